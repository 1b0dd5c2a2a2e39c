use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub lti_course_id: Option<String>,
    pub lti_provider_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Course {
    pub fn is_lti(&self) -> bool {
        self.lti_provider_id.is_some()
    }
}

/// 新建课程所需字段
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub name: String,
    pub lti_course_id: Option<String>,
    pub lti_provider_id: Option<i64>,
    /// (角色名, 显式权限名)
    pub roles: Vec<(String, Vec<String>)>,
    /// 创建者及其课程角色名
    pub owner: Option<(i64, String)>,
}
