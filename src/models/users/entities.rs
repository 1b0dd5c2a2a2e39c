use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 用户
///
/// 序列化时不包含密码哈希；JWT 中间件会把该结构缓存为 JSON。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub active: bool,
    pub lti_user_id: Option<String>,
    pub role_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// 新建用户所需字段（存储层使用）
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub lti_user_id: Option<String>,
    pub role_id: Option<i64>,
}
