use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 一次提交
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Work {
    pub id: i64,
    pub assignment_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub assigned_to: Option<i64>,
    /// 手动设置的成绩，优先于评分标准计算值
    pub grade: Option<f64>,
    pub comment: Option<String>,
    pub edit: i32,
}

/// 新建提交所需字段
#[derive(Debug, Clone)]
pub struct NewWork {
    pub assignment_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub assigned_to: Option<i64>,
    pub grade: Option<f64>,
    pub comment: Option<String>,
}

/// 提交更新，None 表示不修改
#[derive(Debug, Clone, Default)]
pub struct WorkUpdate {
    pub grade: Option<Option<f64>>,
    pub comment: Option<Option<String>>,
    pub assigned_to: Option<Option<i64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeHistoryEntry {
    pub id: i64,
    pub work_id: i64,
    pub user_id: Option<i64>,
    pub grade: Option<f64>,
    pub passed_back: bool,
    pub rubric_modified: bool,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGradeHistory {
    pub work_id: i64,
    pub user_id: Option<i64>,
    pub grade: Option<f64>,
    pub passed_back: bool,
    pub rubric_modified: bool,
}
