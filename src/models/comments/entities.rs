use serde::{Deserialize, Serialize};

/// 人工评论，(file_id, line) 唯一
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub file_id: i64,
    pub line: i32,
    pub user_id: i64,
    pub comment: String,
}

/// linter 产生的评论
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinterComment {
    pub file_id: i64,
    pub line: i32,
    pub linter_id: String,
    pub code: String,
    pub comment: String,
}

/// 待写入的 linter 评论
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLinterComment {
    pub file_id: i64,
    pub line: i32,
    pub code: String,
    pub comment: String,
}
