use crate::models::users::responses::UserResponse;
use serde::Serialize;
use ts_rs::TS;

// GET /code/:file_id?type=feedback 中每行的评论
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "comment.ts")]
pub struct CommentResponse {
    pub line: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub author: Option<UserResponse>,
}

// linter 评论，和 linter 名称组成 [name, {code, msg}]
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "comment.ts")]
pub struct LinterMessage {
    pub code: String,
    pub msg: String,
}
