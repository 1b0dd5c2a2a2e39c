use serde::Deserialize;
use ts_rs::TS;

// PUT /code/:file_id/comments/:line
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "comment.ts")]
pub struct PutCommentRequest {
    pub comment: Option<String>,
}
