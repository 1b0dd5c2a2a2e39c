use crate::models::users::responses::UserResponse;
use chrono::{DateTime, Utc};
use serde::Serialize;
use ts_rs::TS;

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "submission.ts")]
pub struct SubmissionResponse {
    pub id: i64,
    pub user: UserResponse,
    pub created_at: DateTime<Utc>,
    pub assignee: Option<UserResponse>,
    pub grade: Option<f64>,
    pub grade_overridden: bool,
    pub whitespace: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "submission.ts")]
pub struct GradeHistoryResponse {
    pub changed_at: DateTime<Utc>,
    pub user: Option<UserResponse>,
    pub grade: Option<f64>,
    pub passed_back: bool,
    pub rubric_modified: bool,
}

// POST /assignments/:id/submissions/ 的结果
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "submission.ts")]
pub struct BulkUploadResponse {
    pub created: usize,
    pub new_users: usize,
}
