use crate::models::common::deserialize_some;
use serde::Deserialize;
use ts_rs::TS;

// 上传时的忽略模式
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "submission.ts")]
pub struct UploadQuery {
    pub ignored_files: Option<String>,
}

// GET /assignments/:id/submissions/
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "submission.ts")]
pub struct SubmissionListQuery {
    pub extended: Option<String>,
    pub csv: Option<String>,
}

// GET /submissions/:id
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "submission.ts")]
pub struct SubmissionGetQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub extended: Option<String>,
}

// PATCH /submissions/:id，grade 为 null 时清除成绩
#[derive(Debug, Default, Deserialize)]
pub struct PatchSubmissionRequest {
    #[serde(default, deserialize_with = "deserialize_some")]
    pub grade: Option<Option<f64>>,
    pub feedback: Option<String>,
}

// PATCH /submissions/:id/grader
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "submission.ts")]
pub struct SetGraderRequest {
    pub user_id: Option<i64>,
}
