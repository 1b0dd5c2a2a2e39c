use serde::Deserialize;
use std::collections::HashMap;
use ts_rs::TS;

// PATCH /assignments/:id
#[derive(Debug, Default, Deserialize, TS)]
#[ts(export, export_to = "assignment.ts")]
pub struct PatchAssignmentRequest {
    pub name: Option<String>,
    pub state: Option<String>,
    pub deadline: Option<String>,
    pub ignore: Option<String>,
    pub reminder_type: Option<String>,
    pub reminder_time: Option<String>,
    pub done_email: Option<String>,
}

// POST /courses/:id/assignments/
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "assignment.ts")]
pub struct CreateAssignmentRequest {
    pub name: Option<String>,
}

// PATCH /assignments/:id/divide，键为用户 id
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "assignment.ts")]
pub struct DivideRequest {
    pub graders: Option<HashMap<String, f64>>,
}
