use super::entities::{Assignment, AssignmentState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use ts_rs::TS;

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "assignment.ts")]
pub struct AssignmentResponse {
    pub id: i64,
    pub name: String,
    pub state: AssignmentState,
    pub deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub course_id: i64,
    pub course_name: String,
    pub is_lti: bool,
    pub cgignore: Option<String>,
    pub reminder_type: String,
    pub reminder_time: Option<DateTime<Utc>>,
    pub done_email: Option<String>,
    pub whitespace_linter: bool,
}

impl AssignmentResponse {
    pub fn new(assignment: &Assignment, course_name: &str, whitespace_linter: bool) -> Self {
        Self {
            id: assignment.id,
            name: assignment.name.clone(),
            state: assignment.state,
            deadline: assignment.deadline,
            created_at: assignment.created_at,
            course_id: assignment.course_id,
            course_name: course_name.to_string(),
            is_lti: assignment.is_lti(),
            cgignore: assignment.cgignore.clone(),
            reminder_type: assignment.reminder_type.as_str().to_string(),
            reminder_time: assignment.reminder_time,
            done_email: assignment.done_email.clone(),
            whitespace_linter,
        }
    }
}

// GET /assignments/:id/graders/
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "assignment.ts")]
pub struct GraderResponse {
    pub id: i64,
    pub name: String,
    pub weight: f64,
    pub done: bool,
}
