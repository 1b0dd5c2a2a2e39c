use super::entities::Course;
use crate::models::users::responses::UserResponse;
use chrono::{DateTime, Utc};
use serde::Serialize;
use ts_rs::TS;

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "course.ts")]
pub struct CourseResponse {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub is_lti: bool,
    pub role: Option<String>,
}

impl CourseResponse {
    pub fn new(course: &Course, role: Option<String>) -> Self {
        Self {
            id: course.id,
            name: course.name.clone(),
            created_at: course.created_at,
            is_lti: course.is_lti(),
            role,
        }
    }
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "course.ts")]
pub struct CourseRoleInfo {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "course.ts")]
pub struct CourseUserResponse {
    #[serde(rename = "User")]
    pub user: UserResponse,
    #[serde(rename = "CourseRole")]
    pub course_role: CourseRoleInfo,
}
