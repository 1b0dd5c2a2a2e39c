use serde::Deserialize;
use ts_rs::TS;

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "course.ts")]
pub struct CreateCourseRequest {
    pub name: Option<String>,
}

// 选课或修改课程角色
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "course.ts")]
pub struct EnrollUserRequest {
    pub username: Option<String>,
    pub role_id: Option<i64>,
}
