use serde::Deserialize;
use ts_rs::TS;

// GET /permissions/ 参数
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "permission.ts")]
pub struct PermissionQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub permission: Option<String>,
    pub course_id: Option<i64>,
}

// 翻转角色的某个权限
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "permission.ts")]
pub struct SetPermissionRequest {
    pub permission: String,
    pub value: bool,
}
