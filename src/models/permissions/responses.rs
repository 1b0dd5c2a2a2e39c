use serde::Serialize;
use std::collections::BTreeMap;
use ts_rs::TS;

// 角色及其生效权限
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "permission.ts")]
pub struct RoleResponse {
    pub id: i64,
    pub name: String,
    pub perms: BTreeMap<String, bool>,
}
