use serde::Deserialize;
use ts_rs::TS;

// 用户搜索参数
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "user.ts")]
pub struct UserSearchQuery {
    pub q: Option<String>,
}

// 开放注册请求
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "user.ts")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: String,
}
