use serde::Deserialize;
use ts_rs::TS;

// 登录请求，username 也可以是邮箱
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "auth.ts")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}
