use super::entities::User;
use serde::Serialize;
use ts_rs::TS;

// 对外公开的用户信息
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "user.ts")]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub username: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            username: user.username.clone(),
        }
    }
}

// 当前登录用户可见的完整信息
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "user.ts")]
pub struct ExtendedUserResponse {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    pub hidden: bool,
}

impl ExtendedUserResponse {
    pub fn new(user: &User, can_see_hidden: bool) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            hidden: can_see_hidden,
        }
    }
}
