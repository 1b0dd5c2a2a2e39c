//! 数据模型
//!
//! 按业务域划分：entities 为业务实体，requests 为请求体/查询参数，responses 为响应体。

pub mod assignments;
pub mod auth;
pub mod comments;
pub mod common;
pub mod courses;
pub mod files;
pub mod linters;
pub mod lti;
pub mod permissions;
pub mod rubrics;
pub mod submissions;
pub mod users;

pub use common::{AppStartTime, Warning, WarningCode};
