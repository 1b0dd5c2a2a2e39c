use crate::models::users::responses::ExtendedUserResponse;
use serde::Serialize;
use ts_rs::TS;

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "auth.ts")]
pub struct LoginResponse {
    pub user: ExtendedUserResponse,
    pub access_token: String,
}
