use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use super::UserService;
use crate::config::{AppConfig, Feature};
use crate::errors::{CGSystemError, Result};
use crate::models::auth::LoginResponse;
use crate::models::users::entities::NewUser;
use crate::models::users::requests::RegisterRequest;
use crate::models::users::responses::ExtendedUserResponse;
use crate::services::lookup::ensure_feature;
use crate::utils::jwt::JwtUtils;
use crate::utils::password::hash_password;
use crate::utils::run_blocking;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("invalid email regex"));

/// 校验注册字段，返回去掉首尾空白后的请求
pub fn validate_registration(req: RegisterRequest) -> Result<RegisterRequest> {
    let req = RegisterRequest {
        username: req.username.trim().to_string(),
        email: req.email.trim().to_string(),
        name: req.name.trim().to_string(),
        password: req.password,
    };

    let missing: Vec<&str> = [
        ("username", req.username.is_empty()),
        ("email", req.email.is_empty()),
        ("name", req.name.is_empty()),
        ("password", req.password.is_empty()),
    ]
    .iter()
    .filter(|(_, empty)| *empty)
    .map(|(field, _)| *field)
    .collect();
    if !missing.is_empty() {
        return Err(CGSystemError::missing_required_param("Some required fields are empty")
            .with_description(format!("The fields {} should not be empty", missing.join(", "))));
    }

    if !EMAIL.is_match(&req.email) {
        return Err(CGSystemError::invalid_param("The given email is not valid")
            .with_description(format!("\"{}\" is not a valid email address", req.email)));
    }
    Ok(req)
}

pub async fn register_user(
    service: &UserService,
    request: &HttpRequest,
    req: RegisterRequest,
) -> ActixResult<HttpResponse> {
    ensure_feature(Feature::Register)?;
    let req = validate_registration(req)?;
    let storage = service.get_storage(request);

    if storage.get_user_by_username(&req.username).await?.is_some() {
        return Err(CGSystemError::object_already_exists("The given username is already in use")
            .with_description(format!("The username \"{}\" is taken", req.username))
            .into());
    }
    if storage.email_exists(&req.email).await? {
        return Err(CGSystemError::object_already_exists("The given email is already in use")
            .with_description(format!("The email \"{}\" is taken", req.email))
            .into());
    }

    let default_role = &AppConfig::get().app.default_role;
    let role = storage.get_site_role_by_name(default_role).await?.ok_or_else(|| {
        CGSystemError::object_not_found("The default role does not exist")
            .with_description(format!("There is no site role named \"{default_role}\""))
    })?;

    let password = req.password.clone();
    let password_hash = run_blocking(move || hash_password(&password)).await?;

    let user = storage
        .create_user(NewUser {
            name: req.name,
            username: req.username,
            email: req.email,
            password_hash: Some(password_hash),
            lti_user_id: None,
            role_id: Some(role.id),
        })
        .await?;
    let access_token = JwtUtils::generate_access_token(user.id)
        .map_err(|e| CGSystemError::unknown_error(format!("生成访问令牌失败: {e}")))?;
    info!("Registered user {} ({})", user.username, user.id);

    Ok(HttpResponse::Created().json(LoginResponse {
        user: ExtendedUserResponse::new(&user, false),
        access_token,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: "hunter22".into(),
            name: "Thomas".into(),
        }
    }

    #[test]
    fn test_valid_registration_is_trimmed() {
        let req = validate_registration(request(" thomas ", "t@example.com ")).unwrap();
        assert_eq!(req.username, "thomas");
        assert_eq!(req.email, "t@example.com");
    }

    #[test]
    fn test_missing_fields() {
        let err = validate_registration(request("  ", "t@example.com")).unwrap_err();
        assert_eq!(err.api_code(), "MISSING_REQUIRED_PARAM");
        assert!(err.description().contains("username"));
    }

    #[test]
    fn test_invalid_email() {
        let err = validate_registration(request("thomas", "not-an-email")).unwrap_err();
        assert_eq!(err.api_code(), "INVALID_PARAM");
    }
}
