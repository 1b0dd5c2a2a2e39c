use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::AuthService;
use crate::errors::CGSystemError;
use crate::models::auth::{LoginRequest, LoginResponse};
use crate::models::permissions::entities::Perm;
use crate::models::users::responses::ExtendedUserResponse;
use crate::services::permissions::{PermissionChecker, load_checker};
use crate::utils::jwt::JwtUtils;
use crate::utils::password::verify_password;

pub async fn handle_login(
    service: &AuthService,
    login_request: LoginRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    if login_request.username.is_empty() || login_request.password.is_empty() {
        return Err(CGSystemError::missing_required_param("Username and password are required")
            .with_description("Both \"username\" and \"password\" should be given")
            .into());
    }

    let storage = service.get_storage(request);

    // 用户名区分大小写，邮箱不区分
    let user = storage
        .find_user_for_login(&login_request.username)
        .await?
        .filter(|user| {
            user.password_hash
                .as_deref()
                .is_some_and(|hash| verify_password(&login_request.password, hash))
        })
        .ok_or_else(|| {
            CGSystemError::login_failure("The supplied username or password is wrong.")
                .with_description(format!(
                    "The user {} does not exist or has a different password",
                    login_request.username
                ))
        })?;

    if !user.active {
        return Err(CGSystemError::inactive_user("User is not active")
            .with_description(format!("The user with id {} is not active", user.id))
            .into());
    }

    let access_token = JwtUtils::generate_access_token(user.id)
        .map_err(|e| CGSystemError::unknown_error(format!("生成访问令牌失败: {e}")))?;
    let checker = PermissionChecker::load(&storage, &user).await?;
    info!("User {} logged in successfully", user.username);

    Ok(HttpResponse::Ok().json(LoginResponse {
        user: ExtendedUserResponse::new(&user, checker.any_course(Perm::CanSeeHiddenAssignments)),
        access_token,
    }))
}

pub async fn handle_current_user(service: &AuthService, request: &HttpRequest) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let (user, checker) = load_checker(&storage, request).await?;
    Ok(HttpResponse::Ok().json(ExtendedUserResponse::new(
        &user,
        checker.any_course(Perm::CanSeeHiddenAssignments),
    )))
}
