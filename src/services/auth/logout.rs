use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::AuthService;
use crate::errors::CGSystemError;
use crate::middlewares::require_jwt::{bearer_token, revoked_cache_key, user_cache_key};
use crate::utils::jwt::JwtUtils;

/// 剩余有效期（秒），至少 1 秒
pub fn remaining_lifetime(exp: usize, now: i64) -> u64 {
    (exp as i64 - now).max(1) as u64
}

/// 注销当前令牌，有效期内的后续请求都会被拒绝
pub async fn handle_logout(service: &AuthService, request: &HttpRequest) -> ActixResult<HttpResponse> {
    let token = bearer_token(request)
        .ok_or_else(|| CGSystemError::not_logged_in("You need to be logged in to do this."))?;
    let claims = JwtUtils::verify_access_token(&token).map_err(|e| {
        CGSystemError::not_logged_in("Your session has expired, please log in again.")
            .with_description(format!("Invalid JWT token: {e}"))
    })?;

    let cache = service.get_cache(request);
    let ttl = remaining_lifetime(claims.exp, chrono::Utc::now().timestamp());
    cache.insert_raw(revoked_cache_key(&token), "1".to_string(), ttl).await;
    cache.remove(&user_cache_key(&token)).await;

    info!("User {} logged out", claims.sub);
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_lifetime() {
        assert_eq!(remaining_lifetime(1_000, 400), 600);
        assert_eq!(remaining_lifetime(1_000, 1_000), 1);
        assert_eq!(remaining_lifetime(1_000, 2_000), 1);
    }
}
