/*!
 * JWT 认证中间件
 *
 * 验证 `Authorization: Bearer <token>`，通过后把当前用户放入请求扩展。
 *
 * ```rust,ignore
 * web::scope("/api/v1/courses")
 *     .wrap(RequireJWT)
 *     .route("/", web::get().to(list_courses))
 * ```
 *
 * 处理函数中用 `RequireJWT::extract_user_claims(&req)` 取出用户。
 *
 * ## 认证流程
 *
 * 1. 校验签名与过期时间
 * 2. 检查注销标记 `revoked:<token>`
 * 3. 优先读缓存 `user:<token>`，否则查库并回写缓存
 * 4. 已停用的账号返回 INACTIVE_USER
 */

use crate::cache::{CacheResult, ObjectCache};
use crate::config::AppConfig;
use crate::errors::CGSystemError;
use crate::models::users::entities::User;
use crate::storage::Storage;
use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage, HttpResponse, ResponseError,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::{rc::Rc, sync::Arc};
use tracing::{debug, info};

const BEARER_PREFIX: &str = "Bearer ";
const AUTHORIZATION_HEADER: &str = "Authorization";

#[derive(Clone)]
pub struct RequireJWT;

/// 缓存中的用户键
pub fn user_cache_key(token: &str) -> String {
    format!("user:{token}")
}

/// 注销标记键
pub fn revoked_cache_key(token: &str) -> String {
    format!("revoked:{token}")
}

/// 从请求头取出 Bearer token
pub fn bearer_token(req: &actix_web::HttpRequest) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix(BEARER_PREFIX))
        .map(str::to_string)
}

// 辅助函数：提取并验证 JWT access token
async fn extract_and_validate_jwt(req: &ServiceRequest) -> Result<User, CGSystemError> {
    let token = req
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix(BEARER_PREFIX))
        .ok_or_else(|| {
            CGSystemError::not_logged_in("You need to be logged in to do this.")
                .with_description("Missing or invalid Authorization header")
        })?;

    let claims = crate::utils::jwt::JwtUtils::verify_access_token(token).map_err(|err| {
        info!("JWT token validation failed: {}", err);
        CGSystemError::not_logged_in("Your session has expired, please log in again.")
            .with_description(format!("Invalid JWT token: {err}"))
    })?;

    let cache = req
        .app_data::<actix_web::web::Data<Arc<dyn ObjectCache>>>()
        .expect("Cache not found in app data")
        .get_ref()
        .clone();

    if let CacheResult::Found(_) = cache.get_raw(&revoked_cache_key(token)).await {
        info!("Rejected revoked JWT token for subject {}", claims.sub);
        return Err(CGSystemError::not_logged_in("You have been logged out.")
            .with_description("Token has been revoked"));
    }

    // 从缓存中获取用户信息
    match cache.get_raw(&user_cache_key(token)).await {
        CacheResult::Found(json) => match serde_json::from_str::<User>(&json) {
            Ok(user) if user.active => return Ok(user),
            Ok(_) => {
                cache.remove(&user_cache_key(token)).await;
            }
            Err(_) => {
                cache.remove(&user_cache_key(token)).await;
                info!("Failed to deserialize user from cache for subject {}", claims.sub);
            }
        },
        _ => {
            debug!("User not found in cache for subject {}", claims.sub);
        }
    };

    let storage = req
        .app_data::<actix_web::web::Data<Arc<dyn Storage>>>()
        .expect("Storage not found in app data")
        .get_ref()
        .clone();

    let user_id = claims.sub.parse::<i64>().map_err(|_| {
        CGSystemError::not_logged_in("Your session is invalid, please log in again.")
            .with_description("Invalid user ID in JWT")
    })?;

    let user = storage.get_user_by_id(user_id).await?.ok_or_else(|| {
        CGSystemError::not_logged_in("Your session is invalid, please log in again.")
            .with_description(format!("User {user_id} not found"))
    })?;

    if !user.active {
        return Err(CGSystemError::inactive_user("User is not active")
            .with_description(format!("The user with id {} is not active", user.id)));
    }

    // 将用户信息存入缓存
    let app_config = AppConfig::get();
    if let Ok(user_json) = serde_json::to_string(&user) {
        cache
            .insert_raw(user_cache_key(token), user_json, app_config.cache.default_ttl)
            .await;
    }

    Ok(user)
}

impl<S, B> Transform<S, ServiceRequest> for RequireJWT
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireJWTMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireJWTMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct RequireJWTMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequireJWTMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        Box::pin(async move {
            // 处理 OPTIONS 请求
            if req.method() == actix_web::http::Method::OPTIONS {
                return Ok(req.into_response(HttpResponse::NoContent().finish().map_into_right_body()));
            }

            match extract_and_validate_jwt(&req).await {
                Ok(user) => {
                    debug!("JWT authentication successful for ID: {}", user.id);
                    req.extensions_mut().insert(user);
                    let res = srv.call(req).await?.map_into_left_body();
                    Ok(res)
                }
                Err(err) => {
                    info!(
                        "JWT authentication failed for request to {}: {}",
                        req.path(),
                        err
                    );
                    Ok(req.into_response(err.error_response().map_into_right_body()))
                }
            }
        })
    }
}

// 辅助函数：从请求中提取用户信息
impl RequireJWT {
    /// 从请求扩展中提取当前用户
    pub fn extract_user_claims(req: &actix_web::HttpRequest) -> Option<User> {
        req.extensions().get::<User>().cloned()
    }

    /// 从请求扩展中提取用户ID
    pub fn extract_user_id(req: &actix_web::HttpRequest) -> Option<i64> {
        req.extensions().get::<User>().map(|user| user.id)
    }

    /// 当前用户，缺失时返回 NOT_LOGGED_IN
    pub fn current_user(req: &actix_web::HttpRequest) -> Result<User, CGSystemError> {
        Self::extract_user_claims(req)
            .ok_or_else(|| CGSystemError::not_logged_in("You need to be logged in to do this."))
    }
}
