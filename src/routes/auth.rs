use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, guard, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::auth::requests::LoginRequest;
use crate::services::AuthService;

// 懒加载的全局 AuthService 实例
static AUTH_SERVICE: Lazy<AuthService> = Lazy::new(AuthService::new_lazy);

pub async fn login(
    req: HttpRequest,
    user_data: web::Json<LoginRequest>,
) -> ActixResult<HttpResponse> {
    AUTH_SERVICE.login(user_data.into_inner(), &req).await
}

pub async fn current_user(request: HttpRequest) -> ActixResult<HttpResponse> {
    AUTH_SERVICE.current_user(&request).await
}

pub async fn logout(request: HttpRequest) -> ActixResult<HttpResponse> {
    AUTH_SERVICE.logout(&request).await
}

// 配置路由
pub fn configure_auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/v1/login")
            .guard(guard::Post())
            .wrap(middlewares::RateLimit::login())
            .route(web::post().to(login)),
    )
    .service(
        web::resource("/api/v1/login")
            .wrap(middlewares::RequireJWT)
            .route(web::get().to(current_user))
            .route(web::delete().to(logout)),
    );
}
