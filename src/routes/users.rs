use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, guard, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::users::requests::{RegisterRequest, UserSearchQuery};
use crate::services::UserService;

// 懒加载的全局 UserService 实例
static USER_SERVICE: Lazy<UserService> = Lazy::new(UserService::new_lazy);

pub async fn search_users(
    req: HttpRequest,
    query: web::Query<UserSearchQuery>,
) -> ActixResult<HttpResponse> {
    USER_SERVICE.search_users(&req, query.into_inner()).await
}

pub async fn register(
    req: HttpRequest,
    user_data: web::Json<RegisterRequest>,
) -> ActixResult<HttpResponse> {
    USER_SERVICE.register(&req, user_data.into_inner()).await
}

// 配置路由
pub fn configure_user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/v1/users/")
            .guard(guard::Post())
            .wrap(middlewares::RateLimit::register())
            .route(web::post().to(register)),
    )
    .service(
        web::resource("/api/v1/users/")
            .wrap(middlewares::RateLimit::search())
            .wrap(middlewares::RequireJWT)
            .route(web::get().to(search_users)),
    );
}
