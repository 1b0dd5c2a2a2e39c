use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::services::LinterService;

static LINTER_SERVICE: Lazy<LinterService> = Lazy::new(LinterService::new_lazy);

pub async fn get_linter(req: HttpRequest, linter_id: web::Path<String>) -> ActixResult<HttpResponse> {
    LINTER_SERVICE.get_linter(&req, linter_id.into_inner()).await
}

pub async fn delete_linter(req: HttpRequest, linter_id: web::Path<String>) -> ActixResult<HttpResponse> {
    LINTER_SERVICE.delete_linter(&req, linter_id.into_inner()).await
}

// 配置路由
pub fn configure_linter_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/linters")
            .wrap(middlewares::RequireJWT)
            .route("/{id}", web::get().to(get_linter))
            .route("/{id}", web::delete().to(delete_linter)),
    );
}
