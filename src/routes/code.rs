use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::comments::requests::PutCommentRequest;
use crate::models::files::requests::CodeQuery;
use crate::services::CodeService;
use crate::utils::{SafeIDI64, path_i64};

static CODE_SERVICE: Lazy<CodeService> = Lazy::new(CodeService::new_lazy);

pub async fn get_code(
    req: HttpRequest,
    file_id: SafeIDI64,
    query: web::Query<CodeQuery>,
) -> ActixResult<HttpResponse> {
    CODE_SERVICE.get_code(&req, file_id.0, query.into_inner()).await
}

pub async fn put_comment(
    req: HttpRequest,
    file_id: SafeIDI64,
    body: web::Json<PutCommentRequest>,
) -> ActixResult<HttpResponse> {
    let line = path_i64(&req, "line")?;
    CODE_SERVICE
        .put_comment(&req, file_id.0, line, body.into_inner())
        .await
}

pub async fn delete_comment(req: HttpRequest, file_id: SafeIDI64) -> ActixResult<HttpResponse> {
    let line = path_i64(&req, "line")?;
    CODE_SERVICE.delete_comment(&req, file_id.0, line).await
}

// 配置路由
pub fn configure_code_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/code")
            .wrap(middlewares::RequireJWT)
            .route("/{id}", web::get().to(get_code))
            .route("/{id}/comments/{line}", web::put().to(put_comment))
            .route("/{id}/comments/{line}", web::delete().to(delete_comment)),
    );
}
