use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::permissions::requests::{PermissionQuery, SetPermissionRequest};
use crate::services::PermissionService;
use crate::utils::SafeIDI64;

static PERMISSION_SERVICE: Lazy<PermissionService> = Lazy::new(PermissionService::new_lazy);

pub async fn get_permissions(
    req: HttpRequest,
    query: web::Query<PermissionQuery>,
) -> ActixResult<HttpResponse> {
    PERMISSION_SERVICE.get_permissions(&req, query.into_inner()).await
}

pub async fn list_roles(req: HttpRequest) -> ActixResult<HttpResponse> {
    PERMISSION_SERVICE.list_roles(&req).await
}

pub async fn update_role(
    req: HttpRequest,
    role_id: SafeIDI64,
    body: web::Json<SetPermissionRequest>,
) -> ActixResult<HttpResponse> {
    PERMISSION_SERVICE
        .update_role(&req, role_id.0, body.into_inner())
        .await
}

// 站点权限与站点角色
pub fn configure_permission_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/permissions")
            .wrap(middlewares::RequireJWT)
            .route("/", web::get().to(get_permissions)),
    )
    .service(
        web::scope("/api/v1/roles")
            .wrap(middlewares::RequireJWT)
            .route("/", web::get().to(list_roles))
            .route("/{id}", web::patch().to(update_role)),
    );
}
