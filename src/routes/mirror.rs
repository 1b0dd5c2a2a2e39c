use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::files::requests::MirrorDownloadQuery;
use crate::services::MirrorService;

static MIRROR_SERVICE: Lazy<MirrorService> = Lazy::new(MirrorService::new_lazy);

pub async fn upload(req: HttpRequest, payload: web::Payload) -> ActixResult<HttpResponse> {
    MIRROR_SERVICE.upload(&req, payload).await
}

pub async fn download(
    req: HttpRequest,
    name: web::Path<String>,
    query: web::Query<MirrorDownloadQuery>,
) -> ActixResult<HttpResponse> {
    MIRROR_SERVICE
        .download(&req, name.into_inner(), query.into_inner())
        .await
}

// 中转文件，上传需要登录，下载只需知道生成的文件名
pub fn configure_mirror_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/v1/files/")
            .wrap(middlewares::RequireJWT)
            .route(web::post().to(upload)),
    )
    .service(web::resource("/api/v1/files/{name}").route(web::get().to(download)));
}
