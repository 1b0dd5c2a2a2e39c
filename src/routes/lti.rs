use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::services::LtiService;

static LTI_SERVICE: Lazy<LtiService> = Lazy::new(LtiService::new_lazy);

pub async fn launch_first(
    req: HttpRequest,
    form: web::Form<Vec<(String, String)>>,
) -> ActixResult<HttpResponse> {
    LTI_SERVICE.launch_first(&req, form.into_inner()).await
}

pub async fn launch_second(req: HttpRequest) -> ActixResult<HttpResponse> {
    LTI_SERVICE.launch_second(&req).await
}

// LMS 启动，签名在服务内校验
pub fn configure_lti_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/lti")
            .route("/launch/1", web::post().to(launch_first))
            .route("/launch/2", web::get().to(launch_second)),
    );
}
