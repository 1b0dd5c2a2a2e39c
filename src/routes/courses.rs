use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::assignments::requests::CreateAssignmentRequest;
use crate::models::courses::requests::{CreateCourseRequest, EnrollUserRequest};
use crate::models::permissions::requests::SetPermissionRequest;
use crate::services::CourseService;
use crate::utils::{SafeIDI64, path_i64};

// 懒加载的全局 CourseService 实例
static COURSE_SERVICE: Lazy<CourseService> = Lazy::new(CourseService::new_lazy);

pub async fn list_courses(req: HttpRequest) -> ActixResult<HttpResponse> {
    COURSE_SERVICE.list_courses(&req).await
}

pub async fn create_course(
    req: HttpRequest,
    body: web::Json<CreateCourseRequest>,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE.create_course(&req, body.into_inner()).await
}

pub async fn get_course(req: HttpRequest, course_id: SafeIDI64) -> ActixResult<HttpResponse> {
    COURSE_SERVICE.get_course(&req, course_id.0).await
}

pub async fn get_permissions(req: HttpRequest, course_id: SafeIDI64) -> ActixResult<HttpResponse> {
    COURSE_SERVICE.get_permissions(&req, course_id.0).await
}

pub async fn list_roles(req: HttpRequest, course_id: SafeIDI64) -> ActixResult<HttpResponse> {
    COURSE_SERVICE.list_roles(&req, course_id.0).await
}

pub async fn update_role(
    req: HttpRequest,
    course_id: SafeIDI64,
    body: web::Json<SetPermissionRequest>,
) -> ActixResult<HttpResponse> {
    let role_id = path_i64(&req, "role_id")?;
    COURSE_SERVICE
        .update_role(&req, course_id.0, role_id, body.into_inner())
        .await
}

pub async fn list_users(req: HttpRequest, course_id: SafeIDI64) -> ActixResult<HttpResponse> {
    COURSE_SERVICE.list_users(&req, course_id.0).await
}

pub async fn set_user_role(
    req: HttpRequest,
    course_id: SafeIDI64,
    body: web::Json<EnrollUserRequest>,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE
        .set_user_role(&req, course_id.0, body.into_inner())
        .await
}

pub async fn list_assignments(req: HttpRequest, course_id: SafeIDI64) -> ActixResult<HttpResponse> {
    COURSE_SERVICE.list_assignments(&req, course_id.0).await
}

pub async fn create_assignment(
    req: HttpRequest,
    course_id: SafeIDI64,
    body: web::Json<CreateAssignmentRequest>,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE
        .create_assignment(&req, course_id.0, body.into_inner())
        .await
}

// 配置路由
pub fn configure_course_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/courses")
            .wrap(middlewares::RequireJWT)
            .route("/", web::get().to(list_courses))
            .route("/", web::post().to(create_course))
            .route("/{id}", web::get().to(get_course))
            .route("/{id}/assignments/", web::get().to(list_assignments))
            .route("/{id}/assignments/", web::post().to(create_assignment))
            .route("/{id}/roles/", web::get().to(list_roles))
            .route("/{id}/roles/{role_id}", web::patch().to(update_role))
            .route("/{id}/users/", web::get().to(list_users))
            .route("/{id}/users/", web::put().to(set_user_role))
            .route("/{id}/permissions/", web::get().to(get_permissions)),
    );
}
