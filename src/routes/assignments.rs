use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::assignments::requests::{DivideRequest, PatchAssignmentRequest};
use crate::models::linters::requests::CreateLinterRequest;
use crate::models::rubrics::requests::PutRubricRequest;
use crate::models::submissions::requests::{SubmissionListQuery, UploadQuery};
use crate::services::{AssignmentService, LinterService, RubricService, SubmissionService};
use crate::utils::{SafeIDI64, path_i64};

static ASSIGNMENT_SERVICE: Lazy<AssignmentService> = Lazy::new(AssignmentService::new_lazy);
static SUBMISSION_SERVICE: Lazy<SubmissionService> = Lazy::new(SubmissionService::new_lazy);
static RUBRIC_SERVICE: Lazy<RubricService> = Lazy::new(RubricService::new_lazy);
static LINTER_SERVICE: Lazy<LinterService> = Lazy::new(LinterService::new_lazy);

pub async fn get_assignment(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    ASSIGNMENT_SERVICE.get_assignment(&req, id.0).await
}

pub async fn update_assignment(
    req: HttpRequest,
    id: SafeIDI64,
    body: web::Json<PatchAssignmentRequest>,
) -> ActixResult<HttpResponse> {
    ASSIGNMENT_SERVICE
        .update_assignment(&req, id.0, body.into_inner())
        .await
}

pub async fn upload_submission(
    req: HttpRequest,
    id: SafeIDI64,
    query: web::Query<UploadQuery>,
    payload: Multipart,
) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .upload(&req, id.0, payload, query.into_inner())
        .await
}

pub async fn bulk_upload(req: HttpRequest, id: SafeIDI64, payload: Multipart) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE.bulk_upload(&req, id.0, payload).await
}

pub async fn list_submissions(
    req: HttpRequest,
    id: SafeIDI64,
    query: web::Query<SubmissionListQuery>,
) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .list_submissions(&req, id.0, query.into_inner())
        .await
}

pub async fn divide(
    req: HttpRequest,
    id: SafeIDI64,
    body: web::Json<DivideRequest>,
) -> ActixResult<HttpResponse> {
    ASSIGNMENT_SERVICE.divide(&req, id.0, body.into_inner()).await
}

pub async fn list_graders(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    ASSIGNMENT_SERVICE.list_graders(&req, id.0).await
}

pub async fn mark_grader_done(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    let grader_id = path_i64(&req, "grader_id")?;
    ASSIGNMENT_SERVICE
        .set_grader_done(&req, id.0, grader_id, true)
        .await
}

pub async fn mark_grader_not_done(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    let grader_id = path_i64(&req, "grader_id")?;
    ASSIGNMENT_SERVICE
        .set_grader_done(&req, id.0, grader_id, false)
        .await
}

pub async fn get_rubric(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    RUBRIC_SERVICE.get_rubric(&req, id.0).await
}

pub async fn put_rubric(
    req: HttpRequest,
    id: SafeIDI64,
    body: web::Json<PutRubricRequest>,
) -> ActixResult<HttpResponse> {
    RUBRIC_SERVICE.put_rubric(&req, id.0, body.into_inner()).await
}

pub async fn delete_rubric(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    RUBRIC_SERVICE.delete_rubric(&req, id.0).await
}

pub async fn list_linters(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    LINTER_SERVICE.list_linters(&req, id.0).await
}

pub async fn create_linter(
    req: HttpRequest,
    id: SafeIDI64,
    body: web::Json<CreateLinterRequest>,
) -> ActixResult<HttpResponse> {
    LINTER_SERVICE.create_linter(&req, id.0, body.into_inner()).await
}

// 配置路由
pub fn configure_assignment_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/assignments")
            .wrap(middlewares::RequireJWT)
            .route("/{id}", web::get().to(get_assignment))
            .route("/{id}", web::patch().to(update_assignment))
            .route("/{id}/submission", web::post().to(upload_submission))
            .route("/{id}/submissions/", web::get().to(list_submissions))
            .route("/{id}/submissions/", web::post().to(bulk_upload))
            .route("/{id}/divide", web::patch().to(divide))
            .route("/{id}/graders/", web::get().to(list_graders))
            .route("/{id}/graders/{grader_id}/done", web::post().to(mark_grader_done))
            .route("/{id}/graders/{grader_id}/done", web::delete().to(mark_grader_not_done))
            .route("/{id}/rubrics/", web::get().to(get_rubric))
            .route("/{id}/rubrics/", web::put().to(put_rubric))
            .route("/{id}/rubrics/", web::delete().to(delete_rubric))
            .route("/{id}/linters/", web::get().to(list_linters))
            .route("/{id}/linter", web::post().to(create_linter)),
    );
}
