use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::files::requests::FilesQuery;
use crate::models::rubrics::requests::SelectItemsRequest;
use crate::models::submissions::requests::{
    PatchSubmissionRequest, SetGraderRequest, SubmissionGetQuery,
};
use crate::services::{RubricService, SubmissionService};
use crate::utils::{SafeIDI64, path_i64};

static SUBMISSION_SERVICE: Lazy<SubmissionService> = Lazy::new(SubmissionService::new_lazy);
static RUBRIC_SERVICE: Lazy<RubricService> = Lazy::new(RubricService::new_lazy);

pub async fn get_submission(
    req: HttpRequest,
    id: SafeIDI64,
    query: web::Query<SubmissionGetQuery>,
) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .get_submission(&req, id.0, query.into_inner())
        .await
}

pub async fn patch_submission(
    req: HttpRequest,
    id: SafeIDI64,
    body: web::Json<PatchSubmissionRequest>,
) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .patch_submission(&req, id.0, body.into_inner())
        .await
}

pub async fn delete_submission(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE.delete_submission(&req, id.0).await
}

pub async fn list_files(
    req: HttpRequest,
    id: SafeIDI64,
    query: web::Query<FilesQuery>,
) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .list_files(&req, id.0, query.into_inner())
        .await
}

pub async fn get_rubric(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    RUBRIC_SERVICE.get_work_rubric(&req, id.0).await
}

pub async fn select_items(
    req: HttpRequest,
    id: SafeIDI64,
    body: web::Json<SelectItemsRequest>,
) -> ActixResult<HttpResponse> {
    RUBRIC_SERVICE
        .select_items(&req, id.0, body.into_inner())
        .await
}

pub async fn select_item(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    let item_id = path_i64(&req, "item_id")?;
    RUBRIC_SERVICE.select_item(&req, id.0, item_id).await
}

pub async fn unselect_item(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    let item_id = path_i64(&req, "item_id")?;
    RUBRIC_SERVICE.unselect_item(&req, id.0, item_id).await
}

pub async fn set_grader(
    req: HttpRequest,
    id: SafeIDI64,
    body: web::Json<SetGraderRequest>,
) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .set_grader(&req, id.0, body.into_inner())
        .await
}

pub async fn unset_grader(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE.unset_grader(&req, id.0).await
}

pub async fn grade_history(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE.grade_history(&req, id.0).await
}

// 配置路由
pub fn configure_submission_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/submissions")
            .wrap(middlewares::RequireJWT)
            .route("/{id}", web::get().to(get_submission))
            .route("/{id}", web::patch().to(patch_submission))
            .route("/{id}", web::delete().to(delete_submission))
            .route("/{id}/files/", web::get().to(list_files))
            .route("/{id}/rubrics/", web::get().to(get_rubric))
            .route("/{id}/rubricitems/", web::patch().to(select_items))
            .route("/{id}/rubricitems/{item_id}", web::patch().to(select_item))
            .route("/{id}/rubricitems/{item_id}", web::delete().to(unselect_item))
            .route("/{id}/grader", web::patch().to(set_grader))
            .route("/{id}/grader", web::delete().to(unset_grader))
            .route("/{id}/grade_history/", web::get().to(grade_history)),
    );
}
