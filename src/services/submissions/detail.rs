use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::SubmissionService;
use super::export::{archive_root_name, build_zip, render_feedback};
use super::response::submission_response;
use crate::errors::CGSystemError;
use crate::models::permissions::entities::Perm;
use crate::models::submissions::requests::SubmissionGetQuery;
use crate::runtime::Background;
use crate::services::ingest::FileArena;
use crate::services::ingest::blobs::remove_blobs;
use crate::services::lookup;
use crate::services::permissions::{can_see_feedback, ensure_can_see_work, load_checker};
use crate::services::rubrics::grade::work_grade;
use crate::utils::run_blocking;

fn attachment(name: String) -> ContentDisposition {
    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(name)],
    }
}

pub async fn get_submission(
    service: &SubmissionService,
    request: &HttpRequest,
    work_id: i64,
    query: SubmissionGetQuery,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let work = lookup::work(&storage, work_id).await?;
    let assignment = lookup::assignment(&storage, work.assignment_id).await?;
    let (_, checker) = load_checker(&storage, request).await?;
    ensure_can_see_work(&checker, &assignment, &work)?;

    match query.kind.as_deref().unwrap_or("json") {
        "json" => {
            let extended = query.extended.is_some();
            let response = submission_response(&storage, &checker, &assignment, &work, extended).await?;
            Ok(HttpResponse::Ok().json(response))
        }
        "zip" => {
            let owner = lookup::user(&storage, work.user_id).await?;
            let arena = FileArena::new(storage.list_work_files(work.id).await?)?;
            let root = archive_root_name(&assignment.name, &owner.name);
            let blob_dir = Background::from_request(request).upload_dir.clone();
            let name = format!("{root}.zip");
            let data = run_blocking(move || build_zip(&arena, &blob_dir, &root)).await?;
            Ok(HttpResponse::Ok()
                .content_type("application/zip")
                .insert_header(attachment(name))
                .body(data))
        }
        "feedback" => {
            let arena = FileArena::new(storage.list_work_files(work.id).await?)?;
            let text = if can_see_feedback(&checker, &assignment) {
                let grade = work_grade(&storage, &work).await?;
                let comments = storage.list_work_comments(work.id).await?;
                let linter = storage.list_work_linter_comments(work.id).await?;
                render_feedback(
                    &assignment.name,
                    grade.grade,
                    work.comment.as_deref(),
                    &arena,
                    &comments,
                    &linter,
                )
            } else {
                render_feedback(&assignment.name, None, None, &arena, &[], &[])
            };
            Ok(HttpResponse::Ok()
                .content_type("text/plain; charset=utf-8")
                .insert_header(attachment(format!("{}-feedback.txt", assignment.name)))
                .body(text))
        }
        other => Err(CGSystemError::invalid_param("The given type is not supported")
            .with_description(format!("\"{other}\" is not one of json, zip or feedback"))
            .into()),
    }
}

pub async fn delete_submission(
    service: &SubmissionService,
    request: &HttpRequest,
    work_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let work = lookup::work(&storage, work_id).await?;
    let assignment = lookup::assignment(&storage, work.assignment_id).await?;
    let (user, checker) = load_checker(&storage, request).await?;
    checker.ensure_course(Perm::CanDeleteSubmission, assignment.course_id)?;

    let blobs = storage.delete_work(work.id).await?;
    let upload_dir = Background::from_request(request).upload_dir.clone();
    let count = blobs.len();
    run_blocking(move || {
        remove_blobs(&upload_dir, &blobs);
        Ok(())
    })
    .await?;

    info!("User {} deleted work {} ({} file(s))", user.id, work.id, count);
    Ok(HttpResponse::NoContent().finish())
}
