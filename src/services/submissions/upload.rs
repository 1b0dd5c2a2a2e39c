use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use chrono::Utc;
use tracing::info;

use super::SubmissionService;
use super::response::submission_response;
use crate::config::AppConfig;
use crate::errors::{CGSystemError, Result};
use crate::models::assignments::entities::Assignment;
use crate::models::permissions::entities::Perm;
use crate::models::submissions::entities::NewWork;
use crate::models::submissions::requests::UploadQuery;
use crate::runtime::Background;
use crate::services::assignments::{notify_reset, pick_grader};
use crate::services::ingest::blobs::remove_blobs;
use crate::services::ingest::multipart::save_files;
use crate::services::ingest::{IgnoreFilter, IgnoreHandling, process_files};
use crate::services::linters::lint_new_work;
use crate::services::lookup;
use crate::services::permissions::{ensure_can_see_assignment, load_checker};
use crate::utils::run_blocking;

/// 作业的忽略规则
pub fn assignment_filter(assignment: &Assignment) -> Result<IgnoreFilter> {
    match assignment.cgignore.as_deref() {
        Some(text) => IgnoreFilter::new(text),
        None => Ok(IgnoreFilter::empty()),
    }
}

/// 解析 `ignored_files`，缺省时保留所有文件
pub fn ignore_mode(value: Option<&str>) -> Result<IgnoreHandling> {
    value.map(str::parse).transpose().map(Option::unwrap_or_default)
}

pub async fn upload(
    service: &SubmissionService,
    request: &HttpRequest,
    assignment_id: i64,
    payload: Multipart,
    query: UploadQuery,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let assignment = lookup::assignment(&storage, assignment_id).await?;
    let (user, checker) = load_checker(&storage, request).await?;
    ensure_can_see_assignment(&checker, &assignment)?;
    checker.ensure_course(Perm::CanSubmitOwnWork, assignment.course_id)?;
    if assignment.deadline_expired(Utc::now()) {
        checker
            .ensure_course(Perm::CanUploadAfterDeadline, assignment.course_id)
            .map_err(|e| e.with_description("The deadline for this assignment has already passed"))?;
    }

    let mode = ignore_mode(query.ignored_files.as_deref())?;
    let filter = assignment_filter(&assignment)?;

    let bg = Background::from_request(request);
    let scratch = tempfile::tempdir().map_err(CGSystemError::from)?;
    let max_size = AppConfig::get().upload.max_size;
    let files = save_files(payload, scratch.path(), |name| name.starts_with("file"), max_size).await?;

    let upload_dir = bg.upload_dir.clone();
    let tree = run_blocking(move || process_files(&files, &filter, mode, &upload_dir, false)).await?;
    drop(scratch);

    let (work, reset) = {
        let _guard = bg.lock_division(assignment.id).await;
        let previous = storage.latest_work_for_user(assignment.id, user.id).await?;
        let weights = storage.list_grader_weights(assignment.id).await?;
        let latest = storage.latest_works(assignment.id).await?;
        let grader = pick_grader(previous.as_ref(), &latest, &weights);

        let new_work = NewWork {
            assignment_id: assignment.id,
            user_id: user.id,
            created_at: Utc::now(),
            assigned_to: grader,
            grade: None,
            comment: None,
        };
        let work = match storage.create_work(new_work, &tree).await {
            Ok(work) => work,
            Err(e) => {
                remove_blobs(&bg.upload_dir, &tree.blobs());
                return Err(e.into());
            }
        };

        let mut reset = Vec::new();
        if let Some(grader) = grader
            && storage.list_done_graders(assignment.id).await?.contains(&grader)
        {
            storage.set_grader_done(assignment.id, grader, false).await?;
            reset.push(grader);
        }
        (work, reset)
    };
    notify_reset(&bg, &assignment, reset);
    lint_new_work(&bg, assignment.id, work.id).await?;

    info!(
        "User {} uploaded work {} for assignment {} ({} file(s))",
        user.id,
        work.id,
        assignment.id,
        tree.leaf_count()
    );
    let response = submission_response(&storage, &checker, &assignment, &work, false).await?;
    Ok(HttpResponse::Created().json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignore_mode() {
        assert_eq!(ignore_mode(None).unwrap(), IgnoreHandling::Keep);
        assert_eq!(ignore_mode(Some("delete")).unwrap(), IgnoreHandling::Delete);
        assert_eq!(ignore_mode(Some("error")).unwrap(), IgnoreHandling::Error);
        assert_eq!(
            ignore_mode(Some("nope")).unwrap_err().api_code(),
            "INVALID_PARAM"
        );
    }
}
