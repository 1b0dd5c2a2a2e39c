use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::collections::HashMap;
use tracing::info;

use super::SubmissionService;
use super::response::submission_response;
use crate::errors::{CGSystemError, Result};
use crate::models::permissions::entities::Perm;
use crate::models::submissions::entities::WorkUpdate;
use crate::models::submissions::requests::{PatchSubmissionRequest, SetGraderRequest};
use crate::models::submissions::responses::GradeHistoryResponse;
use crate::models::users::responses::UserResponse;
use crate::runtime::Background;
use crate::services::assignments::notify_reset;
use crate::services::lookup;
use crate::services::permissions::{load_checker, users_with_course_perm};
use crate::services::rubrics::grade::record_grade_change;

/// 成绩必须在 [0, 10] 之间，null 表示清除
pub fn validate_grade(grade: Option<f64>) -> Result<Option<f64>> {
    match grade {
        Some(g) if !(0.0..=10.0).contains(&g) => {
            Err(CGSystemError::invalid_param("Grade submitted not between 0 and 10")
                .with_description(format!("Grade {g} is not between 0 and 10")))
        }
        other => Ok(other),
    }
}

pub async fn patch_submission(
    service: &SubmissionService,
    request: &HttpRequest,
    work_id: i64,
    req: PatchSubmissionRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let work = lookup::work(&storage, work_id).await?;
    let assignment = lookup::assignment(&storage, work.assignment_id).await?;
    let (user, checker) = load_checker(&storage, request).await?;
    checker.ensure_course(Perm::CanGradeWork, assignment.course_id)?;

    let grade = req.grade.map(validate_grade).transpose()?;
    let update = WorkUpdate {
        grade,
        comment: req.feedback.map(Some),
        assigned_to: None,
    };
    let grade_changed = update.grade.is_some();
    let mut work = storage.update_work(work.id, update).await?;

    if grade_changed {
        let bg = Background::from_request(request);
        record_grade_change(&bg, &assignment, work.id, user.id, false).await?;
        work = lookup::work(&storage, work.id).await?;
        info!("User {} graded work {}", user.id, work.id);
    }

    let response = submission_response(&storage, &checker, &assignment, &work, true).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn set_grader(
    service: &SubmissionService,
    request: &HttpRequest,
    work_id: i64,
    req: SetGraderRequest,
) -> ActixResult<HttpResponse> {
    let Some(grader_id) = req.user_id else {
        return Err(CGSystemError::missing_required_param("The \"user_id\" field is required").into());
    };
    let storage = service.get_storage(request);
    let work = lookup::work(&storage, work_id).await?;
    let assignment = lookup::assignment(&storage, work.assignment_id).await?;
    let (user, checker) = load_checker(&storage, request).await?;
    checker.ensure_course(Perm::CanManageCourse, assignment.course_id)?;

    let grader = lookup::user(&storage, grader_id).await?;
    let graders = users_with_course_perm(&storage, assignment.course_id, Perm::CanGradeWork).await?;
    if !graders.iter().any(|g| g.id == grader.id) {
        return Err(CGSystemError::invalid_param(format!(
            "The selected user {} is not allowed to grade in this course",
            grader.name
        ))
        .with_description(format!("User {} does not have can_grade_work", grader.id))
        .into());
    }

    let bg = Background::from_request(request);
    {
        let _guard = bg.lock_division(assignment.id).await;
        storage
            .update_work(
                work.id,
                WorkUpdate {
                    assigned_to: Some(Some(grader.id)),
                    ..Default::default()
                },
            )
            .await?;
        if storage.list_done_graders(assignment.id).await?.contains(&grader.id) {
            storage.set_grader_done(assignment.id, grader.id, false).await?;
            notify_reset(&bg, &assignment, vec![grader.id]);
        }
    }

    info!("User {} assigned work {} to grader {}", user.id, work.id, grader.id);
    Ok(HttpResponse::NoContent().finish())
}

pub async fn unset_grader(
    service: &SubmissionService,
    request: &HttpRequest,
    work_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let work = lookup::work(&storage, work_id).await?;
    let assignment = lookup::assignment(&storage, work.assignment_id).await?;
    let (user, checker) = load_checker(&storage, request).await?;
    checker.ensure_course(Perm::CanManageCourse, assignment.course_id)?;

    storage
        .update_work(
            work.id,
            WorkUpdate {
                assigned_to: Some(None),
                ..Default::default()
            },
        )
        .await?;

    info!("User {} unassigned work {}", user.id, work.id);
    Ok(HttpResponse::NoContent().finish())
}

pub async fn grade_history(
    service: &SubmissionService,
    request: &HttpRequest,
    work_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let work = lookup::work(&storage, work_id).await?;
    let assignment = lookup::assignment(&storage, work.assignment_id).await?;
    let (_, checker) = load_checker(&storage, request).await?;
    checker.ensure_course(Perm::CanGradeWork, assignment.course_id)?;

    let history = storage.list_grade_history(work.id).await?;
    let mut ids: Vec<i64> = history.iter().filter_map(|h| h.user_id).collect();
    ids.sort_unstable();
    ids.dedup();
    let users: HashMap<i64, UserResponse> = storage
        .get_users_by_ids(&ids)
        .await?
        .iter()
        .map(|u| (u.id, UserResponse::from(u)))
        .collect();

    let response: Vec<GradeHistoryResponse> = history
        .into_iter()
        .map(|h| GradeHistoryResponse {
            changed_at: h.changed_at,
            user: h.user_id.and_then(|id| users.get(&id).cloned()),
            grade: h.grade,
            passed_back: h.passed_back,
            rubric_modified: h.rubric_modified,
        })
        .collect();
    Ok(HttpResponse::Ok().json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_grade() {
        assert_eq!(validate_grade(Some(0.0)).unwrap(), Some(0.0));
        assert_eq!(validate_grade(Some(10.0)).unwrap(), Some(10.0));
        assert_eq!(validate_grade(None).unwrap(), None);
        assert_eq!(validate_grade(Some(-1.0)).unwrap_err().api_code(), "INVALID_PARAM");
        assert_eq!(validate_grade(Some(11.0)).unwrap_err().api_code(), "INVALID_PARAM");
        assert!(validate_grade(Some(f64::NAN)).is_err());
    }
}
