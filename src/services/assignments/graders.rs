use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

use super::AssignmentService;
use crate::errors::{CGSystemError, Result};
use crate::models::assignments::entities::{Assignment, ReminderType};
use crate::models::assignments::responses::GraderResponse;
use crate::models::permissions::entities::Perm;
use crate::models::{Warning, WarningCode};
use crate::runtime::Background;
use crate::services::lookup;
use crate::services::mail::messages;
use crate::services::permissions::{PermissionChecker, load_checker, users_with_course_perm};
use crate::services::rubrics::grade::work_grade;
use crate::storage::Storage;

pub async fn list_graders(
    service: &AssignmentService,
    request: &HttpRequest,
    assignment_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let assignment = lookup::assignment(&storage, assignment_id).await?;
    let (_, checker) = load_checker(&storage, request).await?;
    checker.ensure_course(Perm::CanSeeAssignments, assignment.course_id)?;

    let weights = storage.list_grader_weights(assignment.id).await?;
    let done: HashSet<i64> = storage.list_done_graders(assignment.id).await?.into_iter().collect();
    let graders: Vec<GraderResponse> = users_with_course_perm(&storage, assignment.course_id, Perm::CanGradeWork)
        .await?
        .into_iter()
        .map(|user| GraderResponse {
            weight: weights
                .iter()
                .find(|w| w.user_id == user.id)
                .map_or(0.0, |w| w.weight),
            done: done.contains(&user.id),
            id: user.id,
            name: user.name,
        })
        .collect();

    Ok(HttpResponse::Ok().json(graders))
}

/// 自己的完成状态需要评分权限，别人的需要管理课程权限
fn ensure_can_change(checker: &PermissionChecker, assignment: &Assignment, grader_id: i64) -> Result<()> {
    if grader_id == checker.user_id() {
        checker.ensure_course(Perm::CanGradeWork, assignment.course_id)
    } else {
        checker.ensure_course(Perm::CanManageCourse, assignment.course_id)
    }
}

pub async fn mark_done(
    service: &AssignmentService,
    request: &HttpRequest,
    assignment_id: i64,
    grader_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let assignment = lookup::assignment(&storage, assignment_id).await?;
    let (user, checker) = load_checker(&storage, request).await?;
    ensure_can_change(&checker, &assignment, grader_id)?;
    let grader = lookup::user(&storage, grader_id).await?;

    let done = storage.list_done_graders(assignment.id).await?;
    if done.contains(&grader.id) {
        return Err(CGSystemError::invalid_state("The grader is already finished")
            .with_description(format!("User {} is already done grading", grader.id))
            .into());
    }

    let assigned: Vec<_> = storage
        .latest_works(assignment.id)
        .await?
        .into_iter()
        .filter(|w| w.assigned_to == Some(grader.id))
        .collect();
    for work in &assigned {
        if work_grade(&storage, work).await?.grade.is_none() {
            return Err(CGSystemError::invalid_state("The grader is not finished!")
                .with_description(format!(
                    "{} has not graded all assigned submissions, work {} has no grade",
                    grader.name, work.id
                ))
                .into());
        }
    }

    storage.set_grader_done(assignment.id, grader.id, true).await?;
    info!(
        "Grader {} marked done for assignment {} by user {}",
        grader.id, assignment.id, user.id
    );
    notify_if_finished(&Background::from_request(request), &storage, &assignment).await?;

    let mut response = HttpResponse::NoContent();
    if assigned.is_empty() {
        Warning::new(WarningCode::GraderNotDone, "You have no assigned work!").apply(&mut response);
    }
    Ok(response.finish())
}

pub async fn mark_not_done(
    service: &AssignmentService,
    request: &HttpRequest,
    assignment_id: i64,
    grader_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let assignment = lookup::assignment(&storage, assignment_id).await?;
    let (user, checker) = load_checker(&storage, request).await?;
    ensure_can_change(&checker, &assignment, grader_id)?;
    let grader = lookup::user(&storage, grader_id).await?;

    if !storage.list_done_graders(assignment.id).await?.contains(&grader.id) {
        return Err(CGSystemError::invalid_state("The grader is not finished")
            .with_description(format!("User {} is not marked as done", grader.id))
            .into());
    }

    storage.set_grader_done(assignment.id, grader.id, false).await?;
    info!(
        "Grader {} marked not done for assignment {} by user {}",
        grader.id, assignment.id, user.id
    );
    Ok(HttpResponse::NoContent().finish())
}

/// 需要完成的评分员是否都已完成
pub fn graders_finished(
    kind: ReminderType,
    graders: &[i64],
    assigned: &HashSet<i64>,
    done: &HashSet<i64>,
) -> bool {
    graders
        .iter()
        .filter(|id| kind != ReminderType::AssignedOnly || assigned.contains(id))
        .all(|id| done.contains(id))
}

/// 所有评分员完成时给 done_email 发一封通知
async fn notify_if_finished(
    bg: &Arc<Background>,
    storage: &Arc<dyn Storage>,
    assignment: &Assignment,
) -> Result<()> {
    let Some(address) = assignment.done_email.clone() else {
        return Ok(());
    };
    let graders: Vec<i64> = users_with_course_perm(storage, assignment.course_id, Perm::CanGradeWork)
        .await?
        .iter()
        .map(|u| u.id)
        .collect();
    let assigned: HashSet<i64> = storage
        .latest_works(assignment.id)
        .await?
        .into_iter()
        .filter_map(|w| w.assigned_to)
        .collect();
    let done: HashSet<i64> = storage.list_done_graders(assignment.id).await?.into_iter().collect();

    if graders_finished(assignment.reminder_type, &graders, &assigned, &done) {
        let mail = messages::grading_done(assignment, &address, &bg.external_url);
        let mailer = bg.mailer.clone();
        bg.spawn("grading done mail", async move {
            mailer.send_batch(vec![mail]).await;
            Ok(())
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graders_finished() {
        let graders = [1, 2, 3];
        let assigned: HashSet<i64> = [1, 2].into_iter().collect();
        let done: HashSet<i64> = [1, 2].into_iter().collect();

        assert!(graders_finished(ReminderType::AssignedOnly, &graders, &assigned, &done));
        assert!(!graders_finished(ReminderType::AllGraders, &graders, &assigned, &done));
        assert!(!graders_finished(ReminderType::None, &graders, &assigned, &done));
    }
}
