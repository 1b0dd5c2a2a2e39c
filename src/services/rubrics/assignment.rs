use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::info;

use super::RubricService;
use super::plan::{delete_all, plan_rubric, removed_items};
use crate::config::Feature;
use crate::errors::{CGSystemError, Result};
use crate::models::assignments::entities::Assignment;
use crate::models::permissions::entities::Perm;
use crate::models::rubrics::entities::{RubricPlan, RubricRow};
use crate::models::rubrics::requests::PutRubricRequest;
use crate::runtime::Background;
use crate::services::lookup::{self, ensure_feature};
use crate::services::permissions::{ensure_can_see_assignment, load_checker};
use crate::services::rubrics::grade::record_grade_change;
use crate::storage::Storage;

fn no_rubric(assignment_id: i64) -> CGSystemError {
    CGSystemError::object_id_not_found("Assignment has no rubric")
        .with_description(format!("The assignment with id {assignment_id} has no rubric"))
}

pub async fn get_rubric(
    service: &RubricService,
    request: &HttpRequest,
    assignment_id: i64,
) -> ActixResult<HttpResponse> {
    ensure_feature(Feature::Rubrics)?;
    let storage = service.get_storage(request);
    let assignment = lookup::assignment(&storage, assignment_id).await?;
    let (_, checker) = load_checker(&storage, request).await?;
    ensure_can_see_assignment(&checker, &assignment)?;

    let rubric = storage.get_rubric(assignment_id).await?;
    if rubric.is_empty() {
        return Err(no_rubric(assignment_id).into());
    }
    Ok(HttpResponse::Ok().json(rubric))
}

pub async fn put_rubric(
    service: &RubricService,
    request: &HttpRequest,
    assignment_id: i64,
    req: PutRubricRequest,
) -> ActixResult<HttpResponse> {
    ensure_feature(Feature::Rubrics)?;
    let Some(rows) = req.rows else {
        return Err(CGSystemError::missing_required_param("The \"rows\" field is required").into());
    };

    let storage = service.get_storage(request);
    let assignment = lookup::assignment(&storage, assignment_id).await?;
    let (user, checker) = load_checker(&storage, request).await?;
    checker.ensure_course(Perm::ManageRubrics, assignment.course_id)?;

    let current = storage.get_rubric(assignment_id).await?;
    let plan = plan_rubric(&current, rows)?;
    let clear = req.clear_selections.unwrap_or(false);
    let rubric = apply(&storage, request, &assignment, &current, plan, clear, user.id).await?;
    info!("User {} replaced the rubric of assignment {}", user.id, assignment_id);

    Ok(HttpResponse::Ok().json(rubric))
}

pub async fn delete_rubric(
    service: &RubricService,
    request: &HttpRequest,
    assignment_id: i64,
) -> ActixResult<HttpResponse> {
    ensure_feature(Feature::Rubrics)?;
    let storage = service.get_storage(request);
    let assignment = lookup::assignment(&storage, assignment_id).await?;
    let (user, checker) = load_checker(&storage, request).await?;
    checker.ensure_course(Perm::ManageRubrics, assignment.course_id)?;

    let current = storage.get_rubric(assignment_id).await?;
    if current.is_empty() {
        return Err(no_rubric(assignment_id).into());
    }
    apply(&storage, request, &assignment, &current, delete_all(&current), true, user.id).await?;
    info!("User {} deleted the rubric of assignment {}", user.id, assignment_id);

    Ok(HttpResponse::NoContent().finish())
}

/// 写入计划；会删掉被选中的条目时需要 `clear`，受影响的提交重新计算成绩
async fn apply(
    storage: &Arc<dyn Storage>,
    request: &HttpRequest,
    assignment: &Assignment,
    current: &[RubricRow],
    plan: RubricPlan,
    clear: bool,
    user_id: i64,
) -> Result<Vec<RubricRow>> {
    let affected = storage
        .works_selecting_items(&removed_items(current, &plan))
        .await?;
    if !affected.is_empty() && !clear {
        return Err(CGSystemError::invalid_state(
            "Some of the removed rubric items are selected by submissions",
        )
        .with_description(format!(
            "{} submission(s) have a selection in the removed rows or items, pass \"clear_selections\" to remove them",
            affected.len()
        )));
    }

    let rubric = storage
        .apply_rubric_plan(assignment.id, plan, clear)
        .await?;

    if !affected.is_empty() {
        let bg = Background::from_request(request);
        for work_id in affected {
            record_grade_change(&bg, assignment, work_id, user_id, true).await?;
        }
    }
    Ok(rubric)
}
