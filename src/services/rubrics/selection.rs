use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

use super::RubricService;
use super::grade::{max_points, record_grade_change, selected_points};
use crate::config::Feature;
use crate::errors::{CGSystemError, Result};
use crate::models::assignments::entities::Assignment;
use crate::models::permissions::entities::Perm;
use crate::models::rubrics::entities::{RubricItem, RubricRow};
use crate::models::rubrics::requests::SelectItemsRequest;
use crate::models::rubrics::responses::{RubricPoints, SubmissionRubricResponse};
use crate::models::submissions::entities::Work;
use crate::runtime::Background;
use crate::services::lookup::{self, ensure_feature};
use crate::services::permissions::{can_see_feedback, ensure_can_see_work, load_checker};
use crate::storage::Storage;

/// 在作业的评分标准中查找条目
fn find_item(rubric: &[RubricRow], item_id: i64) -> Result<RubricItem> {
    rubric
        .iter()
        .flat_map(|row| row.items.iter())
        .find(|item| item.id == item_id)
        .cloned()
        .ok_or_else(|| {
            CGSystemError::invalid_param("The given rubric item does not belong to this assignment")
                .with_description(format!("Rubric item {item_id} is not part of the rubric"))
        })
}

/// 校验整组选择：条目属于评分标准，每行最多一个
pub fn resolve_selection(rubric: &[RubricRow], item_ids: &[i64]) -> Result<Vec<RubricItem>> {
    let mut rows = BTreeSet::new();
    let mut items = Vec::with_capacity(item_ids.len());
    for &id in item_ids {
        let item = find_item(rubric, id)?;
        if !rows.insert(item.row_id) {
            return Err(CGSystemError::invalid_param("Multiple items were selected in the same row")
                .with_description(format!("Rubric row {} has more than one selected item", item.row_id)));
        }
        items.push(item);
    }
    Ok(items)
}

/// 读取提交并检查评分权限
async fn load_for_grading(
    storage: &Arc<dyn Storage>,
    request: &HttpRequest,
    work_id: i64,
) -> Result<(i64, Work, Assignment)> {
    let work = lookup::work(storage, work_id).await?;
    let assignment = lookup::assignment(storage, work.assignment_id).await?;
    let (user, checker) = load_checker(storage, request).await?;
    checker.ensure_course(Perm::CanGradeWork, assignment.course_id)?;
    Ok((user.id, work, assignment))
}

pub async fn get_work_rubric(
    service: &RubricService,
    request: &HttpRequest,
    work_id: i64,
) -> ActixResult<HttpResponse> {
    ensure_feature(Feature::Rubrics)?;
    let storage = service.get_storage(request);
    let work = lookup::work(&storage, work_id).await?;
    let assignment = lookup::assignment(&storage, work.assignment_id).await?;
    let (_, checker) = load_checker(&storage, request).await?;
    ensure_can_see_work(&checker, &assignment, &work)?;

    let rubrics = storage.get_rubric(assignment.id).await?;
    let selected = if can_see_feedback(&checker, &assignment) {
        storage.get_selection(work.id).await?
    } else {
        Vec::new()
    };

    Ok(HttpResponse::Ok().json(SubmissionRubricResponse {
        points: RubricPoints {
            max: max_points(&rubrics),
            selected: selected_points(&selected),
        },
        rubrics,
        selected,
    }))
}

pub async fn select_items(
    service: &RubricService,
    request: &HttpRequest,
    work_id: i64,
    req: SelectItemsRequest,
) -> ActixResult<HttpResponse> {
    ensure_feature(Feature::Rubrics)?;
    let Some(item_ids) = req.items else {
        return Err(CGSystemError::missing_required_param("The \"items\" field is required").into());
    };

    let storage = service.get_storage(request);
    let (user_id, work, assignment) = load_for_grading(&storage, request, work_id).await?;
    let rubric = storage.get_rubric(assignment.id).await?;
    let items = resolve_selection(&rubric, &item_ids)?;

    storage.replace_selection(work.id, &items).await?;
    record_grade_change(&Background::from_request(request), &assignment, work.id, user_id, true).await?;
    info!("User {} selected {} rubric item(s) for work {}", user_id, items.len(), work.id);

    Ok(HttpResponse::NoContent().finish())
}

pub async fn select_item(
    service: &RubricService,
    request: &HttpRequest,
    work_id: i64,
    item_id: i64,
) -> ActixResult<HttpResponse> {
    ensure_feature(Feature::Rubrics)?;
    ensure_feature(Feature::IncrementalRubricSubmission)?;
    let storage = service.get_storage(request);
    let (user_id, work, assignment) = load_for_grading(&storage, request, work_id).await?;
    let item = find_item(&storage.get_rubric(assignment.id).await?, item_id)?;

    storage.select_rubric_item(work.id, &item).await?;
    record_grade_change(&Background::from_request(request), &assignment, work.id, user_id, true).await?;

    Ok(HttpResponse::NoContent().finish())
}

pub async fn unselect_item(
    service: &RubricService,
    request: &HttpRequest,
    work_id: i64,
    item_id: i64,
) -> ActixResult<HttpResponse> {
    ensure_feature(Feature::Rubrics)?;
    ensure_feature(Feature::IncrementalRubricSubmission)?;
    let storage = service.get_storage(request);
    let (user_id, work, assignment) = load_for_grading(&storage, request, work_id).await?;

    if !storage.unselect_rubric_item(work.id, item_id).await? {
        return Err(CGSystemError::invalid_param("Rubric item was not selected")
            .with_description(format!("Rubric item {item_id} is not selected for work {work_id}"))
            .into());
    }
    record_grade_change(&Background::from_request(request), &assignment, work.id, user_id, true).await?;

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::rubrics::grade::tests::{item, row};

    fn rubric() -> Vec<RubricRow> {
        vec![
            row(1, vec![item(1, 1, 5.0), item(2, 1, 10.0)]),
            row(2, vec![item(3, 2, 1.0), item(4, 2, 2.0)]),
        ]
    }

    #[test]
    fn test_one_item_per_row() {
        let items = resolve_selection(&rubric(), &[1, 4]).unwrap();
        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1, 4]);

        let err = resolve_selection(&rubric(), &[1, 2]).unwrap_err();
        assert_eq!(err.api_code(), "INVALID_PARAM");
    }

    #[test]
    fn test_foreign_item() {
        let err = resolve_selection(&rubric(), &[99]).unwrap_err();
        assert_eq!(err.api_code(), "INVALID_PARAM");
        assert!(resolve_selection(&rubric(), &[]).unwrap().is_empty());
    }
}
