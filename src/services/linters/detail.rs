use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::info;

use super::LinterService;
use crate::errors::{CGSystemError, Result};
use crate::models::linters::entities::{AssignmentLinter, LinterCounts};
use crate::models::linters::responses::LinterDetailResponse;
use crate::models::permissions::entities::Perm;
use crate::models::users::entities::User;
use crate::services::lookup;
use crate::services::permissions::load_checker;
use crate::storage::Storage;

/// 读取 linter 并检查 `can_use_linter`
async fn linter_for_user(
    storage: &Arc<dyn Storage>,
    request: &HttpRequest,
    linter_id: &str,
) -> Result<(User, AssignmentLinter)> {
    let linter = storage.get_assignment_linter(linter_id).await?.ok_or_else(|| {
        CGSystemError::object_id_not_found("The requested linter was not found")
            .with_description(format!("There is no linter with id {linter_id}"))
    })?;
    let assignment = lookup::assignment(storage, linter.assignment_id).await?;
    let (user, checker) = load_checker(storage, request).await?;
    checker.ensure_course(Perm::CanUseLinter, assignment.course_id)?;
    Ok((user, linter))
}

pub async fn get_linter(
    service: &LinterService,
    request: &HttpRequest,
    linter_id: String,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let (_, linter) = linter_for_user(&storage, request, &linter_id).await?;
    let counts = LinterCounts::from_states(storage.linter_instance_states(&linter.id).await?);

    Ok(HttpResponse::Ok().json(LinterDetailResponse {
        id: linter.id,
        name: linter.name,
        counts,
    }))
}

pub async fn delete_linter(
    service: &LinterService,
    request: &HttpRequest,
    linter_id: String,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let (user, linter) = linter_for_user(&storage, request, &linter_id).await?;

    storage.delete_assignment_linter(&linter.id).await?;
    info!(
        "User {} deleted linter {} ({}) of assignment {}",
        user.id, linter.id, linter.name, linter.assignment_id
    );

    Ok(HttpResponse::NoContent().finish())
}
