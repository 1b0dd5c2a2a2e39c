use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use super::AssignmentService;
use crate::errors::Result;
use crate::models::assignments::entities::Assignment;
use crate::models::assignments::responses::AssignmentResponse;
use crate::services::linters::has_whitespace_linter;
use crate::services::lookup;
use crate::services::permissions::{ensure_can_see_assignment, load_checker};
use crate::storage::Storage;

pub async fn assignment_response(
    storage: &Arc<dyn Storage>,
    assignment: &Assignment,
) -> Result<AssignmentResponse> {
    let course = lookup::course(storage, assignment.course_id).await?;
    let whitespace = has_whitespace_linter(storage, assignment.id).await?;
    Ok(AssignmentResponse::new(assignment, &course.name, whitespace))
}

pub async fn get_assignment(
    service: &AssignmentService,
    request: &HttpRequest,
    assignment_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let assignment = lookup::assignment(&storage, assignment_id).await?;
    let (_, checker) = load_checker(&storage, request).await?;
    ensure_can_see_assignment(&checker, &assignment)?;

    Ok(HttpResponse::Ok().json(assignment_response(&storage, &assignment).await?))
}
