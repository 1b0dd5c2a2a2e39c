use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use chrono::{Duration, Utc};
use tracing::info;

use super::CourseService;
use crate::errors::CGSystemError;
use crate::models::assignments::entities::{AssignmentState, NewAssignment};
use crate::models::assignments::requests::CreateAssignmentRequest;
use crate::models::assignments::responses::AssignmentResponse;
use crate::models::permissions::entities::Perm;
use crate::services::linters::has_whitespace_linter;
use crate::services::lookup;
use crate::services::permissions::load_checker;

pub async fn list_assignments(
    service: &CourseService,
    request: &HttpRequest,
    course_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let course = lookup::course(&storage, course_id).await?;
    let (_, checker) = load_checker(&storage, request).await?;
    checker.ensure_course(Perm::CanSeeAssignments, course.id)?;
    let see_hidden = checker.course(Perm::CanSeeHiddenAssignments, course.id);

    let mut assignments = storage.list_course_assignments(course.id).await?;
    assignments.retain(|a| see_hidden || a.state != AssignmentState::Hidden);
    assignments.sort_by(|a, b| a.deadline.cmp(&b.deadline).then(a.id.cmp(&b.id)));

    let mut result = Vec::with_capacity(assignments.len());
    for assignment in &assignments {
        let whitespace = has_whitespace_linter(&storage, assignment.id).await?;
        result.push(AssignmentResponse::new(assignment, &course.name, whitespace));
    }
    Ok(HttpResponse::Ok().json(result))
}

/// 新作业默认隐藏，截止时间为一年后
pub async fn create_assignment(
    service: &CourseService,
    request: &HttpRequest,
    course_id: i64,
    req: CreateAssignmentRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let course = lookup::course(&storage, course_id).await?;
    let (user, checker) = load_checker(&storage, request).await?;
    checker.ensure_course(Perm::CanManageCourse, course.id)?;

    let name = req.name.map(|n| n.trim().to_string()).unwrap_or_default();
    if name.is_empty() {
        return Err(CGSystemError::missing_required_param("The name of an assignment cannot be empty")
            .with_description("The \"name\" field is required")
            .into());
    }
    if course.is_lti() {
        return Err(CGSystemError::invalid_state("Assignments of LTI courses are created by the LMS")
            .with_description(format!("Course {} is connected to an LMS", course.id))
            .into());
    }

    let assignment = storage
        .create_assignment(NewAssignment {
            name,
            course_id: course.id,
            state: AssignmentState::Hidden,
            deadline: Utc::now() + Duration::days(365),
            lti_assignment_id: None,
            lti_outcome_service_url: None,
        })
        .await?;
    info!(
        "Assignment {} created in course {} by user {}",
        assignment.id, course.id, user.id
    );

    Ok(HttpResponse::Ok().json(AssignmentResponse::new(&assignment, &course.name, false)))
}
