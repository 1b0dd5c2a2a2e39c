use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::CourseService;
use crate::errors::CGSystemError;
use crate::models::courses::entities::NewCourse;
use crate::models::courses::requests::CreateCourseRequest;
use crate::models::courses::responses::CourseResponse;
use crate::models::permissions::entities::Perm;
use crate::services::permissions::{OWNER_ROLE, default_course_roles, load_checker};

pub async fn create_course(
    service: &CourseService,
    request: &HttpRequest,
    req: CreateCourseRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let (user, checker) = load_checker(&storage, request).await?;
    checker.ensure_site(Perm::CanCreateCourses)?;

    let name = req.name.map(|n| n.trim().to_string()).unwrap_or_default();
    if name.is_empty() {
        return Err(CGSystemError::missing_required_param("The name of a course cannot be empty")
            .with_description("The \"name\" field is required")
            .into());
    }

    let course = storage
        .create_course(NewCourse {
            name,
            lti_course_id: None,
            lti_provider_id: None,
            roles: default_course_roles(),
            owner: Some((user.id, OWNER_ROLE.to_string())),
        })
        .await?;
    info!("Course {} ({}) created by user {}", course.name, course.id, user.id);

    Ok(HttpResponse::Ok().json(CourseResponse::new(&course, Some(OWNER_ROLE.to_string()))))
}
