use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::collections::HashMap;

use super::CourseService;
use crate::errors::CGSystemError;
use crate::models::courses::responses::CourseResponse;
use crate::services::lookup;
use crate::services::permissions::load_checker;

pub async fn list_courses(service: &CourseService, request: &HttpRequest) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let (user, _) = load_checker(&storage, request).await?;

    let roles: HashMap<i64, String> = storage
        .user_course_roles(user.id)
        .await?
        .into_iter()
        .map(|(course_id, role)| (course_id, role.name))
        .collect();
    let ids: Vec<i64> = roles.keys().copied().collect();

    let mut courses: Vec<CourseResponse> = storage
        .get_courses_by_ids(&ids)
        .await?
        .iter()
        .map(|course| CourseResponse::new(course, roles.get(&course.id).cloned()))
        .collect();
    courses.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()).then(a.id.cmp(&b.id)));

    Ok(HttpResponse::Ok().json(courses))
}

pub async fn get_course(
    service: &CourseService,
    request: &HttpRequest,
    course_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let course = lookup::course(&storage, course_id).await?;
    let (_, checker) = load_checker(&storage, request).await?;

    let role = checker.course_role(course.id).ok_or_else(|| {
        CGSystemError::incorrect_permission("You are not enrolled in this course")
            .with_description(format!("The current user is not enrolled in course {course_id}"))
    })?;

    Ok(HttpResponse::Ok().json(CourseResponse::new(&course, Some(role.name.clone()))))
}
