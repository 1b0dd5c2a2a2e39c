use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::CourseService;
use crate::errors::CGSystemError;
use crate::models::courses::requests::EnrollUserRequest;
use crate::models::courses::responses::{CourseRoleInfo, CourseUserResponse};
use crate::models::permissions::entities::Perm;
use crate::models::users::responses::UserResponse;
use crate::services::lookup;
use crate::services::permissions::load_checker;

pub async fn list_users(
    service: &CourseService,
    request: &HttpRequest,
    course_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let course = lookup::course(&storage, course_id).await?;
    let (_, checker) = load_checker(&storage, request).await?;
    checker.ensure_course(Perm::CanManageCourse, course.id)?;

    let mut users = storage.list_course_users(course.id).await?;
    users.sort_by_key(|(user, _)| user.name.to_lowercase());

    let users: Vec<CourseUserResponse> = users
        .iter()
        .map(|(user, role)| CourseUserResponse {
            user: UserResponse::from(user),
            course_role: CourseRoleInfo {
                id: role.id,
                name: role.name.clone(),
            },
        })
        .collect();
    Ok(HttpResponse::Ok().json(users))
}

/// 新选课返回 201 与用户信息，修改已有角色返回 204
pub async fn set_user_role(
    service: &CourseService,
    request: &HttpRequest,
    course_id: i64,
    req: EnrollUserRequest,
) -> ActixResult<HttpResponse> {
    let (Some(username), Some(role_id)) = (req.username, req.role_id) else {
        return Err(CGSystemError::missing_required_param(
            "Both \"username\" and \"role_id\" are required",
        )
        .into());
    };

    let storage = service.get_storage(request);
    let course = lookup::course(&storage, course_id).await?;
    let (current, checker) = load_checker(&storage, request).await?;
    checker.ensure_course(Perm::CanManageCourse, course.id)?;

    let user = storage.get_user_by_username(&username).await?.ok_or_else(|| {
        CGSystemError::object_not_found("The requested user was not found")
            .with_description(format!("There is no user with username \"{username}\""))
    })?;
    if user.id == current.id {
        return Err(CGSystemError::incorrect_permission("You cannot change your own role")
            .with_description("The given user is the current user")
            .into());
    }

    let role = storage
        .get_course_role(role_id)
        .await?
        .filter(|role| role.course_id == Some(course.id))
        .ok_or_else(|| {
            CGSystemError::object_id_not_found("The requested course role was not found")
                .with_description(format!("Course {course_id} has no role with id {role_id}"))
        })?;

    let enrolled = storage.user_course_role(user.id, course.id).await?.is_some();
    storage.set_user_course_role(user.id, course.id, role.id).await?;
    info!(
        "User {} got role {} in course {} (by user {})",
        user.id, role.name, course.id, current.id
    );

    if enrolled {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Ok(HttpResponse::Created().json(UserResponse::from(&user)))
    }
}
