use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::CourseService;
use crate::errors::CGSystemError;
use crate::models::permissions::entities::{Perm, PermissionScope};
use crate::models::permissions::requests::SetPermissionRequest;
use crate::models::permissions::responses::RoleResponse;
use crate::services::lookup;
use crate::services::permissions::load_checker;

/// 当前用户在课程中的全部课程权限
pub async fn get_permissions(
    service: &CourseService,
    request: &HttpRequest,
    course_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let course = lookup::course(&storage, course_id).await?;
    let (_, checker) = load_checker(&storage, request).await?;
    Ok(HttpResponse::Ok().json(checker.course_map(course.id)))
}

pub async fn list_roles(
    service: &CourseService,
    request: &HttpRequest,
    course_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let course = lookup::course(&storage, course_id).await?;
    let (_, checker) = load_checker(&storage, request).await?;
    checker.ensure_course(Perm::CanManageCourse, course.id)?;

    let roles: Vec<RoleResponse> = storage
        .list_course_roles(course.id)
        .await?
        .iter()
        .map(|role| RoleResponse {
            id: role.id,
            name: role.name.clone(),
            perms: checker.catalogue().role_map(Some(role), PermissionScope::Course),
        })
        .collect();

    Ok(HttpResponse::Ok().json(roles))
}

pub async fn update_role(
    service: &CourseService,
    request: &HttpRequest,
    course_id: i64,
    role_id: i64,
    req: SetPermissionRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let course = lookup::course(&storage, course_id).await?;
    let (user, checker) = load_checker(&storage, request).await?;
    checker.ensure_course(Perm::CanManageCourse, course.id)?;

    let role = storage
        .get_course_role(role_id)
        .await?
        .filter(|role| role.course_id == Some(course.id))
        .ok_or_else(|| {
            CGSystemError::object_id_not_found("The requested course role was not found")
                .with_description(format!("Course {course_id} has no role with id {role_id}"))
        })?;

    let (permission, explicit) = checker
        .catalogue()
        .needs_explicit(&req.permission, req.value)?;
    if permission.scope() != PermissionScope::Course {
        return Err(CGSystemError::invalid_param("The given permission is not a course permission")
            .with_description(format!("{} is a site permission", permission.name))
            .into());
    }
    // 不能去掉自己管理课程的权限
    if checker.course_role(course.id).is_some_and(|own| own.id == role.id)
        && permission.name == Perm::CanManageCourse.name()
        && !req.value
    {
        return Err(CGSystemError::invalid_state(
            "You cannot remove this permission from your own role",
        )
        .into());
    }

    storage
        .set_course_role_permission(role.id, permission.id, explicit)
        .await?;
    info!(
        "Set {} to {} for course role {} in course {} by user {}",
        permission.name, req.value, role.name, course.id, user.id
    );

    Ok(HttpResponse::NoContent().finish())
}
