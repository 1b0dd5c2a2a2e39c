use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::{PermissionService, load_checker};
use crate::errors::CGSystemError;
use crate::models::permissions::entities::{Perm, PermissionScope};
use crate::models::permissions::requests::SetPermissionRequest;
use crate::models::permissions::responses::RoleResponse;

pub async fn list_roles(
    service: &PermissionService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let (_, checker) = load_checker(&storage, request).await?;
    checker.ensure_site(Perm::CanManageSiteUsers)?;

    let roles: Vec<RoleResponse> = storage
        .list_site_roles()
        .await?
        .iter()
        .map(|role| RoleResponse {
            id: role.id,
            name: role.name.clone(),
            perms: checker.catalogue().role_map(Some(role), PermissionScope::Site),
        })
        .collect();

    Ok(HttpResponse::Ok().json(roles))
}

pub async fn update_role(
    service: &PermissionService,
    request: &HttpRequest,
    role_id: i64,
    req: SetPermissionRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let (user, checker) = load_checker(&storage, request).await?;
    checker.ensure_site(Perm::CanManageSiteUsers)?;

    let role = storage.get_site_role(role_id).await?.ok_or_else(|| {
        CGSystemError::object_id_not_found(format!("The role with id {role_id} was not found"))
    })?;
    let (permission, explicit) = checker
        .catalogue()
        .needs_explicit(&req.permission, req.value)?;
    if permission.scope() != PermissionScope::Site {
        return Err(CGSystemError::invalid_param("The given permission is not a site permission")
            .with_description(format!("{} is a course permission", permission.name))
            .into());
    }
    // 不能去掉自己管理用户的权限
    if user.role_id == Some(role.id)
        && permission.name == Perm::CanManageSiteUsers.name()
        && !req.value
    {
        return Err(CGSystemError::invalid_state(
            "You cannot remove this permission from your own role",
        )
        .into());
    }

    storage
        .set_site_role_permission(role.id, permission.id, explicit)
        .await?;
    info!(
        "Set {} to {} for site role {} by user {}",
        permission.name, req.value, role.name, user.id
    );

    Ok(HttpResponse::NoContent().finish())
}
