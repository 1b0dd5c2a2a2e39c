use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::{PermissionService, load_checker};
use crate::errors::CGSystemError;
use crate::models::permissions::requests::PermissionQuery;

pub async fn get_permissions(
    service: &PermissionService,
    request: &HttpRequest,
    query: PermissionQuery,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let (_, checker) = load_checker(&storage, request).await?;

    match query.kind.as_deref() {
        Some("site") => match query.permission {
            Some(name) => {
                checker.catalogue().get(&name)?;
                let value = checker.site_map().get(&name).copied().unwrap_or(false);
                Ok(HttpResponse::Ok().json(value))
            }
            None => Ok(HttpResponse::Ok().json(checker.site_map())),
        },
        Some("course") => match (query.permission, query.course_id) {
            (Some(name), Some(course_id)) => {
                let value = checker
                    .per_course(&name)?
                    .get(&course_id)
                    .copied()
                    .unwrap_or(false);
                Ok(HttpResponse::Ok().json(value))
            }
            (Some(name), None) => Ok(HttpResponse::Ok().json(checker.per_course(&name)?)),
            (None, Some(course_id)) => Ok(HttpResponse::Ok().json(checker.course_map(course_id))),
            (None, None) => Err(CGSystemError::missing_required_param(
                "A permission or course_id is required for course permissions",
            )
            .into()),
        },
        Some(other) => Err(CGSystemError::invalid_param(format!(
            "The given type \"{other}\" is not valid"
        ))
        .with_description("type should be either site or course")
        .into()),
        None => Err(CGSystemError::missing_required_param("The type parameter is required").into()),
    }
}
