use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::SubmissionService;
use crate::errors::CGSystemError;
use crate::models::files::requests::FilesQuery;
use crate::services::ingest::FileArena;
use crate::services::lookup;
use crate::services::permissions::{ensure_can_see_work, load_checker};

/// 目录列表；`file_id` 或 `path` 指定子目录，缺省为根目录
pub async fn list_files(
    service: &SubmissionService,
    request: &HttpRequest,
    work_id: i64,
    query: FilesQuery,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let work = lookup::work(&storage, work_id).await?;
    let assignment = lookup::assignment(&storage, work.assignment_id).await?;
    let (_, checker) = load_checker(&storage, request).await?;
    ensure_can_see_work(&checker, &assignment, &work)?;

    let arena = FileArena::new(storage.list_work_files(work.id).await?)?;

    if let Some(path) = query.path {
        let path = if query.is_directory == Some(true) && !path.ends_with('/') {
            format!("{path}/")
        } else {
            path
        };
        let node = arena.resolve_path(&path).ok_or_else(|| {
            CGSystemError::object_id_not_found("The specified path was not found")
                .with_description(format!("\"{path}\" does not exist in work {}", work.id))
        })?;
        let listing = arena.render(node.id).ok_or_else(|| {
            CGSystemError::object_id_not_found("The specified path was not found")
        })?;
        return Ok(HttpResponse::Ok().json(listing));
    }

    let id = query.file_id.unwrap_or(arena.root().id);
    Ok(HttpResponse::Ok().json(arena.listing(id)?))
}
