use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::info;

use super::CodeService;
use crate::errors::{CGSystemError, Result};
use crate::models::comments::entities::Comment;
use crate::models::comments::requests::PutCommentRequest;
use crate::models::files::entities::FileNode;
use crate::models::permissions::entities::Perm;
use crate::services::lookup;
use crate::services::permissions::load_checker;
use crate::storage::Storage;

fn line_number(line: i64) -> Result<i32> {
    i32::try_from(line)
        .ok()
        .filter(|l| *l >= 0)
        .ok_or_else(|| {
            CGSystemError::invalid_param("The given line is not valid")
                .with_description(format!("{line} is not a line number"))
        })
}

/// 读取文件并检查评分权限，返回 (文件, 当前用户 id)
async fn load_for_comment(
    storage: &Arc<dyn Storage>,
    request: &HttpRequest,
    file_id: i64,
) -> Result<(FileNode, i64)> {
    let file = lookup::file(storage, file_id).await?;
    let work = lookup::work(storage, file.work_id).await?;
    let assignment = lookup::assignment(storage, work.assignment_id).await?;
    let (user, checker) = load_checker(storage, request).await?;
    checker.ensure_course(Perm::CanGradeWork, assignment.course_id)?;
    if file.is_directory {
        return Err(CGSystemError::object_wrong_type("Comments can only be placed on files")
            .with_description(format!("File {} is a directory", file.id)));
    }
    Ok((file, user.id))
}

pub async fn put_comment(
    service: &CodeService,
    request: &HttpRequest,
    file_id: i64,
    line: i64,
    req: PutCommentRequest,
) -> ActixResult<HttpResponse> {
    let line = line_number(line)?;
    let Some(text) = req.comment else {
        return Err(CGSystemError::missing_required_param("The \"comment\" field is required").into());
    };
    let storage = service.get_storage(request);
    let (file, user_id) = load_for_comment(&storage, request, file_id).await?;

    storage
        .upsert_comment(Comment {
            file_id: file.id,
            line,
            user_id,
            comment: text,
        })
        .await?;
    info!("User {} commented on file {} line {}", user_id, file.id, line);
    Ok(HttpResponse::NoContent().finish())
}

pub async fn delete_comment(
    service: &CodeService,
    request: &HttpRequest,
    file_id: i64,
    line: i64,
) -> ActixResult<HttpResponse> {
    let line = line_number(line)?;
    let storage = service.get_storage(request);
    let (file, user_id) = load_for_comment(&storage, request, file_id).await?;

    if !storage.delete_comment(file.id, line).await? {
        return Err(CGSystemError::object_id_not_found("The comment was not found")
            .with_description(format!("There is no comment on line {line} of file {}", file.id))
            .into());
    }
    info!("User {} removed the comment on file {} line {}", user_id, file.id, line);
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_number() {
        assert_eq!(line_number(0).unwrap(), 0);
        assert_eq!(line_number(-1).unwrap_err().api_code(), "INVALID_PARAM");
        assert!(line_number(i64::MAX).is_err());
    }
}
