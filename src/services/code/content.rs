use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::collections::{BTreeMap, HashMap};

use super::CodeService;
use crate::errors::{CGSystemError, Result};
use crate::models::comments::entities::{Comment, LinterComment};
use crate::models::comments::responses::{CommentResponse, LinterMessage};
use crate::models::files::entities::FileNode;
use crate::models::files::requests::CodeQuery;
use crate::models::files::responses::FileMetadataResponse;
use crate::models::users::responses::UserResponse;
use crate::runtime::Background;
use crate::services::ingest::blobs::read_blob;
use crate::services::lookup;
use crate::services::permissions::{can_see_feedback, ensure_can_see_work, load_checker};
use crate::utils::run_blocking;

/// 按扩展名推断 MIME，未知时按二进制处理
pub fn mime_for(extension: Option<&str>) -> &'static str {
    match extension.map(str::to_lowercase).as_deref() {
        Some("txt" | "py" | "java" | "c" | "h" | "cpp" | "hpp" | "rs" | "js" | "ts" | "hs" | "md" | "sh" | "csv") => {
            "text/plain; charset=utf-8"
        }
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// `{line: {line, msg, author}}`
pub fn feedback_map(
    comments: Vec<Comment>,
    authors: &HashMap<i64, UserResponse>,
) -> BTreeMap<i32, CommentResponse> {
    comments
        .into_iter()
        .map(|c| {
            (
                c.line,
                CommentResponse {
                    line: c.line,
                    msg: c.comment,
                    author: authors.get(&c.user_id).cloned(),
                },
            )
        })
        .collect()
}

/// `{line: [[linter, {code, msg}], ...]}`，同一行按 linter 名与代码排序
pub fn linter_feedback_map(
    comments: Vec<(String, LinterComment)>,
) -> BTreeMap<i32, Vec<(String, LinterMessage)>> {
    let mut out: BTreeMap<i32, Vec<(String, LinterMessage)>> = BTreeMap::new();
    for (linter, c) in comments {
        out.entry(c.line).or_default().push((
            linter,
            LinterMessage {
                code: c.code,
                msg: c.comment,
            },
        ));
    }
    for entries in out.values_mut() {
        entries.sort_by(|a, b| (&a.0, &a.1.code).cmp(&(&b.0, &b.1.code)));
    }
    out
}

fn ensure_regular(file: &FileNode) -> Result<()> {
    if file.is_directory {
        return Err(CGSystemError::object_wrong_type("The given file is a directory")
            .with_description(format!("File {} is a directory", file.id)));
    }
    Ok(())
}

pub async fn get_code(
    service: &CodeService,
    request: &HttpRequest,
    file_id: i64,
    query: CodeQuery,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let file = lookup::file(&storage, file_id).await?;
    let work = lookup::work(&storage, file.work_id).await?;
    let assignment = lookup::assignment(&storage, work.assignment_id).await?;
    let (_, checker) = load_checker(&storage, request).await?;
    ensure_can_see_work(&checker, &assignment, &work)?;
    let visible = can_see_feedback(&checker, &assignment);

    match query.kind.as_deref() {
        None | Some("content") => {
            ensure_regular(&file)?;
            let Some(blob) = file.filename.clone() else {
                return Err(CGSystemError::object_wrong_type("The given file has no content").into());
            };
            let dir = Background::from_request(request).upload_dir.clone();
            let data = run_blocking(move || read_blob(&dir, &blob)).await?;
            Ok(HttpResponse::Ok()
                .content_type(mime_for(file.extension.as_deref()))
                .body(data))
        }
        Some("metadata") => Ok(HttpResponse::Ok().json(FileMetadataResponse {
            name: file.name,
            extension: file.extension,
            is_directory: file.is_directory,
        })),
        Some("feedback") => {
            if !visible {
                return Ok(HttpResponse::Ok().json(BTreeMap::<i32, CommentResponse>::new()));
            }
            let comments = storage.list_file_comments(file.id).await?;
            let mut ids: Vec<i64> = comments.iter().map(|c| c.user_id).collect();
            ids.sort_unstable();
            ids.dedup();
            let authors: HashMap<i64, UserResponse> = storage
                .get_users_by_ids(&ids)
                .await?
                .iter()
                .map(|u| (u.id, UserResponse::from(u)))
                .collect();
            Ok(HttpResponse::Ok().json(feedback_map(comments, &authors)))
        }
        Some("linter-feedback") => {
            if !visible {
                return Ok(HttpResponse::Ok().json(BTreeMap::<i32, Vec<(String, LinterMessage)>>::new()));
            }
            let comments = storage.list_file_linter_comments(file.id).await?;
            Ok(HttpResponse::Ok().json(linter_feedback_map(comments)))
        }
        Some(other) => Err(CGSystemError::invalid_param("The given type is not supported")
            .with_description(format!(
                "\"{other}\" is not one of metadata, feedback or linter-feedback"
            ))
            .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linter(line: i32, name: &str, code: &str) -> (String, LinterComment) {
        (
            name.to_string(),
            LinterComment {
                file_id: 1,
                line,
                linter_id: "l".into(),
                code: code.into(),
                comment: format!("{code} message"),
            },
        )
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for(Some("PY")), "text/plain; charset=utf-8");
        assert_eq!(mime_for(Some("png")), "image/png");
        assert_eq!(mime_for(None), "application/octet-stream");
    }

    #[test]
    fn test_feedback_map_json() {
        let comments = vec![Comment {
            file_id: 1,
            line: 3,
            user_id: 9,
            comment: "Nice".into(),
        }];
        let map = feedback_map(comments, &HashMap::new());
        assert_eq!(
            serde_json::to_value(&map).unwrap(),
            serde_json::json!({"3": {"line": 3, "msg": "Nice"}})
        );
    }

    #[test]
    fn test_linter_feedback_map() {
        let map = linter_feedback_map(vec![
            linter(0, "Pylint", "C0111"),
            linter(0, "Flake8", "W191"),
            linter(2, "Flake8", "E101"),
        ]);
        assert_eq!(
            serde_json::to_value(&map).unwrap(),
            serde_json::json!({
                "0": [
                    ["Flake8", {"code": "W191", "msg": "W191 message"}],
                    ["Pylint", {"code": "C0111", "msg": "C0111 message"}]
                ],
                "2": [["Flake8", {"code": "E101", "msg": "E101 message"}]]
            })
        );
    }
}
