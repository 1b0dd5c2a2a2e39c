//! 临时中转文件
//!
//! 上传的内容以随机名保存在中转目录，过期后由清理任务删除。

pub mod janitor;

use actix_multipart::Multipart;
use actix_web::http::header::{self, ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use futures_util::StreamExt;
use tracing::info;

use crate::config::AppConfig;
use crate::errors::{CGSystemError, Result};
use crate::models::files::requests::MirrorDownloadQuery;
use crate::runtime::Background;
use crate::services::ingest::blobs::{blob_path, is_blob_name, move_into, store_bytes};
use crate::services::ingest::multipart::{save_files, too_large};
use crate::utils::run_blocking;

pub struct MirrorService;

impl MirrorService {
    pub fn new_lazy() -> Self {
        Self
    }

    pub async fn upload(&self, request: &HttpRequest, payload: web::Payload) -> ActixResult<HttpResponse> {
        let bg = Background::from_request(request);
        let max_size = AppConfig::get().upload.max_size;

        let is_multipart = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/"));

        let name = if is_multipart {
            let workdir = tempfile::tempdir().map_err(CGSystemError::from)?;
            let files = save_files(
                Multipart::new(request.headers(), payload),
                workdir.path(),
                |field| field == "file",
                max_size,
            )
            .await?;
            let file = files.into_iter().next().ok_or_else(|| {
                CGSystemError::no_files_submitted("No file was submitted")
                    .with_description("The request did not contain a \"file\" field")
            })?;
            let dir = bg.mirror_dir.clone();
            run_blocking(move || move_into(&dir, &file.path)).await?
        } else {
            let data = read_body(payload, max_size).await?;
            let dir = bg.mirror_dir.clone();
            run_blocking(move || store_bytes(&dir, &data)).await?
        };

        janitor::schedule_removal(&bg, name.clone());
        info!("Stored mirror file {}", name);
        Ok(HttpResponse::Created().json(name))
    }

    pub async fn download(
        &self,
        request: &HttpRequest,
        name: String,
        query: MirrorDownloadQuery,
    ) -> ActixResult<HttpResponse> {
        let bg = Background::from_request(request);
        let path = blob_path(&bg.mirror_dir, &name);
        if !is_blob_name(&name) || !path.is_file() {
            return Err(CGSystemError::object_not_found("The requested file does not exist")
                .with_description(format!("There is no mirror file named {name}"))
                .into());
        }

        let data = tokio::fs::read(&path).await.map_err(CGSystemError::from)?;
        let filename = query
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "export".to_string());
        Ok(HttpResponse::Ok()
            .content_type("application/octet-stream")
            .insert_header(ContentDisposition {
                disposition: DispositionType::Attachment,
                parameters: vec![DispositionParam::Filename(filename)],
            })
            .body(data))
    }
}

async fn read_body(mut payload: web::Payload, max_size: usize) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| {
            CGSystemError::invalid_param("The request body could not be read").with_description(e.to_string())
        })?;
        if data.len() + chunk.len() > max_size {
            return Err(too_large(max_size));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}
