//! 文件内容与逐行评论

pub mod comments;
pub mod content;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::comments::requests::PutCommentRequest;
use crate::models::files::requests::CodeQuery;
use crate::storage::Storage;

pub struct CodeService {
    storage: Option<Arc<dyn Storage>>,
}

impl CodeService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Arc<dyn Storage> {
        if let Some(storage) = &self.storage {
            storage.clone()
        } else {
            request
                .app_data::<actix_web::web::Data<Arc<dyn Storage>>>()
                .expect("Storage not found in app data")
                .get_ref()
                .clone()
        }
    }

    pub async fn get_code(&self, request: &HttpRequest, file_id: i64, query: CodeQuery) -> ActixResult<HttpResponse> {
        content::get_code(self, request, file_id, query).await
    }

    pub async fn put_comment(
        &self,
        request: &HttpRequest,
        file_id: i64,
        line: i64,
        req: PutCommentRequest,
    ) -> ActixResult<HttpResponse> {
        comments::put_comment(self, request, file_id, line, req).await
    }

    pub async fn delete_comment(&self, request: &HttpRequest, file_id: i64, line: i64) -> ActixResult<HttpResponse> {
        comments::delete_comment(self, request, file_id, line).await
    }
}
