//! 评分标准
//!
//! 作业的评分标准由若干行组成，每行若干条目；提交在每行中最多选中一个条目。

pub mod assignment;
pub mod grade;
pub mod plan;
pub mod selection;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::rubrics::requests::{PutRubricRequest, SelectItemsRequest};
use crate::storage::Storage;

pub struct RubricService {
    storage: Option<Arc<dyn Storage>>,
}

impl RubricService {
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

    pub async fn get_rubric(&self, request: &HttpRequest, assignment_id: i64) -> ActixResult<HttpResponse> {
        assignment::get_rubric(self, request, assignment_id).await
    }

    pub async fn put_rubric(
        &self,
        request: &HttpRequest,
        assignment_id: i64,
        req: PutRubricRequest,
    ) -> ActixResult<HttpResponse> {
        assignment::put_rubric(self, request, assignment_id, req).await
    }

    pub async fn delete_rubric(
        &self,
        request: &HttpRequest,
        assignment_id: i64,
    ) -> ActixResult<HttpResponse> {
        assignment::delete_rubric(self, request, assignment_id).await
    }

    pub async fn get_work_rubric(&self, request: &HttpRequest, work_id: i64) -> ActixResult<HttpResponse> {
        selection::get_work_rubric(self, request, work_id).await
    }

    pub async fn select_items(
        &self,
        request: &HttpRequest,
        work_id: i64,
        req: SelectItemsRequest,
    ) -> ActixResult<HttpResponse> {
        selection::select_items(self, request, work_id, req).await
    }

    pub async fn select_item(
        &self,
        request: &HttpRequest,
        work_id: i64,
        item_id: i64,
    ) -> ActixResult<HttpResponse> {
        selection::select_item(self, request, work_id, item_id).await
    }

    pub async fn unselect_item(
        &self,
        request: &HttpRequest,
        work_id: i64,
        item_id: i64,
    ) -> ActixResult<HttpResponse> {
        selection::unselect_item(self, request, work_id, item_id).await
    }
}
