//! 作业服务
//!
//! 作业设置、提醒邮件、评分员分配与完成标记。

pub mod detail;
pub mod divide;
pub mod division;
pub mod graders;
pub mod update;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::assignments::requests::{DivideRequest, PatchAssignmentRequest};
use crate::storage::Storage;

pub use division::{notify_reset, pick_grader, redivide};

pub struct AssignmentService {
    storage: Option<Arc<dyn Storage>>,
}

impl AssignmentService {
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

    pub async fn get_assignment(
        &self,
        request: &HttpRequest,
        assignment_id: i64,
    ) -> ActixResult<HttpResponse> {
        detail::get_assignment(self, request, assignment_id).await
    }

    pub async fn update_assignment(
        &self,
        request: &HttpRequest,
        assignment_id: i64,
        req: PatchAssignmentRequest,
    ) -> ActixResult<HttpResponse> {
        update::update_assignment(self, request, assignment_id, req).await
    }

    pub async fn divide(
        &self,
        request: &HttpRequest,
        assignment_id: i64,
        req: DivideRequest,
    ) -> ActixResult<HttpResponse> {
        divide::divide(self, request, assignment_id, req).await
    }

    pub async fn list_graders(
        &self,
        request: &HttpRequest,
        assignment_id: i64,
    ) -> ActixResult<HttpResponse> {
        graders::list_graders(self, request, assignment_id).await
    }

    pub async fn set_grader_done(
        &self,
        request: &HttpRequest,
        assignment_id: i64,
        grader_id: i64,
        done: bool,
    ) -> ActixResult<HttpResponse> {
        if done {
            graders::mark_done(self, request, assignment_id, grader_id).await
        } else {
            graders::mark_not_done(self, request, assignment_id, grader_id).await
        }
    }
}
