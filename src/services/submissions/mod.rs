//! 提交
//!
//! 上传、批量导入、列表与导出、评分以及评分员分配。

pub mod bulk;
pub mod detail;
pub mod export;
pub mod files;
pub mod grade;
pub mod list;
pub mod response;
pub mod upload;

use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::files::requests::FilesQuery;
use crate::models::submissions::requests::{
    PatchSubmissionRequest, SetGraderRequest, SubmissionGetQuery, SubmissionListQuery, UploadQuery,
};
use crate::storage::Storage;

pub struct SubmissionService {
    storage: Option<Arc<dyn Storage>>,
}

impl SubmissionService {
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

    /// 上传一次提交
    pub async fn upload(
        &self,
        request: &HttpRequest,
        assignment_id: i64,
        payload: Multipart,
        query: UploadQuery,
    ) -> ActixResult<HttpResponse> {
        upload::upload(self, request, assignment_id, payload, query).await
    }

    /// 导入 Blackboard 成绩册
    pub async fn bulk_upload(
        &self,
        request: &HttpRequest,
        assignment_id: i64,
        payload: Multipart,
    ) -> ActixResult<HttpResponse> {
        bulk::bulk_upload(self, request, assignment_id, payload).await
    }

    pub async fn list_submissions(
        &self,
        request: &HttpRequest,
        assignment_id: i64,
        query: SubmissionListQuery,
    ) -> ActixResult<HttpResponse> {
        list::list_submissions(self, request, assignment_id, query).await
    }

    pub async fn get_submission(
        &self,
        request: &HttpRequest,
        work_id: i64,
        query: SubmissionGetQuery,
    ) -> ActixResult<HttpResponse> {
        detail::get_submission(self, request, work_id, query).await
    }

    pub async fn delete_submission(&self, request: &HttpRequest, work_id: i64) -> ActixResult<HttpResponse> {
        detail::delete_submission(self, request, work_id).await
    }

    pub async fn patch_submission(
        &self,
        request: &HttpRequest,
        work_id: i64,
        req: PatchSubmissionRequest,
    ) -> ActixResult<HttpResponse> {
        grade::patch_submission(self, request, work_id, req).await
    }

    pub async fn set_grader(
        &self,
        request: &HttpRequest,
        work_id: i64,
        req: SetGraderRequest,
    ) -> ActixResult<HttpResponse> {
        grade::set_grader(self, request, work_id, req).await
    }

    pub async fn unset_grader(&self, request: &HttpRequest, work_id: i64) -> ActixResult<HttpResponse> {
        grade::unset_grader(self, request, work_id).await
    }

    pub async fn grade_history(&self, request: &HttpRequest, work_id: i64) -> ActixResult<HttpResponse> {
        grade::grade_history(self, request, work_id).await
    }

    pub async fn list_files(
        &self,
        request: &HttpRequest,
        work_id: i64,
        query: FilesQuery,
    ) -> ActixResult<HttpResponse> {
        files::list_files(self, request, work_id, query).await
    }
}
