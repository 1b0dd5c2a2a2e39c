//! 课程服务
//!
//! 课程、课程角色、选课以及课程下的作业。

pub mod assignments;
pub mod create;
pub mod get;
pub mod roles;
pub mod users;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::assignments::requests::CreateAssignmentRequest;
use crate::models::courses::requests::{CreateCourseRequest, EnrollUserRequest};
use crate::models::permissions::requests::SetPermissionRequest;
use crate::storage::Storage;

pub struct CourseService {
    storage: Option<Arc<dyn Storage>>,
}

impl CourseService {
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

    // 当前用户所在的课程
    pub async fn list_courses(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        get::list_courses(self, request).await
    }

    pub async fn create_course(
        &self,
        request: &HttpRequest,
        req: CreateCourseRequest,
    ) -> ActixResult<HttpResponse> {
        create::create_course(self, request, req).await
    }

    pub async fn get_course(&self, request: &HttpRequest, course_id: i64) -> ActixResult<HttpResponse> {
        get::get_course(self, request, course_id).await
    }

    pub async fn get_permissions(
        &self,
        request: &HttpRequest,
        course_id: i64,
    ) -> ActixResult<HttpResponse> {
        roles::get_permissions(self, request, course_id).await
    }

    pub async fn list_roles(&self, request: &HttpRequest, course_id: i64) -> ActixResult<HttpResponse> {
        roles::list_roles(self, request, course_id).await
    }

    pub async fn update_role(
        &self,
        request: &HttpRequest,
        course_id: i64,
        role_id: i64,
        req: SetPermissionRequest,
    ) -> ActixResult<HttpResponse> {
        roles::update_role(self, request, course_id, role_id, req).await
    }

    pub async fn list_users(&self, request: &HttpRequest, course_id: i64) -> ActixResult<HttpResponse> {
        users::list_users(self, request, course_id).await
    }

    // 选课或修改用户的课程角色
    pub async fn set_user_role(
        &self,
        request: &HttpRequest,
        course_id: i64,
        req: EnrollUserRequest,
    ) -> ActixResult<HttpResponse> {
        users::set_user_role(self, request, course_id, req).await
    }

    pub async fn list_assignments(
        &self,
        request: &HttpRequest,
        course_id: i64,
    ) -> ActixResult<HttpResponse> {
        assignments::list_assignments(self, request, course_id).await
    }

    pub async fn create_assignment(
        &self,
        request: &HttpRequest,
        course_id: i64,
        req: CreateAssignmentRequest,
    ) -> ActixResult<HttpResponse> {
        assignments::create_assignment(self, request, course_id, req).await
    }
}
