//! 用户搜索与开放注册

pub mod register;
pub mod search;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::users::requests::{RegisterRequest, UserSearchQuery};
use crate::storage::Storage;

pub struct UserService {
    storage: Option<Arc<dyn Storage>>,
}

impl UserService {
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

    pub async fn search_users(
        &self,
        request: &HttpRequest,
        query: UserSearchQuery,
    ) -> ActixResult<HttpResponse> {
        search::search_users(self, request, query).await
    }

    pub async fn register(
        &self,
        request: &HttpRequest,
        req: RegisterRequest,
    ) -> ActixResult<HttpResponse> {
        register::register_user(self, request, req).await
    }
}
