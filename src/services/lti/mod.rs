//! LMS 对接 (LTI 1.1)

pub mod launch;
pub mod oauth;
pub mod passback;
pub mod roles;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::storage::Storage;

pub use passback::{should_passback, spawn_assignment_passback, spawn_work_passback};

pub struct LtiService {
    storage: Option<Arc<dyn Storage>>,
}

impl LtiService {
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

    pub async fn launch_first(
        &self,
        request: &HttpRequest,
        form: Vec<(String, String)>,
    ) -> ActixResult<HttpResponse> {
        launch::launch_first(self, request, form).await
    }

    pub async fn launch_second(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        launch::launch_second(self, request).await
    }
}
