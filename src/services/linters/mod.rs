//! linter 服务
//!
//! 对作业的所有最新提交运行静态检查，结果以 linter 评论的形式挂在文件行上。

pub mod create;
pub mod detail;
pub mod list;
pub mod registry;
pub mod runner;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::linters::entities::{LinterInstance, LinterState};
use crate::models::linters::requests::CreateLinterRequest;
use crate::runtime::Background;
use crate::storage::Storage;

pub use registry::{Linter, all_linters, get_linter};

pub struct LinterService {
    storage: Option<Arc<dyn Storage>>,
}

impl LinterService {
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

    pub async fn list_linters(
        &self,
        request: &HttpRequest,
        assignment_id: i64,
    ) -> ActixResult<HttpResponse> {
        list::list_linters(self, request, assignment_id).await
    }

    pub async fn create_linter(
        &self,
        request: &HttpRequest,
        assignment_id: i64,
        req: CreateLinterRequest,
    ) -> ActixResult<HttpResponse> {
        create::create_linter(self, request, assignment_id, req).await
    }

    pub async fn get_linter(&self, request: &HttpRequest, linter_id: String) -> ActixResult<HttpResponse> {
        detail::get_linter(self, request, linter_id).await
    }

    pub async fn delete_linter(
        &self,
        request: &HttpRequest,
        linter_id: String,
    ) -> ActixResult<HttpResponse> {
        detail::delete_linter(self, request, linter_id).await
    }
}

pub const WHITESPACE_LINTER: &str = "MixedWhitespace";

/// 作业是否挂有空白字符检查
pub async fn has_whitespace_linter(storage: &Arc<dyn Storage>, assignment_id: i64) -> Result<bool> {
    Ok(storage
        .list_assignment_linters(assignment_id)
        .await?
        .iter()
        .any(|linter| linter.name == WHITESPACE_LINTER))
}

/// 新提交入库后，为作业上的每个 linter 建一个实例并运行
pub async fn lint_new_work(bg: &Arc<Background>, assignment_id: i64, work_id: i64) -> Result<()> {
    for assignment_linter in bg.storage.list_assignment_linters(assignment_id).await? {
        let linter = match get_linter(&assignment_linter.name) {
            Ok(linter) => linter,
            Err(_) => {
                warn!(
                    "Assignment linter {} refers to unknown linter {}",
                    assignment_linter.id, assignment_linter.name
                );
                continue;
            }
        };

        let instance = LinterInstance {
            id: Uuid::new_v4().to_string(),
            work_id,
            tester_id: assignment_linter.id.clone(),
            state: if linter.runs_externally() {
                LinterState::Running
            } else {
                LinterState::Done
            },
            error: None,
        };
        bg.storage.create_linter_instance(instance.clone()).await?;

        if linter.runs_externally() {
            runner::start_run(
                bg.clone(),
                linter,
                assignment_linter.config.clone(),
                vec![runner::LintJob {
                    instance_id: instance.id,
                    work_id,
                }],
            );
        }
    }
    Ok(())
}
