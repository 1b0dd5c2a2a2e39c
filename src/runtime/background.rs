//! 后台任务上下文
//!
//! linter 运行、提醒邮件、成绩回传和中转文件清理都在请求之外执行，
//! 共用这里的存储句柄、邮件发送器和并发限制。

use actix_web::{HttpRequest, web};
use dashmap::DashMap;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, OwnedSemaphorePermit, Semaphore};
use tracing::warn;

use crate::config::AppConfig;
use crate::errors::{CGSystemError, Result};
use crate::services::mail::{Mailer, ReminderScheduler};
use crate::storage::Storage;

pub struct Background {
    pub storage: Arc<dyn Storage>,
    pub mailer: Arc<dyn Mailer>,
    pub reminders: ReminderScheduler,
    pub http: reqwest::Client,
    pub upload_dir: PathBuf,
    pub mirror_dir: PathBuf,
    pub mirror_ttl: Duration,
    pub external_url: String,
    /// LTI consumer key -> secret
    pub lti_secrets: HashMap<String, String>,
    linter_slots: Arc<Semaphore>,
    linter_timeout: Duration,
    division_locks: KeyedLocks,
}

/// 按 id 区分的互斥锁
#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub async fn lock(&self, key: i64) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}

impl Background {
    pub fn new(storage: Arc<dyn Storage>, mailer: Arc<dyn Mailer>, config: &AppConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CGSystemError::external_service(format!("创建 HTTP 客户端失败: {e}")))?;

        Ok(Self {
            storage,
            mailer,
            reminders: ReminderScheduler::new(),
            http,
            upload_dir: PathBuf::from(&config.upload.dir),
            mirror_dir: PathBuf::from(&config.upload.mirror_dir),
            mirror_ttl: Duration::from_secs(config.upload.mirror_ttl.max(1)),
            external_url: config.app.external_url.clone(),
            lti_secrets: config.lti.consumer_key_secrets.clone(),
            linter_slots: Arc::new(Semaphore::new(config.worker.linter_concurrency.max(1))),
            linter_timeout: Duration::from_secs(config.worker.linter_timeout.max(1)),
            division_locks: KeyedLocks::default(),
        })
    }

    /// 从请求中取出后台上下文
    pub fn from_request(request: &HttpRequest) -> Arc<Background> {
        request
            .app_data::<web::Data<Arc<Background>>>()
            .expect("Background not found in app data")
            .get_ref()
            .clone()
    }

    /// 取得一个 linter 运行名额
    pub async fn linter_slot(&self) -> Result<OwnedSemaphorePermit> {
        self.linter_slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| CGSystemError::unknown_error(format!("linter 队列已关闭: {e}")))
    }

    pub fn linter_timeout(&self) -> Duration {
        self.linter_timeout
    }

    /// 同一作业的分配操作串行执行
    pub async fn lock_division(&self, assignment_id: i64) -> OwnedMutexGuard<()> {
        self.division_locks.lock(assignment_id).await
    }

    /// 在后台执行，失败只记录日志
    pub fn spawn<F>(&self, what: &'static str, job: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        tokio::spawn(async move {
            if let Err(e) = job.await {
                warn!("Background task {} failed: {}", what, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_locks_are_per_key() {
        let locks = Arc::new(KeyedLocks::default());
        let first = locks.lock(1).await;

        let other = tokio::time::timeout(Duration::from_millis(50), locks.lock(2)).await;
        assert!(other.is_ok());

        let same = tokio::time::timeout(Duration::from_millis(50), locks.lock(1)).await;
        assert!(same.is_err());

        drop(first);
        let again = tokio::time::timeout(Duration::from_millis(50), locks.lock(1)).await;
        assert!(again.is_ok());
    }
}
