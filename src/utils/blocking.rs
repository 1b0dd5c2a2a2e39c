use crate::errors::{CGSystemError, Result};

/// 在阻塞线程池中执行文件系统等同步工作
pub async fn run_blocking<T, F>(job: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| CGSystemError::unknown_error(format!("后台任务失败: {e}")))?
}
