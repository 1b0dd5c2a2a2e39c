//! 中转目录清理

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::runtime::Background;
use crate::services::ingest::blobs::{blob_path, is_blob_name};

/// 存活时间到了之后删除单个文件
pub fn schedule_removal(bg: &Arc<Background>, name: String) {
    let path = blob_path(&bg.mirror_dir, &name);
    let ttl = bg.mirror_ttl;
    tokio::spawn(async move {
        tokio::time::sleep(ttl).await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!("Removed expired mirror file {}", name),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove mirror file {}: {}", name, e),
        }
    });
}

/// 删除目录中修改时间早于 `now - ttl` 的生成文件，返回删除数量
pub fn sweep(dir: &Path, ttl: Duration, now: SystemTime) -> usize {
    let expired: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_str().is_some_and(is_blob_name))
        .filter(|entry| {
            entry
                .metadata()
                .ok()
                .and_then(|meta| meta.modified().ok())
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age > ttl)
        })
        .map(|entry| entry.into_path())
        .collect();

    expired
        .iter()
        .filter(|path| match std::fs::remove_file(path) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to remove mirror file {}: {}", path.display(), e);
                false
            }
        })
        .count()
}

/// 每隔一个存活周期清理一次遗留文件
pub fn start_sweeper(dir: PathBuf, ttl: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ttl);
        loop {
            ticker.tick().await;
            let target = dir.clone();
            match tokio::task::spawn_blocking(move || sweep(&target, ttl, SystemTime::now())).await {
                Ok(0) => {}
                Ok(removed) => info!("Removed {} expired mirror files", removed),
                Err(e) => warn!("Mirror sweep failed: {}", e),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_sweep_removes_only_expired_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let blob = Uuid::new_v4().to_string();
        std::fs::write(dir.path().join(&blob), b"data").unwrap();
        std::fs::write(dir.path().join("keep.txt"), b"data").unwrap();

        // 刚写入的文件没有过期
        assert_eq!(sweep(dir.path(), Duration::from_secs(60), SystemTime::now()), 0);

        let later = SystemTime::now() + Duration::from_secs(120);
        assert_eq!(sweep(dir.path(), Duration::from_secs(60), later), 1);
        assert!(!dir.path().join(&blob).exists());
        assert!(dir.path().join("keep.txt").exists());
    }
}
