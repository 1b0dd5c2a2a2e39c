//! 上传目录中的 blob 命名与读写
//!
//! blob 名是随机 UUID，不包含任何用户输入。

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

use crate::errors::{CGSystemError, Result};

/// 在目录中生成一个未被占用的随机路径
pub fn random_file_path(dir: &Path) -> (PathBuf, String) {
    loop {
        let name = Uuid::new_v4().to_string();
        let candidate = dir.join(&name);
        if !candidate.exists() {
            return (candidate, name);
        }
    }
}

/// 是否为本系统生成的 blob 名
pub fn is_blob_name(name: &str) -> bool {
    name.len() == 36 && Uuid::try_parse(name).is_ok()
}

pub fn blob_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

/// 写入新 blob，返回 blob 名
pub fn store_bytes(dir: &Path, data: &[u8]) -> Result<String> {
    let (path, name) = random_file_path(dir);
    fs::write(&path, data)
        .map_err(|e| CGSystemError::file_operation(format!("写入文件失败: {e}")))?;
    Ok(name)
}

/// 把已有文件移动到目录中，跨设备时退回为复制
pub fn move_into(dir: &Path, source: &Path) -> Result<String> {
    let (path, name) = random_file_path(dir);
    if fs::rename(source, &path).is_err() {
        fs::copy(source, &path)
            .map_err(|e| CGSystemError::file_operation(format!("移动文件失败: {e}")))?;
        let _ = fs::remove_file(source);
    }
    Ok(name)
}

pub fn read_blob(dir: &Path, name: &str) -> Result<Vec<u8>> {
    if !is_blob_name(name) {
        return Err(CGSystemError::object_not_found("The requested file does not exist")
            .with_description(format!("{name} is not a stored file name")));
    }
    fs::read(blob_path(dir, name))
        .map_err(|e| CGSystemError::file_operation(format!("读取文件失败: {e}")))
}

/// 删除 blob，失败只记录日志
pub fn remove_blobs<S: AsRef<str>>(dir: &Path, names: &[S]) {
    for name in names {
        let name = name.as_ref();
        if !is_blob_name(name) {
            continue;
        }
        if let Err(e) = fs::remove_file(blob_path(dir, name)) {
            warn!("Failed to remove blob {}: {}", name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_names_are_valid() {
        let dir = tempfile::tempdir().unwrap();
        let (path, name) = random_file_path(dir.path());
        assert!(is_blob_name(&name));
        assert!(!name.contains('/'));
        assert_eq!(path, dir.path().join(&name));
        assert!(!path.exists());
    }

    #[test]
    fn test_store_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let name = store_bytes(dir.path(), b"hello").unwrap();
        assert_eq!(read_blob(dir.path(), &name).unwrap(), b"hello");

        remove_blobs(dir.path(), &[name.clone()]);
        assert!(!blob_path(dir.path(), &name).exists());
    }

    #[test]
    fn test_rejects_foreign_names() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_blob_name("../etc/passwd"));
        assert!(read_blob(dir.path(), "../secret").is_err());
    }

    #[test]
    fn test_move_into() {
        let upload = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let source = scratch.path().join("a.py");
        fs::write(&source, "print(1)").unwrap();

        let name = move_into(upload.path(), &source).unwrap();
        assert!(!source.exists());
        assert_eq!(fs::read_to_string(upload.path().join(name)).unwrap(), "print(1)");
    }
}
