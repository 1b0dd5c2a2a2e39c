use serde::{Deserialize, Serialize};

/// 持久化的文件树节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub id: i64,
    pub work_id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub extension: Option<String>,
    /// 上传目录中的 blob 名，目录为 None
    pub filename: Option<String>,
    pub is_directory: bool,
}

/// 解包后、入库前的文件树
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileTree {
    File { name: String, filename: String },
    Directory { name: String, entries: Vec<FileTree> },
}

impl FileTree {
    pub fn name(&self) -> &str {
        match self {
            FileTree::File { name, .. } | FileTree::Directory { name, .. } => name,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, FileTree::Directory { .. })
    }

    /// 收集所有 blob 名
    pub fn blobs(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_blobs(&mut out);
        out
    }

    fn collect_blobs(&self, out: &mut Vec<String>) {
        match self {
            FileTree::File { filename, .. } => out.push(filename.clone()),
            FileTree::Directory { entries, .. } => {
                for entry in entries {
                    entry.collect_blobs(out);
                }
            }
        }
    }

    /// 叶子数量
    pub fn leaf_count(&self) -> usize {
        match self {
            FileTree::File { .. } => 1,
            FileTree::Directory { entries, .. } => entries.iter().map(FileTree::leaf_count).sum(),
        }
    }
}

/// 文件扩展名：最后一个 `.` 之后的部分，名称以 `.` 开头且没有其他 `.` 时为空
pub fn file_extension(name: &str) -> String {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[idx + 1..].to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("main.py"), "py");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension(".gitignore"), "");
        assert_eq!(file_extension("Makefile"), "");
    }

    #[test]
    fn test_tree_helpers() {
        let tree = FileTree::Directory {
            name: "top".into(),
            entries: vec![
                FileTree::File {
                    name: "a".into(),
                    filename: "x1".into(),
                },
                FileTree::Directory {
                    name: "d".into(),
                    entries: vec![FileTree::File {
                        name: "b".into(),
                        filename: "x2".into(),
                    }],
                },
            ],
        };
        assert_eq!(tree.leaf_count(), 2);
        assert_eq!(tree.blobs(), vec!["x1".to_string(), "x2".to_string()]);
        assert!(tree.is_directory());
    }
}
