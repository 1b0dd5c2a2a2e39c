//! 已入库的文件树
//!
//! 存储层返回一个提交的全部 [`FileNode`]，这里按父节点建立索引，
//! 提供目录列表、路径解析以及把提交还原到文件系统。

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use super::blobs;
use crate::errors::{CGSystemError, Result};
use crate::models::files::entities::FileNode;
use crate::models::files::responses::FileListing;

#[derive(Debug, Clone)]
pub struct FileArena {
    nodes: HashMap<i64, FileNode>,
    children: HashMap<i64, Vec<i64>>,
    root: i64,
}

impl FileArena {
    pub fn new(nodes: Vec<FileNode>) -> Result<Self> {
        let root = nodes
            .iter()
            .find(|n| n.parent_id.is_none())
            .map(|n| n.id)
            .ok_or_else(|| {
                CGSystemError::object_not_found("This submission has no files")
                    .with_description("No root directory found for the submission")
            })?;

        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        for node in &nodes {
            if let Some(parent) = node.parent_id {
                children.entry(parent).or_default().push(node.id);
            }
        }
        let nodes: HashMap<i64, FileNode> = nodes.into_iter().map(|n| (n.id, n)).collect();
        for ids in children.values_mut() {
            ids.sort_by(|a, b| {
                let (a, b) = (&nodes[a].name, &nodes[b].name);
                a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
            });
        }

        Ok(Self {
            nodes,
            children,
            root,
        })
    }

    pub fn root(&self) -> &FileNode {
        &self.nodes[&self.root]
    }

    pub fn get(&self, id: i64) -> Option<&FileNode> {
        self.nodes.get(&id)
    }

    pub fn children(&self, id: i64) -> impl Iterator<Item = &FileNode> {
        self.children
            .get(&id)
            .into_iter()
            .flatten()
            .map(|child| &self.nodes[child])
    }

    /// 渲染节点，叶子没有 entries
    pub fn render(&self, id: i64) -> Option<FileListing> {
        let node = self.nodes.get(&id)?;
        let entries = node
            .is_directory
            .then(|| self.children(id).filter_map(|c| self.render(c.id)).collect());
        Some(FileListing {
            name: node.name.clone(),
            id: node.id,
            entries,
        })
    }

    /// 目录列表，节点不是目录时返回 OBJECT_WRONG_TYPE
    pub fn listing(&self, id: i64) -> Result<FileListing> {
        let node = self.nodes.get(&id).ok_or_else(|| {
            CGSystemError::object_id_not_found(format!("The file with id {id} was not found"))
        })?;
        if !node.is_directory {
            return Err(CGSystemError::object_wrong_type(
                "The given file is not a directory",
            )
            .with_description(format!("File {id} is a regular file")));
        }
        self.render(id).ok_or_else(|| {
            CGSystemError::object_id_not_found(format!("The file with id {id} was not found"))
        })
    }

    /// 节点相对提交的路径，第一段是根目录名
    pub fn path_of(&self, id: i64) -> Option<String> {
        let mut parts = Vec::new();
        let mut current = self.nodes.get(&id)?;
        loop {
            parts.push(current.name.as_str());
            match current.parent_id {
                Some(parent) => current = self.nodes.get(&parent)?,
                None => break,
            }
        }
        parts.reverse();
        Some(parts.join("/"))
    }

    /// 解析 `root/a/b` 形式的路径；以 `/` 结尾时要求目录
    pub fn resolve_path(&self, path: &str) -> Option<&FileNode> {
        let wants_dir = path.ends_with('/');
        let mut parts = path.split('/').filter(|p| !p.is_empty());

        let mut current = self.root();
        if parts.next()? != current.name {
            return None;
        }
        for part in parts {
            current = self.children(current.id).find(|c| c.name == part)?;
        }

        if wants_dir && !current.is_directory {
            return None;
        }
        Some(current)
    }

    /// 先序遍历，返回 (节点, 路径)
    pub fn walk(&self) -> Vec<(&FileNode, String)> {
        fn visit<'a>(
            arena: &'a FileArena,
            node: &'a FileNode,
            prefix: &str,
            out: &mut Vec<(&'a FileNode, String)>,
        ) {
            let path = if prefix.is_empty() {
                node.name.clone()
            } else {
                format!("{prefix}/{}", node.name)
            };
            out.push((node, path.clone()));
            for child in arena.children(node.id) {
                visit(arena, child, &path, out);
            }
        }

        let mut out = Vec::with_capacity(self.nodes.len());
        visit(self, self.root(), "", &mut out);
        out
    }

    /// 把提交还原到目标目录下，返回根目录路径
    pub fn restore(&self, blob_dir: &Path, target: &Path) -> Result<PathBuf> {
        for (node, path) in self.walk() {
            if !is_plain_name(&node.name) {
                return Err(CGSystemError::file_operation(format!(
                    "文件名 `{}` 不是单个路径分量，拒绝还原",
                    node.name
                )));
            }
            let dest = target.join(&path);
            if node.is_directory {
                fs::create_dir_all(&dest)?;
                continue;
            }
            let Some(blob) = &node.filename else {
                continue;
            };
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(blobs::blob_path(blob_dir, blob), &dest).map_err(|e| {
                CGSystemError::file_operation(format!("还原文件 {path} 失败: {e}"))
            })?;
        }
        Ok(target.join(&self.root().name))
    }
}

/// 名字只能是一个普通路径分量
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn node(id: i64, parent: Option<i64>, name: &str, blob: Option<&str>) -> FileNode {
        FileNode {
            id,
            work_id: 1,
            parent_id: parent,
            name: name.to_string(),
            extension: None,
            filename: blob.map(str::to_string),
            is_directory: blob.is_none(),
        }
    }

    pub(crate) fn sample() -> FileArena {
        FileArena::new(vec![
            node(1, None, "topdir", None),
            node(2, Some(1), "b.py", Some("blob-b")),
            node(3, Some(1), "A.py", Some("blob-a")),
            node(4, Some(1), "sub", None),
            node(5, Some(4), "c.txt", Some("blob-c")),
        ])
        .unwrap()
    }

    #[test]
    fn test_listing_sorted_case_insensitive() {
        let listing = sample().listing(1).unwrap();
        assert_eq!(listing.name, "topdir");
        let names: Vec<_> = listing
            .entries
            .unwrap()
            .iter()
            .map(|e| e.name.clone())
            .collect();
        assert_eq!(names, vec!["A.py", "b.py", "sub"]);
    }

    #[test]
    fn test_listing_of_file_is_wrong_type() {
        let err = sample().listing(2).unwrap_err();
        assert_eq!(err.api_code(), "OBJECT_WRONG_TYPE");
        assert!(sample().render(2).unwrap().entries.is_none());
    }

    #[test]
    fn test_paths() {
        let arena = sample();
        assert_eq!(arena.path_of(5).as_deref(), Some("topdir/sub/c.txt"));
        assert_eq!(arena.resolve_path("topdir/sub/c.txt").map(|n| n.id), Some(5));
        assert_eq!(arena.resolve_path("topdir/sub/").map(|n| n.id), Some(4));
        assert!(arena.resolve_path("topdir/b.py/").is_none());
        assert!(arena.resolve_path("other/b.py").is_none());
        assert_eq!(arena.resolve_path("/topdir").map(|n| n.id), Some(1));
    }

    #[test]
    fn test_walk_is_pre_order() {
        let arena = sample();
        let paths: Vec<_> = arena.walk().into_iter().map(|(_, p)| p).collect();
        assert_eq!(
            paths,
            vec![
                "topdir",
                "topdir/A.py",
                "topdir/b.py",
                "topdir/sub",
                "topdir/sub/c.txt"
            ]
        );
    }

    #[test]
    fn test_restore() {
        let blobs = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        for (name, content) in [("blob-a", "a"), ("blob-b", "b"), ("blob-c", "c")] {
            fs::write(blobs.path().join(name), content).unwrap();
        }

        let root = sample().restore(blobs.path(), target.path()).unwrap();
        assert_eq!(root, target.path().join("topdir"));
        assert_eq!(fs::read_to_string(root.join("sub/c.txt")).unwrap(), "c");
        assert_eq!(fs::read_to_string(root.join("A.py")).unwrap(), "a");
    }

    #[test]
    fn test_restore_refuses_escaping_names() {
        let scratch = tempfile::tempdir().unwrap();
        let blobs = scratch.path().join("blobs");
        let target = scratch.path().join("a/b");
        fs::create_dir_all(&blobs).unwrap();
        fs::create_dir_all(&target).unwrap();
        fs::write(blobs.join("blob-x"), "x").unwrap();

        let arena = FileArena::new(vec![
            node(1, None, "top", None),
            node(2, Some(1), "../../escaped.py", Some("blob-x")),
        ])
        .unwrap();
        assert!(arena.restore(&blobs, &target).is_err());
        assert!(!scratch.path().join("escaped.py").exists());
        assert!(!scratch.path().join("a/escaped.py").exists());

        assert!(is_plain_name("a.py"));
        assert!(!is_plain_name(".."));
        assert!(!is_plain_name("a/b"));
        assert!(!is_plain_name(""));
    }

    #[test]
    fn test_missing_root() {
        assert!(FileArena::new(vec![]).is_err());
    }
}
