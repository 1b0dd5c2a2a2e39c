//! 归档解包与文件树构建
//!
//! 支持 zip、tar.gz、tar.bz2。归档先解到私有临时目录，检查忽略规则，
//! 然后去掉单层包裹目录，最后把叶子移动到上传目录。

use flate2::read::GzDecoder;
use bzip2::read::BzDecoder;
use serde_json::json;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::blobs;
use super::ignore::{IgnoreFilter, IgnoreHandling};
use crate::errors::{CGSystemError, Result};
use crate::models::files::entities::FileTree;

/// 非归档上传与多文件上传的根目录名
pub const TOP_DIRECTORY: &str = "top";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
    TarBz2,
}

impl ArchiveKind {
    /// 按后缀识别归档类型
    pub fn detect(filename: &str) -> Option<Self> {
        let lower = filename.to_lowercase();
        if lower.ends_with(".zip") {
            Some(ArchiveKind::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else if lower.ends_with(".tar.bz2") || lower.ends_with(".tbz") || lower.ends_with(".tbz2")
        {
            Some(ArchiveKind::TarBz2)
        } else {
            None
        }
    }
}

/// 一个上传的文件，内容已落盘
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// 用户给出的文件名
    pub filename: String,
    pub path: PathBuf,
}

/// 解包后的中间树，叶子仍在临时目录里
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    File { name: String, source: PathBuf },
    Dir { name: String, entries: Vec<Extracted> },
}

impl Extracted {
    pub fn name(&self) -> &str {
        match self {
            Extracted::File { name, .. } | Extracted::Dir { name, .. } => name,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Extracted::Dir { .. })
    }
}

fn escape_error(name: &str) -> CGSystemError {
    CGSystemError::invalid_archive("The given archive contains invalid entries")
        .with_description(format!("The entry `{name}` may escape the extraction root"))
}

fn broken_archive(err: io::Error) -> CGSystemError {
    CGSystemError::invalid_archive("The given archive could not be extracted")
        .with_description(err.to_string())
}

fn no_files_error() -> CGSystemError {
    CGSystemError::no_files_submitted(
        "All files are ignored by a rule in the assignment's ignore file",
    )
    .with_description("No files were in the given archive after filtering.")
}

/// 客户端给出的上传文件名只保留最后一段
pub fn upload_file_name(raw: &str) -> Result<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(CGSystemError::invalid_param("The given file name is not valid")
            .with_description(format!("`{raw}` does not name a file")));
    }
    Ok(name.to_string())
}

/// 校验归档成员名，返回相对路径；`./` 这样的根条目返回 None
pub fn safe_member_path(name: &str) -> Result<Option<PathBuf>> {
    if name.starts_with('/') || name.starts_with('\\') {
        return Err(escape_error(name));
    }

    let trimmed = name.trim_end_matches('/');
    let mut out = PathBuf::new();
    for part in trimmed.split('/') {
        match part {
            "." => continue,
            "" | ".." => return Err(escape_error(name)),
            p if p.contains('\\') => return Err(escape_error(name)),
            p => out.push(p),
        }
    }

    if out.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(out))
    }
}

fn unpack_zip(archive: &Path, dest: &Path) -> Result<()> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let name = entry.name().to_string();
        if entry.is_symlink() {
            return Err(escape_error(&name));
        }
        let Some(rel) = safe_member_path(&name)? else {
            continue;
        };

        let target = dest.join(rel);
        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out).map_err(broken_archive)?;
    }
    Ok(())
}

fn unpack_tar<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries().map_err(broken_archive)? {
        let mut entry = entry.map_err(broken_archive)?;
        let name = entry
            .path()
            .map_err(broken_archive)?
            .to_string_lossy()
            .into_owned();
        let kind = entry.header().entry_type();
        if kind.is_symlink() || kind.is_hard_link() {
            return Err(escape_error(&name));
        }
        let Some(rel) = safe_member_path(&name)? else {
            continue;
        };

        let target = dest.join(rel);
        if kind.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if !kind.is_file() {
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out).map_err(broken_archive)?;
    }
    Ok(())
}

/// 把归档解包到目标目录
pub fn unpack(kind: ArchiveKind, archive: &Path, dest: &Path) -> Result<()> {
    match kind {
        ArchiveKind::Zip => unpack_zip(archive, dest),
        ArchiveKind::TarGz => unpack_tar(GzDecoder::new(File::open(archive)?), dest),
        ArchiveKind::TarBz2 => unpack_tar(BzDecoder::new(File::open(archive)?), dest),
    }
}

/// 读取目录内容，条目按名称排序
pub fn read_dir_tree(dir: &Path) -> Result<Vec<Extracted>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            entries.push(Extracted::Dir {
                name,
                entries: read_dir_tree(&entry.path())?,
            });
        } else if file_type.is_file() {
            entries.push(Extracted::File {
                name,
                source: entry.path(),
            });
        }
    }
    entries.sort_by(|a, b| a.name().cmp(b.name()));
    Ok(entries)
}

fn child_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// 收集所有被忽略的条目，目录以 `/` 结尾
pub fn ignored_entries(entries: &[Extracted], filter: &IgnoreFilter) -> Vec<(String, String)> {
    fn walk(
        entries: &[Extracted],
        prefix: &str,
        filter: &IgnoreFilter,
        out: &mut Vec<(String, String)>,
    ) {
        for entry in entries {
            let path = child_path(prefix, entry.name());
            match entry {
                Extracted::Dir { entries, .. } => {
                    let dir_path = format!("{path}/");
                    if let Some(line) = filter.ignored_by(&dir_path) {
                        out.push((dir_path, line.to_string()));
                    }
                    walk(entries, &path, filter, out);
                }
                Extracted::File { .. } => {
                    if let Some(line) = filter.ignored_by(&path) {
                        out.push((path, line.to_string()));
                    }
                }
            }
        }
    }

    let mut out = Vec::new();
    walk(entries, "", filter, &mut out);
    out
}

/// 去掉被忽略的条目，被忽略的目录连同内容一起去掉
pub fn remove_ignored(entries: Vec<Extracted>, prefix: &str, filter: &IgnoreFilter) -> Vec<Extracted> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let path = child_path(prefix, entry.name());
            match entry {
                Extracted::Dir { name, entries } => {
                    if filter.ignored_by(&format!("{path}/")).is_some() {
                        None
                    } else {
                        Some(Extracted::Dir {
                            entries: remove_ignored(entries, &path, filter),
                            name,
                        })
                    }
                }
                file => filter.ignored_by(&path).is_none().then_some(file),
            }
        })
        .collect()
}

fn invalid_files_error(invalid: Vec<(String, String)>) -> CGSystemError {
    let pairs: Vec<_> = invalid.iter().map(|(path, line)| json!([path, line])).collect();
    CGSystemError::invalid_file_in_archive("The archive contains files that are ignored")
        .with_description("Some files in the archive matched the ignore file")
        .with_extra("invalid_files", pairs)
}

fn apply_ignore(
    entries: Vec<Extracted>,
    filter: &IgnoreFilter,
    mode: IgnoreHandling,
) -> Result<Vec<Extracted>> {
    match mode {
        IgnoreHandling::Keep => Ok(entries),
        IgnoreHandling::Delete => Ok(remove_ignored(entries, "", filter)),
        IgnoreHandling::Error => {
            let invalid = ignored_entries(&entries, filter);
            if invalid.is_empty() {
                Ok(entries)
            } else {
                Err(invalid_files_error(invalid))
            }
        }
    }
}

/// 解包单个归档；多个顶层条目时根目录以文件名（去掉后缀）命名
pub fn extract(
    file: &UploadedFile,
    kind: ArchiveKind,
    filter: &IgnoreFilter,
    mode: IgnoreHandling,
    workdir: &Path,
) -> Result<Option<Extracted>> {
    unpack(kind, &file.path, workdir)?;
    let mut entries = apply_ignore(read_dir_tree(workdir)?, filter, mode)?;

    let root_name = match upload_file_name(&file.filename)?.split('.').next() {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => TOP_DIRECTORY.to_string(),
    };
    Ok(match entries.len() {
        0 => None,
        1 if entries[0].is_dir() => entries.pop(),
        _ => Some(Extracted::Dir {
            name: root_name,
            entries,
        }),
    })
}

/// 根目录只有一个子目录时用它替换根目录
pub fn dehead(mut tree: Extracted) -> Extracted {
    while let Extracted::Dir { entries, .. } = &mut tree {
        if entries.len() != 1 || !entries[0].is_dir() {
            break;
        }
        match entries.pop() {
            Some(child) => tree = child,
            None => break,
        }
    }
    tree
}

/// 把叶子移动到上传目录
pub fn persist(node: Extracted, upload_dir: &Path) -> Result<FileTree> {
    match node {
        Extracted::File { name, source } => Ok(FileTree::File {
            filename: blobs::move_into(upload_dir, &source)?,
            name,
        }),
        Extracted::Dir { name, entries } => Ok(FileTree::Directory {
            entries: entries
                .into_iter()
                .map(|entry| persist(entry, upload_dir))
                .collect::<Result<Vec<_>>>()?,
            name,
        }),
    }
}

/// 处理一次上传
///
/// 单个归档直接解包；多个文件或非归档文件放进名为 `top` 的根目录，
/// 其中的归档各自解包并去头。`force_txt` 时所有文件都按普通文件处理。
pub fn process_files(
    files: &[UploadedFile],
    filter: &IgnoreFilter,
    mode: IgnoreHandling,
    upload_dir: &Path,
    force_txt: bool,
) -> Result<FileTree> {
    let archive_kind = |file: &UploadedFile| {
        if force_txt {
            None
        } else {
            ArchiveKind::detect(&file.filename)
        }
    };
    // 临时目录要活到叶子移动完成
    let mut workdirs: Vec<TempDir> = Vec::new();

    let tree = match files {
        [] => return Err(no_files_error()),
        [single] if archive_kind(single).is_some() => {
            let workdir = tempfile::tempdir()?;
            let kind = archive_kind(single).ok_or_else(no_files_error)?;
            let tree = extract(single, kind, filter, mode, workdir.path())?;
            workdirs.push(workdir);
            tree.ok_or_else(no_files_error)?
        }
        _ => {
            let mut entries = Vec::new();
            for file in files {
                if let Some(kind) = archive_kind(file) {
                    let workdir = tempfile::tempdir()?;
                    if let Some(tree) = extract(file, kind, filter, mode, workdir.path())? {
                        entries.push(dehead(tree));
                    }
                    workdirs.push(workdir);
                    continue;
                }

                let name = upload_file_name(&file.filename)?;
                if mode != IgnoreHandling::Keep
                    && let Some(line) = filter.ignored_by(&name)
                {
                    if mode == IgnoreHandling::Delete {
                        continue;
                    }
                    return Err(invalid_files_error(vec![(name, line.to_string())]));
                }
                entries.push(Extracted::File {
                    name,
                    source: file.path.clone(),
                });
            }
            if entries.is_empty() {
                return Err(no_files_error());
            }
            Extracted::Dir {
                name: TOP_DIRECTORY.to_string(),
                entries,
            }
        }
    };

    let tree = persist(dehead(tree), upload_dir)?;
    drop(workdirs);
    Ok(tree)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) fn write_zip(dir: &Path, name: &str, entries: &[(&str, &str)]) -> UploadedFile {
        let path = dir.join(name);
        let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
        let options = zip::write::SimpleFileOptions::default();
        for (entry, content) in entries {
            if entry.ends_with('/') {
                zip.add_directory(*entry, options).unwrap();
            } else {
                zip.start_file(*entry, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
        }
        zip.finish().unwrap();
        UploadedFile {
            filename: name.to_string(),
            path,
        }
    }

    fn write_tar<W: Write>(writer: W, entries: &[(&str, &str)]) -> W {
        let mut builder = tar::Builder::new(writer);
        for (entry, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, entry, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn names(tree: &FileTree) -> Vec<String> {
        match tree {
            FileTree::Directory { entries, .. } => {
                entries.iter().map(|e| e.name().to_string()).collect()
            }
            FileTree::File { .. } => vec![],
        }
    }

    #[test]
    fn test_detect() {
        assert_eq!(ArchiveKind::detect("a.zip"), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::detect("a.tar.gz"), Some(ArchiveKind::TarGz));
        assert_eq!(ArchiveKind::detect("a.tgz"), Some(ArchiveKind::TarGz));
        assert_eq!(ArchiveKind::detect("a.tbz"), Some(ArchiveKind::TarBz2));
        assert_eq!(ArchiveKind::detect("a.tar.bz2"), Some(ArchiveKind::TarBz2));
        assert_eq!(ArchiveKind::detect("a.py"), None);
    }

    #[test]
    fn test_safe_member_path() {
        assert_eq!(
            safe_member_path("dir/a.py").unwrap(),
            Some(PathBuf::from("dir/a.py"))
        );
        assert_eq!(safe_member_path("./").unwrap(), None);
        assert_eq!(
            safe_member_path("./dir/").unwrap(),
            Some(PathBuf::from("dir"))
        );
        assert!(safe_member_path("/etc/passwd").is_err());
        assert!(safe_member_path("../x").is_err());
        assert!(safe_member_path("a//b").is_err());
    }

    #[test]
    fn test_single_top_directory_is_root() {
        let scratch = tempfile::tempdir().unwrap();
        let upload = tempfile::tempdir().unwrap();
        let file = write_zip(
            scratch.path(),
            "sub.zip",
            &[("topdir/", ""), ("topdir/a", "1"), ("topdir/b", "2")],
        );

        let tree = process_files(
            &[file],
            &IgnoreFilter::empty(),
            IgnoreHandling::Keep,
            upload.path(),
            false,
        )
        .unwrap();
        assert_eq!(tree.name(), "topdir");
        assert_eq!(names(&tree), vec!["a", "b"]);
        assert_eq!(tree.leaf_count(), 2);
    }

    #[test]
    fn test_double_nesting_is_deheaded() {
        let scratch = tempfile::tempdir().unwrap();
        let upload = tempfile::tempdir().unwrap();
        let file = write_zip(
            scratch.path(),
            "sub.zip",
            &[("topdir/sub/a", "1"), ("topdir/sub/b", "2")],
        );

        let tree = process_files(
            &[file],
            &IgnoreFilter::empty(),
            IgnoreHandling::Keep,
            upload.path(),
            false,
        )
        .unwrap();
        assert_eq!(tree.name(), "sub");
        assert_eq!(names(&tree), vec!["a", "b"]);
    }

    #[test]
    fn test_multiple_top_level_entries_use_archive_name() {
        let scratch = tempfile::tempdir().unwrap();
        let upload = tempfile::tempdir().unwrap();
        let file = write_zip(scratch.path(), "handin.v2.zip", &[("a.py", "1"), ("b.py", "2")]);

        let tree = process_files(
            &[file],
            &IgnoreFilter::empty(),
            IgnoreHandling::Keep,
            upload.path(),
            false,
        )
        .unwrap();
        assert_eq!(tree.name(), "handin");
        for blob in tree.blobs() {
            assert!(upload.path().join(blob).exists());
        }
    }

    #[test]
    fn test_ignore_delete_and_error() {
        let scratch = tempfile::tempdir().unwrap();
        let upload = tempfile::tempdir().unwrap();
        let filter = IgnoreFilter::new("*\n!dir/").unwrap();

        let file = write_zip(scratch.path(), "a.zip", &[("dir/f", "1"), ("other/g", "2")]);
        let tree = process_files(
            std::slice::from_ref(&file),
            &filter,
            IgnoreHandling::Delete,
            upload.path(),
            false,
        )
        .unwrap();
        assert_eq!(tree.name(), "dir");
        assert_eq!(names(&tree), vec!["f"]);

        let file = write_zip(scratch.path(), "b.zip", &[("dir/f", "1"), ("other/g", "2")]);
        let err = process_files(&[file], &filter, IgnoreHandling::Error, upload.path(), false)
            .unwrap_err();
        assert_eq!(err.api_code(), "INVALID_FILE_IN_ARCHIVE");
        let invalid = &err.detail().extra["invalid_files"];
        assert!(
            invalid
                .as_array()
                .unwrap()
                .contains(&json!(["other/g", "*"]))
        );
    }

    #[test]
    fn test_everything_ignored() {
        let scratch = tempfile::tempdir().unwrap();
        let upload = tempfile::tempdir().unwrap();
        let filter = IgnoreFilter::new("*.pyc").unwrap();
        let file = write_zip(scratch.path(), "a.zip", &[("x.pyc", "1"), ("y.pyc", "2")]);

        let err = process_files(&[file], &filter, IgnoreHandling::Delete, upload.path(), false)
            .unwrap_err();
        assert_eq!(err.api_code(), "NO_FILES_SUBMITTED");
    }

    #[test]
    fn test_plain_file_goes_under_top() {
        let scratch = tempfile::tempdir().unwrap();
        let upload = tempfile::tempdir().unwrap();
        let path = scratch.path().join("upload");
        fs::write(&path, "print(1)").unwrap();
        let file = UploadedFile {
            filename: "main.py".into(),
            path,
        };

        let tree = process_files(
            &[file],
            &IgnoreFilter::empty(),
            IgnoreHandling::Keep,
            upload.path(),
            false,
        )
        .unwrap();
        assert_eq!(tree.name(), TOP_DIRECTORY);
        assert_eq!(names(&tree), vec!["main.py"]);
    }

    #[test]
    fn test_upload_file_name() {
        assert_eq!(upload_file_name("main.py").unwrap(), "main.py");
        assert_eq!(upload_file_name("../../escaped.py").unwrap(), "escaped.py");
        assert_eq!(upload_file_name("C:\\Users\\me\\a.py").unwrap(), "a.py");
        assert_eq!(upload_file_name("..").unwrap_err().api_code(), "INVALID_PARAM");
        assert!(upload_file_name("dir/").is_err());
        assert!(upload_file_name("").is_err());
    }

    #[test]
    fn test_plain_file_name_cannot_escape() {
        let scratch = tempfile::tempdir().unwrap();
        let upload = tempfile::tempdir().unwrap();
        let path = scratch.path().join("upload");
        fs::write(&path, "print(1)").unwrap();
        let file = UploadedFile {
            filename: "../../escaped.py".into(),
            path,
        };

        let tree = process_files(
            &[file],
            &IgnoreFilter::empty(),
            IgnoreHandling::Keep,
            upload.path(),
            false,
        )
        .unwrap();
        assert_eq!(names(&tree), vec!["escaped.py"]);

        let path = scratch.path().join("upload-2");
        fs::write(&path, "x").unwrap();
        let dots = UploadedFile {
            filename: "a/..".into(),
            path,
        };
        let err = process_files(
            &[dots],
            &IgnoreFilter::empty(),
            IgnoreHandling::Keep,
            upload.path(),
            false,
        )
        .unwrap_err();
        assert_eq!(err.api_code(), "INVALID_PARAM");
    }

    #[test]
    fn test_tar_gz_and_bz2() {
        let scratch = tempfile::tempdir().unwrap();
        let upload = tempfile::tempdir().unwrap();

        let gz_path = scratch.path().join("w.tar.gz");
        let encoder = flate2::write::GzEncoder::new(
            File::create(&gz_path).unwrap(),
            flate2::Compression::default(),
        );
        write_tar(encoder, &[("proj/a.c", "int x;"), ("proj/b.c", "int y;")])
            .finish()
            .unwrap();

        let tree = process_files(
            &[UploadedFile {
                filename: "w.tar.gz".into(),
                path: gz_path,
            }],
            &IgnoreFilter::empty(),
            IgnoreHandling::Keep,
            upload.path(),
            false,
        )
        .unwrap();
        assert_eq!(tree.name(), "proj");
        assert_eq!(names(&tree), vec!["a.c", "b.c"]);

        let bz_path = scratch.path().join("w.tar.bz2");
        let encoder = bzip2::write::BzEncoder::new(
            File::create(&bz_path).unwrap(),
            bzip2::Compression::default(),
        );
        write_tar(encoder, &[("one.txt", "1"), ("two.txt", "2")])
            .finish()
            .unwrap();

        let tree = process_files(
            &[UploadedFile {
                filename: "w.tar.bz2".into(),
                path: bz_path,
            }],
            &IgnoreFilter::empty(),
            IgnoreHandling::Keep,
            upload.path(),
            false,
        )
        .unwrap();
        assert_eq!(tree.name(), "w");
        assert_eq!(tree.leaf_count(), 2);
    }

    #[test]
    fn test_symlink_in_tar_rejected() {
        let scratch = tempfile::tempdir().unwrap();
        let upload = tempfile::tempdir().unwrap();
        let path = scratch.path().join("evil.tar.gz");
        let encoder = flate2::write::GzEncoder::new(
            File::create(&path).unwrap(),
            flate2::Compression::default(),
        );
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_size(0);
        builder
            .append_link(&mut header, "link", "/etc/passwd")
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let err = process_files(
            &[UploadedFile {
                filename: "evil.tar.gz".into(),
                path,
            }],
            &IgnoreFilter::empty(),
            IgnoreHandling::Keep,
            upload.path(),
            false,
        )
        .unwrap_err();
        assert_eq!(err.api_code(), "INVALID_ARCHIVE");
    }

    #[test]
    fn test_dehead_stops_at_file() {
        let tree = Extracted::Dir {
            name: "a".into(),
            entries: vec![Extracted::File {
                name: "f".into(),
                source: PathBuf::from("/tmp/f"),
            }],
        };
        assert_eq!(dehead(tree.clone()), tree);
    }
}
