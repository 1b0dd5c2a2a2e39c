//! 提交导出：zip 归档与纯文本反馈报告

use std::fmt::Write as _;
use std::io::{Cursor, Write};
use std::path::Path;

use crate::errors::{CGSystemError, Result};
use crate::models::comments::entities::{Comment, LinterComment};
use crate::services::ingest::FileArena;
use crate::services::ingest::blobs::blob_path;

/// zip 根目录名，`/` 会被替换掉
pub fn archive_root_name(assignment: &str, user: &str) -> String {
    format!("{assignment}-{user}-archive").replace(['/', '\\'], "_")
}

fn zip_error(e: zip::result::ZipError) -> CGSystemError {
    CGSystemError::file_operation(format!("生成 zip 失败: {e}"))
}

/// 把提交打包成 zip，根目录改名为 `root_name`
pub fn build_zip(arena: &FileArena, blob_dir: &Path, root_name: &str) -> Result<Vec<u8>> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    let root = arena.root().name.as_str();

    for (node, path) in arena.walk() {
        let relative = path.strip_prefix(root).unwrap_or(&path);
        let name = format!("{root_name}{relative}");
        if node.is_directory {
            zip.add_directory(format!("{name}/"), options).map_err(zip_error)?;
        } else if let Some(blob) = &node.filename {
            zip.start_file(name, options).map_err(zip_error)?;
            zip.write_all(&std::fs::read(blob_path(blob_dir, blob))?)?;
        }
    }
    Ok(zip.finish().map_err(zip_error)?.into_inner())
}

/// 去掉根目录名后的路径
fn relative_path(arena: &FileArena, file_id: i64) -> Option<String> {
    let path = arena.path_of(file_id)?;
    Some(match path.split_once('/') {
        Some((_, rest)) => rest.to_string(),
        None => path,
    })
}

/// 纯文本反馈报告，按 (路径, 行) 排序
pub fn render_feedback(
    assignment: &str,
    grade: Option<f64>,
    general: Option<&str>,
    arena: &FileArena,
    comments: &[Comment],
    linter_comments: &[(String, LinterComment)],
) -> String {
    let mut human: Vec<(String, i32, &str)> = comments
        .iter()
        .filter_map(|c| Some((relative_path(arena, c.file_id)?, c.line, c.comment.as_str())))
        .collect();
    human.sort();

    let mut linted: Vec<(String, i32, &str, &str, &str)> = linter_comments
        .iter()
        .filter_map(|(linter, c)| {
            Some((
                relative_path(arena, c.file_id)?,
                c.line,
                linter.as_str(),
                c.code.as_str(),
                c.comment.as_str(),
            ))
        })
        .collect();
    linted.sort();

    let mut out = String::new();
    let _ = writeln!(out, "Assignment: {assignment}");
    let _ = writeln!(out, "Grade: {}", grade.map(|g| g.to_string()).unwrap_or_default());
    let _ = writeln!(out, "General feedback:");
    let _ = writeln!(out, "{}", general.unwrap_or_default());
    let _ = writeln!(out);
    let _ = writeln!(out, "Comments:");
    for (path, line, text) in human {
        let _ = writeln!(out, "{path}:{}:0: {text}", line + 1);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Linter comments:");
    for (path, line, linter, code, text) in linted {
        let _ = writeln!(out, "{path}:{}:0: ({linter} {code}) {text}", line + 1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ingest::tree::tests::sample;
    use std::io::Read;

    fn comment(file_id: i64, line: i32, text: &str) -> Comment {
        Comment {
            file_id,
            line,
            user_id: 1,
            comment: text.into(),
        }
    }

    #[test]
    fn test_render_feedback_sorted() {
        let comments = vec![
            comment(5, 0, "nested"),
            comment(2, 4, "second"),
            comment(2, 1, "first"),
        ];
        let linter = vec![(
            "Flake8".to_string(),
            LinterComment {
                file_id: 3,
                line: 0,
                linter_id: "l1".into(),
                code: "W191".into(),
                comment: "indentation contains tabs".into(),
            },
        )];
        let text = render_feedback("Hello", Some(7.5), Some("Good job"), &sample(), &comments, &linter);
        assert_eq!(
            text,
            "Assignment: Hello\n\
             Grade: 7.5\n\
             General feedback:\n\
             Good job\n\
             \n\
             Comments:\n\
             b.py:2:0: first\n\
             b.py:5:0: second\n\
             sub/c.txt:1:0: nested\n\
             \n\
             Linter comments:\n\
             A.py:1:0: (Flake8 W191) indentation contains tabs\n"
        );
    }

    #[test]
    fn test_render_feedback_empty() {
        let text = render_feedback("Hello", None, None, &sample(), &[], &[]);
        assert!(text.starts_with("Assignment: Hello\nGrade: \nGeneral feedback:\n\n"));
    }

    #[test]
    fn test_build_zip() {
        let blobs = tempfile::tempdir().unwrap();
        for (name, content) in [("blob-a", "a"), ("blob-b", "b"), ("blob-c", "c")] {
            std::fs::write(blobs.path().join(name), content).unwrap();
        }
        let root = archive_root_name("Hello", "Jane");
        assert_eq!(root, "Hello-Jane-archive");

        let data = build_zip(&sample(), blobs.path(), &root).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
        let mut content = String::new();
        archive
            .by_name("Hello-Jane-archive/sub/c.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "c");
        assert!(archive.by_name("Hello-Jane-archive/A.py").is_ok());
    }
}
