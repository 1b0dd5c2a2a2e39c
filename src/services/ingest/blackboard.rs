//! Blackboard 成绩册导入
//!
//! 成绩册是一个扁平的归档，每个提交对应一个 `<作业>_<学号>_attempt_<时间>.txt`
//! 信息文件，以及若干按信息文件中 `Filename:` 命名的数据文件。

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

use super::archive::{self, ArchiveKind, UploadedFile};
use super::ignore::{IgnoreFilter, IgnoreHandling};
use crate::errors::{CGSystemError, Result};
use crate::models::files::entities::FileTree;

static INFO_FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<assignment_name>.+)_(?P<student_id>.+?)_attempt_(?P<datetime>\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2})\.txt$",
    )
    .expect("invalid blackboard filename regex")
});

static INFO_CONTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^Name: (?P<name>.+) \((?P<id>[^\n]*)\)\n",
        r"Assignment: (?P<assignment>.+)\n",
        r"Date Submitted: (?P<datetime>.+)\n",
        r"Current Grade: *(?P<grade>([0-9.]*|[^\n]*))\n+",
        r"(Override Grade:[^\n]*\n\n)?",
        r"Submission Field:\n(?P<text>(.*\n)+)\n",
        r"Comments:\n(?P<comment>(.*\n)+)\n",
        r"Files:\n",
        r"((?P<files>(.+\n.+\n+)+)|No files were attached to this submission\.\n*)",
    ))
    .expect("invalid blackboard info regex")
});

static INFO_FILES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\tOriginal filename: (.+)\n\tFilename: (.+)\n")
        .expect("invalid blackboard files regex")
});

/// 用户上传的文件名与它存在成绩册中的文件名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub original_name: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionFile {
    Stored(FileInfo),
    /// 没有附件时生成的文件
    Inline { name: String, content: Vec<u8> },
}

/// 一个信息文件描述的提交
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionInfo {
    pub student_name: String,
    pub student_id: String,
    pub assignment_name: String,
    pub created_at: DateTime<Utc>,
    pub grade: Option<f64>,
    pub text: String,
    pub comment: String,
    pub files: Vec<SubmissionFile>,
}

/// 用户文件不能冒充导入时生成的警告文件
const WARNING_FILE: &str = "__WARNING__";

const DATE_FORMATS: &[&str] = &[
    "%A, %B %d, %Y %I:%M:%S %p",
    "%A, %B %d, %Y %H:%M:%S",
    "%A, %d %B %Y %H:%M:%S",
    "%A, %d %B %Y %I:%M:%S %p",
    "%B %d, %Y %I:%M:%S %p",
    "%d %B %Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// 解析提交时间；CET 与 CEST 按阿姆斯特丹冬令时与夏令时处理，没有时区时按 UTC
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let cleaned = raw.replace(" o'clock", "");
    let cleaned = cleaned.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(cleaned) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(cleaned) {
        return Some(parsed.with_timezone(&Utc));
    }

    let (body, offset_hours) = match cleaned.rsplit_once(' ') {
        Some((body, "CEST")) => (body, 2),
        Some((body, "CET")) => (body, 1),
        Some((body, "UTC" | "GMT")) => (body, 0),
        _ => (cleaned, 0),
    };
    let offset = FixedOffset::east_opt(offset_hours * 3600)?;

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(body, fmt).ok())
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_grade(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|g| g.is_finite())
        .map(|g| g.clamp(0.0, 10.0))
}

/// 解析信息文件内容；时间无法解析时使用文件名中的时间
pub fn parse_info(content: &str, fallback: Option<DateTime<Utc>>) -> Result<SubmissionInfo> {
    let content = content.replace("\r\n", "\n");
    let caps = INFO_CONTENT.captures(&content).ok_or_else(|| {
        CGSystemError::invalid_param("The blackboard info file has an unknown format")
    })?;
    let group = |name: &str| caps.name(name).map(|m| m.as_str()).unwrap_or_default();

    let comment = group("comment");
    let files = match caps.name("files") {
        Some(block) => INFO_FILES
            .captures_iter(block.as_str())
            .map(|c| {
                SubmissionFile::Stored(FileInfo {
                    original_name: c[1].to_string(),
                    name: c[2].to_string(),
                })
            })
            .collect(),
        None => vec![SubmissionFile::Inline {
            name: "Comment".to_string(),
            content: format!(
                "No files were uploaded! The comments for this submission were:\n\"\"\"\n{}\n\"\"\"",
                comment.trim()
            )
            .into_bytes(),
        }],
    };

    let created_at = parse_datetime(group("datetime"))
        .or(fallback)
        .ok_or_else(|| {
            CGSystemError::invalid_param("The submission date could not be parsed")
                .with_description(format!("Unknown date format: {}", group("datetime")))
        })?;

    Ok(SubmissionInfo {
        student_name: group("name").to_string(),
        student_id: group("id").to_string(),
        assignment_name: group("assignment").to_string(),
        created_at,
        grade: parse_grade(group("grade")),
        text: group("text").trim_end().to_string(),
        comment: comment.trim_end().to_string(),
        files,
    })
}

/// 信息文件名中的时间
fn filename_datetime(filename: &str) -> Option<DateTime<Utc>> {
    let caps = INFO_FILENAME.captures(filename)?;
    NaiveDateTime::parse_from_str(&caps["datetime"], "%Y-%m-%d-%H-%M-%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn submission_files(info: &SubmissionInfo, extracted: &Path, scratch: &Path) -> Result<Vec<UploadedFile>> {
    let mut out = Vec::with_capacity(info.files.len());
    for (idx, file) in info.files.iter().enumerate() {
        let (name, path) = match file {
            SubmissionFile::Stored(stored) => {
                let path = extracted.join(&stored.name);
                if archive::safe_member_path(&stored.name)?.is_none() || !path.is_file() {
                    return Err(CGSystemError::invalid_param(
                        "The blackboard zip references a missing file",
                    )
                    .with_description(format!("`{}` is not in the archive", stored.name)));
                }
                (stored.original_name.clone(), path)
            }
            SubmissionFile::Inline { name, content } => {
                let path = scratch.join(format!("inline-{idx}"));
                fs::write(&path, content)?;
                (name.clone(), path)
            }
        };

        let filename = if name == WARNING_FILE {
            format!("{WARNING_FILE} (User)")
        } else {
            name
        };
        out.push(UploadedFile { filename, path });
    }
    Ok(out)
}

fn ingest_one(
    info: &SubmissionInfo,
    extracted: &Path,
    upload_dir: &Path,
) -> Result<FileTree> {
    let scratch = tempfile::tempdir()?;
    let files = submission_files(info, extracted, scratch.path())?;
    let filter = IgnoreFilter::empty();

    match archive::process_files(&files, &filter, IgnoreHandling::Keep, upload_dir, false) {
        Ok(tree) => Ok(tree),
        Err(err) => {
            tracing::warn!(
                "Blackboard submission of {} could not be extracted, storing files as-is: {}",
                info.student_id,
                err
            );
            let mut files = submission_files(info, extracted, scratch.path())?;
            let warning = scratch.path().join("warning");
            fs::write(&warning, "Some files could not be extracted!")?;
            files.push(UploadedFile {
                filename: WARNING_FILE.to_string(),
                path: warning,
            });
            archive::process_files(&files, &filter, IgnoreHandling::Keep, upload_dir, true)
        }
    }
}

/// 解析整个成绩册，返回每个提交的信息与文件树
pub fn process_blackboard_zip(
    file: &UploadedFile,
    upload_dir: &Path,
) -> Result<Vec<(SubmissionInfo, FileTree)>> {
    let kind = ArchiveKind::detect(&file.filename).ok_or_else(|| {
        CGSystemError::invalid_archive("The blackboard zip is not an archive")
    })?;
    let extracted = tempfile::tempdir()?;
    archive::unpack(kind, &file.path, extracted.path())?;

    let mut info_files: Vec<String> = fs::read_dir(extracted.path())?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| INFO_FILENAME.is_match(name))
        .collect();
    info_files.sort();

    let mut submissions = Vec::with_capacity(info_files.len());
    for name in info_files {
        let content = fs::read(extracted.path().join(&name))?;
        let info = parse_info(&String::from_utf8_lossy(&content), filename_datetime(&name))?;
        let tree = ingest_one(&info, extracted.path(), upload_dir)?;
        submissions.push((info, tree));
    }

    if submissions.is_empty() {
        return Err(CGSystemError::invalid_param(
            "The blackboard zip could not imported or it was empty.",
        )
        .with_description(
            "The blackboard zip could not be parsed or it did not contain any valid submissions.",
        ));
    }
    Ok(submissions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ingest::archive::tests::write_zip;
    use chrono::{Datelike, Timelike};

    const WITH_FILES: &str = "Name: Student One (s1234)
Assignment: Assignment 1
Date Submitted: Monday, October 20, 2014 10:48:33 PM CEST
Current Grade: 8.5

Submission Field:
There is no student submission text data for this assignment.

Comments:
There are no student comments for this assignment.

Files:
\tOriginal filename: main.py
\tFilename: Assignment 1_s1234_attempt_2014-10-20-22-48-33_main.py

\tOriginal filename: __WARNING__
\tFilename: Assignment 1_s1234_attempt_2014-10-20-22-48-33___WARNING__

";

    const WITHOUT_FILES: &str = "Name: Student Two (s5678)
Assignment: Assignment 1
Date Submitted: Thursday, 2 February 2017 15:33:55 o'clock CET
Current Grade: Needs Grading

Submission Field:
Some text

Comments:
  see attached

Files:
No files were attached to this submission.
";

    #[test]
    fn test_parse_info_with_files() {
        let info = parse_info(WITH_FILES, None).unwrap();
        assert_eq!(info.student_name, "Student One");
        assert_eq!(info.student_id, "s1234");
        assert_eq!(info.assignment_name, "Assignment 1");
        assert_eq!(info.grade, Some(8.5));
        assert_eq!(info.files.len(), 2);
        assert_eq!(
            info.files[0],
            SubmissionFile::Stored(FileInfo {
                original_name: "main.py".into(),
                name: "Assignment 1_s1234_attempt_2014-10-20-22-48-33_main.py".into(),
            })
        );
        assert_eq!(info.created_at.hour(), 20);
        assert_eq!(info.created_at.day(), 20);
    }

    #[test]
    fn test_parse_info_without_files() {
        let info = parse_info(WITHOUT_FILES, None).unwrap();
        assert_eq!(info.grade, None);
        assert_eq!(info.comment, "  see attached");
        let SubmissionFile::Inline { name, content } = &info.files[0] else {
            panic!("expected inline comment file");
        };
        assert_eq!(name, "Comment");
        let content = String::from_utf8(content.clone()).unwrap();
        assert!(content.ends_with("\"\"\"\nsee attached\n\"\"\""));
        assert_eq!(info.created_at.hour(), 14);
        assert_eq!(info.created_at.year(), 2017);
    }

    #[test]
    fn test_grade_clamped() {
        assert_eq!(parse_grade("12"), Some(10.0));
        assert_eq!(parse_grade("-1"), Some(0.0));
        assert_eq!(parse_grade(""), None);
        assert_eq!(parse_grade("Needs Grading"), None);
    }

    #[test]
    fn test_datetime_fallback() {
        assert!(parse_datetime("not a date").is_none());
        let fallback = filename_datetime("A_s1_attempt_2020-01-02-03-04-05.txt");
        let text = WITH_FILES.replace(
            "Monday, October 20, 2014 10:48:33 PM CEST",
            "sometime",
        );
        let info = parse_info(&text, fallback).unwrap();
        assert_eq!(info.created_at.year(), 2020);
        assert_eq!(info.created_at.minute(), 4);
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(parse_info("hello", None).is_err());
    }

    #[test]
    fn test_process_blackboard_zip() {
        let scratch = tempfile::tempdir().unwrap();
        let upload = tempfile::tempdir().unwrap();
        let file = write_zip(
            scratch.path(),
            "gradebook.zip",
            &[
                ("Assignment 1_s1234_attempt_2014-10-20-22-48-33.txt", WITH_FILES),
                (
                    "Assignment 1_s1234_attempt_2014-10-20-22-48-33_main.py",
                    "print(1)",
                ),
                (
                    "Assignment 1_s1234_attempt_2014-10-20-22-48-33___WARNING__",
                    "user file",
                ),
                ("Assignment 1_s5678_attempt_2017-02-02-15-33-55.txt", WITHOUT_FILES),
            ],
        );

        let result = process_blackboard_zip(&file, upload.path()).unwrap();
        assert_eq!(result.len(), 2);

        let (info, tree) = &result[0];
        assert_eq!(info.student_id, "s1234");
        let FileTree::Directory { name, entries } = tree else {
            panic!("expected directory");
        };
        assert_eq!(name, "top");
        let names: Vec<_> = entries.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["main.py", "__WARNING__ (User)"]);

        let (info, tree) = &result[1];
        assert_eq!(info.student_id, "s5678");
        assert_eq!(tree.leaf_count(), 1);
    }

    #[test]
    fn test_empty_gradebook_rejected() {
        let scratch = tempfile::tempdir().unwrap();
        let upload = tempfile::tempdir().unwrap();
        let file = write_zip(scratch.path(), "gradebook.zip", &[("readme.md", "hi")]);
        let err = process_blackboard_zip(&file, upload.path()).unwrap_err();
        assert_eq!(err.api_code(), "INVALID_PARAM");
    }
}
