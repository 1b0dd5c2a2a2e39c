//! linter 注册表
//!
//! 每个 linter 在启动时登记名称、说明、默认配置和运行方式。
//! 外部 linter 把提交还原到临时目录后以子进程运行，输出每行一条结果，
//! 字段之间用随机 UUID 分隔，避免与文件名或消息内容冲突。

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use uuid::Uuid;

use crate::errors::{CGSystemError, Result};

pub const EMPTY_CONFIG: &str = "Empty config file";

/// linter 输出的一条结果，行号从 1 开始
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted {
    pub path: String,
    pub line: i32,
    pub code: String,
    pub msg: String,
}

#[async_trait]
pub trait Linter: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// 预设配置：名称 -> 配置文本
    fn default_options(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(EMPTY_CONFIG.to_string(), String::new())])
    }

    /// 不需要运行子进程的 linter，实例创建后直接完成
    fn runs_externally(&self) -> bool {
        true
    }

    /// 在 `dir` 上运行，返回所有结果
    async fn run(&self, dir: &Path, config: &str, timeout: Duration) -> Result<Vec<Emitted>>;
}

/// 按分隔符拆分输出，字段数不是 4 或行号不是整数的行被跳过
pub fn parse_output(stdout: &str, sep: &str) -> Vec<Emitted> {
    stdout
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(sep).collect();
            let [path, row, code, msg] = parts.as_slice() else {
                return None;
            };
            Some(Emitted {
                path: path.to_string(),
                line: row.trim().parse().ok()?,
                code: code.to_string(),
                msg: msg.to_string(),
            })
        })
        .collect()
}

async fn write_config(dir: &Path, file_name: &str, config: &str) -> Result<String> {
    let path = dir.join(file_name);
    tokio::fs::write(&path, config).await?;
    Ok(path.to_string_lossy().into_owned())
}

async fn run_command(mut command: Command, timeout: Duration) -> Result<Output> {
    command.kill_on_drop(true);
    let program = command.as_std().get_program().to_string_lossy().into_owned();
    match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(CGSystemError::external_service(format!(
            "Could not start {program}: {e}"
        ))),
        Err(_) => Err(CGSystemError::external_service(format!(
            "{program} did not finish within {}s",
            timeout.as_secs()
        ))),
    }
}

pub struct Flake8;

#[async_trait]
impl Linter for Flake8 {
    fn name(&self) -> &'static str {
        "Flake8"
    }

    fn description(&self) -> &'static str {
        "The flake8 linter with all \"noqa\"s disabled."
    }

    async fn run(&self, dir: &Path, config: &str, timeout: Duration) -> Result<Vec<Emitted>> {
        let cfg = write_config(dir, ".flake8", config).await?;
        let sep = Uuid::new_v4().to_string();
        let format = format!("%(path)s{sep}%(row)d{sep}%(code)s{sep}%(text)s");

        let mut command = Command::new("flake8");
        command
            .arg("--disable-noqa")
            .arg(format!("--config={cfg}"))
            .arg("--format")
            .arg(format)
            .arg(dir);
        let output = run_command(command, timeout).await?;
        if findings_tool_crashed(output.status.code()) {
            return Err(CGSystemError::external_service(format!(
                "flake8 exited abnormally: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(parse_output(&String::from_utf8_lossy(&output.stdout), &sep))
    }
}

/// flake8 和 coala 发现问题时以 1 退出，其他非零退出码或被信号终止视为崩溃
fn findings_tool_crashed(code: Option<i32>) -> bool {
    !matches!(code, Some(0) | Some(1))
}

pub struct Pylint;

#[async_trait]
impl Linter for Pylint {
    fn name(&self) -> &'static str {
        "Pylint"
    }

    fn description(&self) -> &'static str {
        "The pylint checker, this checker only works on modules!"
    }

    async fn run(&self, dir: &Path, config: &str, timeout: Duration) -> Result<Vec<Emitted>> {
        let cfg = write_config(dir, ".pylintrc", config).await?;
        let sep = Uuid::new_v4().to_string();
        let template = format!("{{path}}{sep}{{line}}{sep}{{msg_id}}{sep}{{msg}}");

        let mut command = Command::new("pylint");
        command
            .arg(format!("--rcfile={cfg}"))
            .arg("--output-format=text")
            .arg(format!("--msg-template={template}"))
            .arg(dir);
        let output = run_command(command, timeout).await?;
        if pylint_crashed(output.status.code()) {
            return Err(CGSystemError::external_service(
                "No init file was found, pylint did not run!",
            ));
        }
        Ok(parse_output(&String::from_utf8_lossy(&output.stdout), &sep))
    }
}

/// pylint 的退出码：1 为致命错误，32 为用法错误
fn pylint_crashed(code: Option<i32>) -> bool {
    matches!(code, Some(1) | Some(32) | None)
}

/// 通过 coala 运行的单个 bear
pub struct BearLinter {
    name: &'static str,
    description: &'static str,
    bear: &'static str,
}

impl BearLinter {
    pub const fn new(name: &'static str, description: &'static str, bear: &'static str) -> Self {
        Self {
            name,
            description,
            bear,
        }
    }

    fn command(&self, dir: &Path, sep: &str) -> Command {
        let mut command = Command::new("coala");
        command
            .current_dir(dir)
            .arg("--format")
            .arg(format!("{{file}}{sep}{{line}}{sep}{{severity_str}}{sep}{{message}}"))
            .arg("--files")
            .arg(format!("{}/**/*.*", dir.display()))
            .arg("--bears")
            .arg(self.bear)
            .arg("-I");
        command
    }
}

#[async_trait]
impl Linter for BearLinter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        self.description
    }

    async fn run(&self, dir: &Path, config: &str, timeout: Duration) -> Result<Vec<Emitted>> {
        write_config(dir, ".coala", config).await?;
        let sep = Uuid::new_v4().to_string();
        let output = run_command(self.command(dir, &sep), timeout).await?;
        if findings_tool_crashed(output.status.code()) {
            return Err(CGSystemError::external_service(format!(
                "coala ({}) exited abnormally: {}",
                self.bear,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(parse_output(&String::from_utf8_lossy(&output.stdout), &sep))
    }
}

const BEARS: &[BearLinter] = &[
    BearLinter::new("PyFlakes", "The pyflake checker", "PyFlakesBear"),
    BearLinter::new(
        "Pycodestyle",
        "The pycode style checker, formerly known as `pep8`",
        "PycodestyleBear",
    ),
    BearLinter::new("HTML Linter", "The HTML lint checker", "HTMLLintBear"),
    BearLinter::new("Shell Linter", "The Shell checker", "ShellCheckBear"),
    BearLinter::new("Haskell Linter", "Haskell ghc mod package", "GhcModBear"),
    BearLinter::new("Java Linter", "Java Checkstyle", "CheckstyleBear"),
    BearLinter::new("Clang", "syntax and semantical problems", "ClangBear"),
    BearLinter::new("golint", "Suggest better formatting options in Go code.", "GoLintBear"),
    BearLinter::new("gofmt", "Suggest better formatting options in Go code.", "GofmtBear"),
    BearLinter::new("PHP Codesniffer", "PHP syntax and formatting", "PHPCodeSnifferBear"),
    BearLinter::new(
        "Eslint",
        "Check JavaScript for style issues and semantic errors.",
        "ESLintCheckBear",
    ),
    BearLinter::new("SCSSLint", "Check CSS for formatting and syntax errors", "SCSSLintBear"),
    BearLinter::new("chktex", "Check Latex for formatting and syntax errors", "LatexLintBear"),
];

/// 混合缩进检查，结果由前端根据文件内容展示
pub struct MixedWhitespace;

#[async_trait]
impl Linter for MixedWhitespace {
    fn name(&self) -> &'static str {
        "MixedWhitespace"
    }

    fn description(&self) -> &'static str {
        "Checks if a file contains mixed whitespace (tabs and spaces) and highlights it."
    }

    fn runs_externally(&self) -> bool {
        false
    }

    async fn run(&self, _dir: &Path, _config: &str, _timeout: Duration) -> Result<Vec<Emitted>> {
        Ok(Vec::new())
    }
}

static REGISTRY: Lazy<BTreeMap<&'static str, Box<dyn Linter>>> = Lazy::new(|| {
    let mut linters: Vec<Box<dyn Linter>> = vec![Box::new(Flake8), Box::new(Pylint), Box::new(MixedWhitespace)];
    linters.extend(BEARS.iter().map(|bear| {
        Box::new(BearLinter::new(bear.name, bear.description, bear.bear)) as Box<dyn Linter>
    }));
    linters.into_iter().map(|l| (l.name(), l)).collect()
});

/// 所有 linter，按名称排序
pub fn all_linters() -> impl Iterator<Item = &'static dyn Linter> {
    REGISTRY.values().map(|l| l.as_ref())
}

pub fn get_linter(name: &str) -> Result<&'static dyn Linter> {
    REGISTRY.get(name).map(|l| l.as_ref()).ok_or_else(|| {
        CGSystemError::invalid_param(format!("No linter named \"{name}\" was found"))
            .with_description(format!("The linter \"{name}\" is not registered"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_sorted_by_name() {
        let names: Vec<_> = all_linters().map(|l| l.name()).collect();
        assert_eq!(
            names,
            vec![
                "Clang",
                "Eslint",
                "Flake8",
                "HTML Linter",
                "Haskell Linter",
                "Java Linter",
                "MixedWhitespace",
                "PHP Codesniffer",
                "PyFlakes",
                "Pycodestyle",
                "Pylint",
                "SCSSLint",
                "Shell Linter",
                "chktex",
                "gofmt",
                "golint",
            ]
        );
        assert!(get_linter("Shell Linter").unwrap().runs_externally());
        assert!(!get_linter("MixedWhitespace").unwrap().runs_externally());
        assert!(get_linter("Flake8").unwrap().runs_externally());
    }

    #[test]
    fn test_unknown_linter() {
        let err = get_linter("Lint9000").err().unwrap();
        assert_eq!(err.api_code(), "INVALID_PARAM");
    }

    #[test]
    fn test_parse_output() {
        let sep = "8b1f";
        let out = format!(
            "/tmp/x/top/a.py{sep}3{sep}W191{sep}indentation contains tabs\n\
             garbage line\n\
             /tmp/x/top/b.py{sep}notanumber{sep}E1{sep}msg\n\
             /tmp/x/top/c.py{sep}1{sep}E501{sep}line too long{sep}extra\n\
             /tmp/x/top/d.py{sep}10{sep}C0111{sep}Missing docstring\n"
        );
        let parsed = parse_output(&out, sep);
        assert_eq!(parsed.len(), 2);
        assert_eq!(
            parsed[0],
            Emitted {
                path: "/tmp/x/top/a.py".into(),
                line: 3,
                code: "W191".into(),
                msg: "indentation contains tabs".into(),
            }
        );
        assert_eq!(parsed[1].line, 10);
    }

    #[test]
    fn test_pylint_exit_codes() {
        assert!(pylint_crashed(Some(1)));
        assert!(pylint_crashed(Some(32)));
        assert!(pylint_crashed(None));
        assert!(!pylint_crashed(Some(0)));
        assert!(!pylint_crashed(Some(4)));
        assert!(!pylint_crashed(Some(30)));
    }

    #[test]
    fn test_findings_exit_codes() {
        assert!(!findings_tool_crashed(Some(0)));
        assert!(!findings_tool_crashed(Some(1)));
        assert!(findings_tool_crashed(Some(2)));
        assert!(findings_tool_crashed(Some(127)));
        assert!(findings_tool_crashed(None));
    }

    #[test]
    fn test_bear_command_line() {
        let dir = Path::new("/tmp/lint-xyz");
        let command = BearLinter::new("PyFlakes", "desc", "PyFlakesBear").command(dir, "SEP");
        let args: Vec<String> = command
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(command.as_std().get_program(), "coala");
        assert_eq!(
            args,
            vec![
                "--format",
                "{file}SEP{line}SEP{severity_str}SEP{message}",
                "--files",
                "/tmp/lint-xyz/**/*.*",
                "--bears",
                "PyFlakesBear",
                "-I",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let err = run_command(Command::new("surely-not-an-installed-linter"), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, CGSystemError::ExternalService(_)));
        assert!(err.message().contains("Could not start"));
    }

    #[tokio::test]
    async fn test_mixed_whitespace_does_not_run() {
        let dir = tempfile::tempdir().unwrap();
        let out = MixedWhitespace
            .run(dir.path(), "", Duration::from_secs(1))
            .await
            .unwrap();
        assert!(out.is_empty());
    }
}
