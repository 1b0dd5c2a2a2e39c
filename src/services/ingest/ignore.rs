//! 忽略规则
//!
//! 规则写法与 `.gitignore` 基本一致，只在提交的根目录生效：
//!
//! - 空行与 `#` 开头的行被跳过
//! - 行尾空格被去掉，除非用 `\ ` 转义
//! - `!` 开头表示反选，后面的反选可以重新包含前面排除的路径
//! - `/` 结尾的规则只匹配目录
//! - 不含 `/` 的规则在任意深度匹配，否则相对根目录锚定
//!
//! 判断路径 `a/b/c` 时依次检查 `a/`、`a/b/`、`a/b/c`，在第一个有匹配的层级上由最后一条匹配规则决定。

use regex::Regex;
use std::str::FromStr;

use crate::errors::{CGSystemError, Result};

/// 上传时对被忽略文件的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IgnoreHandling {
    /// 保留所有文件
    #[default]
    Keep,
    /// 删除被忽略的文件
    Delete,
    /// 拒绝整个上传
    Error,
}

impl FromStr for IgnoreHandling {
    type Err = CGSystemError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ignore" | "keep" => Ok(IgnoreHandling::Keep),
            "delete" => Ok(IgnoreHandling::Delete),
            "error" => Ok(IgnoreHandling::Error),
            other => Err(CGSystemError::invalid_param(
                "The given value for ignored_files is not valid",
            )
            .with_description(format!("{other} is not one of error, ignore or delete"))),
        }
    }
}

#[derive(Debug)]
struct Pattern {
    regex: Regex,
    is_exclude: bool,
    original: String,
}

impl Pattern {
    fn new(pattern: &str, original: &str) -> Result<Self> {
        let (is_exclude, body) = match pattern.strip_prefix('!') {
            Some(rest) => (false, rest),
            None => (true, pattern.strip_prefix('\\').unwrap_or(pattern)),
        };
        let regex = Regex::new(&translate(body)).map_err(|e| {
            CGSystemError::invalid_param("The ignore file contains an invalid pattern")
                .with_description(format!("Pattern `{original}` could not be compiled: {e}"))
        })?;

        Ok(Self {
            regex,
            is_exclude,
            original: original.to_string(),
        })
    }
}

/// 编译后的忽略规则集合
#[derive(Debug, Default)]
pub struct IgnoreFilter {
    patterns: Vec<Pattern>,
}

impl IgnoreFilter {
    pub fn new(text: &str) -> Result<Self> {
        let patterns = read_patterns(text)
            .into_iter()
            .map(|(pattern, original)| Pattern::new(&pattern, &original))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    fn find_matching(&self, path: &str) -> Vec<&Pattern> {
        let parts: Vec<&str> = path.split('/').collect();
        for i in 1..=parts.len() {
            let mut relpath = parts[..i].join("/");
            if i < parts.len() {
                relpath.push('/');
            }
            let matches: Vec<&Pattern> = self
                .patterns
                .iter()
                .filter(|p| p.regex.is_match(&relpath))
                .collect();
            if !matches.is_empty() {
                return matches;
            }
        }
        Vec::new()
    }

    /// 路径被规则提到时返回 (是否排除, 原始规则行)
    pub fn is_ignored(&self, path: &str) -> Option<(bool, &str)> {
        self.find_matching(path)
            .last()
            .map(|p| (p.is_exclude, p.original.as_str()))
    }

    /// 路径被排除时返回决定它的规则行
    pub fn ignored_by(&self, path: &str) -> Option<&str> {
        match self.is_ignored(path) {
            Some((true, line)) => Some(line),
            _ => None,
        }
    }
}

/// 读取规则行，返回 (处理后的规则, 原始行)
fn read_patterns(text: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in text.lines() {
        let original = raw.trim_end_matches(['\r', '\n']);
        if original.is_empty() || original.starts_with('#') {
            continue;
        }

        let mut line = original.to_string();
        while line.ends_with(' ') && !line.ends_with("\\ ") {
            line.pop();
        }
        let line = line.replace("\\ ", " ");
        if line.is_empty() {
            continue;
        }
        out.push((line, original.to_string()));
    }
    out
}

fn translate_segment(segment: &str) -> String {
    if segment == "*" {
        return "[^/]+".to_string();
    }

    let chars: Vec<char> = segment.chars().collect();
    let n = chars.len();
    let mut res = String::new();
    let mut i = 0;
    while i < n {
        let c = chars[i];
        i += 1;
        match c {
            '*' => res.push_str("[^/]*"),
            '?' => res.push_str("[^/]"),
            '\\' if i < n => {
                res.push_str(&regex::escape(&chars[i].to_string()));
                i += 1;
            }
            '[' => {
                let mut j = i;
                if j < n && chars[j] == '!' {
                    j += 1;
                }
                if j < n && chars[j] == ']' {
                    j += 1;
                }
                while j < n && chars[j] != ']' {
                    j += 1;
                }
                if j >= n {
                    res.push_str("\\[");
                } else {
                    let mut stuff: String = chars[i..j].iter().collect();
                    i = j + 1;
                    if let Some(rest) = stuff.strip_prefix('!') {
                        stuff = format!("^{rest}");
                    }
                    let stuff = stuff
                        .replace('\\', "\\\\")
                        .replace('[', "\\[")
                        .replace('&', "\\&")
                        .replace('~', "\\~");
                    res.push('[');
                    res.push_str(&stuff);
                    res.push(']');
                }
            }
            other => res.push_str(&regex::escape(&other.to_string())),
        }
    }
    res
}

/// 把一条规则翻译成正则
fn translate(pattern: &str) -> String {
    let mut res = String::from("^(?s)");

    let mut head = pattern.chars();
    head.next_back();
    if !head.as_str().contains('/') {
        res.push_str("(.*/)?");
    }

    let mut pat = pattern;
    if let Some(rest) = pat.strip_prefix("**/") {
        pat = rest;
        res.push_str("(.*/)?");
    }
    let pat = pat.strip_prefix('/').unwrap_or(pat);

    for (i, segment) in pat.split('/').enumerate() {
        if segment == "**" {
            res.push_str("(/.*)?");
        } else {
            if i > 0 {
                res.push('/');
            }
            res.push_str(&translate_segment(segment));
        }
    }

    if !pat.ends_with('/') {
        res.push_str("/?");
    }
    res.push_str("\\z");
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negated_directory() {
        let filter = IgnoreFilter::new("*\n!dir/").unwrap();
        assert_eq!(filter.ignored_by("dir/f"), None);
        assert_eq!(filter.ignored_by("other/g"), Some("*"));
        assert_eq!(filter.ignored_by("other/"), Some("*"));
    }

    #[test]
    fn test_last_match_wins() {
        let filter = IgnoreFilter::new("*.pyc\n!keep.pyc").unwrap();
        assert_eq!(filter.ignored_by("a/b.pyc"), Some("*.pyc"));
        assert_eq!(filter.ignored_by("keep.pyc"), None);

        let reversed = IgnoreFilter::new("!keep.pyc\n*.pyc").unwrap();
        assert_eq!(reversed.ignored_by("keep.pyc"), Some("*.pyc"));
    }

    #[test]
    fn test_unmatched_is_included() {
        let filter = IgnoreFilter::new("# comment\n\n*.o").unwrap();
        assert!(filter.is_ignored("main.c").is_none());
        assert!(IgnoreFilter::empty().is_ignored("x").is_none());
    }

    #[test]
    fn test_anchored_patterns() {
        let filter = IgnoreFilter::new("/build\nsrc/*.tmp").unwrap();
        assert!(filter.ignored_by("build").is_some());
        assert!(filter.ignored_by("build/out.o").is_some());
        assert!(filter.ignored_by("a/build").is_none());
        assert!(filter.ignored_by("src/x.tmp").is_some());
        assert!(filter.ignored_by("lib/src/x.tmp").is_none());
    }

    #[test]
    fn test_directory_only_pattern() {
        let filter = IgnoreFilter::new("cache/").unwrap();
        assert!(filter.ignored_by("cache").is_none());
        assert!(filter.ignored_by("cache/").is_some());
        assert!(filter.ignored_by("x/cache/data").is_some());
    }

    #[test]
    fn test_double_star() {
        let filter = IgnoreFilter::new("**/logs\na/**/b\nout/**").unwrap();
        assert!(filter.ignored_by("logs").is_some());
        assert!(filter.ignored_by("deep/logs").is_some());
        assert!(filter.ignored_by("a/b").is_some());
        assert!(filter.ignored_by("a/x/y/b").is_some());
        assert!(filter.ignored_by("out/any/thing").is_some());
    }

    #[test]
    fn test_wildcards_and_classes() {
        let filter = IgnoreFilter::new("file?.txt\n[ab].c\n[!x]y.h").unwrap();
        assert!(filter.ignored_by("file1.txt").is_some());
        assert!(filter.ignored_by("file12.txt").is_none());
        assert!(filter.ignored_by("a.c").is_some());
        assert!(filter.ignored_by("c.c").is_none());
        assert!(filter.ignored_by("zy.h").is_some());
        assert!(filter.ignored_by("xy.h").is_none());
    }

    #[test]
    fn test_escapes() {
        let filter = IgnoreFilter::new("\\!important\n\\#hash\nspace\\ \nunclosed[").unwrap();
        assert!(filter.ignored_by("!important").is_some());
        assert!(filter.ignored_by("#hash").is_some());
        assert!(filter.ignored_by("space ").is_some());
        assert!(filter.ignored_by("unclosed[").is_some());
    }

    #[test]
    fn test_trailing_whitespace_stripped() {
        let filter = IgnoreFilter::new("*.log   ").unwrap();
        assert_eq!(filter.ignored_by("x.log"), Some("*.log   "));
    }

    #[test]
    fn test_handling_parse() {
        assert_eq!("error".parse::<IgnoreHandling>().unwrap(), IgnoreHandling::Error);
        assert_eq!("ignore".parse::<IgnoreHandling>().unwrap(), IgnoreHandling::Keep);
        assert_eq!("delete".parse::<IgnoreHandling>().unwrap(), IgnoreHandling::Delete);
        assert!("drop".parse::<IgnoreHandling>().is_err());
    }
}
