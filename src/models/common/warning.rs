//! 非致命警告
//!
//! 以 HTTP `Warning` 头返回，格式为 `NNN CodeGrade "text"`。

use actix_web::HttpResponseBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningCode {
    Deprecated = 0,
    GraderNotDone = 1,
    ConditionAlreadyMet = 2,
}

#[derive(Debug, Clone)]
pub struct Warning {
    pub code: WarningCode,
    pub text: String,
}

impl Warning {
    pub fn new<T: Into<String>>(code: WarningCode, text: T) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    /// 渲染为 Warning 头的值
    pub fn header_value(&self) -> String {
        format!(
            "{:03} CodeGrade \"{}\"",
            self.code as u16,
            self.text.replace('"', "\\\"")
        )
    }

    pub fn apply(&self, builder: &mut HttpResponseBuilder) {
        builder.insert_header(("Warning", self.header_value()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_value() {
        let warning = Warning::new(WarningCode::GraderNotDone, "You have no assigned work!");
        assert_eq!(
            warning.header_value(),
            "001 CodeGrade \"You have no assigned work!\""
        );
    }

    #[test]
    fn test_header_value_escapes_quotes() {
        let warning = Warning::new(WarningCode::Deprecated, "use \"x\"");
        assert_eq!(warning.header_value(), "000 CodeGrade \"use \\\"x\\\"\"");
    }
}
