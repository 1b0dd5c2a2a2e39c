//! 统一错误处理模块
//!
//! 使用宏自动生成错误类型。每个错误携带对外稳定的 API 代码（数字与名称）、
//! HTTP 状态码以及错误详情，直接实现 `ResponseError`，处理函数中可以用 `?` 返回。

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::{Map, Value};
use std::fmt;

/// 错误详情
#[derive(Debug, Clone, Default)]
pub struct ErrorDetail {
    /// 给用户看的信息
    pub message: String,
    /// 给开发者看的描述
    pub description: String,
    /// 附加字段，原样合并进响应体
    pub extra: Map<String, Value>,
    /// 覆盖默认状态码
    pub status: Option<u16>,
}

/// 定义错误类型的宏
///
/// 自动生成：
/// - enum 定义
/// - code() 方法 - 返回数字错误代码
/// - api_code() 方法 - 返回错误代码名称
/// - default_status() 方法 - 返回默认 HTTP 状态码
/// - 便捷构造函数
macro_rules! define_cgsystem_errors {
    ($(
        $variant:ident($code:literal, $api_name:literal, $status:ident)
    ),* $(,)?) => {
        #[derive(Debug, Clone)]
        pub enum CGSystemError {
            $($variant(Box<ErrorDetail>),)*
        }

        impl CGSystemError {
            /// 获取数字错误代码
            pub fn code(&self) -> u16 {
                match self {
                    $(CGSystemError::$variant(_) => $code,)*
                }
            }

            /// 获取错误代码名称
            pub fn api_code(&self) -> &'static str {
                match self {
                    $(CGSystemError::$variant(_) => $api_name,)*
                }
            }

            /// 获取默认 HTTP 状态码
            pub fn default_status(&self) -> StatusCode {
                match self {
                    $(CGSystemError::$variant(_) => StatusCode::$status,)*
                }
            }

            /// 获取错误详情
            pub fn detail(&self) -> &ErrorDetail {
                match self {
                    $(CGSystemError::$variant(detail) => detail,)*
                }
            }

            fn detail_mut(&mut self) -> &mut ErrorDetail {
                match self {
                    $(CGSystemError::$variant(detail) => detail,)*
                }
            }
        }

        // 生成便捷构造函数
        paste::paste! {
            impl CGSystemError {
                $(
                    pub fn [<$variant:snake>]<T: Into<String>>(msg: T) -> Self {
                        let message = msg.into();
                        CGSystemError::$variant(Box::new(ErrorDetail {
                            description: message.clone(),
                            message,
                            extra: Map::new(),
                            status: None,
                        }))
                    }
                )*
            }
        }
    };
}

define_cgsystem_errors! {
    IncorrectPermission(0, "INCORRECT_PERMISSION", FORBIDDEN),
    NotLoggedIn(1, "NOT_LOGGED_IN", UNAUTHORIZED),
    ObjectIdNotFound(2, "OBJECT_ID_NOT_FOUND", NOT_FOUND),
    ObjectWrongType(3, "OBJECT_WRONG_TYPE", BAD_REQUEST),
    MissingRequiredParam(4, "MISSING_REQUIRED_PARAM", BAD_REQUEST),
    InvalidParam(5, "INVALID_PARAM", BAD_REQUEST),
    RequestTooLarge(6, "REQUEST_TOO_LARGE", BAD_REQUEST),
    LoginFailure(7, "LOGIN_FAILURE", BAD_REQUEST),
    InactiveUser(8, "INACTIVE_USER", FORBIDDEN),
    InvalidUrl(9, "INVALID_URL", BAD_REQUEST),
    ObjectNotFound(10, "OBJECT_NOT_FOUND", NOT_FOUND),
    BlockedAssignment(11, "BLOCKED_ASSIGNMENT", BAD_REQUEST),
    InvalidCredentials(12, "INVALID_CREDENTIALS", FORBIDDEN),
    InvalidState(13, "INVALID_STATE", BAD_REQUEST),
    InvalidOauthRequest(14, "INVALID_OAUTH_REQUEST", BAD_REQUEST),
    DisabledFeature(15, "DISABLED_FEATURE", BAD_REQUEST),
    UnknownError(16, "UNKNOWN_ERROR", INTERNAL_SERVER_ERROR),
    InvalidFileInArchive(17, "INVALID_FILE_IN_ARCHIVE", BAD_REQUEST),
    NoFilesSubmitted(18, "NO_FILES_SUBMITTED", BAD_REQUEST),
    RateLimitExceeded(19, "RATE_LIMIT_EXCEEDED", TOO_MANY_REQUESTS),
    ObjectAlreadyExists(20, "OBJECT_ALREADY_EXISTS", BAD_REQUEST),
    InvalidArchive(21, "INVALID_ARCHIVE", BAD_REQUEST),

    // 内部错误，对外统一表现为 UNKNOWN_ERROR
    CacheConnection(16, "UNKNOWN_ERROR", INTERNAL_SERVER_ERROR),
    CachePluginNotFound(16, "UNKNOWN_ERROR", INTERNAL_SERVER_ERROR),
    DatabaseConfig(16, "UNKNOWN_ERROR", INTERNAL_SERVER_ERROR),
    DatabaseConnection(16, "UNKNOWN_ERROR", INTERNAL_SERVER_ERROR),
    DatabaseOperation(16, "UNKNOWN_ERROR", INTERNAL_SERVER_ERROR),
    FileOperation(16, "UNKNOWN_ERROR", INTERNAL_SERVER_ERROR),
    Serialization(16, "UNKNOWN_ERROR", INTERNAL_SERVER_ERROR),
    DateParse(16, "UNKNOWN_ERROR", INTERNAL_SERVER_ERROR),
    ExternalService(16, "UNKNOWN_ERROR", INTERNAL_SERVER_ERROR),
}

impl CGSystemError {
    /// 获取错误信息
    pub fn message(&self) -> &str {
        &self.detail().message
    }

    /// 获取错误描述
    pub fn description(&self) -> &str {
        &self.detail().description
    }

    /// 设置开发者描述
    pub fn with_description<T: Into<String>>(mut self, description: T) -> Self {
        self.detail_mut().description = description.into();
        self
    }

    /// 附加字段
    pub fn with_extra<T: Into<Value>>(mut self, key: &str, value: T) -> Self {
        self.detail_mut().extra.insert(key.to_string(), value.into());
        self
    }

    /// 覆盖状态码
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.detail_mut().status = Some(status.as_u16());
        self
    }

    /// 是否为内部错误
    pub fn is_internal(&self) -> bool {
        self.code() == 16
    }

    /// 格式化为彩色输出（用于开发环境）
    #[cfg(debug_assertions)]
    pub fn format_colored(&self) -> String {
        format!(
            "\x1b[1;31m[ERROR]\x1b[0m \x1b[33m{}\x1b[0m \x1b[31m{}\x1b[0m\n  {}",
            self.code(),
            self.api_code(),
            self.description()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.api_code(), self.description())
    }

    /// 构造响应体
    pub fn to_envelope(&self) -> Value {
        let detail = self.detail();
        let mut body = Map::new();
        for (key, value) in &detail.extra {
            body.insert(key.clone(), value.clone());
        }
        body.insert("message".into(), Value::from(detail.message.clone()));
        body.insert("description".into(), Value::from(detail.description.clone()));
        body.insert("code".into(), Value::from(self.api_code()));
        body.insert("status_code".into(), Value::from(self.status_code().as_u16()));
        Value::Object(body)
    }
}

impl fmt::Display for CGSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CGSystemError {}

impl ResponseError for CGSystemError {
    fn status_code(&self) -> StatusCode {
        self.detail()
            .status
            .and_then(|s| StatusCode::from_u16(s).ok())
            .unwrap_or_else(|| self.default_status())
    }

    fn error_response(&self) -> HttpResponse {
        if self.is_internal() {
            tracing::error!("{}", self.format_simple());
        }
        HttpResponse::build(self.status_code()).json(self.to_envelope())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for CGSystemError {
    fn from(err: sea_orm::DbErr) -> Self {
        CGSystemError::database_operation(err.to_string())
    }
}

impl From<std::io::Error> for CGSystemError {
    fn from(err: std::io::Error) -> Self {
        CGSystemError::file_operation(err.to_string())
    }
}

impl From<serde_json::Error> for CGSystemError {
    fn from(err: serde_json::Error) -> Self {
        CGSystemError::serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for CGSystemError {
    fn from(err: chrono::ParseError) -> Self {
        CGSystemError::date_parse(err.to_string())
    }
}

impl From<zip::result::ZipError> for CGSystemError {
    fn from(err: zip::result::ZipError) -> Self {
        CGSystemError::invalid_archive("The given archive could not be extracted")
            .with_description(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CGSystemError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CGSystemError::incorrect_permission("x").code(), 0);
        assert_eq!(CGSystemError::invalid_param("x").code(), 5);
        assert_eq!(CGSystemError::invalid_archive("x").code(), 21);
        assert_eq!(CGSystemError::database_operation("x").code(), 16);
    }

    #[test]
    fn test_api_code_names() {
        assert_eq!(
            CGSystemError::no_files_submitted("x").api_code(),
            "NO_FILES_SUBMITTED"
        );
        assert_eq!(
            CGSystemError::file_operation("x").api_code(),
            "UNKNOWN_ERROR"
        );
    }

    #[test]
    fn test_status_override() {
        let err = CGSystemError::invalid_state("running");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let err = err.with_status(StatusCode::CONFLICT);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_envelope_contains_extra() {
        let err = CGSystemError::invalid_file_in_archive("ignored files")
            .with_description("matched the ignore file")
            .with_extra("invalid_files", serde_json::json!([["other/g", "*"]]));
        let body = err.to_envelope();
        assert_eq!(body["code"], "INVALID_FILE_IN_ARCHIVE");
        assert_eq!(body["status_code"], 400);
        assert_eq!(body["message"], "ignored files");
        assert_eq!(body["description"], "matched the ignore file");
        assert_eq!(body["invalid_files"][0][1], "*");
    }

    #[test]
    fn test_format_simple() {
        let formatted = CGSystemError::invalid_url("bad url").format_simple();
        assert!(formatted.contains("INVALID_URL"));
        assert!(formatted.contains("bad url"));
    }
}
