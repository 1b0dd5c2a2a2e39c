//! 路径参数提取器
//!
//! 非法的 id 直接返回 INVALID_PARAM 错误体，而不是 actix 默认的 404 文本。

use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::{Ready, ready};

use crate::errors::{CGSystemError, Result};

/// 读取命名路径参数并解析为 i64
pub fn path_i64(req: &HttpRequest, name: &str) -> Result<i64> {
    let raw = req.match_info().get(name).ok_or_else(|| {
        CGSystemError::missing_required_param(format!("The path parameter `{name}` is missing"))
    })?;
    raw.parse::<i64>().map_err(|_| {
        CGSystemError::invalid_param(format!("The given {name} is not a valid id"))
            .with_description(format!("`{raw}` is not an integer"))
    })
}

/// 路径中的 `{id}`
#[derive(Debug, Clone, Copy)]
pub struct SafeIDI64(pub i64);

impl FromRequest for SafeIDI64 {
    type Error = CGSystemError;
    type Future = Ready<Result<Self>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(path_i64(req, "id").map(SafeIDI64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_path_i64() {
        let req = TestRequest::default()
            .param("id", "42")
            .param("line", "x")
            .to_http_request();
        assert_eq!(path_i64(&req, "id").unwrap(), 42);
        assert_eq!(path_i64(&req, "line").unwrap_err().api_code(), "INVALID_PARAM");
        assert_eq!(
            path_i64(&req, "other").unwrap_err().api_code(),
            "MISSING_REQUIRED_PARAM"
        );
    }
}
