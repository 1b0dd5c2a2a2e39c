//! 请求参数解析失败时的统一响应

use actix_web::{HttpRequest, error};

use crate::errors::CGSystemError;

/// JSON 请求体解析错误
pub fn json_error_handler(err: error::JsonPayloadError, _req: &HttpRequest) -> error::Error {
    let converted = match &err {
        error::JsonPayloadError::OverflowKnownLength { .. } | error::JsonPayloadError::Overflow { .. } => {
            CGSystemError::request_too_large("Request is bigger than maximum upload size")
        }
        error::JsonPayloadError::ContentType => {
            CGSystemError::missing_required_param("Did not find a JSON request body")
        }
        error::JsonPayloadError::Deserialize(e) if e.is_data() && e.to_string().starts_with("missing field") => {
            CGSystemError::missing_required_param("请求缺少必要字段").with_description(e.to_string())
        }
        _ => CGSystemError::invalid_param("请求体格式错误").with_description(err.to_string()),
    };
    converted.into()
}

/// 查询参数解析错误
pub fn query_error_handler(err: error::QueryPayloadError, _req: &HttpRequest) -> error::Error {
    let text = err.to_string();
    let converted = if text.contains("missing field") {
        CGSystemError::missing_required_param("查询参数缺失").with_description(text)
    } else {
        CGSystemError::invalid_param("查询参数格式错误").with_description(text)
    };
    converted.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;
    use actix_web::http::StatusCode;
    use actix_web::test::TestRequest;

    #[test]
    fn test_content_type_is_missing_param() {
        let req = TestRequest::default().to_http_request();
        let err = json_error_handler(error::JsonPayloadError::ContentType, &req);
        let resp = err.as_response_error().error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
