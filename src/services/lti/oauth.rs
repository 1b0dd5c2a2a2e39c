//! OAuth 1.0a HMAC-SHA1 签名
//!
//! 启动请求由 LMS 签名后发来，成绩回传由本系统签名后发往 LMS。

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use moka::future::Cache;
use once_cell::sync::Lazy;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Url;
use sha1::{Digest, Sha1};
use std::time::Duration;

use crate::errors::{CGSystemError, Result};

type HmacSha1 = Hmac<Sha1>;

/// `oauth_timestamp` 与服务器时间允许的最大偏差（秒）
pub const TIMESTAMP_WINDOW: i64 = 300;

/// 已使用过的启动 nonce，窗口过后自然过期
pub static LAUNCH_NONCES: Lazy<NonceCache> =
    Lazy::new(|| NonceCache::new(Duration::from_secs(TIMESTAMP_WINDOW as u64)));

// RFC 5849 3.6: 只保留 ALPHA / DIGIT / "-" / "." / "_" / "~"
const OAUTH_RESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_RESERVED).to_string()
}

/// 规范化的请求地址：小写协议与主机，去掉默认端口、查询串和片段
pub fn normalize_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url)
        .map_err(|e| CGSystemError::invalid_param(format!("Invalid url {url}: {e}")))?;
    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    let mut normalized = format!("{}://{}", parsed.scheme(), host);
    if let Some(port) = parsed.port() {
        normalized.push_str(&format!(":{port}"));
    }
    normalized.push_str(parsed.path());
    Ok(normalized)
}

/// 签名基串 METHOD&url&params
pub fn base_string(method: &str, url: &str, params: &[(String, String)]) -> Result<String> {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .filter(|(key, _)| key != "oauth_signature")
        .map(|(key, value)| (encode(key), encode(value)))
        .collect();
    pairs.sort();
    let joined = pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    Ok(format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(&normalize_url(url)?),
        encode(&joined)
    ))
}

pub trait OAuthSigner: Send + Sync {
    fn sign(&self, base: &str, secret: &str) -> Result<String>;

    fn verify(&self, base: &str, secret: &str, signature: &str) -> bool;
}

/// 不使用 token secret，签名密钥为 `pct(secret)&`
pub struct HmacSha1Signer;

impl HmacSha1Signer {
    fn mac(base: &str, secret: &str) -> Result<HmacSha1> {
        let key = format!("{}&", encode(secret));
        let mut mac = <HmacSha1 as Mac>::new_from_slice(key.as_bytes())
            .map_err(|e| CGSystemError::unknown_error(format!("HMAC key error: {e}")))?;
        mac.update(base.as_bytes());
        Ok(mac)
    }
}

impl OAuthSigner for HmacSha1Signer {
    fn sign(&self, base: &str, secret: &str) -> Result<String> {
        Ok(STANDARD.encode(Self::mac(base, secret)?.finalize().into_bytes()))
    }

    fn verify(&self, base: &str, secret: &str, signature: &str) -> bool {
        match (STANDARD.decode(signature), Self::mac(base, secret)) {
            (Ok(raw), Ok(mac)) => mac.verify_slice(&raw).is_ok(),
            _ => false,
        }
    }
}

/// 校验一次带签名的请求，参数需包含 `oauth_signature`
pub fn verify_request(
    signer: &dyn OAuthSigner,
    method: &str,
    url: &str,
    params: &[(String, String)],
    secret: &str,
) -> Result<()> {
    let signature = params
        .iter()
        .find(|(key, _)| key == "oauth_signature")
        .map(|(_, value)| value.as_str())
        .ok_or_else(invalid_oauth)?;
    if params
        .iter()
        .find(|(key, _)| key == "oauth_signature_method")
        .is_some_and(|(_, value)| value != "HMAC-SHA1")
    {
        return Err(invalid_oauth());
    }

    let base = base_string(method, url, params)?;
    if signer.verify(&base, secret, signature) {
        Ok(())
    } else {
        Err(invalid_oauth())
    }
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// 时间戳必须存在且在窗口内
pub fn check_timestamp(params: &[(String, String)], now: i64) -> Result<i64> {
    let timestamp = param(params, "oauth_timestamp")
        .and_then(|value| value.parse::<i64>().ok())
        .ok_or_else(invalid_oauth)?;
    if (now - timestamp).abs() > TIMESTAMP_WINDOW {
        return Err(invalid_oauth().with_description(format!(
            "The oauth timestamp {timestamp} is more than {TIMESTAMP_WINDOW} seconds away from the server time"
        )));
    }
    Ok(timestamp)
}

/// (consumer key, nonce, timestamp) 只能使用一次
pub struct NonceCache {
    seen: Cache<String, ()>,
}

impl NonceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(100_000)
                .build(),
        }
    }

    /// 第一次出现时返回 true
    pub async fn remember(&self, consumer_key: &str, nonce: &str, timestamp: i64) -> bool {
        self.seen
            .entry(format!("{consumer_key}:{timestamp}:{nonce}"))
            .or_insert(())
            .await
            .is_fresh()
    }
}

/// 启动请求：签名、时间窗口和 nonce 都要通过
pub async fn verify_launch(
    signer: &dyn OAuthSigner,
    url: &str,
    params: &[(String, String)],
    consumer_key: &str,
    secret: &str,
    nonces: &NonceCache,
    now: i64,
) -> Result<()> {
    verify_request(signer, "POST", url, params, secret)?;
    let timestamp = check_timestamp(params, now)?;
    let nonce = param(params, "oauth_nonce")
        .filter(|nonce| !nonce.is_empty())
        .ok_or_else(invalid_oauth)?;
    if !nonces.remember(consumer_key, nonce, timestamp).await {
        return Err(invalid_oauth().with_description("The oauth nonce of this request was already used"));
    }
    Ok(())
}

pub fn invalid_oauth() -> CGSystemError {
    CGSystemError::invalid_oauth_request("No valid oauth request could be found.")
        .with_description("The given request is not a valid oauth request.")
}

/// 带 body hash 的请求头，用于向 LMS 发送 XML
pub fn body_authorization(
    signer: &dyn OAuthSigner,
    consumer_key: &str,
    secret: &str,
    url: &str,
    body: &str,
    nonce: &str,
    timestamp: i64,
) -> Result<String> {
    let body_hash = STANDARD.encode(Sha1::digest(body.as_bytes()));
    let mut oauth = vec![
        ("oauth_body_hash".to_string(), body_hash),
        ("oauth_consumer_key".to_string(), consumer_key.to_string()),
        ("oauth_nonce".to_string(), nonce.to_string()),
        ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
        ("oauth_timestamp".to_string(), timestamp.to_string()),
        ("oauth_version".to_string(), "1.0".to_string()),
    ];

    let mut params = oauth.clone();
    if let Ok(parsed) = Url::parse(url) {
        params.extend(parsed.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())));
    }
    let signature = signer.sign(&base_string("POST", url, &params)?, secret)?;
    oauth.push(("oauth_signature".to_string(), signature));

    let fields = oauth
        .iter()
        .map(|(key, value)| format!("{}=\"{}\"", key, encode(value)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {fields}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_encode_reserved() {
        assert_eq!(encode("a b+c/~d"), "a%20b%2Bc%2F~d");
        assert_eq!(encode("é"), "%C3%A9");
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("http://Example.com:80/lti/launch?x=1#frag").unwrap(),
            "http://example.com/lti/launch"
        );
        assert_eq!(
            normalize_url("https://example.com:8443/a").unwrap(),
            "https://example.com:8443/a"
        );
    }

    #[test]
    fn test_base_string_sorted_and_encoded() {
        let base = base_string(
            "post",
            "http://Example.com:80/lti/launch",
            &params(&[("b", "2 3"), ("a", "1"), ("oauth_signature", "zzz")]),
        )
        .unwrap();
        assert_eq!(
            base,
            "POST&http%3A%2F%2Fexample.com%2Flti%2Flaunch&a%3D1%26b%3D2%25203"
        );
    }

    #[test]
    fn test_sign_and_verify() {
        let url = "https://cg.example.com/api/v1/lti/launch/1";
        let mut request = params(&[
            ("oauth_consumer_key", "canvas"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("user_id", "42"),
            ("roles", "Instructor"),
        ]);
        let base = base_string("POST", url, &request).unwrap();
        let signature = HmacSha1Signer.sign(&base, "secret").unwrap();
        request.push(("oauth_signature".into(), signature));

        assert!(verify_request(&HmacSha1Signer, "POST", url, &request, "secret").is_ok());
        let err = verify_request(&HmacSha1Signer, "POST", url, &request, "other").unwrap_err();
        assert_eq!(err.api_code(), "INVALID_OAUTH_REQUEST");

        request[2].1 = "43".into();
        assert!(verify_request(&HmacSha1Signer, "POST", url, &request, "secret").is_err());
    }

    fn signed_launch(url: &str, timestamp: i64, nonce: &str) -> Vec<(String, String)> {
        let mut request = params(&[
            ("oauth_consumer_key", "canvas"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", &timestamp.to_string()),
            ("oauth_nonce", nonce),
            ("user_id", "42"),
        ]);
        let base = base_string("POST", url, &request).unwrap();
        request.push(("oauth_signature".into(), HmacSha1Signer.sign(&base, "secret").unwrap()));
        request
    }

    #[tokio::test]
    async fn test_launch_timestamp_window() {
        let url = "https://cg.example.com/api/v1/lti/launch/1";
        let now = 1_700_000_000;
        let nonces = NonceCache::new(Duration::from_secs(300));

        let old = signed_launch(url, 1_000_000_000, "a");
        let err = verify_launch(&HmacSha1Signer, url, &old, "canvas", "secret", &nonces, now)
            .await
            .unwrap_err();
        assert_eq!(err.api_code(), "INVALID_OAUTH_REQUEST");

        let future = signed_launch(url, now + TIMESTAMP_WINDOW + 1, "b");
        assert!(
            verify_launch(&HmacSha1Signer, url, &future, "canvas", "secret", &nonces, now)
                .await
                .is_err()
        );

        let edge = signed_launch(url, now - TIMESTAMP_WINDOW, "c");
        assert!(
            verify_launch(&HmacSha1Signer, url, &edge, "canvas", "secret", &nonces, now)
                .await
                .is_ok()
        );

        let mut missing = params(&[("oauth_nonce", "d")]);
        let base = base_string("POST", url, &missing).unwrap();
        missing.push(("oauth_signature".into(), HmacSha1Signer.sign(&base, "secret").unwrap()));
        assert!(
            verify_launch(&HmacSha1Signer, url, &missing, "canvas", "secret", &nonces, now)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_launch_nonce_used_once() {
        let url = "https://cg.example.com/api/v1/lti/launch/1";
        let now = 1_700_000_000;
        let nonces = NonceCache::new(Duration::from_secs(300));
        let request = signed_launch(url, now, "same");

        assert!(
            verify_launch(&HmacSha1Signer, url, &request, "canvas", "secret", &nonces, now)
                .await
                .is_ok()
        );
        let err = verify_launch(&HmacSha1Signer, url, &request, "canvas", "secret", &nonces, now + 1)
            .await
            .unwrap_err();
        assert_eq!(err.api_code(), "INVALID_OAUTH_REQUEST");

        // 同一 nonce 在另一个 consumer 下互不影响
        assert!(nonces.remember("moodle", "same", now).await);
    }

    #[test]
    fn test_missing_signature_rejected() {
        let request = params(&[("oauth_consumer_key", "canvas")]);
        assert!(verify_request(&HmacSha1Signer, "POST", "http://x/", &request, "s").is_err());
    }

    #[test]
    fn test_body_authorization_header() {
        let header = body_authorization(
            &HmacSha1Signer,
            "canvas",
            "secret",
            "https://lms.example.com/outcomes?course=1",
            "<xml/>",
            "nonce",
            1_700_000_000,
        )
        .unwrap();
        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_consumer_key=\"canvas\""));
        assert!(header.contains("oauth_timestamp=\"1700000000\""));
        assert!(header.contains("oauth_signature=\""));
        assert!(header.contains("oauth_body_hash=\""));
    }
}
