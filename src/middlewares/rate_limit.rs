/*!
 * 速率限制中间件
 *
 * 固定窗口计数：窗口从第一次请求开始，到期后计数清零。
 * 已认证的请求按用户 ID 计数，否则按客户端 IP。
 *
 * ```rust,ignore
 * web::resource("/")
 *     .wrap(RateLimit::search())  // 1次/秒/用户
 *     .wrap(RequireJWT)
 *     .route(web::get().to(search_users))
 * ```
 *
 * 注意 actix 中后 `wrap` 的中间件先执行，按用户限流时 `RequireJWT` 需要放在外层。
 */

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{HeaderName, HeaderValue},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use moka::Expiry;
use moka::future::Cache;
use once_cell::sync::Lazy;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::errors::CGSystemError;

#[derive(Clone, Copy, Debug)]
struct WindowCounter {
    count: u32,
    started: Instant,
    window: Duration,
}

/// 窗口从创建时开始计时，更新计数不延长窗口
struct FixedWindow;

impl Expiry<String, WindowCounter> for FixedWindow {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &WindowCounter,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.window)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        _value: &WindowCounter,
        _updated_at: Instant,
        duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        duration_until_expiry
    }
}

/// 全局速率限制缓存
/// 键: 前缀:标识，值: 窗口内计数
static RATE_LIMIT_CACHE: Lazy<Cache<String, WindowCounter>> = Lazy::new(|| {
    Cache::builder()
        .expire_after(FixedWindow)
        .max_capacity(100_000)
        .build()
});

/// 速率限制配置
#[derive(Clone)]
pub struct RateLimit {
    /// 时间窗口内允许的最大请求数
    max_requests: u32,
    /// 时间窗口（秒）
    window_secs: u64,
    /// 限制键前缀（用于区分不同端点）
    key_prefix: String,
}

impl RateLimit {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
            key_prefix: String::new(),
        }
    }

    /// 设置限制键前缀
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.key_prefix = prefix.to_string();
        self
    }

    /// 登录端点限制：5次/分钟/IP
    pub fn login() -> Self {
        Self::new(5, 60).with_prefix("login")
    }

    /// 用户搜索限制：1次/秒/用户
    pub fn search() -> Self {
        Self::new(1, 1).with_prefix("search")
    }

    /// 注册端点限制：3次/分钟/IP
    pub fn register() -> Self {
        Self::new(3, 60).with_prefix("register")
    }
}

/// 从请求中提取客户端 IP
///
/// 部署在反向代理后面时需要代理正确设置 X-Forwarded-For / X-Real-IP。
fn extract_client_ip(req: &ServiceRequest) -> String {
    let connection_ip = req
        .connection_info()
        .realip_remote_addr()
        .map(|s| s.to_string());

    if let Some(ref ip) = connection_ip
        && is_valid_ip(ip)
    {
        return ip.clone();
    }

    // 只取第一个 IP（最接近客户端的）
    if let Some(forwarded) = req.headers().get("X-Forwarded-For")
        && let Ok(value) = forwarded.to_str()
        && let Some(ip) = value.split(',').next()
    {
        let ip = ip.trim();
        if is_valid_ip(ip) {
            return ip.to_string();
        }
    }

    if let Some(real_ip) = req.headers().get("X-Real-IP")
        && let Ok(ip) = real_ip.to_str()
    {
        let ip = ip.trim();
        if is_valid_ip(ip) {
            return ip.to_string();
        }
    }

    connection_ip.unwrap_or_else(|| "unknown".to_string())
}

fn is_valid_ip(ip: &str) -> bool {
    use std::net::IpAddr;
    ip.parse::<IpAddr>().is_ok()
}

fn extract_user_id(req: &ServiceRequest) -> Option<i64> {
    use crate::models::users::entities::User;
    req.extensions().get::<User>().map(|user| user.id)
}

fn rate_limit_key(prefix: &str, user_id: Option<i64>, ip: impl FnOnce() -> String) -> String {
    let identifier = user_id
        .map(|id| format!("user:{id}"))
        .unwrap_or_else(|| format!("ip:{}", ip()));
    if prefix.is_empty() {
        identifier
    } else {
        format!("{prefix}:{identifier}")
    }
}

/// 计数并返回剩余次数；超限时返回需要等待的秒数
async fn hit(key: &str, max_requests: u32, window: Duration) -> Result<u32, u64> {
    let now = Instant::now();
    let current = RATE_LIMIT_CACHE
        .get(key)
        .await
        .filter(|counter| now.duration_since(counter.started) < counter.window);

    match current {
        Some(counter) if counter.count >= max_requests => {
            let left = counter.window.saturating_sub(now.duration_since(counter.started));
            Err(left.as_secs().max(1))
        }
        Some(counter) => {
            let count = counter.count + 1;
            RATE_LIMIT_CACHE
                .insert(key.to_string(), WindowCounter { count, ..counter })
                .await;
            Ok(max_requests.saturating_sub(count))
        }
        None => {
            RATE_LIMIT_CACHE
                .insert(
                    key.to_string(),
                    WindowCounter {
                        count: 1,
                        started: now,
                        window,
                    },
                )
                .await;
            Ok(max_requests.saturating_sub(1))
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service: Rc::new(service),
            max_requests: self.max_requests,
            window_secs: self.window_secs,
            key_prefix: self.key_prefix.clone(),
        }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
    max_requests: u32,
    window_secs: u64,
    key_prefix: String,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let max_requests = self.max_requests;
        let window = Duration::from_secs(self.window_secs);
        let key_prefix = self.key_prefix.clone();

        Box::pin(async move {
            let cache_key =
                rate_limit_key(&key_prefix, extract_user_id(&req), || extract_client_ip(&req));

            match hit(&cache_key, max_requests, window).await {
                Ok(remaining) => {
                    let mut res = srv.call(req).await?.map_into_left_body();
                    res.headers_mut().insert(
                        HeaderName::from_static("x-ratelimit-remaining"),
                        HeaderValue::from(remaining),
                    );
                    Ok(res)
                }
                Err(retry_after) => {
                    warn!(
                        "Rate limit exceeded for key: {} (limit: {}/{}s)",
                        cache_key,
                        max_requests,
                        window.as_secs()
                    );
                    let mut response = CGSystemError::rate_limit_exceeded(
                        "Rate limit for this route exceeded, please slow down.",
                    )
                    .error_response();
                    let headers = response.headers_mut();
                    headers.insert(
                        HeaderName::from_static("retry-after"),
                        HeaderValue::from(retry_after),
                    );
                    headers.insert(
                        HeaderName::from_static("x-ratelimit-remaining"),
                        HeaderValue::from_static("0"),
                    );
                    Ok(req.into_response(response.map_into_right_body()))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_presets() {
        let login = RateLimit::login();
        assert_eq!(login.max_requests, 5);
        assert_eq!(login.window_secs, 60);
        assert_eq!(login.key_prefix, "login");

        let search = RateLimit::search();
        assert_eq!(search.max_requests, 1);
        assert_eq!(search.window_secs, 1);
    }

    #[test]
    fn test_key_prefers_user() {
        assert_eq!(rate_limit_key("search", Some(7), || "1.2.3.4".into()), "search:user:7");
        assert_eq!(rate_limit_key("login", None, || "1.2.3.4".into()), "login:ip:1.2.3.4");
        assert_eq!(rate_limit_key("", None, || "::1".into()), "ip:::1");
    }

    #[tokio::test]
    async fn test_second_hit_within_window_is_limited() {
        let key = "test:second-hit";
        assert_eq!(hit(key, 1, Duration::from_secs(1)).await, Ok(0));
        assert_eq!(hit(key, 1, Duration::from_secs(1)).await, Err(1));
    }

    #[tokio::test]
    async fn test_window_resets() {
        let key = "test:reset";
        assert!(hit(key, 1, Duration::from_millis(200)).await.is_ok());
        assert!(hit(key, 1, Duration::from_millis(200)).await.is_err());
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(hit(key, 1, Duration::from_millis(200)).await.is_ok());
    }
}
