//! Anti-abuse middleware for the WebSocket endpoint
//!
//! Venue crowds arrive through shared NAT'd WiFi, so limits are keyed on the
//! client's device id rather than IP. Protections:
//! - Blocks obvious CLI user agents
//! - Requires browser-like upgrade headers (Origin + Sec-WebSocket-Key)
//! - Rate limits per device id

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, Response, StatusCode},
    middleware::Next,
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

/// Sec-WebSocket-Key header (browsers always send this for WS upgrades)
const SEC_WEBSOCKET_KEY: &str = "sec-websocket-key";

/// Fixed-window rate limiter keyed by device id
#[derive(Debug, Clone)]
pub struct RateLimiter {
    requests: Arc<RwLock<HashMap<String, (u32, Instant)>>>,
    max_requests: u32,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(60, Duration::from_secs(10))
    }
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Returns `true` if the request is allowed
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut requests = self.requests.write().await;

        match requests.get_mut(key) {
            Some((count, window_start)) => {
                if now.duration_since(*window_start) >= self.window {
                    *count = 1;
                    *window_start = now;
                    true
                } else if *count >= self.max_requests {
                    false
                } else {
                    *count += 1;
                    true
                }
            }
            None => {
                requests.insert(key.to_string(), (1, now));
                true
            }
        }
    }

    /// Drop stale windows (call periodically)
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        requests.retain(|_, (_, window_start)| now.duration_since(*window_start) < self.window * 2);
    }
}

#[derive(Debug, Clone)]
pub struct AbuseConfig {
    pub block_user_agents: bool,
    pub require_browser_headers: bool,
    pub rate_limiter: Option<RateLimiter>,
}

impl Default for AbuseConfig {
    fn default() -> Self {
        Self {
            block_user_agents: true,
            require_browser_headers: true,
            rate_limiter: Some(RateLimiter::default()),
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| v != "0" && v.to_lowercase() != "false")
        .unwrap_or(default)
}

impl AbuseConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let block_user_agents = env_flag("ABUSE_BLOCK_USER_AGENTS", true);
        let require_browser_headers = env_flag("ABUSE_REQUIRE_BROWSER", true);

        let rate_limiter = if env_flag("ABUSE_RATE_LIMIT", true) {
            let max_requests = std::env::var("ABUSE_RATE_LIMIT_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            let window_secs = std::env::var("ABUSE_RATE_LIMIT_WINDOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10);
            Some(RateLimiter::new(
                max_requests,
                Duration::from_secs(window_secs),
            ))
        } else {
            None
        };

        tracing::info!(
            block_user_agents,
            require_browser_headers,
            rate_limit_enabled = rate_limiter.is_some(),
            "Anti-abuse config loaded"
        );

        Self {
            block_user_agents,
            require_browser_headers,
            rate_limiter,
        }
    }
}

/// Check if a user agent looks like a bot/CLI tool
fn is_blocked_user_agent(user_agent: &str) -> bool {
    let ua = user_agent.to_lowercase();
    ua.contains("curl")
        || ua.contains("wget")
        || ua.contains("httpie")
        || ua.contains("python-requests")
        || ua.contains("python-urllib")
        || ua.contains("go-http-client")
        || ua.ends_with("bot")
        || ua.contains("bot/")
        || ua.contains("spider")
        || ua.contains("crawler")
}

/// Rate-limit key from the query string. Only device ids are keyed — venue
/// WiFi puts whole crowds behind one public IP.
fn rate_limit_key(request: &Request<Body>) -> Option<String> {
    let query = request.uri().query()?;
    for pair in query.split('&') {
        if let Some(device) = pair.strip_prefix("device=") {
            return Some(format!("device:{}", device));
        }
    }
    None
}

fn forbidden(message: &str) -> Response<Body> {
    Response::builder()
        .status(StatusCode::FORBIDDEN)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(message.to_string()))
        .unwrap_or_default()
}

fn rate_limited() -> Response<Body> {
    Response::builder()
        .status(StatusCode::TOO_MANY_REQUESTS)
        .header(header::CONTENT_TYPE, "text/plain")
        .header(header::RETRY_AFTER, "10")
        .body(Body::from("Rate limit exceeded. Please slow down."))
        .unwrap_or_default()
}

/// Browsers send both headers for a legitimate WS upgrade; curl does not
fn is_browser_websocket(request: &Request<Body>) -> bool {
    request.headers().contains_key(SEC_WEBSOCKET_KEY)
        && request.headers().contains_key(header::ORIGIN)
}

/// Middleware for anti-abuse protection on the WebSocket endpoint
pub async fn ws_abuse_middleware(
    State(config): State<Arc<AbuseConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    if config.block_user_agents {
        match request
            .headers()
            .get(header::USER_AGENT)
            .and_then(|ua| ua.to_str().ok())
        {
            Some(ua) if is_blocked_user_agent(ua) => {
                tracing::warn!(user_agent = ua, "Blocked suspicious user agent");
                return forbidden("Access denied");
            }
            Some(_) => {}
            None => {
                tracing::warn!("Blocked request with no User-Agent");
                return forbidden("Access denied");
            }
        }
    }

    if config.require_browser_headers && !is_browser_websocket(&request) {
        tracing::warn!(uri = %request.uri(), "Blocked non-browser WebSocket request");
        return forbidden("Access denied");
    }

    if let Some(ref rate_limiter) = config.rate_limiter {
        if let Some(key) = rate_limit_key(&request) {
            if !rate_limiter.check(&key).await {
                tracing::warn!(key, "Rate limited");
                return rate_limited();
            }
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_blocked_user_agents() {
        assert!(is_blocked_user_agent("curl/7.64.1"));
        assert!(is_blocked_user_agent("Wget/1.20.3"));
        assert!(is_blocked_user_agent("python-requests/2.25.1"));
        assert!(is_blocked_user_agent("Googlebot"));
        assert!(is_blocked_user_agent("SomeSpider/1.0"));

        assert!(!is_blocked_user_agent(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)"
        ));
        assert!(!is_blocked_user_agent(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 14_0 like Mac OS X)"
        ));
    }

    #[test]
    fn test_rate_limit_key_from_device_param() {
        let req = Request::builder()
            .uri("/ws?role=player&device=abc123")
            .body(Body::empty())
            .unwrap();
        assert_eq!(rate_limit_key(&req), Some("device:abc123".to_string()));

        let req = Request::builder().uri("/ws").body(Body::empty()).unwrap();
        assert_eq!(rate_limit_key(&req), None);
    }

    #[tokio::test]
    async fn test_rate_limiter_blocks_after_max() {
        let limiter = RateLimiter::new(3, Duration::from_secs(1));
        for _ in 0..3 {
            assert!(limiter.check("d1").await);
        }
        assert!(!limiter.check("d1").await);
        // Separate devices have separate budgets
        assert!(limiter.check("d2").await);
    }

    #[tokio::test]
    async fn test_rate_limiter_window_reset() {
        let limiter = RateLimiter::new(1, Duration::from_millis(40));
        assert!(limiter.check("d1").await);
        assert!(!limiter.check("d1").await);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(limiter.check("d1").await);
    }

    #[tokio::test]
    async fn test_cleanup_drops_stale_windows() {
        let limiter = RateLimiter::new(5, Duration::from_millis(10));
        limiter.check("d1").await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        limiter.cleanup().await;
        assert!(limiter.requests.read().await.is_empty());
    }

    #[test]
    #[serial]
    fn test_abuse_config_from_env_defaults() {
        for var in [
            "ABUSE_BLOCK_USER_AGENTS",
            "ABUSE_REQUIRE_BROWSER",
            "ABUSE_RATE_LIMIT",
        ] {
            std::env::remove_var(var);
        }
        let config = AbuseConfig::from_env();
        assert!(config.block_user_agents);
        assert!(config.require_browser_headers);
        assert!(config.rate_limiter.is_some());
    }

    #[test]
    #[serial]
    fn test_abuse_config_rate_limit_disabled() {
        std::env::set_var("ABUSE_RATE_LIMIT", "0");
        let config = AbuseConfig::from_env();
        assert!(config.rate_limiter.is_none());
        std::env::remove_var("ABUSE_RATE_LIMIT");
    }
}
