use crate::auth::TokenManager;
use crate::config::CentralConfig;
use crate::constants::retry;
use crate::errors::{ToolError, ToolErrorKind};
use crate::observability::Telemetry;
use crate::resilience::{CircuitBreaker, RateLimiter};
use crate::services::logger::Logger;
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Query parameters; `None` values are omitted from the request.
pub type Query<'a> = &'a [(&'a str, Option<String>)];

/// The only HTTP surface tool handlers use. Composes token freshness, the
/// rate limiter, the circuit breaker, and retry-with-backoff around one
/// authenticated request, in that order.
pub struct ApiClient {
    logger: Logger,
    http: Client,
    config: Arc<CentralConfig>,
    auth: Arc<TokenManager>,
    limiter: Arc<RateLimiter>,
    breaker: Arc<CircuitBreaker>,
    telemetry: Arc<Telemetry>,
}

impl ApiClient {
    pub fn new(
        logger: Logger,
        config: Arc<CentralConfig>,
        auth: Arc<TokenManager>,
        limiter: Arc<RateLimiter>,
        breaker: Arc<CircuitBreaker>,
        telemetry: Arc<Telemetry>,
    ) -> Result<Self, ToolError> {
        let http = Client::builder()
            .user_agent(concat!("aruba-noc/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ToolError::internal(format!("Failed to build HTTP client: {}", err)))?;
        Ok(Self {
            logger: logger.child("api"),
            http,
            config,
            auth,
            limiter,
            breaker,
            telemetry,
        })
    }

    pub fn config(&self) -> &CentralConfig {
        &self.config
    }

    pub fn auth(&self) -> &TokenManager {
        &self.auth
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub async fn get(&self, endpoint: &str, query: Query<'_>) -> Result<Value, ToolError> {
        self.call(endpoint, Method::GET, query, None).await
    }

    pub async fn post(&self, endpoint: &str, body: Value) -> Result<Value, ToolError> {
        self.call(endpoint, Method::POST, &[], Some(body)).await
    }

    pub async fn call(
        &self,
        endpoint: &str,
        method: Method,
        query: Query<'_>,
        body: Option<Value>,
    ) -> Result<Value, ToolError> {
        let mut token = self.auth.ensure_fresh().await?;
        self.limiter.acquire().await;
        self.telemetry
            .set_rate_limiter_tokens(self.limiter.available().await);
        self.breaker.check()?;

        let started = Instant::now();
        let outcome = self
            .call_with_retry(endpoint, &method, query, body.as_ref(), &mut token)
            .await;

        match &outcome {
            Ok(_) => {
                self.breaker.record_success();
                self.telemetry
                    .record_api_call(endpoint, "2xx", started.elapsed());
            }
            Err(err) => {
                if breaker_counts_failure(err) {
                    self.breaker.record_failure();
                }
                self.telemetry
                    .record_api_call(endpoint, status_class(err), started.elapsed());
                self.logger.warn(
                    "API call failed",
                    Some(&serde_json::json!({
                        "endpoint": endpoint,
                        "kind": err.kind_label(),
                        "status": err.status,
                    })),
                );
            }
        }
        self.telemetry.set_circuit_state(self.breaker.snapshot().state);
        outcome
    }

    async fn call_with_retry(
        &self,
        endpoint: &str,
        method: &Method,
        query: Query<'_>,
        body: Option<&Value>,
        token: &mut String,
    ) -> Result<Value, ToolError> {
        let mut attempt = 0usize;
        let mut reauthed = false;
        loop {
            attempt += 1;
            match self.attempt(endpoint, method, query, body, token).await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::UNAUTHORIZED {
                        // One forced refresh per call; the re-issued request
                        // does not count as a retry attempt.
                        if !reauthed {
                            reauthed = true;
                            attempt -= 1;
                            *token = self.auth.force_refresh().await?;
                            continue;
                        }
                        return Err(ToolError::auth(
                            "Authentication failed after forced token refresh",
                        )
                        .with_status(401));
                    }
                    if status.is_success() {
                        return decode_json(response).await;
                    }
                    let code = status.as_u16();
                    if retry::STATUS_CODES.contains(&code) && attempt < retry::MAX_ATTEMPTS {
                        let delay = compute_retry_delay(attempt, retry_after_secs(&response));
                        self.logger.warn(
                            "HTTP retry",
                            Some(&serde_json::json!({
                                "endpoint": endpoint,
                                "status": code,
                                "attempt": attempt,
                                "delay_ms": delay.as_millis() as u64,
                            })),
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(error_for_status(code, response).await);
                }
                Err(err) => {
                    let transient = err.is_timeout() || err.is_connect();
                    if transient && attempt < retry::MAX_ATTEMPTS {
                        let delay = compute_retry_delay(attempt, None);
                        self.logger.warn(
                            "HTTP retry",
                            Some(&serde_json::json!({
                                "endpoint": endpoint,
                                "error": "transport",
                                "attempt": attempt,
                                "delay_ms": delay.as_millis() as u64,
                            })),
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(map_transport_error(err));
                }
            }
        }
    }

    async fn attempt(
        &self,
        endpoint: &str,
        method: &Method,
        query: Query<'_>,
        body: Option<&Value>,
        token: &str,
    ) -> Result<Response, reqwest::Error> {
        let url = format!("{}{}", self.config.base_url, endpoint);
        let mut request = self
            .http
            .request(method.clone(), url)
            .bearer_auth(token)
            .header("Accept", "application/json");
        let pairs: Vec<(&str, &str)> = query
            .iter()
            .filter_map(|(key, value)| value.as_deref().map(|v| (*key, v)))
            .collect();
        if !pairs.is_empty() {
            request = request.query(&pairs);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await
    }
}

async fn decode_json(response: Response) -> Result<Value, ToolError> {
    let text = response.text().await.unwrap_or_default();
    if text.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    match serde_json::from_str(&text) {
        Ok(value) => Ok(value),
        Err(_) => Ok(serde_json::json!({ "raw": text })),
    }
}

async fn error_for_status(code: u16, response: Response) -> ToolError {
    let detail = response
        .text()
        .await
        .ok()
        .and_then(|text| serde_json::from_str::<Value>(&text).ok())
        .and_then(|body| {
            body.get("error_description")
                .or_else(|| body.get("message"))
                .or_else(|| body.get("description"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        });

    if code == 429 {
        let mut err = ToolError::upstream_client(429, "Rate limited by upstream after retries");
        if let Some(detail) = detail {
            err = err.with_details(serde_json::json!({ "detail": detail }));
        }
        return err;
    }
    if code >= 500 {
        let message = format!("Upstream server error ({})", code);
        let mut err = ToolError::upstream_unavailable(message).with_status(code);
        if let Some(detail) = detail {
            err = err.with_details(serde_json::json!({ "detail": detail }));
        }
        return err;
    }
    let reason = StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Client error");
    let message = match detail {
        Some(detail) => format!("{} ({}): {}", reason, code, detail),
        None => format!("{} ({})", reason, code),
    };
    ToolError::upstream_client(code, message)
}

fn map_transport_error(err: reqwest::Error) -> ToolError {
    if err.is_timeout() {
        ToolError::timeout("Request timed out")
    } else if err.is_connect() {
        ToolError::upstream_unavailable(format!("Connection failed: {}", err))
    } else {
        ToolError::upstream_unavailable(format!("Request failed: {}", err))
    }
}

/// 5xx responses and transport failures count against the breaker; 4xx
/// (429 included), auth failures and cancellations are neutral.
fn breaker_counts_failure(err: &ToolError) -> bool {
    matches!(
        err.kind,
        ToolErrorKind::UpstreamUnavailable | ToolErrorKind::Timeout
    )
}

fn status_class(err: &ToolError) -> &'static str {
    match err.status {
        Some(code) if code >= 500 => "5xx",
        Some(_) => "4xx",
        None => match err.kind {
            ToolErrorKind::Timeout => "timeout",
            _ => "error",
        },
    }
}

/// Exponential backoff with jitter in [0.5, 1.5), capped at the max delay.
/// A `Retry-After` header overrides the formula verbatim.
fn compute_retry_delay(attempt: usize, retry_after: Option<u64>) -> Duration {
    if let Some(secs) = retry_after {
        return Duration::from_secs(secs);
    }
    let exponent = attempt.saturating_sub(1).min(16) as i32;
    let mut delay_ms = retry::BASE_DELAY_MS as f64 * 2f64.powi(exponent);
    let jitter = 0.5 + rand::random::<f64>();
    delay_ms *= jitter;
    if delay_ms > retry::MAX_DELAY_MS as f64 {
        delay_ms = retry::MAX_DELAY_MS as f64;
    }
    Duration::from_millis(delay_ms as u64)
}

fn retry_after_secs(response: &Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_overrides_backoff_verbatim() {
        let delay = compute_retry_delay(1, Some(3));
        assert_eq!(delay, Duration::from_secs(3));
        let delay = compute_retry_delay(4, Some(3));
        assert_eq!(delay, Duration::from_secs(3));
    }

    #[test]
    fn backoff_grows_and_respects_the_cap() {
        for attempt in 1..=6 {
            let delay = compute_retry_delay(attempt, None);
            let base = retry::BASE_DELAY_MS as f64 * 2f64.powi((attempt - 1) as i32);
            let floor = (base * 0.5).min(retry::MAX_DELAY_MS as f64) as u128;
            assert!(delay.as_millis() >= floor.saturating_sub(1));
            assert!(delay.as_millis() <= retry::MAX_DELAY_MS as u128);
        }
    }

    #[test]
    fn five_hundreds_count_against_the_breaker() {
        assert!(breaker_counts_failure(
            &ToolError::upstream_unavailable("boom").with_status(500)
        ));
        assert!(breaker_counts_failure(&ToolError::timeout("slow")));
        assert!(!breaker_counts_failure(&ToolError::upstream_client(
            429,
            "rate limited"
        )));
        assert!(!breaker_counts_failure(&ToolError::auth("denied")));
        assert!(!breaker_counts_failure(&ToolError::cancelled("gone")));
    }

    #[test]
    fn status_class_maps_kinds() {
        assert_eq!(
            status_class(&ToolError::upstream_unavailable("x").with_status(503)),
            "5xx"
        );
        assert_eq!(status_class(&ToolError::upstream_client(400, "x")), "4xx");
        assert_eq!(status_class(&ToolError::timeout("x")), "timeout");
    }
}
