use crate::client::ApiClient;
use crate::constants::network;
use crate::errors::ToolError;
use crate::report::{labels, percent, Report};
use crate::resilience::CircuitState;
use crate::tools::ToolHandler;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ComponentHealth {
    Healthy,
    Degraded,
    Unhealthy,
}

impl ComponentHealth {
    fn as_str(self) -> &'static str {
        match self {
            ComponentHealth::Healthy => "healthy",
            ComponentHealth::Degraded => "degraded",
            ComponentHealth::Unhealthy => "unhealthy",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ComponentHealth::Healthy => labels::OK,
            ComponentHealth::Degraded => labels::WARN,
            ComponentHealth::Unhealthy => labels::CRIT,
        }
    }
}

/// Pseudo-tool that introspects the substrate and makes exactly one
/// lightweight GET against the vendor base URL. The probe uses its own
/// short-timeout client so it never consumes a rate-limiter token or
/// counts against the breaker.
pub struct CheckServerHealth {
    client: Arc<ApiClient>,
    probe: reqwest::Client,
}

impl CheckServerHealth {
    pub fn new(client: Arc<ApiClient>) -> Result<Self, ToolError> {
        let probe = reqwest::Client::builder()
            .timeout(Duration::from_millis(network::HEALTH_PROBE_TIMEOUT_MS))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|err| ToolError::internal(format!("Failed to build probe client: {}", err)))?;
        Ok(Self { client, probe })
    }

    async fn probe_vendor(&self) -> (ComponentHealth, String, Option<u16>) {
        let started = Instant::now();
        match self
            .probe
            .get(self.client.config().base_url.as_str())
            .send()
            .await
        {
            Ok(response) => {
                let code = response.status().as_u16();
                let latency_ms = started.elapsed().as_millis() as u64;
                // Any non-5xx answer proves reachability; 401/403 are the
                // expected replies to an unauthenticated GET.
                if code < 500 {
                    if latency_ms > 2_000 {
                        (
                            ComponentHealth::Degraded,
                            format!("status {} in {}ms, high latency", code, latency_ms),
                            Some(code),
                        )
                    } else {
                        (
                            ComponentHealth::Healthy,
                            format!("status {} in {}ms", code, latency_ms),
                            Some(code),
                        )
                    }
                } else {
                    (
                        ComponentHealth::Unhealthy,
                        format!("server error {}", code),
                        Some(code),
                    )
                }
            }
            Err(err) if err.is_timeout() => (
                ComponentHealth::Unhealthy,
                "connection timeout (>5s)".to_string(),
                None,
            ),
            Err(err) => (
                ComponentHealth::Unhealthy,
                format!("unreachable: {}", err),
                None,
            ),
        }
    }
}

#[async_trait]
impl ToolHandler for CheckServerHealth {
    async fn execute(&self, _args: Value) -> Result<Report, ToolError> {
        // Auth component.
        let expiry = self.client.auth().seconds_to_expiry().await;
        let (auth_health, auth_detail) = match expiry {
            None => (
                ComponentHealth::Degraded,
                "no access token yet, will be generated on first call".to_string(),
            ),
            Some(secs) if secs <= 0 => (
                ComponentHealth::Degraded,
                "token expired, will refresh on next call".to_string(),
            ),
            Some(secs) => (
                ComponentHealth::Healthy,
                format!("token expires in {}s", secs),
            ),
        };

        // Circuit breaker component.
        let breaker = self.client.breaker().snapshot();
        let (breaker_health, breaker_detail) = match breaker.state {
            CircuitState::Closed => (
                ComponentHealth::Healthy,
                format!(
                    "closed, failures {}/{}",
                    breaker.consecutive_failures, breaker.failure_threshold
                ),
            ),
            CircuitState::HalfOpen => (
                ComponentHealth::Degraded,
                "half_open, testing recovery".to_string(),
            ),
            CircuitState::Open => (
                ComponentHealth::Degraded,
                format!(
                    "open, retry in {}s",
                    breaker.retry_in_secs.unwrap_or(0)
                ),
            ),
        };

        // Rate limiter component.
        let available = self.client.limiter().available().await;
        let capacity = self.client.limiter().capacity().max(1);
        let available_share = available as f64 / capacity as f64 * 100.0;
        let utilization = 100.0 - available_share;
        let (limiter_health, limiter_detail) = if available_share > 50.0 {
            (
                ComponentHealth::Healthy,
                format!(
                    "{}/{} tokens, utilization {}",
                    available,
                    capacity,
                    percent(utilization)
                ),
            )
        } else if available_share > 10.0 {
            (
                ComponentHealth::Degraded,
                format!("{}/{} tokens, capacity below 50%", available, capacity),
            )
        } else {
            (
                ComponentHealth::Degraded,
                format!("{}/{} tokens, capacity critically low", available, capacity),
            )
        };

        // Vendor reachability, one cheap GET with a 5s deadline.
        let (vendor_health, vendor_detail, vendor_status) = self.probe_vendor().await;

        let overall = [auth_health, breaker_health, limiter_health, vendor_health]
            .into_iter()
            .max()
            .unwrap_or(ComponentHealth::Healthy);

        let mut report = Report::new();
        report.line(format!(
            "{} Server Health: {}",
            labels::HEALTH,
            overall.as_str()
        ));

        report.section();
        report.line(format!(
            "  {} auth: {} ({})",
            auth_health.label(),
            auth_health.as_str(),
            auth_detail
        ));
        report.line(format!(
            "  {} circuit_breaker: {} ({})",
            breaker_health.label(),
            breaker_health.as_str(),
            breaker_detail
        ));
        report.line(format!(
            "  {} rate_limiter: {} ({})",
            limiter_health.label(),
            limiter_health.as_str(),
            limiter_detail
        ));
        report.line(format!(
            "  {} vendor_api: {} ({})",
            vendor_health.label(),
            vendor_health.as_str(),
            vendor_detail
        ));

        report.fact("Overall", overall.as_str());
        report.fact("Breaker failures", breaker.consecutive_failures);
        report.fact("Tokens available", available);
        if let Some(code) = vendor_status {
            report.fact("Vendor status", code);
        }
        Ok(report)
    }
}
