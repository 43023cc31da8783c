use crate::resilience::CircuitState;
use crate::services::logger::Logger;
use crate::utils::redact::redact_args;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// One tool invocation span. The id doubles as the correlation id in logs
/// even when trace emission is disabled.
pub struct Span {
    pub id: String,
    tool: String,
    started: Instant,
}

#[derive(Default)]
struct MetricsState {
    api_calls: HashMap<(String, String), u64>,
    api_call_duration_ms: u64,
    token_refreshes: u64,
    token_refresh_failures: u64,
    circuit_state: u8,
    circuit_opens: u64,
    rate_limiter_tokens: u32,
}

/// Span and metric emission shim. Spans are emitted only when tracing
/// credentials are configured; the metric registry is always live so the
/// health probe and tests can read it.
pub struct Telemetry {
    logger: Logger,
    tracing_enabled: bool,
    metrics: Mutex<MetricsState>,
}

impl Telemetry {
    pub fn from_env(logger: Logger) -> Self {
        let tracing_enabled = std::env::var("ARUBA_TRACE_API_KEY")
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);
        Self::new(logger, tracing_enabled)
    }

    pub fn new(logger: Logger, tracing_enabled: bool) -> Self {
        Self {
            logger: logger.child("telemetry"),
            tracing_enabled,
            metrics: Mutex::new(MetricsState::default()),
        }
    }

    pub fn start_span(&self, tool: &str, args: &Value) -> Span {
        let span = Span {
            id: uuid::Uuid::new_v4().to_string(),
            tool: tool.to_string(),
            started: Instant::now(),
        };
        if self.tracing_enabled {
            self.logger.debug(
                "span start",
                Some(&serde_json::json!({
                    "span_id": span.id,
                    "tool": span.tool,
                    "args": redact_args(args),
                })),
            );
        }
        span
    }

    pub fn end_span(&self, span: &Span, status: &str, error_kind: Option<&str>) {
        if !self.tracing_enabled {
            return;
        }
        self.logger.debug(
            "span end",
            Some(&serde_json::json!({
                "span_id": span.id,
                "tool": span.tool,
                "status": status,
                "error_kind": error_kind,
                "duration_ms": span.started.elapsed().as_millis() as u64,
            })),
        );
    }

    pub fn record_api_call(&self, endpoint: &str, status_class: &str, duration: Duration) {
        let mut metrics = self.lock();
        *metrics
            .api_calls
            .entry((endpoint.to_string(), status_class.to_string()))
            .or_insert(0) += 1;
        metrics.api_call_duration_ms += duration.as_millis() as u64;
    }

    pub fn record_token_refresh(&self, success: bool) {
        let mut metrics = self.lock();
        metrics.token_refreshes += 1;
        if !success {
            metrics.token_refresh_failures += 1;
        }
    }

    pub fn set_circuit_state(&self, state: CircuitState) {
        let mut metrics = self.lock();
        let encoded = match state {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        };
        if encoded == 1 && metrics.circuit_state != 1 {
            metrics.circuit_opens += 1;
        }
        metrics.circuit_state = encoded;
    }

    pub fn set_rate_limiter_tokens(&self, tokens: u32) {
        self.lock().rate_limiter_tokens = tokens;
    }

    pub fn api_call_count(&self, endpoint: &str, status_class: &str) -> u64 {
        self.lock()
            .api_calls
            .get(&(endpoint.to_string(), status_class.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn token_refresh_count(&self) -> u64 {
        self.lock().token_refreshes
    }

    pub fn snapshot(&self) -> Value {
        let metrics = self.lock();
        let calls: Vec<Value> = metrics
            .api_calls
            .iter()
            .map(|((endpoint, class), count)| {
                serde_json::json!({"endpoint": endpoint, "status_class": class, "count": count})
            })
            .collect();
        serde_json::json!({
            "api_calls": calls,
            "api_call_duration_ms": metrics.api_call_duration_ms,
            "token_refreshes": metrics.token_refreshes,
            "token_refresh_failures": metrics.token_refresh_failures,
            "circuit_state": metrics.circuit_state,
            "circuit_opens": metrics.circuit_opens,
            "rate_limiter_tokens": metrics.rate_limiter_tokens,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MetricsState> {
        self.metrics.lock().unwrap_or_else(|err| err.into_inner())
    }
}
