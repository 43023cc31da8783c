use crate::config::CentralConfig;
use crate::constants::oauth;
use crate::errors::ToolError;
use crate::observability::Telemetry;
use crate::services::logger::Logger;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default)]
struct TokenState {
    access_token: Option<String>,
    expires_at: Option<Instant>,
}

/// OAuth2 client-credentials token manager with proactive refresh.
///
/// Duplicate refreshes from concurrent callers are prevented by comparing
/// the token value snapshotted before the lock against the value inside it:
/// any refresh that completed while a caller waited leaves a different
/// token behind, and the waiter returns it instead of exchanging again.
pub struct TokenManager {
    logger: Logger,
    http: Client,
    config: Arc<CentralConfig>,
    telemetry: Arc<Telemetry>,
    state: Mutex<TokenState>,
    refresh_buffer: Duration,
}

impl TokenManager {
    pub fn new(
        logger: Logger,
        http: Client,
        config: Arc<CentralConfig>,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        Self {
            logger: logger.child("auth"),
            http,
            config,
            telemetry,
            state: Mutex::new(TokenState::default()),
            refresh_buffer: Duration::from_secs(oauth::REFRESH_BUFFER_SECS),
        }
    }

    /// Return a token that is valid for at least the refresh buffer,
    /// exchanging credentials if the current one is missing or stale.
    pub async fn ensure_fresh(&self) -> Result<String, ToolError> {
        self.refresh(false).await
    }

    /// Unconditional refresh, used once per HTTP call that saw a 401.
    pub async fn force_refresh(&self) -> Result<String, ToolError> {
        self.refresh(true).await
    }

    async fn refresh(&self, skip_expiry_check: bool) -> Result<String, ToolError> {
        let snapshot = { self.state.lock().await.access_token.clone() };

        let mut state = self.state.lock().await;
        if state.access_token != snapshot {
            if let Some(token) = state.access_token.clone() {
                return Ok(token);
            }
        }
        if !skip_expiry_check {
            if let (Some(token), Some(expires_at)) = (state.access_token.clone(), state.expires_at)
            {
                if Instant::now() + self.refresh_buffer < expires_at {
                    return Ok(token);
                }
            }
        }

        let started = Instant::now();
        let exchanged = self.exchange().await;
        self.telemetry.record_token_refresh(exchanged.is_ok());
        let (token, expires_in) = exchanged?;
        self.logger.info(
            "OAuth2 access token acquired",
            Some(&serde_json::json!({
                "expires_in": expires_in,
                "duration_ms": started.elapsed().as_millis() as u64,
            })),
        );
        state.access_token = Some(token.clone());
        state.expires_at = Some(Instant::now() + Duration::from_secs(expires_in));
        Ok(token)
    }

    /// POST the client-credentials form to `{base_url}/oauth2/token`.
    /// Failure raises `AuthError` and leaves the stored token untouched.
    async fn exchange(&self) -> Result<(String, u64), ToolError> {
        let mut form = HashMap::new();
        form.insert("grant_type", "client_credentials");
        form.insert("client_id", self.config.client_id.as_str());
        form.insert("client_secret", self.config.client_secret.as_str());

        let response = self
            .http
            .post(self.config.token_url())
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ToolError::auth("OAuth2 token request timed out")
                } else {
                    ToolError::auth(format!("OAuth2 token request failed: {}", err))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::auth(format!(
                "OAuth2 token request failed ({})",
                status.as_u16()
            ))
            .with_status(status.as_u16()));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|_| ToolError::auth("OAuth2 token response is not valid JSON"))?;
        let token = payload
            .get("access_token")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        if token.is_empty() {
            return Err(ToolError::auth("OAuth2 response did not carry access_token"));
        }
        let expires_in = payload
            .get("expires_in")
            .and_then(|v| v.as_u64())
            .unwrap_or(oauth::DEFAULT_EXPIRES_IN_SECS);
        Ok((token, expires_in))
    }

    /// Current token without triggering a refresh. Used for report
    /// redaction and the health probe.
    pub async fn current_token(&self) -> Option<String> {
        self.state.lock().await.access_token.clone()
    }

    pub async fn seconds_to_expiry(&self) -> Option<i64> {
        let state = self.state.lock().await;
        let expires_at = state.expires_at?;
        state.access_token.as_ref()?;
        let now = Instant::now();
        if expires_at > now {
            Some((expires_at - now).as_secs() as i64)
        } else {
            Some(-((now - expires_at).as_secs() as i64))
        }
    }

    /// Install a token directly, bypassing the exchange. Intended for tests
    /// that need a known-stale or known-fresh starting state.
    pub async fn install_token(&self, token: &str, valid_for: Duration) {
        let mut state = self.state.lock().await;
        state.access_token = Some(token.to_string());
        state.expires_at = Some(Instant::now() + valid_for);
    }
}
