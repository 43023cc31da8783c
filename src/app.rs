use crate::auth::TokenManager;
use crate::client::ApiClient;
use crate::config::CentralConfig;
use crate::errors::ToolError;
use crate::observability::Telemetry;
use crate::resilience::{CircuitBreaker, RateLimiter};
use crate::services::dispatcher::Dispatcher;
use crate::services::logger::Logger;
use crate::tools;
use std::sync::Arc;

/// Process-wide wiring: exactly one instance each of the credential record,
/// rate limiter, circuit breaker, and tool registry, created at startup and
/// torn down on exit.
pub struct App {
    pub logger: Logger,
    pub dispatcher: Arc<Dispatcher>,
}

impl App {
    pub fn initialize() -> Result<Self, ToolError> {
        let logger = Logger::new("aruba-noc");
        let config = Arc::new(CentralConfig::load(&logger)?);
        let telemetry = Arc::new(Telemetry::from_env(logger.clone()));

        let oauth_http = reqwest::Client::builder()
            .user_agent(concat!("aruba-noc/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| {
                ToolError::config(format!("Failed to build OAuth2 HTTP client: {}", err))
            })?;
        let auth = Arc::new(TokenManager::new(
            logger.clone(),
            oauth_http,
            config.clone(),
            telemetry.clone(),
        ));

        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit_requests,
            config.rate_limit_window,
        ));
        let breaker = Arc::new(CircuitBreaker::new(
            config.breaker_threshold,
            config.breaker_timeout,
        ));

        let api_client = Arc::new(ApiClient::new(
            logger.clone(),
            config.clone(),
            auth.clone(),
            limiter,
            breaker,
            telemetry.clone(),
        )?);

        let handlers = tools::build_registry(api_client)?;
        let dispatcher = Arc::new(Dispatcher::new(
            logger.clone(),
            telemetry,
            config,
            auth,
            handlers,
        )?);

        logger.info(
            "Server initialized",
            Some(&serde_json::json!({"tools": dispatcher.list_tools().len()})),
        );
        Ok(Self { logger, dispatcher })
    }
}
