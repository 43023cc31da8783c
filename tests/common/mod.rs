use aruba_noc::auth::TokenManager;
use aruba_noc::client::ApiClient;
use aruba_noc::config::CentralConfig;
use aruba_noc::observability::Telemetry;
use aruba_noc::resilience::{CircuitBreaker, RateLimiter};
use aruba_noc::services::dispatcher::Dispatcher;
use aruba_noc::services::logger::Logger;
use aruba_noc::tools::build_registry;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub const TEST_CLIENT_SECRET: &str = "itsa-test-client-secret";

pub struct RigOptions {
    pub breaker_threshold: u32,
    pub breaker_timeout: Duration,
    pub rate_capacity: u32,
    pub rate_window: Duration,
}

impl Default for RigOptions {
    fn default() -> Self {
        Self {
            breaker_threshold: 5,
            breaker_timeout: Duration::from_secs(60),
            rate_capacity: 100,
            rate_window: Duration::from_secs(60),
        }
    }
}

pub struct TestRig {
    pub client: Arc<ApiClient>,
    pub auth: Arc<TokenManager>,
    pub limiter: Arc<RateLimiter>,
    pub breaker: Arc<CircuitBreaker>,
    pub telemetry: Arc<Telemetry>,
    pub dispatcher: Arc<Dispatcher>,
}

/// Wire the full substrate against a mock server base URL, with the
/// resilience knobs shrunk to test scale.
pub fn build_rig(base_url: &str, opts: RigOptions) -> TestRig {
    let logger = Logger::new("test");
    let config = Arc::new(CentralConfig {
        base_url: base_url.trim_end_matches('/').to_string(),
        client_id: "test-client".to_string(),
        client_secret: TEST_CLIENT_SECRET.to_string(),
        request_timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
        rate_limit_requests: opts.rate_capacity,
        rate_limit_window: opts.rate_window,
        breaker_threshold: opts.breaker_threshold,
        breaker_timeout: opts.breaker_timeout,
    });
    let telemetry = Arc::new(Telemetry::new(logger.clone(), false));
    let oauth_http = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("oauth http client");
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
    let client = Arc::new(
        ApiClient::new(
            logger.clone(),
            config.clone(),
            auth.clone(),
            limiter.clone(),
            breaker.clone(),
            telemetry.clone(),
        )
        .expect("api client"),
    );
    let handlers = build_registry(client.clone()).expect("registry");
    let dispatcher = Arc::new(
        Dispatcher::new(logger, telemetry.clone(), config, auth.clone(), handlers)
            .expect("dispatcher"),
    );
    TestRig {
        client,
        auth,
        limiter,
        breaker,
        telemetry,
        dispatcher,
    }
}
