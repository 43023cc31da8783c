pub mod circuit_breaker;
pub mod rate_limiter;

pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitState};
pub use rate_limiter::RateLimiter;
