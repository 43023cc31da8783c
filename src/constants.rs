pub mod network {
    pub const CONNECT_TIMEOUT_MS: u64 = 10_000;
    pub const REQUEST_TIMEOUT_MS: u64 = 30_000;
    pub const HEALTH_PROBE_TIMEOUT_MS: u64 = 5_000;
}

pub mod oauth {
    pub const TOKEN_PATH: &str = "/oauth2/token";
    pub const REFRESH_BUFFER_SECS: u64 = 60;
    pub const DEFAULT_EXPIRES_IN_SECS: u64 = 7_200;
}

pub mod retry {
    pub const MAX_ATTEMPTS: usize = 4;
    pub const BASE_DELAY_MS: u64 = 1_000;
    pub const MAX_DELAY_MS: u64 = 30_000;
    pub const STATUS_CODES: &[u16] = &[429, 502, 503, 504];
}

pub mod rate_limit {
    pub const MAX_REQUESTS: u32 = 100;
    pub const WINDOW_MS: u64 = 60_000;
}

pub mod circuit_breaker {
    pub const FAILURE_THRESHOLD: u32 = 5;
    pub const OPEN_TIMEOUT_MS: u64 = 60_000;
}

pub mod report {
    pub const MAX_REPORT_BYTES: usize = 8 * 1024;
    pub const CHECKPOINT_MARKER: &str = "── Verification ──";
}

pub mod secrets {
    pub const DOCKER_SECRETS_DIR: &str = "/run/secrets";
    pub const FILE_SECRETS_DIR: &str = "/secrets";
}
