use crate::constants::{circuit_breaker, network, rate_limit, secrets};
use crate::errors::ToolError;
use crate::services::logger::Logger;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Closed set of regional API endpoints. `ARUBA_BASE_URL` may carry either a
/// full URL or one of these region aliases.
pub mod regions {
    pub const US1: &str = "https://us1.api.central.arubanetworks.com";
    pub const EU1: &str = "https://eu1.api.central.arubanetworks.com";
    pub const APAC1: &str = "https://apac1.api.central.arubanetworks.com";
    pub const INTERNAL: &str = "https://internal.api.central.arubanetworks.com";
}

#[derive(Debug, Clone)]
pub struct CentralConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,
    pub breaker_threshold: u32,
    pub breaker_timeout: Duration,
}

impl CentralConfig {
    /// Resolve credentials and tuning knobs from the standard sources.
    /// Missing required credentials are fatal; the process must exit 1.
    pub fn load(logger: &Logger) -> Result<Self, ToolError> {
        let dirs = [
            PathBuf::from(secrets::DOCKER_SECRETS_DIR),
            PathBuf::from(secrets::FILE_SECRETS_DIR),
        ];
        let dir_refs: Vec<&Path> = dirs.iter().map(|p| p.as_path()).collect();
        Self::load_from(logger, &dir_refs)
    }

    /// Same as `load`, with the secret directories injectable for tests.
    pub fn load_from(logger: &Logger, secret_dirs: &[&Path]) -> Result<Self, ToolError> {
        let base_url = resolve_base_url(
            load_value(logger, secret_dirs, "ARUBA_BASE_URL")
                .as_deref()
                .unwrap_or(regions::US1),
        )?;

        let client_id = load_value(logger, secret_dirs, "ARUBA_CLIENT_ID").ok_or_else(|| {
            ToolError::config("ARUBA_CLIENT_ID is not configured").with_hint(
                "Provide it via /run/secrets/aruba_client_id, /secrets/aruba_client_id, or the ARUBA_CLIENT_ID environment variable.",
            )
        })?;
        let client_secret =
            load_value(logger, secret_dirs, "ARUBA_CLIENT_SECRET").ok_or_else(|| {
                ToolError::config("ARUBA_CLIENT_SECRET is not configured").with_hint(
                    "Provide it via /run/secrets/aruba_client_secret, /secrets/aruba_client_secret, or the ARUBA_CLIENT_SECRET environment variable.",
                )
            })?;

        Ok(Self {
            base_url,
            client_id,
            client_secret,
            request_timeout: Duration::from_secs(env_u64(
                "ARUBA_API_TIMEOUT",
                network::REQUEST_TIMEOUT_MS / 1_000,
            )),
            connect_timeout: Duration::from_millis(network::CONNECT_TIMEOUT_MS),
            rate_limit_requests: env_u64("ARUBA_RATE_LIMIT_REQUESTS", rate_limit::MAX_REQUESTS as u64)
                as u32,
            rate_limit_window: Duration::from_secs(env_u64(
                "ARUBA_RATE_LIMIT_WINDOW",
                rate_limit::WINDOW_MS / 1_000,
            )),
            breaker_threshold: env_u64(
                "ARUBA_CIRCUIT_BREAKER_THRESHOLD",
                circuit_breaker::FAILURE_THRESHOLD as u64,
            ) as u32,
            breaker_timeout: Duration::from_secs(env_u64(
                "ARUBA_CIRCUIT_BREAKER_TIMEOUT",
                circuit_breaker::OPEN_TIMEOUT_MS / 1_000,
            )),
        })
    }

    pub fn token_url(&self) -> String {
        format!("{}{}", self.base_url, crate::constants::oauth::TOKEN_PATH)
    }
}

/// Priority order per variable: secrets-mount file, alternate secrets file,
/// process environment. The file basename is the variable in lowercase.
fn load_value(logger: &Logger, secret_dirs: &[&Path], var: &str) -> Option<String> {
    let basename = var.to_lowercase();
    for dir in secret_dirs {
        let path = dir.join(&basename);
        match std::fs::read_to_string(&path) {
            Ok(raw) => {
                let value = raw.trim().to_string();
                if !is_placeholder(&value) {
                    logger.info(
                        "Loaded credential from secret file",
                        Some(&serde_json::json!({"var": var, "dir": dir.display().to_string()})),
                    );
                    return Some(value);
                }
            }
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => {
                logger.warn(
                    "Failed to read secret file",
                    Some(&serde_json::json!({"var": var, "error": err.to_string()})),
                );
            }
            Err(_) => {}
        }
    }
    let value = std::env::var(var).ok()?;
    let value = value.trim().to_string();
    if is_placeholder(&value) {
        return None;
    }
    logger.info(
        "Loaded credential from environment",
        Some(&serde_json::json!({"var": var})),
    );
    Some(value)
}

fn is_placeholder(value: &str) -> bool {
    value.is_empty() || (value.starts_with("your_") && value.ends_with("_here"))
}

fn resolve_base_url(raw: &str) -> Result<String, ToolError> {
    let trimmed = raw.trim();
    let resolved = match trimmed.to_lowercase().as_str() {
        "us-1" | "us1" => regions::US1,
        "eu-1" | "eu1" => regions::EU1,
        "apac-1" | "apac1" => regions::APAC1,
        "internal" => regions::INTERNAL,
        _ => trimmed,
    };
    let url = Url::parse(resolved).map_err(|_| {
        ToolError::config(format!("Invalid ARUBA_BASE_URL: {}", resolved))
            .with_hint("Expected a full https URL or one of: us-1, eu-1, apac-1, internal.")
    })?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ToolError::config(format!(
            "Unsupported base URL scheme: {}",
            url.scheme()
        )));
    }
    Ok(resolved.trim_end_matches('/').to_string())
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}
