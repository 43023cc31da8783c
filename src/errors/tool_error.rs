use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    Config,
    Auth,
    CircuitOpen,
    UpstreamClient,
    UpstreamUnavailable,
    Timeout,
    Schema,
    Cancelled,
    Internal,
}

/// Uniform error carried from the call path up to the dispatcher boundary.
/// `status` holds the upstream HTTP status when the error originated from a
/// response, so the dispatcher can distinguish 5xx from transport failures.
#[derive(Debug, Clone, Serialize)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub retryable: bool,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            hint: None,
            details: None,
            status: None,
            retryable: matches!(
                kind,
                ToolErrorKind::Timeout | ToolErrorKind::UpstreamUnavailable
            ),
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Config, "CONFIG", message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Auth, "AUTH", message)
    }

    pub fn circuit_open(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::CircuitOpen, "CIRCUIT_OPEN", message)
    }

    pub fn upstream_client(status: u16, message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::UpstreamClient, "UPSTREAM_CLIENT", message).with_status(status)
    }

    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        Self::new(
            ToolErrorKind::UpstreamUnavailable,
            "UPSTREAM_UNAVAILABLE",
            message,
        )
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Timeout, "TIMEOUT", message)
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Schema, "SCHEMA", message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Cancelled, "CANCELLED", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Internal, "INTERNAL", message)
    }

    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            ToolErrorKind::Config => "config",
            ToolErrorKind::Auth => "auth",
            ToolErrorKind::CircuitOpen => "circuit_open",
            ToolErrorKind::UpstreamClient => "upstream_client",
            ToolErrorKind::UpstreamUnavailable => "upstream_unavailable",
            ToolErrorKind::Timeout => "timeout",
            ToolErrorKind::Schema => "schema",
            ToolErrorKind::Cancelled => "cancelled",
            ToolErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ToolError {}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        ToolError::internal(err.to_string())
    }
}
