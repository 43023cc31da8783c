use crate::auth::TokenManager;
use crate::config::CentralConfig;
use crate::errors::{ToolError, ToolErrorKind};
use crate::mcp::catalog::{tool_catalog, tool_names, validate_tool_args, ToolDef};
use crate::observability::Telemetry;
use crate::report::labels;
use crate::services::logger::Logger;
use crate::tools::ToolHandler;
use crate::utils::redact::redact_text;
use crate::utils::suggest::suggest;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Single entry point for tool invocation. Looks the handler up, validates
/// arguments against the catalog schema, runs the handler inside a span,
/// and converts every error kind into a one-segment report. Nothing below
/// this boundary writes to the client stream.
pub struct Dispatcher {
    logger: Logger,
    telemetry: Arc<Telemetry>,
    config: Arc<CentralConfig>,
    auth: Arc<TokenManager>,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl Dispatcher {
    pub fn new(
        logger: Logger,
        telemetry: Arc<Telemetry>,
        config: Arc<CentralConfig>,
        auth: Arc<TokenManager>,
        handlers: HashMap<String, Arc<dyn ToolHandler>>,
    ) -> Result<Self, ToolError> {
        Self::validate_wiring(&handlers)?;
        Ok(Self {
            logger: logger.child("dispatcher"),
            telemetry,
            config,
            auth,
            handlers,
        })
    }

    /// Every catalog entry must have a handler; a gap is a wiring bug
    /// caught at startup rather than on first call.
    fn validate_wiring(handlers: &HashMap<String, Arc<dyn ToolHandler>>) -> Result<(), ToolError> {
        let mut missing: Vec<String> = tool_catalog()
            .iter()
            .filter(|tool| !handlers.contains_key(&tool.name))
            .map(|tool| tool.name.clone())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        Err(ToolError::internal("Tool wiring is incomplete")
            .with_details(serde_json::json!({ "missing_tools": missing })))
    }

    pub fn list_tools(&self) -> &'static Vec<ToolDef> {
        tool_catalog()
    }

    /// Invoke a tool. Always returns a well-formed report; failures never
    /// surface as protocol-level errors or leak stack detail.
    pub async fn call_tool(&self, name: &str, args: Value) -> String {
        let Some(handler) = self.handlers.get(name) else {
            let mut text = format!("{} Unknown tool: {}", labels::ERR, name);
            let suggestions = suggest(name, &tool_names(), 3);
            if !suggestions.is_empty() {
                text.push_str(&format!("\nDid you mean: {}", suggestions.join(", ")));
            }
            return text;
        };

        let span = self.telemetry.start_span(name, &args);

        if let Err(err) = validate_tool_args(name, &args) {
            self.telemetry.end_span(&span, "error", Some(err.kind_label()));
            return self.redact(self.error_report(name, &err)).await;
        }

        let text = match handler.execute(args).await {
            Ok(report) => {
                self.telemetry.end_span(&span, "ok", None);
                report.render()
            }
            Err(err) => {
                self.logger.error(
                    "Tool call failed",
                    Some(&serde_json::json!({
                        "tool": name,
                        "span_id": span.id,
                        "kind": err.kind_label(),
                        "code": err.code,
                        "status": err.status,
                        "message": err.message,
                    })),
                );
                self.telemetry.end_span(&span, "error", Some(err.kind_label()));
                self.error_report(name, &err)
            }
        };

        self.redact(text).await
    }

    fn error_report(&self, tool: &str, err: &ToolError) -> String {
        match err.kind {
            ToolErrorKind::Auth => format!("{} Authentication failed", labels::ERR),
            ToolErrorKind::CircuitOpen => {
                format!("{} Upstream temporarily unavailable", labels::ERR)
            }
            ToolErrorKind::UpstreamClient => {
                format!("{} {}: {}", labels::ERR, tool, err.message)
            }
            ToolErrorKind::UpstreamUnavailable => {
                if err.status.is_some() {
                    format!("{} {}: Upstream server error", labels::ERR, tool)
                } else {
                    format!("{} {}: {}", labels::ERR, tool, err.message)
                }
            }
            ToolErrorKind::Timeout => format!("{} {}: Request timed out", labels::ERR, tool),
            ToolErrorKind::Schema => format!(
                "{} Invalid input for {}\n{}",
                labels::ERR,
                tool,
                err.message
            ),
            ToolErrorKind::Cancelled => format!("{} {}: Cancelled", labels::ERR, tool),
            ToolErrorKind::Config | ToolErrorKind::Internal => {
                format!("{} {}: {}", labels::ERR, tool, err.message)
            }
        }
    }

    /// Last line of defense against credential leakage: scrub the live
    /// client secret and access token from the rendered text.
    async fn redact(&self, text: String) -> String {
        let mut extra = vec![self.config.client_secret.clone()];
        if let Some(token) = self.auth.current_token().await {
            extra.push(token);
        }
        redact_text(&text, Some(&extra))
    }
}
