use crate::client::ApiClient;
use crate::errors::ToolError;
use crate::report::{labels, Report};
use crate::tools::{items_of, str_field, u64_or, ToolHandler};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

const WLANS_ENDPOINT: &str = "/configuration/v1/wlans";

pub struct ListWlans {
    client: Arc<ApiClient>,
}

impl ListWlans {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for ListWlans {
    async fn execute(&self, args: Value) -> Result<Report, ToolError> {
        let query = [("limit", Some(u64_or(&args, "limit", 100).to_string()))];
        let data = self.client.get(WLANS_ENDPOINT, &query).await?;
        let wlans = items_of(&data);

        let mut enabled = 0u64;
        let mut disabled = 0u64;
        let mut by_security: BTreeMap<String, u64> = BTreeMap::new();
        for wlan in &wlans {
            if wlan.get("enabled").and_then(|v| v.as_bool()).unwrap_or(false) {
                enabled += 1;
            } else {
                disabled += 1;
            }
            *by_security
                .entry(str_field(wlan, "security").to_string())
                .or_insert(0) += 1;
        }
        let total = wlans.len() as u64;

        let mut report = Report::new();
        report.line(format!("{} Configured WLANs", labels::NET));
        report.line(format!(
            "Total WLANs: {} (enabled: {}, disabled: {})",
            total, enabled, disabled
        ));

        report.section();
        report.line(format!("{} SSIDs", labels::DATA));
        for wlan in &wlans {
            let label = if wlan.get("enabled").and_then(|v| v.as_bool()).unwrap_or(false) {
                labels::UP
            } else {
                labels::DN
            };
            report.line(format!(
                "  {} {} ({})",
                label,
                str_field(wlan, "name"),
                str_field(wlan, "security")
            ));
        }

        report.section();
        report.line(format!("{} By security", labels::SEC));
        for (security, count) in &by_security {
            report.line(format!("  - {}: {}", security, count));
        }

        report.fact("Enabled", enabled);
        report.fact("Disabled", disabled);
        report.total_fact("Total WLANs", total, &["Enabled", "Disabled"])?;
        Ok(report)
    }
}
