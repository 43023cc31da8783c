use crate::client::ApiClient;
use crate::errors::ToolError;
use crate::report::{labels, uptime, Report};
use crate::tools::{require_string, str_field, ToolHandler};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const APS_ENDPOINT: &str = "/monitoring/v2/aps";

/// Single access point drill-down: status, firmware, uptime, radios.
pub struct GetApDetails {
    client: Arc<ApiClient>,
}

impl GetApDetails {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for GetApDetails {
    async fn execute(&self, args: Value) -> Result<Report, ToolError> {
        let serial = require_string(&args, "serial")?;
        let endpoint = format!("{}/{}", APS_ENDPOINT, serial);
        let data = self.client.get(&endpoint, &[]).await?;

        let name = data
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or(serial.as_str());
        let status = str_field(&data, "status");
        let status_label = if status == "ONLINE" { labels::UP } else { labels::DN };
        let clients = data.get("clientCount").and_then(|v| v.as_u64()).unwrap_or(0);
        let uptime_secs = data.get("uptimeSeconds").and_then(|v| v.as_u64());
        let radios = data
            .get("radios")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut report = Report::new();
        report.line(format!("{} Access Point: {}", labels::AP, name));
        report.line(format!("  {} Status: {}", status_label, status));
        report.line(format!("  Serial: {}", serial));
        if let Some(model) = data.get("model").and_then(|v| v.as_str()) {
            report.line(format!("  Model: {}", model));
        }
        if let Some(ip) = data.get("ipAddress").and_then(|v| v.as_str()) {
            report.line(format!("  IP: {}", ip));
        }
        if let Some(firmware) = data.get("firmwareVersion").and_then(|v| v.as_str()) {
            report.line(format!("  Firmware: {}", firmware));
        }
        if let Some(seconds) = uptime_secs {
            report.line(format!("  Uptime: {}", uptime(seconds)));
        }
        report.line(format!("  {} Clients: {}", labels::DATA, clients));
        report.line(format!("  Radios: {}", radios.len()));

        if !radios.is_empty() {
            report.section();
            report.line(format!("{} Radio state", labels::STATS));
            for radio in &radios {
                let band = str_field(radio, "band");
                let channel = radio
                    .get("channel")
                    .and_then(|v| v.as_u64())
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let radio_status = str_field(radio, "status");
                let label = if radio_status == "UP" { labels::UP } else { labels::DN };
                report.line(format!("  {} {} ch {}", label, band, channel));
            }
        }

        report.fact("Status", status);
        report.fact("Clients", clients);
        report.fact("Radios", radios.len());
        Ok(report)
    }
}
