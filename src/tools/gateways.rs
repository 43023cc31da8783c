use crate::client::ApiClient;
use crate::errors::ToolError;
use crate::report::{labels, uptime, Report};
use crate::tools::{items_of, require_string, str_field, u64_or, ToolHandler};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const GATEWAYS_ENDPOINT: &str = "/monitoring/v1/gateways";

pub struct ListGateways {
    client: Arc<ApiClient>,
}

impl ListGateways {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for ListGateways {
    async fn execute(&self, args: Value) -> Result<Report, ToolError> {
        let query = [("limit", Some(u64_or(&args, "limit", 100).to_string()))];
        let data = self.client.get(GATEWAYS_ENDPOINT, &query).await?;
        let items = items_of(&data);

        let mut online = 0u64;
        let mut offline = 0u64;
        let mut other = 0u64;
        for item in &items {
            match str_field(item, "status") {
                "ONLINE" | "UP" => online += 1,
                "OFFLINE" | "DOWN" => offline += 1,
                _ => other += 1,
            }
        }
        let total = items.len() as u64;

        let mut report = Report::new();
        report.line(format!("{} Gateways", labels::GW));
        report.line(format!("Total gateways: {}", total));

        report.section();
        report.line(format!("{} By status", labels::STATS));
        report.line(format!("  {} Online: {}", labels::UP, online));
        report.line(format!("  {} Offline: {}", labels::DN, offline));
        report.line(format!("  [--] Other: {}", other));

        if offline > 0 {
            report.section();
            report.line(format!("{} Offline gateways", labels::CRIT));
            for item in items.iter().filter(|i| {
                matches!(str_field(i, "status"), "OFFLINE" | "DOWN")
            }) {
                report.line(format!(
                    "  {} {} ({})",
                    labels::DN,
                    str_field(item, "name"),
                    str_field(item, "serial")
                ));
            }
        }

        report.fact("Online", online);
        report.fact("Offline", offline);
        report.fact("Other", other);
        report.total_fact("Total gateways", total, &["Online", "Offline", "Other"])?;
        Ok(report)
    }
}

/// Per-uplink state for one gateway, including VPN tunnel count.
pub struct GetGatewayUplinks {
    client: Arc<ApiClient>,
}

impl GetGatewayUplinks {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for GetGatewayUplinks {
    async fn execute(&self, args: Value) -> Result<Report, ToolError> {
        let serial = require_string(&args, "serial")?;
        let endpoint = format!("{}/{}/uplinks", GATEWAYS_ENDPOINT, serial);
        let data = self.client.get(&endpoint, &[]).await?;
        let uplinks = items_of(&data);

        let mut up = 0u64;
        let mut down = 0u64;
        for uplink in &uplinks {
            match str_field(uplink, "status") {
                "UP" | "ONLINE" => up += 1,
                _ => down += 1,
            }
        }
        let total = uplinks.len() as u64;
        let tunnels = data.get("tunnelCount").and_then(|v| v.as_u64()).unwrap_or(0);

        let mut report = Report::new();
        report.line(format!("{} Gateway Uplinks: {}", labels::GW, serial));
        report.line(format!(
            "Total uplinks: {} (up: {}, down: {})",
            total, up, down
        ));

        report.section();
        report.line(format!("{} Uplink state", labels::STATS));
        for uplink in &uplinks {
            let status = str_field(uplink, "status");
            let label = if matches!(status, "UP" | "ONLINE") {
                labels::UP
            } else {
                labels::DN
            };
            let mut line = format!(
                "  {} {} ({})",
                label,
                str_field(uplink, "name"),
                str_field(uplink, "interface")
            );
            if let Some(seconds) = uplink.get("uptimeSeconds").and_then(|v| v.as_u64()) {
                line.push_str(&format!(", up {}", uptime(seconds)));
            }
            report.line(line);
        }
        if tunnels > 0 {
            report.section();
            report.line(format!("{} Active tunnels: {}", labels::VPN, tunnels));
        }

        report.fact("Uplinks up", up);
        report.fact("Uplinks down", down);
        report.total_fact("Total uplinks", total, &["Uplinks up", "Uplinks down"])?;
        Ok(report)
    }
}
