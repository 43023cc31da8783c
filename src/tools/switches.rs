use crate::client::ApiClient;
use crate::errors::ToolError;
use crate::report::{labels, Report};
use crate::tools::{items_of, require_string, str_field, ToolHandler};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const SWITCHES_ENDPOINT: &str = "/monitoring/v1/switches";

/// Per-port interface status for one switch.
pub struct GetSwitchInterfaces {
    client: Arc<ApiClient>,
}

impl GetSwitchInterfaces {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for GetSwitchInterfaces {
    async fn execute(&self, args: Value) -> Result<Report, ToolError> {
        let serial = require_string(&args, "serial")?;
        let endpoint = format!("{}/{}/interfaces", SWITCHES_ENDPOINT, serial);
        let data = self.client.get(&endpoint, &[]).await?;
        let interfaces = items_of(&data);

        let mut up = 0u64;
        let mut down = 0u64;
        let mut other = 0u64;
        for interface in &interfaces {
            match str_field(interface, "status") {
                "UP" => up += 1,
                "DOWN" => down += 1,
                _ => other += 1,
            }
        }
        let total = interfaces.len() as u64;

        let mut report = Report::new();
        report.line(format!("{} Switch Interfaces: {}", labels::SW, serial));
        report.line(format!(
            "Total ports: {} (up: {}, down: {}, other: {})",
            total, up, down, other
        ));

        report.section();
        report.line(format!("{} Port status", labels::STATS));
        for interface in &interfaces {
            let status = str_field(interface, "status");
            let label = match status {
                "UP" => labels::UP,
                "DOWN" => labels::DN,
                _ => "[--]",
            };
            let mut line = format!("  {} {}", label, str_field(interface, "name"));
            if let Some(speed) = interface.get("speedMbps").and_then(|v| v.as_u64()) {
                line.push_str(&format!(" {} Mbps", speed));
            }
            if let Some(vlan) = interface.get("vlan").and_then(|v| v.as_u64()) {
                line.push_str(&format!(" vlan {}", vlan));
            }
            report.line(line);
        }

        report.fact("Ports up", up);
        report.fact("Ports down", down);
        report.fact("Ports other", other);
        report.total_fact(
            "Total ports",
            total,
            &["Ports up", "Ports down", "Ports other"],
        )?;
        Ok(report)
    }
}
