use crate::client::ApiClient;
use crate::errors::ToolError;
use crate::report::{labels, Report};
use crate::tools::{items_of, opt_string, str_field, u64_or, ToolHandler};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

const DEVICES_ENDPOINT: &str = "/inventory/v1/devices";

fn type_label(device_type: &str) -> &'static str {
    match device_type {
        "ACCESS_POINT" => labels::AP,
        "SWITCH" => labels::SW,
        "GATEWAY" => labels::GW,
        _ => "[--]",
    }
}

fn status_label(status: &str) -> &'static str {
    match status {
        "ONLINE" => labels::UP,
        "OFFLINE" => labels::DN,
        _ => "[--]",
    }
}

/// Full device inventory with type, status, and deployment breakdowns.
pub struct GetDeviceList {
    client: Arc<ApiClient>,
}

impl GetDeviceList {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for GetDeviceList {
    async fn execute(&self, args: Value) -> Result<Report, ToolError> {
        let query = [
            ("filter", opt_string(&args, "filter")),
            ("sort", opt_string(&args, "sort")),
            ("limit", Some(u64_or(&args, "limit", 100).to_string())),
            ("next", opt_string(&args, "next")),
        ];
        let data = self.client.get(DEVICES_ENDPOINT, &query).await?;

        let items = items_of(&data);
        let total = data
            .get("total")
            .and_then(|v| v.as_u64())
            .unwrap_or(items.len() as u64);
        let next_cursor = data.get("next").and_then(|v| v.as_str());

        let mut by_type: BTreeMap<String, u64> = BTreeMap::new();
        let mut by_status: BTreeMap<String, u64> = BTreeMap::new();
        let mut by_deployment: BTreeMap<String, u64> = BTreeMap::new();
        for item in &items {
            *by_type.entry(str_field(item, "deviceType").to_string()).or_insert(0) += 1;
            *by_status.entry(str_field(item, "status").to_string()).or_insert(0) += 1;
            *by_deployment
                .entry(str_field(item, "deployment").to_string())
                .or_insert(0) += 1;
        }

        let mut report = Report::new();
        report.line(format!("{} Device Inventory", labels::DEV));
        report.line(format!(
            "Total devices: {} (showing {})",
            total,
            items.len()
        ));

        report.section();
        report.line(format!("{} By type", labels::STATS));
        for (device_type, count) in &by_type {
            report.line(format!(
                "  {} {}: {}",
                type_label(device_type),
                device_type,
                count
            ));
        }

        report.section();
        report.line(format!("{} By status", labels::STATS));
        for (status, count) in &by_status {
            report.line(format!("  {} {}: {}", status_label(status), status, count));
        }

        if by_deployment.len() > 1 {
            report.section();
            report.line(format!("{} By deployment", labels::STATS));
            for (deployment, count) in &by_deployment {
                report.line(format!("  - {}: {}", deployment, count));
            }
        }

        if next_cursor.is_some() {
            report.section();
            report.line(format!(
                "{} More results available, pass the next cursor to continue",
                labels::INFO
            ));
        }

        report.fact("Total devices", total);
        report.fact("Shown", items.len());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_labels_cover_the_three_device_classes() {
        assert_eq!(type_label("ACCESS_POINT"), "[AP]");
        assert_eq!(type_label("SWITCH"), "[SW]");
        assert_eq!(type_label("GATEWAY"), "[GW]");
        assert_eq!(type_label("SENSOR"), "[--]");
    }

    #[test]
    fn status_labels_map_online_offline() {
        assert_eq!(status_label("ONLINE"), "[UP]");
        assert_eq!(status_label("OFFLINE"), "[DN]");
    }
}
