use crate::client::ApiClient;
use crate::errors::ToolError;
use crate::report::{labels, percent, Report};
use crate::tools::{items_of, require_string, u64_or, ToolHandler};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const SITES_HEALTH_ENDPOINT: &str = "/network-monitoring/v1alpha1/sites-health";
const SITE_ENDPOINT: &str = "/network-monitoring/v1alpha1/sites";

fn health_label(health: &str) -> &'static str {
    match health {
        "Good" => labels::OK,
        "Fair" => labels::WARN,
        "Poor" => labels::CRIT,
        _ => "[--]",
    }
}

fn normalize_health(raw: &str) -> &'static str {
    match raw.to_ascii_lowercase().as_str() {
        "good" => "Good",
        "fair" => "Fair",
        "poor" => "Poor",
        _ => "Unknown",
    }
}

/// Fleet-wide site health overview with alert hot spots.
pub struct GetSitesHealth {
    client: Arc<ApiClient>,
}

impl GetSitesHealth {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for GetSitesHealth {
    async fn execute(&self, args: Value) -> Result<Report, ToolError> {
        let query = [
            ("limit", Some(u64_or(&args, "limit", 100).to_string())),
            ("offset", Some(u64_or(&args, "offset", 0).to_string())),
        ];
        let data = self.client.get(SITES_HEALTH_ENDPOINT, &query).await?;
        let sites = items_of(&data);
        let total_sites = sites.len() as u64;

        let mut good = 0u64;
        let mut fair = 0u64;
        let mut poor = 0u64;
        let mut unknown = 0u64;
        let mut total_devices = 0u64;
        let mut total_clients = 0u64;
        let mut total_alerts = 0u64;
        let mut alerting: Vec<(String, u64, &'static str)> = Vec::new();

        for site in &sites {
            let health = normalize_health(
                site.get("overallHealth")
                    .and_then(|v| v.as_str())
                    .unwrap_or(""),
            );
            match health {
                "Good" => good += 1,
                "Fair" => fair += 1,
                "Poor" => poor += 1,
                _ => unknown += 1,
            }
            total_devices += site.get("deviceCount").and_then(|v| v.as_u64()).unwrap_or(0);
            total_clients += site.get("clientCount").and_then(|v| v.as_u64()).unwrap_or(0);
            let alerts = site.get("alertCount").and_then(|v| v.as_u64()).unwrap_or(0);
            if alerts > 0 {
                total_alerts += alerts;
                let name = site
                    .get("siteName")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Unknown")
                    .to_string();
                alerting.push((name, alerts, health_label(health)));
            }
        }
        alerting.sort_by(|a, b| b.1.cmp(&a.1));

        let mut report = Report::new();
        report.line(format!("{} Sites Health Overview", labels::NET));
        report.line(format!("Total sites: {}", total_sites));

        report.section();
        report.line(format!("{} Health distribution", labels::STATS));
        for (name, count) in [
            ("Good", good),
            ("Fair", fair),
            ("Poor", poor),
            ("Unknown", unknown),
        ] {
            let share = if total_sites > 0 {
                count as f64 / total_sites as f64 * 100.0
            } else {
                0.0
            };
            report.line(format!(
                "  {} {}: {} ({})",
                health_label(name),
                name,
                count,
                percent(share)
            ));
        }

        report.section();
        report.line(format!("{} Aggregate", labels::STATS));
        report.line(format!("  {} Devices: {}", labels::DEV, total_devices));
        report.line(format!("  {} Clients: {}", labels::DATA, total_clients));
        report.line(format!("  {} Active alerts: {}", labels::WARN, total_alerts));

        if !alerting.is_empty() {
            report.section();
            report.line(format!("{} Sites with alerts", labels::CRIT));
            for (rank, (name, alerts, label)) in alerting.iter().take(5).enumerate() {
                report.line(format!("  {}. {} {}: {} alerts", rank + 1, label, name, alerts));
            }
        }

        report.fact("Good sites", good);
        report.fact("Fair sites", fair);
        report.fact("Poor sites", poor);
        report.fact("Unknown sites", unknown);
        report.total_fact(
            "Total sites",
            total_sites,
            &["Good sites", "Fair sites", "Poor sites", "Unknown sites"],
        )?;
        report.fact("Devices", total_devices);
        report.fact("Clients", total_clients);
        report.fact("Active alerts", total_alerts);
        Ok(report)
    }
}

/// Single-site drill-down.
pub struct GetSiteDetails {
    client: Arc<ApiClient>,
}

impl GetSiteDetails {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for GetSiteDetails {
    async fn execute(&self, args: Value) -> Result<Report, ToolError> {
        let site_id = require_string(&args, "site_id")?;
        let endpoint = format!("{}/{}", SITE_ENDPOINT, site_id);
        let data = self.client.get(&endpoint, &[]).await?;

        let name = data
            .get("siteName")
            .and_then(|v| v.as_str())
            .unwrap_or(site_id.as_str());
        let health = normalize_health(
            data.get("overallHealth")
                .and_then(|v| v.as_str())
                .unwrap_or(""),
        );
        let devices = data.get("deviceCount").and_then(|v| v.as_u64()).unwrap_or(0);
        let clients = data.get("clientCount").and_then(|v| v.as_u64()).unwrap_or(0);
        let alerts = data.get("alertCount").and_then(|v| v.as_u64()).unwrap_or(0);

        let mut report = Report::new();
        report.line(format!("{} Site: {}", labels::NET, name));
        report.line(format!("  {} Health: {}", health_label(health), health));
        report.line(format!("  {} Devices: {}", labels::DEV, devices));
        report.line(format!("  {} Clients: {}", labels::DATA, clients));
        report.line(format!("  {} Active alerts: {}", labels::WARN, alerts));
        if let Some(address) = data.get("address").and_then(|v| v.as_str()) {
            report.line(format!("  {} Address: {}", labels::INFO, address));
        }

        report.fact("Health", health);
        report.fact("Devices", devices);
        report.fact("Clients", clients);
        report.fact("Active alerts", alerts);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_values_are_normalized_case_insensitively() {
        assert_eq!(normalize_health("GOOD"), "Good");
        assert_eq!(normalize_health("poor"), "Poor");
        assert_eq!(normalize_health(""), "Unknown");
        assert_eq!(normalize_health("excellent"), "Unknown");
    }

    #[test]
    fn health_labels_use_the_closed_vocabulary() {
        assert_eq!(health_label("Good"), "[OK]");
        assert_eq!(health_label("Fair"), "[WARN]");
        assert_eq!(health_label("Poor"), "[CRIT]");
    }
}
