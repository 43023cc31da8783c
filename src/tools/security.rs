use crate::client::ApiClient;
use crate::errors::ToolError;
use crate::report::{labels, Report};
use crate::tools::{items_of, opt_string, str_field, u64_or, ToolHandler};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const IDPS_THREATS_ENDPOINT: &str = "/network-services/v1/idps/threats";

fn severity_label(severity: &str) -> &'static str {
    match severity {
        "CRITICAL" | "HIGH" => labels::CRIT,
        "MEDIUM" => labels::WARN,
        _ => labels::INFO,
    }
}

/// Recent IDS/IPS threat events. Tenants without the security subscription
/// get a 400 from the vendor, which surfaces as an upstream client error.
pub struct ListIdpsThreats {
    client: Arc<ApiClient>,
}

impl ListIdpsThreats {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for ListIdpsThreats {
    async fn execute(&self, args: Value) -> Result<Report, ToolError> {
        let query = [
            ("severity", opt_string(&args, "severity")),
            ("limit", Some(u64_or(&args, "limit", 100).to_string())),
        ];
        let data = self.client.get(IDPS_THREATS_ENDPOINT, &query).await?;
        let threats = items_of(&data);

        let mut critical = 0u64;
        let mut high = 0u64;
        let mut medium = 0u64;
        let mut low = 0u64;
        for threat in &threats {
            match str_field(threat, "severity") {
                "CRITICAL" => critical += 1,
                "HIGH" => high += 1,
                "MEDIUM" => medium += 1,
                _ => low += 1,
            }
        }
        let total = threats.len() as u64;

        let mut report = Report::new();
        report.line(format!("{} IDS/IPS Threats", labels::SEC));
        report.line(format!(
            "Total threats: {} (critical: {}, high: {}, medium: {}, low: {})",
            total, critical, high, medium, low
        ));

        if !threats.is_empty() {
            report.section();
            report.line(format!("{} Recent events", labels::DATA));
            for threat in &threats {
                let severity = str_field(threat, "severity");
                report.line(format!(
                    "  {} {} from {} on {}",
                    severity_label(severity),
                    str_field(threat, "signature"),
                    str_field(threat, "sourceIp"),
                    str_field(threat, "deviceName")
                ));
            }
        } else {
            report.section();
            report.line(format!("{} No threat events in the window", labels::OK));
        }

        report.fact("Critical", critical);
        report.fact("High", high);
        report.fact("Medium", medium);
        report.fact("Low", low);
        report.total_fact(
            "Total threats",
            total,
            &["Critical", "High", "Medium", "Low"],
        )?;
        Ok(report)
    }
}
