use crate::client::ApiClient;
use crate::errors::ToolError;
use crate::report::{bytes, labels, Report};
use crate::tools::{items_of, opt_string, str_field, u64_or, ToolHandler};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const CLIENTS_ENDPOINT: &str = "/monitoring/v2/clients";
const TOP_CLIENTS_ENDPOINT: &str = "/monitoring/v2/clients/bandwidth-usage/topn";

pub struct ListAllClients {
    client: Arc<ApiClient>,
}

impl ListAllClients {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for ListAllClients {
    async fn execute(&self, args: Value) -> Result<Report, ToolError> {
        let query = [
            ("client_type", opt_string(&args, "client_type")),
            ("limit", Some(u64_or(&args, "limit", 100).to_string())),
        ];
        let data = self.client.get(CLIENTS_ENDPOINT, &query).await?;
        let items = items_of(&data);

        let mut wireless = 0u64;
        let mut wired = 0u64;
        let mut other = 0u64;
        for item in &items {
            match str_field(item, "clientType") {
                "WIRELESS" => wireless += 1,
                "WIRED" => wired += 1,
                _ => other += 1,
            }
        }
        let total = items.len() as u64;

        let mut report = Report::new();
        report.line(format!("{} Connected Clients", labels::DATA));
        report.line(format!("Total clients: {}", total));

        report.section();
        report.line(format!("{} By connection", labels::STATS));
        report.line(format!("  {} Wireless: {}", labels::AP, wireless));
        report.line(format!("  {} Wired: {}", labels::SW, wired));
        report.line(format!("  [--] Other: {}", other));

        report.fact("Wireless", wireless);
        report.fact("Wired", wired);
        report.fact("Other", other);
        report.total_fact("Total clients", total, &["Wireless", "Wired", "Other"])?;
        Ok(report)
    }
}

/// Top talkers by combined rx+tx usage over the recent window.
pub struct GetTopClientsByUsage {
    client: Arc<ApiClient>,
}

impl GetTopClientsByUsage {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for GetTopClientsByUsage {
    async fn execute(&self, args: Value) -> Result<Report, ToolError> {
        let query = [("count", Some(u64_or(&args, "count", 10).to_string()))];
        let data = self.client.get(TOP_CLIENTS_ENDPOINT, &query).await?;
        let items = items_of(&data);

        let mut ranked: Vec<(String, u64)> = items
            .iter()
            .map(|item| {
                let name = item
                    .get("name")
                    .or_else(|| item.get("macAddress"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string();
                let usage = item.get("usageBytes").and_then(|v| v.as_u64()).unwrap_or(
                    item.get("rxBytes").and_then(|v| v.as_u64()).unwrap_or(0)
                        + item.get("txBytes").and_then(|v| v.as_u64()).unwrap_or(0),
                );
                (name, usage)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        let combined: u64 = ranked.iter().map(|(_, usage)| usage).sum();

        let mut report = Report::new();
        report.line(format!("{} Top Clients by Usage", labels::TREND));
        report.line(format!(
            "Clients ranked: {}, combined usage: {} bytes ({})",
            ranked.len(),
            combined,
            bytes(combined)
        ));

        report.section();
        report.line(format!("{} Ranking", labels::DATA));
        for (rank, (name, usage)) in ranked.iter().enumerate() {
            report.line(format!("  {}. {}: {}", rank + 1, name, bytes(*usage)));
        }

        report.fact("Clients ranked", ranked.len());
        report.fact("Combined usage bytes", combined);
        Ok(report)
    }
}
