use crate::client::ApiClient;
use crate::errors::ToolError;
use crate::report::{labels, Report};
use crate::tools::{require_string, str_field, u64_or, ToolHandler};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const TROUBLESHOOTING_PREFIX: &str = "/troubleshooting/v1alpha1";

/// Kick off an async diagnostic and report the task id with polling
/// instructions. Task-id lifetime is vendor-defined; it is never cached
/// here, only echoed to the caller.
fn async_started_report(kind: &str, device: &str, serial: &str, target: &str, data: &Value) -> Report {
    let task_id = data
        .get("taskId")
        .and_then(|v| v.as_str())
        .unwrap_or("UNKNOWN");
    let status = str_field(data, "status");

    let mut report = Report::new();
    report.line(format!("{} {} Test Initiated", labels::ASYNC, kind));
    report.line(format!("  From: {} ({})", device, serial));
    report.line(format!("  To: {}", target));
    report.line(format!("  Status: {}", status));
    report.line(format!("  Task ID: {}", task_id));

    report.section();
    report.line(format!(
        "{} Poll for results with get_async_test_result(task_id: '{}')",
        labels::INFO,
        task_id
    ));

    report.fact("Task ID", task_id);
    report.fact("Status", status);
    report
}

pub struct PingFromGateway {
    client: Arc<ApiClient>,
}

impl PingFromGateway {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for PingFromGateway {
    async fn execute(&self, args: Value) -> Result<Report, ToolError> {
        let serial = require_string(&args, "serial")?;
        let target = require_string(&args, "target")?;
        let count = u64_or(&args, "count", 5);
        let endpoint = format!("{}/gateways/{}/ping", TROUBLESHOOTING_PREFIX, serial);
        let body = serde_json::json!({ "target": target, "count": count });
        let data = self.client.post(&endpoint, body).await?;
        let device = data
            .get("gatewayName")
            .and_then(|v| v.as_str())
            .unwrap_or(serial.as_str())
            .to_string();
        Ok(async_started_report("Ping", &device, &serial, &target, &data))
    }
}

pub struct PingFromAp {
    client: Arc<ApiClient>,
}

impl PingFromAp {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for PingFromAp {
    async fn execute(&self, args: Value) -> Result<Report, ToolError> {
        let serial = require_string(&args, "serial")?;
        let target = require_string(&args, "target")?;
        let count = u64_or(&args, "count", 5);
        let endpoint = format!("{}/aps/{}/ping", TROUBLESHOOTING_PREFIX, serial);
        let body = serde_json::json!({ "target": target, "count": count });
        let data = self.client.post(&endpoint, body).await?;
        let device = data
            .get("apName")
            .and_then(|v| v.as_str())
            .unwrap_or(serial.as_str())
            .to_string();
        Ok(async_started_report("Ping", &device, &serial, &target, &data))
    }
}

pub struct TracerouteFromAp {
    client: Arc<ApiClient>,
}

impl TracerouteFromAp {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for TracerouteFromAp {
    async fn execute(&self, args: Value) -> Result<Report, ToolError> {
        let serial = require_string(&args, "serial")?;
        let target = require_string(&args, "target")?;
        let endpoint = format!("{}/aps/{}/traceroute", TROUBLESHOOTING_PREFIX, serial);
        let body = serde_json::json!({ "target": target });
        let data = self.client.post(&endpoint, body).await?;
        let device = data
            .get("apName")
            .and_then(|v| v.as_str())
            .unwrap_or(serial.as_str())
            .to_string();
        Ok(async_started_report(
            "Traceroute",
            &device,
            &serial,
            &target,
            &data,
        ))
    }
}

/// Poll an async diagnostic by task id and format the outcome per test
/// type. An expired or bogus id comes back from the vendor as a 404.
pub struct GetAsyncTestResult {
    client: Arc<ApiClient>,
}

impl GetAsyncTestResult {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for GetAsyncTestResult {
    async fn execute(&self, args: Value) -> Result<Report, ToolError> {
        let task_id = require_string(&args, "task_id")?;
        let endpoint = format!("{}/async-operations/{}", TROUBLESHOOTING_PREFIX, task_id);
        let data = self.client.get(&endpoint, &[]).await?;

        let status = str_field(&data, "status");
        let test_type = str_field(&data, "testType");
        let device = str_field(&data, "deviceName");
        let target = str_field(&data, "target");

        let mut report = Report::new();
        match status {
            "IN_PROGRESS" => {
                let progress = data
                    .get("progressPercent")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0);
                report.line(format!("{} Test In Progress", labels::ASYNC));
                report.line(format!("  Status: {}", status));
                report.line(format!("  Type: {}", test_type));
                report.line(format!("  Device: {}", device));
                report.line(format!("  Target: {}", target));
                report.line(format!("  Progress: {}%", progress));
                report.section();
                report.line(format!(
                    "{} Poll again in a few seconds for completion",
                    labels::INFO
                ));
            }
            "COMPLETED" => {
                let results = data.get("results").cloned().unwrap_or(Value::Null);
                report.line(format!("{} Test Complete: {}", labels::OK, test_type));
                report.line(format!("  Status: {}", status));
                report.line(format!("  Device: {}", device));
                report.line(format!("  Target: {}", target));
                if test_type == "PING" {
                    format_ping_results(&mut report, &results)?;
                } else if test_type == "TRACEROUTE" {
                    format_traceroute_results(&mut report, &results);
                }
            }
            "FAILED" => {
                let error = data
                    .get("errorMessage")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Unknown error");
                report.line(format!("{} Test Failed: {}", labels::ERR, test_type));
                report.line(format!("  Status: {}", status));
                report.line(format!("  Device: {}", device));
                report.line(format!("  Target: {}", target));
                report.line(format!("  Error: {}", error));
            }
            other => {
                report.line(format!("{} Status: {}", labels::ASYNC, other));
                report.line(format!("  Type: {}", test_type));
                report.line(format!("  Target: {}", target));
            }
        }

        report.fact("Status", status);
        report.fact("Test type", test_type);
        report.fact("Target", target);
        Ok(report)
    }
}

fn format_ping_results(report: &mut Report, results: &Value) -> Result<(), ToolError> {
    let sent = results.get("packetsSent").and_then(|v| v.as_u64()).unwrap_or(0);
    let received = results
        .get("packetsReceived")
        .and_then(|v| v.as_u64())
        .unwrap_or(0);
    let loss = results
        .get("packetLossPercent")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    let avg = results.get("avgLatencyMs").and_then(|v| v.as_f64()).unwrap_or(0.0);
    let max = results.get("maxLatencyMs").and_then(|v| v.as_f64()).unwrap_or(0.0);

    report.section();
    report.line(format!("{} Results", labels::DATA));
    report.line(format!("  Packets sent: {}, received: {}", sent, received));
    report.line(format!("  Loss: {:.1}%", loss));
    report.line(format!("  Latency avg: {:.1}ms, max: {:.1}ms", avg, max));

    let assessment = if loss == 0.0 && avg < 50.0 {
        format!("{} Excellent connectivity", labels::OK)
    } else if loss < 5.0 && avg < 100.0 {
        format!("{} Good connectivity", labels::OK)
    } else if loss < 20.0 {
        format!("{} Degraded connectivity, packet loss detected", labels::WARN)
    } else {
        format!("{} Poor connectivity, high loss", labels::CRIT)
    };
    report.section();
    report.line(assessment);

    report.fact("Packets sent", sent);
    report.fact("Packets received", received);
    Ok(())
}

fn format_traceroute_results(report: &mut Report, results: &Value) {
    let hops = results
        .get("hops")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    report.section();
    report.line(format!("{} Path: {} hops", labels::DATA, hops.len()));
    for hop in &hops {
        let index = hop.get("hop").and_then(|v| v.as_u64()).unwrap_or(0);
        let ip = hop.get("ip").and_then(|v| v.as_str()).unwrap_or("*");
        let mut line = format!("  {:2}. {}", index, ip);
        if let Some(latency) = hop.get("latencyMs").and_then(|v| v.as_f64()) {
            line.push_str(&format!(" {:.1}ms", latency));
        }
        report.line(line);
    }
    report.fact("Hops", hops.len());
}
