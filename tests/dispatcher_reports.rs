mod common;

use common::{build_rig, RigOptions, TEST_CLIENT_SECRET};
use httpmock::prelude::*;
use serde_json::json;

fn oauth_mock<'a>(server: &'a MockServer, token: &str) -> httpmock::Mock<'a> {
    server.mock(|when, then| {
        when.method(POST).path("/oauth2/token");
        then.status(200)
            .json_body(json!({"access_token": token, "expires_in": 3600}));
    })
}

#[tokio::test]
async fn unknown_tool_yields_a_single_error_report_with_zero_io() {
    let server = MockServer::start();
    let oauth = oauth_mock(&server, "tok-unknown");

    let rig = build_rig(&server.base_url(), RigOptions::default());
    let report = rig.dispatcher.call_tool("does_not_exist", json!({})).await;

    assert!(
        report.starts_with("[ERR] Unknown tool: does_not_exist"),
        "report: {}",
        report
    );
    assert_eq!(oauth.hits(), 0);
    // No rate-limiter token was consumed either.
    assert_eq!(rig.limiter.available().await, 100);
}

#[tokio::test]
async fn typoed_tool_name_gets_a_suggestion() {
    let server = MockServer::start();
    let rig = build_rig(&server.base_url(), RigOptions::default());
    let report = rig
        .dispatcher
        .call_tool("get_devices_list", json!({}))
        .await;
    assert!(report.contains("Did you mean"), "report: {}", report);
    assert!(report.contains("get_device_list"), "report: {}", report);
}

#[tokio::test]
async fn schema_violations_are_reported_without_invoking_the_handler() {
    let server = MockServer::start();
    let oauth = oauth_mock(&server, "tok-schema");

    let rig = build_rig(&server.base_url(), RigOptions::default());
    let report = rig
        .dispatcher
        .call_tool("get_device_list", json!({"limit": "ten"}))
        .await;

    assert!(
        report.starts_with("[ERR] Invalid input for get_device_list"),
        "report: {}",
        report
    );
    assert!(report.contains("limit"), "report: {}", report);
    assert_eq!(oauth.hits(), 0);
}

#[tokio::test]
async fn auth_failure_maps_to_the_uniform_envelope() {
    let server = MockServer::start();
    let _oauth = server.mock(|when, then| {
        when.method(POST).path("/oauth2/token");
        then.status(500);
    });

    let rig = build_rig(&server.base_url(), RigOptions::default());
    let report = rig.dispatcher.call_tool("get_sites_health", json!({})).await;
    assert_eq!(report, "[ERR] Authentication failed");
}

#[tokio::test]
async fn circuit_open_maps_to_upstream_temporarily_unavailable() {
    let server = MockServer::start();
    let _oauth = oauth_mock(&server, "tok-open");
    let _failing = server.mock(|when, then| {
        when.method(GET)
            .path("/network-monitoring/v1alpha1/sites-health");
        then.status(500);
    });

    let rig = build_rig(
        &server.base_url(),
        RigOptions {
            breaker_threshold: 1,
            ..RigOptions::default()
        },
    );
    // Trip the breaker, then observe the dispatcher-level envelope.
    let _ = rig.dispatcher.call_tool("get_sites_health", json!({})).await;
    let report = rig.dispatcher.call_tool("get_sites_health", json!({})).await;
    assert_eq!(report, "[ERR] Upstream temporarily unavailable");
}

#[tokio::test]
async fn upstream_4xx_maps_to_a_tool_prefixed_reason() {
    let server = MockServer::start();
    let _oauth = oauth_mock(&server, "tok-404");
    let _missing = server.mock(|when, then| {
        when.method(GET)
            .path("/network-monitoring/v1alpha1/sites/unknown-site");
        then.status(404);
    });

    let rig = build_rig(&server.base_url(), RigOptions::default());
    let report = rig
        .dispatcher
        .call_tool("get_site_details", json!({"site_id": "unknown-site"}))
        .await;
    assert!(
        report.starts_with("[ERR] get_site_details:"),
        "report: {}",
        report
    );
    assert!(report.contains("404"), "report: {}", report);
}

#[tokio::test]
async fn oversized_list_sections_are_truncated_under_8_kib() {
    let server = MockServer::start();
    let _oauth = oauth_mock(&server, "tok-trunc");
    let interfaces: Vec<_> = (0..500)
        .map(|i| json!({"name": format!("1/1/{}", i), "status": "UP", "speedMbps": 1000}))
        .collect();
    let _switch = server.mock(|when, then| {
        when.method(GET)
            .path("/monitoring/v1/switches/CN12345678/interfaces");
        then.status(200).json_body(json!({"items": interfaces}));
    });

    let rig = build_rig(&server.base_url(), RigOptions::default());
    let report = rig
        .dispatcher
        .call_tool("get_switch_interfaces", json!({"serial": "CN12345678"}))
        .await;

    assert!(report.len() <= 8 * 1024, "report is {} bytes", report.len());
    assert!(report.contains("[INFO] Truncated"), "report: {}", report);
    assert!(report.contains("more"), "report: {}", report);
    assert!(report.contains("── Verification ──"), "report: {}", report);
    assert!(report.contains("Total ports: 500"), "report: {}", report);
}

#[tokio::test]
async fn secrets_never_reach_the_report_text() {
    let server = MockServer::start();
    let _oauth = oauth_mock(&server, "tok-leaky-value-123456");
    // A hostile payload that echoes credentials back in data fields.
    let _devices = server.mock(|when, then| {
        when.method(GET).path("/inventory/v1/devices");
        then.status(200).json_body(json!({
            "items": [
                {"deviceType": "ACCESS_POINT", "status": "ONLINE", "deployment": TEST_CLIENT_SECRET},
                {"deviceType": "SWITCH", "status": "ONLINE", "deployment": "tok-leaky-value-123456"},
            ],
        }));
    });

    let rig = build_rig(&server.base_url(), RigOptions::default());
    let report = rig
        .dispatcher
        .call_tool("get_device_list", json!({}))
        .await;

    assert!(!report.contains(TEST_CLIENT_SECRET), "report: {}", report);
    assert!(!report.contains("tok-leaky-value-123456"), "report: {}", report);
}

#[tokio::test]
async fn checkpoint_values_echo_the_report_body() {
    let server = MockServer::start();
    let _oauth = oauth_mock(&server, "tok-echo");
    let _sites = server.mock(|when, then| {
        when.method(GET)
            .path("/network-monitoring/v1alpha1/sites-health");
        then.status(200).json_body(json!({
            "items": [
                {"siteName": "HQ", "overallHealth": "Good", "deviceCount": 4, "clientCount": 25, "alertCount": 0},
                {"siteName": "Branch", "overallHealth": "Poor", "deviceCount": 2, "clientCount": 9, "alertCount": 3},
                {"siteName": "Lab", "overallHealth": "Good", "deviceCount": 1, "clientCount": 0, "alertCount": 0},
            ],
        }));
    });

    let rig = build_rig(&server.base_url(), RigOptions::default());
    let report = rig.dispatcher.call_tool("get_sites_health", json!({})).await;

    let marker = report.find("── Verification ──").expect("checkpoint present");
    let (body, footer) = report.split_at(marker);
    for fact_line in ["Total sites: 3", "Devices: 7", "Clients: 34", "Active alerts: 3"] {
        assert!(footer.contains(fact_line), "footer missing {}", fact_line);
        let value = fact_line.split(": ").nth(1).expect("value");
        assert!(body.contains(value), "body missing value {}", value);
    }
}

#[tokio::test]
async fn health_probe_reports_all_components() {
    let server = MockServer::start();
    let _oauth = oauth_mock(&server, "tok-health");
    let _base = server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(401);
    });

    let rig = build_rig(&server.base_url(), RigOptions::default());
    rig.auth
        .install_token("tok-health", std::time::Duration::from_secs(1800))
        .await;
    let report = rig
        .dispatcher
        .call_tool("check_server_health", json!({}))
        .await;

    assert!(report.starts_with("[HEALTH]"), "report: {}", report);
    assert!(report.contains("auth: healthy"), "report: {}", report);
    assert!(report.contains("circuit_breaker: healthy"), "report: {}", report);
    assert!(report.contains("rate_limiter: healthy"), "report: {}", report);
    assert!(report.contains("vendor_api: healthy"), "report: {}", report);
    assert!(report.contains("Overall: healthy"), "report: {}", report);
}

#[tokio::test]
async fn async_diagnostics_round_trip_the_task_id() {
    let server = MockServer::start();
    let _oauth = oauth_mock(&server, "tok-async");
    let _ping = server.mock(|when, then| {
        when.method(POST)
            .path("/troubleshooting/v1alpha1/gateways/GW001/ping");
        then.status(200).json_body(json!({
            "taskId": "task-42",
            "status": "IN_PROGRESS",
            "gatewayName": "edge-gw",
        }));
    });
    let _result = server.mock(|when, then| {
        when.method(GET)
            .path("/troubleshooting/v1alpha1/async-operations/task-42");
        then.status(200).json_body(json!({
            "status": "COMPLETED",
            "testType": "PING",
            "deviceName": "edge-gw",
            "target": "10.0.0.1",
            "results": {
                "packetsSent": 5,
                "packetsReceived": 5,
                "packetLossPercent": 0.0,
                "avgLatencyMs": 12.0,
                "maxLatencyMs": 20.0,
            },
        }));
    });

    let rig = build_rig(&server.base_url(), RigOptions::default());
    let started = rig
        .dispatcher
        .call_tool(
            "ping_from_gateway",
            json!({"serial": "GW001", "target": "10.0.0.1"}),
        )
        .await;
    assert!(started.starts_with("[ASYNC]"), "report: {}", started);
    assert!(started.contains("Task ID: task-42"), "report: {}", started);

    let polled = rig
        .dispatcher
        .call_tool("get_async_test_result", json!({"task_id": "task-42"}))
        .await;
    assert!(polled.contains("[OK] Test Complete: PING"), "report: {}", polled);
    assert!(polled.contains("Packets sent: 5"), "report: {}", polled);
    assert!(polled.contains("── Verification ──"), "report: {}", polled);
}
