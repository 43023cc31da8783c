mod common;

use common::{build_rig, RigOptions};
use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;

use aruba_noc::errors::ToolErrorKind;
use aruba_noc::resilience::CircuitState;

fn oauth_mock<'a>(server: &'a MockServer, token: &str) -> httpmock::Mock<'a> {
    server.mock(|when, then| {
        when.method(POST).path("/oauth2/token");
        then.status(200)
            .json_body(json!({"access_token": token, "expires_in": 3600}));
    })
}

#[tokio::test]
async fn happy_path_hits_the_endpoint_once_and_reports_stats() {
    let server = MockServer::start();
    let oauth = oauth_mock(&server, "tok-happy");
    let devices = server.mock(|when, then| {
        when.method(GET)
            .path("/inventory/v1/devices")
            .query_param("limit", "10");
        then.status(200).json_body(json!({
            "total": 2,
            "items": [
                {"deviceType": "ACCESS_POINT", "status": "ONLINE", "deployment": "Standalone"},
                {"deviceType": "SWITCH", "status": "OFFLINE", "deployment": "Standalone"},
            ],
        }));
    });

    let rig = build_rig(&server.base_url(), RigOptions::default());
    let report = rig
        .dispatcher
        .call_tool("get_device_list", json!({"limit": 10}))
        .await;

    assert!(report.contains("[STATS]"), "report: {}", report);
    assert!(report.contains("── Verification ──"), "report: {}", report);
    assert!(report.contains("Total devices: 2"), "report: {}", report);
    assert_eq!(oauth.hits(), 1);
    assert_eq!(devices.hits(), 1);
    // Exactly one rate-limiter token was consumed.
    assert_eq!(rig.limiter.available().await, 99);
    assert_eq!(
        rig.telemetry.api_call_count("/inventory/v1/devices", "2xx"),
        1
    );
}

#[tokio::test]
async fn expired_token_triggers_exactly_one_exchange_before_the_get() {
    let server = MockServer::start();
    let oauth = oauth_mock(&server, "tok-refreshed");
    let sites = server.mock(|when, then| {
        when.method(GET)
            .path("/network-monitoring/v1alpha1/sites-health")
            .header("authorization", "Bearer tok-refreshed");
        then.status(200).json_body(json!({"items": []}));
    });

    let rig = build_rig(&server.base_url(), RigOptions::default());
    rig.auth.install_token("tok-stale", Duration::ZERO).await;

    let report = rig.dispatcher.call_tool("get_sites_health", json!({})).await;

    assert!(report.starts_with("[NET]"), "report: {}", report);
    assert!(report.contains("── Verification ──"), "report: {}", report);
    assert_eq!(oauth.hits(), 1);
    assert_eq!(sites.hits(), 1);
}

#[tokio::test]
async fn refresh_buffer_boundary_controls_proactive_refresh() {
    let server = MockServer::start();
    let oauth = oauth_mock(&server, "tok-refreshed");
    let rig = build_rig(&server.base_url(), RigOptions::default());

    // At expiry - buffer (60s): refresh fires.
    rig.auth
        .install_token("tok-edge", Duration::from_secs(60))
        .await;
    let token = rig.auth.ensure_fresh().await.expect("token");
    assert_eq!(token, "tok-refreshed");
    assert_eq!(oauth.hits(), 1);

    // Just past the boundary: no refresh.
    rig.auth
        .install_token("tok-still-good", Duration::from_secs(70))
        .await;
    let token = rig.auth.ensure_fresh().await.expect("token");
    assert_eq!(token, "tok-still-good");
    assert_eq!(oauth.hits(), 1);
}

#[tokio::test]
async fn concurrent_ensure_fresh_converges_on_one_exchange() {
    let server = MockServer::start();
    let oauth = server.mock(|when, then| {
        when.method(POST).path("/oauth2/token");
        then.status(200)
            .delay(Duration::from_millis(100))
            .json_body(json!({"access_token": "tok-single", "expires_in": 3600}));
    });

    let rig = build_rig(&server.base_url(), RigOptions::default());
    let mut tasks = Vec::new();
    for _ in 0..10 {
        let auth = rig.auth.clone();
        tasks.push(tokio::spawn(async move { auth.ensure_fresh().await }));
    }
    for task in tasks {
        let token = task.await.expect("join").expect("token");
        assert_eq!(token, "tok-single");
    }
    assert_eq!(oauth.hits(), 1);
}

#[tokio::test]
async fn concurrent_401s_force_a_single_refresh() {
    let server = MockServer::start();
    let oauth = server.mock(|when, then| {
        when.method(POST).path("/oauth2/token");
        then.status(200)
            .delay(Duration::from_millis(50))
            .json_body(json!({"access_token": "tok-fresh", "expires_in": 3600}));
    });
    let stale = server.mock(|when, then| {
        when.method(GET)
            .path("/monitoring/v1/gateways")
            .header("authorization", "Bearer tok-stale");
        then.status(401);
    });
    let fresh = server.mock(|when, then| {
        when.method(GET)
            .path("/monitoring/v1/gateways")
            .header("authorization", "Bearer tok-fresh");
        then.status(200).json_body(json!({"items": []}));
    });

    let rig = build_rig(&server.base_url(), RigOptions::default());
    rig.auth
        .install_token("tok-stale", Duration::from_secs(3600))
        .await;

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let client = rig.client.clone();
        tasks.push(tokio::spawn(async move {
            client.get("/monitoring/v1/gateways", &[]).await
        }));
    }
    for task in tasks {
        task.await.expect("join").expect("call succeeds");
    }

    assert_eq!(oauth.hits(), 1);
    // Every call retried onto the fresh token; at least one saw the 401.
    assert!(stale.hits() >= 1);
    assert_eq!(fresh.hits(), 10);
}

#[tokio::test]
async fn second_401_after_forced_refresh_surfaces_auth_error() {
    let server = MockServer::start();
    let oauth = oauth_mock(&server, "tok-alpha");
    let denied = server.mock(|when, then| {
        when.method(GET).path("/monitoring/v1/gateways");
        then.status(401);
    });

    let rig = build_rig(&server.base_url(), RigOptions::default());
    let err = rig
        .client
        .get("/monitoring/v1/gateways", &[])
        .await
        .unwrap_err();

    assert_eq!(err.kind, ToolErrorKind::Auth);
    // Initial exchange plus exactly one forced refresh.
    assert_eq!(oauth.hits(), 2);
    assert_eq!(denied.hits(), 2);
}

#[tokio::test]
async fn five_consecutive_500s_trip_the_breaker_and_recovery_closes_it() {
    let server = MockServer::start();
    let _oauth = oauth_mock(&server, "tok-breaker");
    let mut failing = server.mock(|when, then| {
        when.method(GET).path("/monitoring/v1/gateways");
        then.status(500);
    });

    let rig = build_rig(
        &server.base_url(),
        RigOptions {
            breaker_threshold: 5,
            breaker_timeout: Duration::from_millis(300),
            ..RigOptions::default()
        },
    );

    for _ in 0..5 {
        let err = rig
            .client
            .get("/monitoring/v1/gateways", &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::UpstreamUnavailable);
    }
    assert_eq!(rig.breaker.snapshot().state, CircuitState::Open);
    assert_eq!(failing.hits(), 5);

    // While open: rejected without HTTP I/O.
    let err = rig
        .client
        .get("/monitoring/v1/gateways", &[])
        .await
        .unwrap_err();
    assert_eq!(err.kind, ToolErrorKind::CircuitOpen);
    assert_eq!(failing.hits(), 5);

    // After the open timeout, one probe is admitted and success closes.
    tokio::time::sleep(Duration::from_millis(350)).await;
    failing.delete();
    let _recovered = server.mock(|when, then| {
        when.method(GET).path("/monitoring/v1/gateways");
        then.status(200).json_body(json!({"items": []}));
    });
    rig.client
        .get("/monitoring/v1/gateways", &[])
        .await
        .expect("probe succeeds");
    assert_eq!(rig.breaker.snapshot().state, CircuitState::Closed);
    assert_eq!(rig.breaker.snapshot().consecutive_failures, 0);
}

#[tokio::test]
async fn four_twenty_nine_is_neutral_for_the_breaker() {
    let server = MockServer::start();
    let _oauth = oauth_mock(&server, "tok-429");
    let limited = server.mock(|when, then| {
        when.method(GET).path("/monitoring/v2/clients");
        then.status(429).header("Retry-After", "0");
    });

    let rig = build_rig(&server.base_url(), RigOptions::default());
    let err = rig
        .client
        .get("/monitoring/v2/clients", &[])
        .await
        .unwrap_err();

    assert_eq!(err.kind, ToolErrorKind::UpstreamClient);
    assert_eq!(err.status, Some(429));
    // Retried up to the attempt cap, but the breaker never counts it.
    assert_eq!(limited.hits(), 4);
    assert_eq!(rig.breaker.snapshot().state, CircuitState::Closed);
    assert_eq!(rig.breaker.snapshot().consecutive_failures, 0);
}

#[tokio::test]
async fn non_retryable_4xx_is_not_retried() {
    let server = MockServer::start();
    let _oauth = oauth_mock(&server, "tok-400");
    let bad_request = server.mock(|when, then| {
        when.method(GET).path("/network-services/v1/idps/threats");
        then.status(400)
            .json_body(json!({"message": "subscription scope missing"}));
    });

    let rig = build_rig(&server.base_url(), RigOptions::default());
    let err = rig
        .client
        .get("/network-services/v1/idps/threats", &[])
        .await
        .unwrap_err();

    assert_eq!(err.kind, ToolErrorKind::UpstreamClient);
    assert_eq!(err.status, Some(400));
    assert_eq!(bad_request.hits(), 1);
}

#[tokio::test]
async fn none_query_params_are_omitted() {
    let server = MockServer::start();
    let _oauth = oauth_mock(&server, "tok-query");
    let devices = server.mock(|when, then| {
        when.method(GET)
            .path("/inventory/v1/devices")
            .query_param("limit", "100")
            .matches(|req| {
                req.query_params
                    .as_ref()
                    .map(|params| params.iter().all(|(key, _)| key != "filter"))
                    .unwrap_or(true)
            });
        then.status(200).json_body(json!({"items": []}));
    });

    let rig = build_rig(&server.base_url(), RigOptions::default());
    let query = [
        ("filter", None::<String>),
        ("limit", Some("100".to_string())),
    ];
    rig.client
        .get("/inventory/v1/devices", &query)
        .await
        .expect("call succeeds");

    assert_eq!(devices.hits(), 1);
}

#[tokio::test]
async fn empty_2xx_bodies_decode_to_an_empty_record() {
    let server = MockServer::start();
    let _oauth = oauth_mock(&server, "tok-empty");
    let _no_content = server.mock(|when, then| {
        when.method(GET).path("/monitoring/v1/gateways");
        then.status(204);
    });

    let rig = build_rig(&server.base_url(), RigOptions::default());
    let value = rig
        .client
        .get("/monitoring/v1/gateways", &[])
        .await
        .expect("call succeeds");
    assert_eq!(value, json!({}));
}
