use crate::client::ApiClient;
use crate::errors::ToolError;
use crate::report::Report;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub mod aps;
pub mod clients;
pub mod devices;
pub mod diagnostics;
pub mod gateways;
pub mod health;
pub mod security;
pub mod sites;
pub mod switches;
pub mod wlans;

/// Contract every tool implements: take the validated argument map, call
/// the vendor API through `ApiClient`, return a report. Handlers never
/// catch auth or circuit-open errors; the dispatcher owns that mapping.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn execute(&self, args: Value) -> Result<Report, ToolError>;
}

pub(crate) fn opt_string(args: &Value, key: &str) -> Option<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

pub(crate) fn u64_or(args: &Value, key: &str, default: u64) -> u64 {
    args.get(key).and_then(|v| v.as_u64()).unwrap_or(default)
}

pub(crate) fn require_string(args: &Value, key: &str) -> Result<String, ToolError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::schema(format!("{} must be a non-empty string", key)))
}

pub(crate) fn items_of(data: &Value) -> Vec<Value> {
    data.get("items")
        .or_else(|| data.get("devices"))
        .or_else(|| data.get("clients"))
        .or_else(|| data.get("wlans"))
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

pub(crate) fn str_field<'a>(item: &'a Value, key: &str) -> &'a str {
    item.get(key).and_then(|v| v.as_str()).unwrap_or("UNKNOWN")
}

/// Wire every catalog tool to its handler. The dispatcher cross-checks this
/// map against the catalog at startup.
pub fn build_registry(
    client: Arc<ApiClient>,
) -> Result<HashMap<String, Arc<dyn ToolHandler>>, ToolError> {
    let mut handlers: HashMap<String, Arc<dyn ToolHandler>> = HashMap::new();
    handlers.insert(
        "get_device_list".to_string(),
        Arc::new(devices::GetDeviceList::new(client.clone())),
    );
    handlers.insert(
        "get_sites_health".to_string(),
        Arc::new(sites::GetSitesHealth::new(client.clone())),
    );
    handlers.insert(
        "get_site_details".to_string(),
        Arc::new(sites::GetSiteDetails::new(client.clone())),
    );
    handlers.insert(
        "list_all_clients".to_string(),
        Arc::new(clients::ListAllClients::new(client.clone())),
    );
    handlers.insert(
        "get_top_clients_by_usage".to_string(),
        Arc::new(clients::GetTopClientsByUsage::new(client.clone())),
    );
    handlers.insert(
        "list_gateways".to_string(),
        Arc::new(gateways::ListGateways::new(client.clone())),
    );
    handlers.insert(
        "get_gateway_uplinks".to_string(),
        Arc::new(gateways::GetGatewayUplinks::new(client.clone())),
    );
    handlers.insert(
        "get_ap_details".to_string(),
        Arc::new(aps::GetApDetails::new(client.clone())),
    );
    handlers.insert(
        "get_switch_interfaces".to_string(),
        Arc::new(switches::GetSwitchInterfaces::new(client.clone())),
    );
    handlers.insert(
        "list_wlans".to_string(),
        Arc::new(wlans::ListWlans::new(client.clone())),
    );
    handlers.insert(
        "list_idps_threats".to_string(),
        Arc::new(security::ListIdpsThreats::new(client.clone())),
    );
    handlers.insert(
        "ping_from_gateway".to_string(),
        Arc::new(diagnostics::PingFromGateway::new(client.clone())),
    );
    handlers.insert(
        "ping_from_ap".to_string(),
        Arc::new(diagnostics::PingFromAp::new(client.clone())),
    );
    handlers.insert(
        "traceroute_from_ap".to_string(),
        Arc::new(diagnostics::TracerouteFromAp::new(client.clone())),
    );
    handlers.insert(
        "get_async_test_result".to_string(),
        Arc::new(diagnostics::GetAsyncTestResult::new(client.clone())),
    );
    handlers.insert(
        "check_server_health".to_string(),
        Arc::new(health::CheckServerHealth::new(client)?),
    );
    Ok(handlers)
}
