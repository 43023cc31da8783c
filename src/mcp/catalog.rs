use crate::errors::ToolError;
use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

static TOOL_CATALOG: Lazy<Vec<ToolDef>> = Lazy::new(|| {
    let raw = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tool_catalog.json"));
    serde_json::from_str(raw).expect("tool_catalog.json must be valid JSON")
});

static TOOL_MAP: Lazy<HashMap<String, ToolDef>> = Lazy::new(|| {
    TOOL_CATALOG
        .iter()
        .cloned()
        .map(|tool| (tool.name.clone(), tool))
        .collect()
});

static TOOL_VALIDATORS: Lazy<HashMap<String, JSONSchema>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for tool in TOOL_CATALOG.iter() {
        if let Ok(schema) = JSONSchema::compile(&tool.input_schema) {
            map.insert(tool.name.clone(), schema);
        }
    }
    map
});

pub fn tool_catalog() -> &'static Vec<ToolDef> {
    &TOOL_CATALOG
}

pub fn tool_by_name(name: &str) -> Option<&'static ToolDef> {
    TOOL_MAP.get(name)
}

pub fn tool_names() -> Vec<String> {
    TOOL_CATALOG.iter().map(|tool| tool.name.clone()).collect()
}

/// Validate an argument map against the tool's input schema. Violations are
/// collected into one `Schema` error, one line per offending field.
pub fn validate_tool_args(tool_name: &str, args: &Value) -> Result<(), ToolError> {
    let Some(schema) = TOOL_VALIDATORS.get(tool_name) else {
        return Ok(());
    };
    let violations: Vec<String> = match schema.validate(args) {
        Ok(()) => return Ok(()),
        Err(errors) => errors.take(8).map(|err| render_violation(&err)).collect(),
    };
    Err(ToolError::schema(violations.join("\n"))
        .with_details(serde_json::json!({ "tool": tool_name })))
}

fn render_violation(err: &jsonschema::ValidationError<'_>) -> String {
    let path = err.instance_path.to_string();
    let field = if path.is_empty() {
        "(root)".to_string()
    } else {
        path.trim_start_matches('/').replace('/', ".")
    };
    format!("{} {}", field, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ToolErrorKind;

    #[test]
    fn catalog_parses_and_names_are_unique() {
        let names = tool_names();
        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());
        assert!(names.contains(&"get_device_list".to_string()));
        assert!(names.contains(&"check_server_health".to_string()));
    }

    #[test]
    fn valid_args_pass() {
        let args = serde_json::json!({"limit": 10});
        assert!(validate_tool_args("get_device_list", &args).is_ok());
    }

    #[test]
    fn wrong_type_is_a_schema_error() {
        let args = serde_json::json!({"limit": "ten"});
        let err = validate_tool_args("get_device_list", &args).unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Schema);
        assert!(err.message.contains("limit"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let args = serde_json::json!({"limti": 10});
        assert!(validate_tool_args("get_device_list", &args).is_err());
    }

    #[test]
    fn missing_required_field_is_reported() {
        let args = serde_json::json!({});
        let err = validate_tool_args("ping_from_gateway", &args).unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Schema);
        assert!(err.message.contains("serial") || err.message.contains("required"));
    }
}
