use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

const REDACTION: &str = "[REDACTED]";
const INLINE_REDACTION: &str = "***REDACTED***";

static SENSITIVE_KEYS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "password",
        "secret",
        "token",
        "access_token",
        "refresh_token",
        "client_secret",
        "api_key",
        "authorization",
    ]
    .into_iter()
    .collect()
});

static INLINE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"\b(Bearer)\s+([A-Za-z0-9._~-]{10,})\b").expect("redaction regex"),
            "$1 ***REDACTED***",
        ),
        (
            Regex::new(r"\beyJ[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\b")
                .expect("redaction regex"),
            INLINE_REDACTION,
        ),
        (
            Regex::new(
                r#"\b(password|token|api[_-]?key|secret|access[_-]?token|client[_-]?secret)\b\s*([:=])\s*([^\s"'`]+)"#,
            )
            .expect("redaction regex"),
            "$1$2***REDACTED***",
        ),
    ]
});

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = normalize_key(key);
    if normalized.is_empty() {
        return false;
    }
    if SENSITIVE_KEYS.contains(normalized.as_str()) {
        return true;
    }
    normalized.contains("secret") || normalized.contains("token")
}

/// Scrub inline secrets from free text. `extra_secrets` carries live values
/// (client secret, current access token) that must never reach a report.
pub fn redact_text(value: &str, extra_secrets: Option<&[String]>) -> String {
    let mut out = value.to_string();
    for (re, replacement) in INLINE_PATTERNS.iter() {
        if re.is_match(&out) {
            out = re.replace_all(&out, *replacement).to_string();
        }
    }
    if let Some(values) = extra_secrets {
        for raw in values {
            let needle = raw.trim();
            if needle.len() < 6 {
                continue;
            }
            out = out.replace(needle, INLINE_REDACTION);
        }
    }
    out
}

/// Redact an argument map for span attributes: values under sensitive keys
/// are replaced wholesale, everything else passes through untouched.
pub fn redact_args(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (key, entry) in map.iter() {
                if is_sensitive_key(key) {
                    out.insert(key.clone(), Value::String(REDACTION.to_string()));
                } else {
                    out.insert(key.clone(), redact_args(entry));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_args).collect()),
        _ => value.clone(),
    }
}
