use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// `name=` up to the next comma or closing bracket, as found in Greenhopper's
/// `Sprint@...[id=1367,rapidViewId=..,name=...,goal=...]` serialization.
static RE_SPRINT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"name=([^,\]]+)").unwrap());
/// Digits directly after the first `#`; a later `#` is never consulted.
static RE_SPRINT_SEQ: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^#]*#\s*(\d+)").unwrap());

/// Recover the sprint name from the raw sprint custom field.
///
/// The field holds every sprint the issue was ever assigned to, oldest first;
/// only the last one counts. Entries may be serialized strings or, on newer
/// servers, objects with a `name` key.
pub fn extract_sprint_name(raw: &Value) -> Option<String> {
    let entry = match raw {
        Value::Array(items) => items.last()?,
        other => other,
    };

    match entry {
        Value::String(s) => scan_name(s),
        Value::Object(map) => map
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

fn scan_name(serialized: &str) -> Option<String> {
    RE_SPRINT_NAME
        .captures(serialized)
        .map(|caps| caps[1].to_string())
}

/// Sequence number encoded after the first `#` in a sprint name.
///
/// `"MAR 08.12.25 - 22.12.25 #24"` yields 24. Names without a `#`, or whose
/// first `#` is not followed by digits, yield `None`.
pub fn sprint_sequence(name: &str) -> Option<u64> {
    RE_SPRINT_SEQ
        .captures(name)
        .and_then(|caps| caps[1].parse().ok())
}
