use std::collections::HashSet;

use serde_json::Value;

use crate::config::FieldMap;
use crate::date_util::{parse_jira_timestamp, seconds_to_hours};
use crate::model::Issue;
use crate::sync::sprint::extract_sprint_name;

static NULL: Value = Value::Null;

/// Link type as declared on an `issuelinks` entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkTypeInfo {
    pub id: Option<String>,
    pub name: Option<String>,
    /// Label used when the other issue is the inward side ("is blocked by").
    pub inward: Option<String>,
    /// Label used when the other issue is the outward side ("blocks").
    pub outward: Option<String>,
}

/// The issue on the far side of a link, with whatever fields came along.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkTarget {
    pub key: String,
    pub summary: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
}

/// One unexpanded `issuelinks` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDescriptor {
    pub link_type: LinkTypeInfo,
    pub inward: Option<LinkTarget>,
    pub outward: Option<LinkTarget>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedIssue {
    pub issue: Issue,
    pub links: Vec<LinkDescriptor>,
}

/// Map one raw search result into an [`Issue`] plus its link descriptors.
///
/// Returns `None` only when the record has no string `key`. Every other
/// malformed or missing field becomes `None`/empty on the issue.
pub fn normalize_issue(raw: &Value, field_map: &FieldMap) -> Option<NormalizedIssue> {
    let key = raw.get("key").and_then(Value::as_str)?;
    let fields = raw.get("fields").filter(|f| f.is_object()).unwrap_or(&NULL);
    let field = |name: &str| fields.get(name).unwrap_or(&NULL);

    let links = parse_link_descriptors(key, field("issuelinks"));
    let linked_issues = dedup(
        links
            .iter()
            .flat_map(|d| [d.inward.as_ref(), d.outward.as_ref()])
            .flatten()
            .map(|target| target.key.clone()),
    );

    let issue = Issue {
        issue_key: key.to_string(),
        issue_type: nested_str(field("issuetype"), "name"),
        status: nested_str(field("status"), "name"),
        summary: plain_str(field("summary")),
        assignee: nested_str(field("assignee"), "displayName"),
        reporter: nested_str(field("reporter"), "displayName"),
        priority: nested_str(field("priority"), "name"),
        created: field("created").as_str().and_then(parse_jira_timestamp),
        updated: field("updated").as_str().and_then(parse_jira_timestamp),
        original_estimate: duration_hours(field("timeoriginalestimate")),
        time_spent: duration_hours(field("timespent")),
        sprint: extract_sprint_name(field(&field_map.sprint)),
        epic_link: scalar_string(field(&field_map.epic)),
        labels: dedup(
            field("labels")
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .map(str::to_string),
        ),
        linked_issues,
    };

    Some(NormalizedIssue { issue, links })
}

fn parse_link_descriptors(source_key: &str, raw: &Value) -> Vec<LinkDescriptor> {
    let Some(entries) = raw.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter(|entry| entry.is_object())
        .map(|entry| {
            let link_type = entry.get("type").unwrap_or(&NULL);
            LinkDescriptor {
                link_type: LinkTypeInfo {
                    id: link_type.get("id").and_then(scalar_string),
                    name: link_type.get("name").and_then(plain_str),
                    inward: link_type.get("inward").and_then(plain_str),
                    outward: link_type.get("outward").and_then(plain_str),
                },
                inward: entry
                    .get("inwardIssue")
                    .and_then(|t| parse_target(source_key, t)),
                outward: entry
                    .get("outwardIssue")
                    .and_then(|t| parse_target(source_key, t)),
            }
        })
        .collect()
}

fn parse_target(source_key: &str, raw: &Value) -> Option<LinkTarget> {
    let Some(key) = raw.get("key").and_then(Value::as_str) else {
        log::debug!("{source_key}: skipping linked issue without a key");
        return None;
    };
    let fields = raw.get("fields").unwrap_or(&NULL);
    Some(LinkTarget {
        key: key.to_string(),
        summary: fields.get("summary").and_then(plain_str),
        status: fields.get("status").and_then(|s| nested_str(s, "name")),
        priority: fields.get("priority").and_then(|p| nested_str(p, "name")),
    })
}

fn plain_str(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// `value[key]` when `value` is an object holding a string there.
fn nested_str(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(plain_str)
}

/// Strings as-is, numbers rendered; anything else is `None`.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn duration_hours(value: &Value) -> Option<f64> {
    let seconds = value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite())
            .map(|f| f.round() as i64)
    })?;
    Some(seconds_to_hours(seconds))
}

fn dedup(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values.filter(|v| seen.insert(v.clone())).collect()
}
