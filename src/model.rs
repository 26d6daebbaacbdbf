use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical issue shape as mirrored into `jira_issues`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub issue_key: String,
    pub issue_type: Option<String>,
    pub status: Option<String>,
    pub summary: Option<String>,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub priority: Option<String>,
    pub created: Option<NaiveDateTime>,
    pub updated: Option<NaiveDateTime>,
    /// Original estimate in hours.
    pub original_estimate: Option<f64>,
    /// Logged work in hours.
    pub time_spent: Option<f64>,
    pub sprint: Option<String>,
    pub epic_link: Option<String>,
    /// De-duplicated, first-occurrence order.
    pub labels: Vec<String>,
    /// Keys of every directly linked issue, de-duplicated.
    pub linked_issues: Vec<String>,
}

impl Issue {
    /// An issue with only its key set.
    pub fn new(issue_key: impl Into<String>) -> Self {
        Self {
            issue_key: issue_key.into(),
            issue_type: None,
            status: None,
            summary: None,
            assignee: None,
            reporter: None,
            priority: None,
            created: None,
            updated: None,
            original_estimate: None,
            time_spent: None,
            sprint: None,
            epic_link: None,
            labels: Vec::new(),
            linked_issues: Vec::new(),
        }
    }
}

/// A stored issue together with the time of its last successful upsert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueRecord {
    #[serde(flatten)]
    pub issue: Issue,
    pub last_synced: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkDirection {
    Inward,
    Outward,
}

impl LinkDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkDirection::Inward => "inward",
            LinkDirection::Outward => "outward",
        }
    }
}

impl fmt::Display for LinkDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inward" => Ok(LinkDirection::Inward),
            "outward" => Ok(LinkDirection::Outward),
            other => Err(format!("unknown link direction: {other}")),
        }
    }
}

/// Directed edge from a synced issue to one of its linked issues.
///
/// The `target_*` fields are a snapshot taken when the source issue was last
/// synced and can lag behind the target's own row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub source_issue_key: String,
    pub target_issue_key: String,
    pub link_type: Option<String>,
    pub link_type_name: Option<String>,
    pub direction: LinkDirection,
    /// Verb phrase such as "blocks" or "is blocked by".
    pub direction_label: Option<String>,
    pub target_summary: Option<String>,
    pub target_status: Option<String>,
    pub target_priority: Option<String>,
}
