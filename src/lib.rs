pub mod config;
pub mod date_util;
pub mod error;
pub mod metrics;
pub mod model;
pub mod query;
pub mod storage;
pub mod sync;

pub use config::{FieldMap, JiraConfig};
pub use error::{Error, Result};
pub use metrics::{
    CurrentSprintMetrics, MetricsOptions, SprintMetrics, StatusLabels, WorkloadStatus,
};
pub use model::{Issue, IssueRecord, Link, LinkDirection};
pub use query::builder::IssueQuery;
pub use query::{GraphData, IssueDetail, Statistics};
pub use storage::Database;
pub use sync::source::{IssueSource, JiraClient};
pub use sync::{NoopProgress, SyncOptions, SyncProgress, SyncReport};

use sync::syncer;

/// Query used when a sync is run without one: the caller's issues created
/// within the reporting window.
pub const DEFAULT_JQL: &str =
    "assignee=currentUser() AND created >= 2025-10-01 AND created <= 2025-12-16";

/// Main entry point for the Jira mirror.
pub struct JiraDW {
    db: Database,
    source: Box<dyn IssueSource>,
    options: SyncOptions,
}

impl JiraDW {
    pub fn new(db: Database, source: impl IssueSource + 'static, options: SyncOptions) -> Self {
        Self {
            db,
            source: Box::new(source),
            options,
        }
    }

    /// Build a mirror that talks to the Jira server described by `config`.
    pub fn from_config(db: Database, config: &JiraConfig) -> Result<Self> {
        let client = JiraClient::new(config)?;
        Ok(Self::new(db, client, SyncOptions::from_config(config)))
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    // ── Sync ─────────────────────────────────────────────────────────

    /// Fetch every issue matching `jql` and mirror it, with its links, in one
    /// transaction.
    pub async fn sync(&self, jql: &str, progress: &dyn SyncProgress) -> Result<SyncReport> {
        syncer::sync_issues(&self.db, self.source.as_ref(), jql, &self.options, progress).await
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub async fn issue(&self, issue_key: &str) -> Result<Option<IssueDetail>> {
        query::get_issue(&self.db, issue_key).await
    }

    pub async fn statistics(&self) -> Result<Statistics> {
        query::statistics(&self.db).await
    }

    pub async fn link_graph(&self) -> Result<GraphData> {
        query::link_graph(&self.db).await
    }

    pub async fn current_sprint_metrics(
        &self,
        options: &MetricsOptions,
    ) -> Result<CurrentSprintMetrics> {
        metrics::compute_current_sprint_metrics(&self.db, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::testing::FakeSource;
    use serde_json::json;

    #[tokio::test]
    async fn test_sync_then_read_back() {
        let db = Database::open_memory().await.unwrap();
        let source = FakeSource::new(vec![json!({
            "key": "DW-1",
            "fields": {
                "status": {"name": "Готово"},
                "timeoriginalestimate": 36000,
                "timespent": 28800,
                "customfield_10104": ["Sprint@1[id=1,name=MAR 08.12.25 - 22.12.25 #24,goal=]"],
                "issuelinks": [{
                    "type": {"id": "10000", "name": "Blocks", "inward": "is blocked by", "outward": "blocks"},
                    "outwardIssue": {"key": "DW-2"}
                }]
            }
        })]);
        let dw = JiraDW::new(db, source, SyncOptions::default());

        let report = dw.sync(DEFAULT_JQL, &NoopProgress).await.unwrap();
        assert_eq!((report.issues_written, report.links_written), (1, 1));

        let detail = dw.issue("DW-1").await.unwrap().unwrap();
        assert_eq!(detail.issue.issue.original_estimate, Some(10.0));
        assert_eq!(detail.links[0].direction, LinkDirection::Outward);

        let stats = dw.statistics().await.unwrap();
        assert_eq!(stats.total, 1);

        let CurrentSprintMetrics::Data(m) = dw
            .current_sprint_metrics(&MetricsOptions::default())
            .await
            .unwrap()
        else {
            panic!("expected sprint data");
        };
        assert_eq!(m.sprint_name, "MAR 08.12.25 - 22.12.25 #24");
        assert_eq!(m.progress_percent, 100.0);
        assert_eq!(m.completed_spent, 8.0);

        let graph = dw.link_graph().await.unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.edges.len(), 1);
    }

    #[tokio::test]
    async fn test_from_config_builds_client() {
        let config = JiraConfig::new("https://jira.example.com", "alice", "secret").unwrap();
        let db = Database::open_memory().await.unwrap();
        assert!(JiraDW::from_config(db, &config).is_ok());
    }
}
