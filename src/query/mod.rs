pub mod builder;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::date_util::{micros_to_datetime, round_to};
use crate::error::Result;
use crate::model::{IssueRecord, Link};
use crate::storage::repository;
use crate::storage::Database;

/// One issue with its outbound links.
#[derive(Debug, Clone, Serialize)]
pub struct IssueDetail {
    pub issue: IssueRecord,
    pub links: Vec<Link>,
}

/// Row count for one value of a grouping column. `None` groups issues with
/// no value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountBy {
    pub value: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SprintSummary {
    pub sprint: String,
    pub count: u64,
    pub total_estimate: f64,
    pub total_spent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkTypeCount {
    pub link_type_name: Option<String>,
    pub direction: String,
    pub count: u64,
}

/// Aggregate counts over the mirror.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Statistics {
    pub total: u64,
    pub total_links: u64,
    pub by_status: Vec<CountBy>,
    pub by_type: Vec<CountBy>,
    /// Ten sprints with the greatest names.
    pub by_sprint: Vec<SprintSummary>,
    pub by_link_type: Vec<LinkTypeCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub issue_key: String,
    pub summary: Option<String>,
    pub status: Option<String>,
    pub issue_type: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub source_issue_key: String,
    pub target_issue_key: String,
    pub link_type_name: Option<String>,
    pub direction_label: Option<String>,
    pub direction: String,
}

/// Issues taking part in at least one link, plus every link.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Fetch one issue with its outbound links; `None` if the key is unknown.
pub async fn get_issue(db: &Database, issue_key: &str) -> Result<Option<IssueDetail>> {
    let issue_key = issue_key.to_string();
    db.reader()
        .call(move |conn| -> std::result::Result<_, rusqlite::Error> {
            let Some(issue) = repository::get_issue(conn, &issue_key)? else {
                return Ok(None);
            };
            let links = repository::links_for_source(conn, &issue_key)?;
            Ok(Some(IssueDetail { issue, links }))
        })
        .await
        .map_err(|e| crate::error::Error::Database(e.to_string()))
}

/// Time of the most recent issue upsert, `None` for an empty mirror.
pub async fn last_synced_at(db: &Database) -> Result<Option<DateTime<Utc>>> {
    let micros: Option<i64> = db
        .reader()
        .call(|conn| conn.query_row("SELECT MAX(last_synced) FROM jira_issues", [], |r| r.get(0)))
        .await
        .map_err(|e| crate::error::Error::Database(e.to_string()))?;
    Ok(micros.and_then(micros_to_datetime))
}

pub async fn statistics(db: &Database) -> Result<Statistics> {
    db.reader()
        .call(|conn| {
            let total: i64 = conn.query_row("SELECT COUNT(*) FROM jira_issues", [], |r| r.get(0))?;
            let total_links: i64 =
                conn.query_row("SELECT COUNT(*) FROM jira_issue_links", [], |r| r.get(0))?;

            let by_sprint = {
                let mut stmt = conn.prepare(
                    "SELECT sprint, COUNT(*),
                            COALESCE(SUM(time_original_estimate), 0),
                            COALESCE(SUM(time_spent), 0)
                     FROM jira_issues
                     WHERE sprint IS NOT NULL
                     GROUP BY sprint
                     ORDER BY sprint DESC
                     LIMIT 10",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(SprintSummary {
                        sprint: row.get(0)?,
                        count: row.get::<_, i64>(1)? as u64,
                        total_estimate: round_to(row.get(2)?, 2),
                        total_spent: round_to(row.get(3)?, 2),
                    })
                })?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            };

            let by_link_type = {
                let mut stmt = conn.prepare(
                    "SELECT link_type_name, direction, COUNT(*) AS n
                     FROM jira_issue_links
                     GROUP BY link_type_name, direction
                     ORDER BY n DESC, link_type_name, direction",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(LinkTypeCount {
                        link_type_name: row.get(0)?,
                        direction: row.get(1)?,
                        count: row.get::<_, i64>(2)? as u64,
                    })
                })?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            };

            Ok::<Statistics, rusqlite::Error>(Statistics {
                total: total as u64,
                total_links: total_links as u64,
                by_status: count_by(conn, "status")?,
                by_type: count_by(conn, "issue_type")?,
                by_sprint,
                by_link_type,
            })
        })
        .await
        .map_err(|e| crate::error::Error::Database(e.to_string()))
}

/// Counts grouped by one `jira_issues` column, largest group first.
fn count_by(
    conn: &Connection,
    column: &str,
) -> std::result::Result<Vec<CountBy>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {column}, COUNT(*) AS n FROM jira_issues GROUP BY {column} ORDER BY n DESC, {column}"
    ))?;
    let rows = stmt.query_map([], |row| {
        Ok(CountBy {
            value: row.get(0)?,
            count: row.get::<_, i64>(1)? as u64,
        })
    })?;
    rows.collect()
}

pub async fn link_graph(db: &Database) -> Result<GraphData> {
    db.reader()
        .call(|conn| {
            let nodes = {
                let mut stmt = conn.prepare(
                    "SELECT issue_key, summary, status, issue_type, priority
                     FROM jira_issues
                     WHERE issue_key IN (
                         SELECT source_issue_key FROM jira_issue_links
                         UNION
                         SELECT target_issue_key FROM jira_issue_links
                     )
                     ORDER BY issue_key",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(GraphNode {
                        issue_key: row.get(0)?,
                        summary: row.get(1)?,
                        status: row.get(2)?,
                        issue_type: row.get(3)?,
                        priority: row.get(4)?,
                    })
                })?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            };

            let edges = {
                let mut stmt = conn.prepare(
                    "SELECT source_issue_key, target_issue_key, link_type_name,
                            direction_label, direction
                     FROM jira_issue_links
                     ORDER BY source_issue_key, position",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(GraphEdge {
                        source_issue_key: row.get(0)?,
                        target_issue_key: row.get(1)?,
                        link_type_name: row.get(2)?,
                        direction_label: row.get(3)?,
                        direction: row.get(4)?,
                    })
                })?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            };

            Ok::<GraphData, rusqlite::Error>(GraphData { nodes, edges })
        })
        .await
        .map_err(|e| crate::error::Error::Database(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Issue, LinkDirection};
    use crate::storage::repository::{insert_links, upsert_issue};

    fn issue(key: &str, status: &str, sprint: Option<&str>, estimate: f64) -> Issue {
        let mut issue = Issue::new(key);
        issue.status = Some(status.to_string());
        issue.issue_type = Some("Задача".to_string());
        issue.sprint = sprint.map(str::to_string);
        issue.original_estimate = Some(estimate);
        issue.time_spent = Some(1.25);
        issue
    }

    fn link(source: &str, target: &str, direction: LinkDirection) -> Link {
        Link {
            source_issue_key: source.to_string(),
            target_issue_key: target.to_string(),
            link_type: Some("10000".to_string()),
            link_type_name: Some("Blocks".to_string()),
            direction,
            direction_label: Some("blocks".to_string()),
            target_summary: None,
            target_status: None,
            target_priority: None,
        }
    }

    async fn seeded_db() -> Database {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| {
                for i in [
                    issue("DW-1", "Готово", Some("MAR #23"), 2.0),
                    issue("DW-2", "В работе", Some("MAR #24"), 3.5),
                    issue("DW-3", "В работе", Some("MAR #24"), 4.25),
                    issue("DW-4", "Открыто", None, 1.0),
                ] {
                    upsert_issue(conn, &i, 1)?;
                }
                insert_links(
                    conn,
                    &[
                        link("DW-1", "DW-2", LinkDirection::Outward),
                        link("DW-2", "DW-1", LinkDirection::Inward),
                        link("DW-2", "EXT-9", LinkDirection::Outward),
                    ],
                )?;
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_get_issue_with_links() {
        let db = seeded_db().await;
        let detail = get_issue(&db, "DW-2").await.unwrap().unwrap();
        assert_eq!(detail.issue.issue.status.as_deref(), Some("В работе"));
        let targets: Vec<&str> = detail
            .links
            .iter()
            .map(|l| l.target_issue_key.as_str())
            .collect();
        assert_eq!(targets, vec!["DW-1", "EXT-9"]);

        assert!(get_issue(&db, "DW-404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_statistics() {
        let db = seeded_db().await;
        let stats = statistics(&db).await.unwrap();

        assert_eq!(stats.total, 4);
        assert_eq!(stats.total_links, 3);
        assert_eq!(
            stats.by_status[0],
            CountBy {
                value: Some("В работе".to_string()),
                count: 2
            }
        );
        assert_eq!(stats.by_type.len(), 1);

        assert_eq!(stats.by_sprint.len(), 2);
        assert_eq!(stats.by_sprint[0].sprint, "MAR #24");
        assert_eq!(stats.by_sprint[0].count, 2);
        assert_eq!(stats.by_sprint[0].total_estimate, 7.75);
        assert_eq!(stats.by_sprint[0].total_spent, 2.5);

        let outward = stats
            .by_link_type
            .iter()
            .find(|c| c.direction == "outward")
            .unwrap();
        assert_eq!(outward.count, 2);
    }

    #[tokio::test]
    async fn test_last_synced_at() {
        let db = seeded_db().await;
        let at = last_synced_at(&db).await.unwrap().unwrap();
        assert_eq!(at.timestamp_micros(), 1);

        let empty = Database::open_memory().await.unwrap();
        assert!(last_synced_at(&empty).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_statistics_on_empty_db() {
        let db = Database::open_memory().await.unwrap();
        let stats = statistics(&db).await.unwrap();
        assert_eq!(stats.total, 0);
        assert!(stats.by_status.is_empty());
        assert!(stats.by_sprint.is_empty());
    }

    #[tokio::test]
    async fn test_link_graph_only_includes_linked_issues() {
        let db = seeded_db().await;
        let graph = link_graph(&db).await.unwrap();

        let nodes: Vec<&str> = graph.nodes.iter().map(|n| n.issue_key.as_str()).collect();
        assert_eq!(nodes, vec!["DW-1", "DW-2"]);
        assert_eq!(graph.edges.len(), 3);
        assert_eq!(graph.edges[2].target_issue_key, "EXT-9");
    }
}
