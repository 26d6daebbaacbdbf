use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::date_util::{format_timestamp, micros_to_datetime, parse_stored_timestamp};
use crate::model::{Issue, IssueRecord, Link, LinkDirection};

/// Column list matching [`issue_from_row`].
pub const ISSUE_COLUMNS: &str = "issue_key, issue_type, status, summary, assignee, reporter,
    priority, created_date, updated_date, time_original_estimate, time_spent, sprint,
    epic_link, labels, linked_issues, last_synced";

/// Column list matching [`link_from_row`].
pub const LINK_COLUMNS: &str = "source_issue_key, target_issue_key, link_type, link_type_name,
    direction, direction_label, target_summary, target_status, target_priority";

// ── Issues ─────────────────────────────────────────────────────────

/// Insert or overwrite an issue keyed by `issue_key`.
///
/// Every mutable column is replaced. `last_synced` becomes `synced_at`, or
/// the previous value plus one microsecond if the clock has not moved past
/// it, so it strictly increases on every upsert.
pub fn upsert_issue(
    conn: &Connection,
    issue: &Issue,
    synced_at: i64,
) -> Result<(), rusqlite::Error> {
    let labels = to_json_array(&issue.labels)?;
    let linked = to_json_array(&issue.linked_issues)?;

    conn.execute(
        "INSERT INTO jira_issues (
            issue_key, issue_type, status, created_date,
            time_original_estimate, time_spent, updated_date,
            sprint, epic_link, summary, assignee, reporter,
            priority, labels, linked_issues, last_synced
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        ON CONFLICT(issue_key) DO UPDATE SET
            issue_type=excluded.issue_type, status=excluded.status,
            created_date=excluded.created_date,
            time_original_estimate=excluded.time_original_estimate,
            time_spent=excluded.time_spent, updated_date=excluded.updated_date,
            sprint=excluded.sprint, epic_link=excluded.epic_link,
            summary=excluded.summary, assignee=excluded.assignee,
            reporter=excluded.reporter, priority=excluded.priority,
            labels=excluded.labels, linked_issues=excluded.linked_issues,
            last_synced=MAX(excluded.last_synced, jira_issues.last_synced + 1)",
        params![
            issue.issue_key,
            issue.issue_type,
            issue.status,
            issue.created.as_ref().map(format_timestamp),
            issue.original_estimate,
            issue.time_spent,
            issue.updated.as_ref().map(format_timestamp),
            issue.sprint,
            issue.epic_link,
            issue.summary,
            issue.assignee,
            issue.reporter,
            issue.priority,
            labels,
            linked,
            synced_at,
        ],
    )?;
    Ok(())
}

pub fn get_issue(conn: &Connection, issue_key: &str) -> Result<Option<IssueRecord>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {ISSUE_COLUMNS} FROM jira_issues WHERE issue_key = ?1"),
        params![issue_key],
        issue_from_row,
    )
    .optional()
}

/// Map a row selected with [`ISSUE_COLUMNS`].
pub fn issue_from_row(row: &Row<'_>) -> Result<IssueRecord, rusqlite::Error> {
    let created: Option<String> = row.get(7)?;
    let updated: Option<String> = row.get(8)?;
    let labels: String = row.get(13)?;
    let linked: String = row.get(14)?;
    let last_synced: i64 = row.get(15)?;

    Ok(IssueRecord {
        issue: Issue {
            issue_key: row.get(0)?,
            issue_type: row.get(1)?,
            status: row.get(2)?,
            summary: row.get(3)?,
            assignee: row.get(4)?,
            reporter: row.get(5)?,
            priority: row.get(6)?,
            created: created.as_deref().and_then(parse_stored_timestamp),
            updated: updated.as_deref().and_then(parse_stored_timestamp),
            original_estimate: row.get(9)?,
            time_spent: row.get(10)?,
            sprint: row.get(11)?,
            epic_link: row.get(12)?,
            labels: from_json_array(&labels),
            linked_issues: from_json_array(&linked),
        },
        last_synced: micros_to_datetime(last_synced),
    })
}

// ── Links ──────────────────────────────────────────────────────────

/// Delete every link row whose source is one of `issue_keys`.
pub fn delete_links_for_sources(
    conn: &Connection,
    issue_keys: &[String],
) -> Result<usize, rusqlite::Error> {
    let mut stmt = conn.prepare("DELETE FROM jira_issue_links WHERE source_issue_key = ?1")?;
    let mut deleted = 0;
    for key in issue_keys {
        deleted += stmt.execute(params![key])?;
    }
    Ok(deleted)
}

/// Insert links, numbering them per source key in slice order.
pub fn insert_links(conn: &Connection, links: &[Link]) -> Result<usize, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "INSERT INTO jira_issue_links (
            source_issue_key, position, target_issue_key, link_type, link_type_name,
            direction, direction_label, target_summary, target_status, target_priority
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;

    let mut positions: HashMap<&str, i64> = HashMap::new();
    for link in links {
        let position = positions.entry(link.source_issue_key.as_str()).or_insert(0);
        stmt.execute(params![
            link.source_issue_key,
            *position,
            link.target_issue_key,
            link.link_type,
            link.link_type_name,
            link.direction.as_str(),
            link.direction_label,
            link.target_summary,
            link.target_status,
            link.target_priority,
        ])?;
        *position += 1;
    }
    Ok(links.len())
}

/// Links recorded for one source issue, in their original order.
pub fn links_for_source(conn: &Connection, issue_key: &str) -> Result<Vec<Link>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LINK_COLUMNS} FROM jira_issue_links
         WHERE source_issue_key = ?1 ORDER BY position"
    ))?;
    let rows = stmt.query_map(params![issue_key], link_from_row)?;
    rows.collect()
}

/// Map a row selected with [`LINK_COLUMNS`].
pub fn link_from_row(row: &Row<'_>) -> Result<Link, rusqlite::Error> {
    let direction: String = row.get(4)?;
    let direction = direction.parse::<LinkDirection>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, e.into())
    })?;
    Ok(Link {
        source_issue_key: row.get(0)?,
        target_issue_key: row.get(1)?,
        link_type: row.get(2)?,
        link_type_name: row.get(3)?,
        direction,
        direction_label: row.get(5)?,
        target_summary: row.get(6)?,
        target_status: row.get(7)?,
        target_priority: row.get(8)?,
    })
}

// ── Helpers ────────────────────────────────────────────────────────

fn to_json_array(values: &[String]) -> Result<String, rusqlite::Error> {
    serde_json::to_string(values).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Decode a JSON string array column; anything unreadable becomes empty.
fn from_json_array(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}
