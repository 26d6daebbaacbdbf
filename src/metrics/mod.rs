pub mod types;

pub use types::*;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::storage::Database;
use crate::sync::sprint::sprint_sequence;

/// Compute workload and progress for the current sprint.
///
/// The current sprint is the one whose name carries the highest `#N`
/// number. Returns [`CurrentSprintMetrics::NoData`] when no issue has a
/// sprint.
pub async fn compute_current_sprint_metrics(
    db: &Database,
    options: &MetricsOptions,
) -> Result<CurrentSprintMetrics> {
    let capacity = options.capacity_hours;
    if !capacity.is_finite() || capacity <= 0.0 {
        return Err(Error::Config(format!(
            "sprint capacity must be a positive number of hours, got {capacity}"
        )));
    }
    let statuses = options.statuses.clone();

    let totals = db
        .reader()
        .call(move |conn| -> std::result::Result<Option<SprintTotals>, rusqlite::Error> {
            let names = sprint_names(conn)?;
            let Some(current) = select_current_sprint(names.iter().map(String::as_str)) else {
                return Ok(None);
            };
            sprint_totals(conn, current, &statuses)
        })
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    Ok(match totals {
        Some(totals) => CurrentSprintMetrics::Data(derive_sprint_metrics(totals, capacity)),
        None => CurrentSprintMetrics::NoData,
    })
}

/// Pick the sprint with the highest `#N` number.
///
/// Names without a number rank below every numbered name. Equal numbers are
/// decided by the lexicographically greatest name.
pub fn select_current_sprint<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    names
        .into_iter()
        .max_by(|a, b| (sprint_sequence(a), *a).cmp(&(sprint_sequence(b), *b)))
}

/// Derive the reported figures from raw sprint totals.
pub fn derive_sprint_metrics(totals: SprintTotals, capacity: f64) -> SprintMetrics {
    let progress_percent = if totals.total_tasks == 0 {
        0.0
    } else {
        totals.completed_tasks as f64 / totals.total_tasks as f64 * 100.0
    };
    let workload_percent = totals.total_estimated / capacity * 100.0;
    let time_used_percent = totals.total_spent / capacity * 100.0;

    SprintMetrics {
        sprint_name: totals.sprint,
        sprint_capacity: capacity,
        total_tasks: totals.total_tasks,
        completed_tasks: totals.completed_tasks,
        in_progress_tasks: totals.in_progress_tasks,
        open_tasks: totals.open_tasks,
        total_estimated: totals.total_estimated,
        total_spent: totals.total_spent,
        completed_spent: totals.completed_spent,
        remaining_capacity: capacity - totals.total_spent,
        remaining_work: totals.total_estimated - totals.completed_spent,
        progress_percent,
        workload_percent,
        time_used_percent,
        workload_status: workload_status(workload_percent),
    }
}

/// Classify a workload percentage; every boundary is strictly greater-than.
pub fn workload_status(workload_percent: f64) -> WorkloadStatus {
    if workload_percent > 100.0 {
        WorkloadStatus::Overloaded
    } else if workload_percent > 90.0 {
        WorkloadStatus::Full
    } else if workload_percent > 70.0 {
        WorkloadStatus::Normal
    } else {
        WorkloadStatus::Light
    }
}

// ── SQL helpers ─────────────────────────────────────────────────────

fn sprint_names(conn: &Connection) -> std::result::Result<Vec<String>, rusqlite::Error> {
    let mut stmt =
        conn.prepare("SELECT DISTINCT sprint FROM jira_issues WHERE sprint IS NOT NULL")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect()
}

fn sprint_totals(
    conn: &Connection,
    sprint: &str,
    statuses: &StatusLabels,
) -> std::result::Result<Option<SprintTotals>, rusqlite::Error> {
    conn.query_row(
        "SELECT COUNT(*),
                COUNT(CASE WHEN status = ?2 THEN 1 END),
                COUNT(CASE WHEN status = ?3 THEN 1 END),
                COUNT(CASE WHEN status = ?4 THEN 1 END),
                COALESCE(SUM(time_original_estimate), 0),
                COALESCE(SUM(time_spent), 0),
                COALESCE(SUM(CASE WHEN status = ?2 THEN time_spent END), 0)
         FROM jira_issues
         WHERE sprint = ?1
         HAVING COUNT(*) > 0",
        params![sprint, statuses.done, statuses.in_progress, statuses.open],
        |row| {
            Ok(SprintTotals {
                sprint: sprint.to_string(),
                total_tasks: row.get::<_, i64>(0)? as u64,
                completed_tasks: row.get::<_, i64>(1)? as u64,
                in_progress_tasks: row.get::<_, i64>(2)? as u64,
                open_tasks: row.get::<_, i64>(3)? as u64,
                total_estimated: row.get(4)?,
                total_spent: row.get(5)?,
                completed_spent: row.get(6)?,
            })
        },
    )
    .optional()
}
