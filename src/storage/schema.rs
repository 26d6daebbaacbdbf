use rusqlite::Connection;

/// DDL for the mirror tables; applied by the first migration and by
/// [`reset_schema`].
pub const INITIAL_SCHEMA: &str = include_str!("migrations/001_initial.sql");

/// Tables owned by the mirror, in drop order (links reference issues).
pub const MIRROR_TABLES: &[&str] = &["jira_issue_links", "jira_issues"];

/// Drop the mirror tables and recreate them empty.
///
/// Callers are expected to run this inside a transaction so a failure leaves
/// the previous tables in place.
pub fn reset_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    for table in MIRROR_TABLES {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))?;
    }
    conn.execute_batch(INITIAL_SCHEMA)
}
