pub mod repository;
pub mod schema;

use rusqlite_migration::{Migrations, M};

use crate::error::{Error, Result};

/// Database wraps two `tokio_rusqlite::Connection` instances (writer + reader)
/// using WAL mode for concurrent access. The writer serializes writes via
/// `tokio_rusqlite`'s internal channel; readers only ever see committed sync
/// runs.
#[derive(Clone)]
pub struct Database {
    writer: tokio_rusqlite::Connection,
    reader: tokio_rusqlite::Connection,
}

pub(crate) fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(schema::INITIAL_SCHEMA)])
}

impl Database {
    /// Open the database at the default path (`~/.jiradw/jiradw.db`).
    pub async fn open() -> Result<Self> {
        let dir = dirs::home_dir()
            .ok_or_else(|| Error::Config("cannot determine home directory".into()))?
            .join(".jiradw");
        std::fs::create_dir_all(&dir).map_err(|e| Error::Config(e.to_string()))?;
        Self::open_at(dir.join("jiradw.db")).await
    }

    /// Open the database at the given path.
    pub async fn open_at(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let writer = tokio_rusqlite::Connection::open(&path).await?;
        Self::init_writer(&writer).await?;

        let reader = tokio_rusqlite::Connection::open(&path).await?;
        Self::init_reader(&reader).await?;

        Ok(Self { writer, reader })
    }

    /// Open an in-memory database (for testing).
    pub async fn open_memory() -> Result<Self> {
        let writer = tokio_rusqlite::Connection::open_in_memory().await?;
        Self::init_writer(&writer).await?;

        // In-memory DBs are per-connection, so reader and writer share one.
        Ok(Self {
            reader: writer.clone(),
            writer,
        })
    }

    async fn init_writer(conn: &tokio_rusqlite::Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;\
                 PRAGMA foreign_keys=ON;\
                 PRAGMA busy_timeout=5000;",
            )
            .map_err(|e| e.to_string())?;
            migrations().to_latest(conn).map_err(|e| e.to_string())?;
            Ok::<(), String>(())
        })
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn init_reader(conn: &tokio_rusqlite::Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;\
                 PRAGMA foreign_keys=ON;\
                 PRAGMA busy_timeout=5000;",
            )?;
            Ok::<(), rusqlite::Error>(())
        })
        .await?;
        Ok(())
    }

    /// Get a reference to the writer connection.
    pub fn writer(&self) -> &tokio_rusqlite::Connection {
        &self.writer
    }

    /// Get a reference to the reader connection.
    pub fn reader(&self) -> &tokio_rusqlite::Connection {
        &self.reader
    }

    /// Drop every mirrored row and recreate the tables from the known schema.
    ///
    /// This is the one-time provisioning step; sync never deletes issues.
    pub async fn reset(&self) -> Result<()> {
        self.writer
            .call(|conn| {
                let tx = conn.transaction()?;
                schema::reset_schema(&tx)?;
                tx.commit()?;
                Ok::<(), rusqlite::Error>(())
            })
            .await?;
        log::info!("Storage reset to the initial schema");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_names(db: &Database) -> Vec<String> {
        db.reader()
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                Ok::<Vec<String>, rusqlite::Error>(rows.filter_map(|r| r.ok()).collect())
            })
            .await
            .unwrap()
    }

    #[test]
    fn test_migrations_are_valid() {
        assert!(migrations().validate().is_ok());
    }

    #[tokio::test]
    async fn test_open_memory() {
        let db = Database::open_memory().await.unwrap();
        let tables = table_names(&db).await;
        assert!(tables.contains(&"jira_issues".to_string()));
        assert!(tables.contains(&"jira_issue_links".to_string()));
    }

    #[tokio::test]
    async fn test_open_at_file_reopens_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirror.db");

        let db = Database::open_at(&path).await.unwrap();
        db.writer()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO jira_issues (issue_key, last_synced) VALUES ('DW-1', 1)",
                    [],
                )?;
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
        drop(db);

        let db = Database::open_at(&path).await.unwrap();
        let count: i64 = db
            .reader()
            .call(|conn| {
                conn.query_row("SELECT COUNT(*) FROM jira_issues", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_reset_clears_rows_and_keeps_schema() {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO jira_issues (issue_key, last_synced) VALUES ('DW-1', 1)",
                    [],
                )?;
                conn.execute(
                    "INSERT INTO jira_issue_links (source_issue_key, position, target_issue_key, direction)
                     VALUES ('DW-1', 0, 'DW-2', 'outward')",
                    [],
                )?;
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();

        db.reset().await.unwrap();

        let (issues, links): (i64, i64) = db
            .reader()
            .call(|conn| {
                let issues = conn.query_row("SELECT COUNT(*) FROM jira_issues", [], |r| r.get(0))?;
                let links =
                    conn.query_row("SELECT COUNT(*) FROM jira_issue_links", [], |r| r.get(0))?;
                Ok::<_, rusqlite::Error>((issues, links))
            })
            .await
            .unwrap();
        assert_eq!((issues, links), (0, 0));

        let tables = table_names(&db).await;
        assert!(tables.contains(&"jira_issue_links".to_string()));
    }

    #[tokio::test]
    async fn test_link_requires_existing_source_issue() {
        let db = Database::open_memory().await.unwrap();
        let result = db
            .writer()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO jira_issue_links (source_issue_key, position, target_issue_key, direction)
                     VALUES ('NOPE-1', 0, 'DW-2', 'outward')",
                    [],
                )?;
                Ok::<(), rusqlite::Error>(())
            })
            .await;
        assert!(result.is_err());
    }
}
