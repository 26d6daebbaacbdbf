use crate::error::Result;
use crate::model::IssueRecord;
use crate::storage::repository::{issue_from_row, ISSUE_COLUMNS};
use crate::storage::Database;

/// Builder for listing mirrored issues with optional filters.
///
/// Results are ordered by `updated_date` (newest first, undated last), then
/// by key.
#[derive(Debug, Clone, Default)]
pub struct IssueQuery {
    status: Option<String>,
    issue_type: Option<String>,
    sprint: Option<String>,
    assignee: Option<String>,
    epic: Option<String>,
    label: Option<String>,
    limit: Option<u32>,
}

impl IssueQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn issue_type(mut self, issue_type: &str) -> Self {
        self.issue_type = Some(issue_type.to_string());
        self
    }

    pub fn sprint(mut self, sprint: &str) -> Self {
        self.sprint = Some(sprint.to_string());
        self
    }

    pub fn assignee(mut self, name: &str) -> Self {
        self.assignee = Some(name.to_string());
        self
    }

    pub fn epic(mut self, key: &str) -> Self {
        self.epic = Some(key.to_string());
        self
    }

    /// Issues carrying this label.
    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }

    /// Build and execute the query.
    pub async fn issues(self, db: &Database) -> Result<Vec<IssueRecord>> {
        let builder = self;
        db.reader()
            .call(move |conn| {
                let (sql, params) = builder.build_sql();
                let param_refs: Vec<&dyn rusqlite::types::ToSql> =
                    params.iter().map(|p| p.as_ref()).collect();
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(param_refs.as_slice(), issue_from_row)?;
                let result: std::result::Result<Vec<IssueRecord>, _> = rows.collect();
                result
            })
            .await
            .map_err(|e| crate::error::Error::Database(e.to_string()))
    }

    /// Build and execute the query, returning a count of matching issues.
    pub async fn count(self, db: &Database) -> Result<u64> {
        let builder = self;
        db.reader()
            .call(move |conn| {
                let (inner_sql, params) = builder.build_sql();
                let sql = format!("SELECT COUNT(*) FROM ({inner_sql})");
                let param_refs: Vec<&dyn rusqlite::types::ToSql> =
                    params.iter().map(|p| p.as_ref()).collect();
                let count: i64 = conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?;
                Ok::<u64, rusqlite::Error>(count as u64)
            })
            .await
            .map_err(|e| crate::error::Error::Database(e.to_string()))
    }

    /// Build and execute the query, returning results as JSON.
    pub async fn to_json(self, db: &Database) -> Result<String> {
        let rows = self.issues(db).await?;
        serde_json::to_string_pretty(&rows).map_err(|e| crate::error::Error::Other(e.to_string()))
    }

    /// Build and execute the query, returning results as CSV.
    pub async fn to_csv(self, db: &Database) -> Result<String> {
        let rows = self.issues(db).await?;
        let mut out = String::new();
        out.push_str("issue_key,issue_type,status,summary,assignee,priority,sprint,epic_link,original_estimate,time_spent,created,updated,labels\n");
        for row in &rows {
            let issue = &row.issue;
            out.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{},{},{},{}\n",
                csv_escape(&issue.issue_key),
                csv_escape(issue.issue_type.as_deref().unwrap_or("")),
                csv_escape(issue.status.as_deref().unwrap_or("")),
                csv_escape(issue.summary.as_deref().unwrap_or("")),
                csv_escape(issue.assignee.as_deref().unwrap_or("")),
                csv_escape(issue.priority.as_deref().unwrap_or("")),
                csv_escape(issue.sprint.as_deref().unwrap_or("")),
                csv_escape(issue.epic_link.as_deref().unwrap_or("")),
                issue.original_estimate.map_or(String::new(), |h| h.to_string()),
                issue.time_spent.map_or(String::new(), |h| h.to_string()),
                issue.created.map_or(String::new(), |t| t.to_string()),
                issue.updated.map_or(String::new(), |t| t.to_string()),
                csv_escape(&issue.labels.join(";")),
            ));
        }
        Ok(out)
    }

    fn build_sql(&self) -> (String, Vec<Box<dyn rusqlite::types::ToSql>>) {
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        let mut wheres = Vec::new();
        let mut param_idx = 1;

        let equality_filters = [
            ("status", &self.status),
            ("issue_type", &self.issue_type),
            ("sprint", &self.sprint),
            ("assignee", &self.assignee),
            ("epic_link", &self.epic),
        ];
        for (column, value) in equality_filters {
            if let Some(value) = value {
                wheres.push(format!("{column} = ?{param_idx}"));
                params.push(Box::new(value.clone()));
                param_idx += 1;
            }
        }

        // Labels are a JSON array column
        if let Some(ref label) = self.label {
            wheres.push(format!(
                "EXISTS (SELECT 1 FROM json_each(jira_issues.labels) WHERE json_each.value = ?{param_idx})"
            ));
            params.push(Box::new(label.clone()));
            param_idx += 1;
        }

        let mut sql = format!("SELECT {ISSUE_COLUMNS} FROM jira_issues");
        if !wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&wheres.join(" AND "));
        }
        sql.push_str(" ORDER BY updated_date DESC, issue_key ASC");

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT ?{param_idx}"));
            params.push(Box::new(limit));
        }

        (sql, params)
    }
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
