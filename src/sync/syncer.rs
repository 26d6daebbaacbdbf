use std::collections::HashMap;

use serde_json::Value;

use crate::config::FieldMap;
use crate::date_util::now_micros;
use crate::error::Result;
use crate::model::{Issue, Link};
use crate::storage::repository;
use crate::storage::Database;
use crate::sync::links::resolve_links;
use crate::sync::normalize::{normalize_issue, NormalizedIssue};
use crate::sync::paginator::Paginator;
use crate::sync::source::IssueSource;
use crate::sync::{SyncOptions, SyncProgress, SyncReport};

/// Issues and links ready to be written in one transaction.
#[derive(Debug, Default)]
struct Batch {
    issues: Vec<Issue>,
    links: Vec<Link>,
    skipped: usize,
}

/// Mirror every issue matching `jql` into the database.
///
/// The full result set is fetched first; nothing is written if any page
/// fails. Persistence runs in a single transaction: upsert each issue, drop
/// every stored link whose source is one of those issues, insert the freshly
/// resolved links, commit. Links of issues outside this result set are left
/// alone. An empty result set writes nothing and opens no transaction.
pub async fn sync_issues(
    db: &Database,
    source: &dyn IssueSource,
    jql: &str,
    options: &SyncOptions,
    progress: &dyn SyncProgress,
) -> Result<SyncReport> {
    log::info!("Starting sync for JQL: {jql}");

    let mut paginator = Paginator::new(source, jql, options.page_size);
    let mut records: Vec<Value> = Vec::new();
    while let Some(page) = paginator.next_page().await? {
        records.extend(page);
        progress.on_page_fetched(paginator.pages_fetched(), records.len());
    }

    let mut report = SyncReport {
        jql: jql.to_string(),
        pages_fetched: paginator.pages_fetched(),
        records_fetched: records.len(),
        ..Default::default()
    };

    let batch = build_batch(&records, &options.fields);
    report.issues_skipped = batch.skipped;
    progress.on_batch_ready(batch.issues.len(), batch.links.len());

    if batch.issues.is_empty() {
        log::info!("No issues to write for JQL: {jql}");
        progress.on_complete(&report);
        return Ok(report);
    }

    let (issues_written, links_written) = db
        .writer()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let synced_at = now_micros();

            for issue in &batch.issues {
                repository::upsert_issue(&tx, issue, synced_at)?;
            }

            let keys: Vec<String> = batch.issues.iter().map(|i| i.issue_key.clone()).collect();
            let replaced = repository::delete_links_for_sources(&tx, &keys)?;
            let inserted = repository::insert_links(&tx, &batch.links)?;
            log::debug!("Replaced {replaced} stored links with {inserted} fresh ones");

            tx.commit()?;
            Ok::<(usize, usize), rusqlite::Error>((batch.issues.len(), inserted))
        })
        .await?;

    report.issues_written = issues_written;
    report.links_written = links_written;
    log::info!(
        "Sync complete: {issues_written} issues, {links_written} links ({} skipped)",
        report.issues_skipped
    );
    progress.on_complete(&report);
    Ok(report)
}

/// Normalize raw records, keeping the last record seen for each key.
fn build_batch(records: &[Value], fields: &FieldMap) -> Batch {
    let mut batch = Batch::default();
    let mut normalized: Vec<NormalizedIssue> = Vec::with_capacity(records.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for raw in records {
        let Some(record) = normalize_issue(raw, fields) else {
            log::warn!("Skipping issue record without a key");
            batch.skipped += 1;
            continue;
        };
        match index.get(&record.issue.issue_key) {
            Some(&i) => {
                log::debug!(
                    "Duplicate record for {}, keeping the later one",
                    record.issue.issue_key
                );
                normalized[i] = record;
            }
            None => {
                index.insert(record.issue.issue_key.clone(), normalized.len());
                normalized.push(record);
            }
        }
    }

    for record in normalized {
        batch
            .links
            .extend(resolve_links(&record.issue.issue_key, &record.links));
        batch.issues.push(record.issue);
    }
    batch
}
