pub mod links;
pub mod normalize;
pub mod paginator;
pub mod source;
pub mod sprint;
pub mod syncer;

#[cfg(test)]
pub(crate) mod testing;

use serde::Serialize;

use crate::config::{FieldMap, JiraConfig, DEFAULT_PAGE_SIZE};

/// Options controlling a sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub page_size: u32,
    pub fields: FieldMap,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            fields: FieldMap::default(),
        }
    }
}

impl SyncOptions {
    pub fn from_config(config: &JiraConfig) -> Self {
        Self {
            page_size: config.page_size,
            fields: config.fields.clone(),
        }
    }
}

/// Summary of one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub jql: String,
    pub issues_written: usize,
    pub links_written: usize,
    /// Records dropped because they carried no issue key.
    pub issues_skipped: usize,
    pub pages_fetched: u32,
    pub records_fetched: usize,
}

/// Callback trait for reporting sync progress to the caller.
pub trait SyncProgress: Send + Sync {
    fn on_page_fetched(&self, _page: u32, _fetched_so_far: usize) {}
    fn on_batch_ready(&self, _issues: usize, _links: usize) {}
    fn on_complete(&self, _report: &SyncReport) {}
}

/// Progress reporter that ignores every event.
pub struct NoopProgress;

impl SyncProgress for NoopProgress {}
