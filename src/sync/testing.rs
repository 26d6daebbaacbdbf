use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::sync::source::{IssueSource, SearchPage};

/// In-memory [`IssueSource`] for sync tests. Serves a fixed list of raw
/// issues and records every requested offset.
pub struct FakeSource {
    issues: Mutex<Vec<Value>>,
    reported_total: Option<usize>,
    fail_at: Option<usize>,
    page_cap: Option<usize>,
    offsets: Mutex<Vec<usize>>,
}

impl FakeSource {
    pub fn new(issues: Vec<Value>) -> Self {
        Self {
            issues: Mutex::new(issues),
            reported_total: None,
            fail_at: None,
            page_cap: None,
            offsets: Mutex::new(Vec::new()),
        }
    }

    /// `count` minimal issues keyed `DW-1` .. `DW-{count}`.
    pub fn numbered(count: usize) -> Self {
        Self::new(
            (1..=count)
                .map(|i| json!({"key": format!("DW-{i}"), "fields": {}}))
                .collect(),
        )
    }

    /// Report this total instead of the real length.
    pub fn with_reported_total(mut self, total: usize) -> Self {
        self.reported_total = Some(total);
        self
    }

    /// Fail the request whose offset equals `start_at`.
    pub fn failing_at(mut self, start_at: usize) -> Self {
        self.fail_at = Some(start_at);
        self
    }

    /// Return at most `cap` issues per request, whatever `maxResults` asks
    /// for, like a server enforcing its own limit.
    pub fn with_page_cap(mut self, cap: usize) -> Self {
        self.page_cap = Some(cap);
        self
    }

    /// Swap the served issues, as if the remote changed between runs.
    pub fn set_issues(&self, issues: Vec<Value>) {
        *self.issues.lock().unwrap() = issues;
    }

    pub fn offsets(&self) -> Vec<usize> {
        self.offsets.lock().unwrap().clone()
    }
}

#[async_trait]
impl IssueSource for FakeSource {
    async fn search(&self, _jql: &str, start_at: usize, max_results: u32) -> Result<SearchPage> {
        self.offsets.lock().unwrap().push(start_at);
        if self.fail_at == Some(start_at) {
            return Err(Error::Http {
                endpoint: "fake://search".to_string(),
                status: 503,
                body: "service unavailable".to_string(),
            });
        }

        let issues = self.issues.lock().unwrap();
        let limit = match self.page_cap {
            Some(cap) => cap.min(max_results as usize),
            None => max_results as usize,
        };
        let page = issues
            .iter()
            .skip(start_at)
            .take(limit)
            .cloned()
            .collect();
        Ok(SearchPage {
            issues: page,
            total: self.reported_total.unwrap_or(issues.len()),
        })
    }
}
