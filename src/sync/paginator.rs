use serde_json::Value;

use crate::error::Result;
use crate::sync::source::IssueSource;

/// Walks a JQL result set page by page.
///
/// Each request starts where the records received so far end, so a server
/// that caps `maxResults` below the requested page size loses nothing.
/// The scan ends once the records seen so far reach the most recently
/// reported total, or when a page comes back empty. If the remote total
/// shifts mid-scan the result can be short or long by the drift; this is not
/// corrected. A paginator is single-use: start a new one to re-run the query.
pub struct Paginator<'a> {
    source: &'a dyn IssueSource,
    jql: &'a str,
    page_size: u32,
    start_at: usize,
    fetched: usize,
    pages: u32,
    done: bool,
}

impl<'a> Paginator<'a> {
    pub fn new(source: &'a dyn IssueSource, jql: &'a str, page_size: u32) -> Self {
        Self {
            source,
            jql,
            page_size: page_size.max(1),
            start_at: 0,
            fetched: 0,
            pages: 0,
            done: false,
        }
    }

    /// Fetch the next page, or `None` once the result set is exhausted.
    ///
    /// Any transport error is returned as-is and ends the scan.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Value>>> {
        if self.done {
            return Ok(None);
        }

        let page = match self
            .source
            .search(self.jql, self.start_at, self.page_size)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                self.done = true;
                return Err(e);
            }
        };
        self.pages += 1;
        self.fetched += page.issues.len();
        log::info!(
            "Fetched {} of {} issues (startAt={})",
            self.fetched,
            page.total,
            self.start_at
        );

        if page.issues.is_empty() || self.fetched >= page.total {
            self.done = true;
        }
        self.start_at += page.issues.len();

        if page.issues.is_empty() {
            Ok(None)
        } else {
            Ok(Some(page.issues))
        }
    }

    /// Drain every remaining page into one vector.
    pub async fn collect_all(mut self) -> Result<Vec<Value>> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            all.extend(page);
        }
        Ok(all)
    }

    /// Number of requests issued so far.
    pub fn pages_fetched(&self) -> u32 {
        self.pages
    }

    pub fn records_fetched(&self) -> usize {
        self.fetched
    }
}
