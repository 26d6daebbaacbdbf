use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::JiraConfig;
use crate::error::{Error, Result};

/// Longest response body carried in an [`Error::Http`].
const MAX_ERROR_BODY: usize = 500;

/// One page of a JQL search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub issues: Vec<Value>,
    /// Total number of issues matching the query at the time of the request.
    #[serde(default)]
    pub total: usize,
}

/// Remote issue-query endpoint.
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// Fetch at most `max_results` raw issues starting at offset `start_at`.
    async fn search(&self, jql: &str, start_at: usize, max_results: u32) -> Result<SearchPage>;
}

/// [`IssueSource`] backed by the Jira REST v2 search endpoint.
pub struct JiraClient {
    http: Client,
    endpoint: String,
    login: String,
    password: String,
    fields: String,
}

impl JiraClient {
    pub fn new(config: &JiraConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            endpoint: config.search_endpoint(),
            login: config.login.clone(),
            password: config.password.clone(),
            fields: config.fields.fields_param(),
        })
    }
}

#[async_trait]
impl IssueSource for JiraClient {
    async fn search(&self, jql: &str, start_at: usize, max_results: u32) -> Result<SearchPage> {
        log::debug!(
            "GET {} jql={jql:?} startAt={start_at} maxResults={max_results}",
            self.endpoint
        );

        let start_at = start_at.to_string();
        let max_results = max_results.to_string();
        let response = self
            .http
            .get(&self.endpoint)
            .basic_auth(&self.login, Some(&self.password))
            .header("Accept", "application/json")
            .query(&[
                ("jql", jql),
                ("startAt", start_at.as_str()),
                ("maxResults", max_results.as_str()),
                ("fields", self.fields.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read response body>".to_string());
            let body = truncate_body(&body);
            log::error!("Jira search failed with HTTP {}: {body}", status.as_u16());
            return Err(Error::Http {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<SearchPage>().await?)
    }
}

fn truncate_body(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_page_defaults_missing_fields() {
        let page: SearchPage = serde_json::from_str("{}").unwrap();
        assert!(page.issues.is_empty());
        assert_eq!(page.total, 0);

        let page: SearchPage = serde_json::from_str(
            r#"{"startAt":0,"maxResults":100,"total":2,"issues":[{"key":"DW-1"},{"key":"DW-2"}]}"#,
        )
        .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.issues[1]["key"], "DW-2");
    }

    #[test]
    fn test_truncate_body_counts_characters() {
        let long = "ошибка".repeat(200);
        let truncated = truncate_body(&long);
        assert_eq!(truncated.chars().count(), MAX_ERROR_BODY);
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn test_client_uses_configured_endpoint() {
        let config = JiraConfig::new("https://jira.example.com/", "alice", "secret").unwrap();
        let client = JiraClient::new(&config).unwrap();
        assert_eq!(client.endpoint, "https://jira.example.com/rest/api/2/search");
        assert!(client.fields.contains("issuelinks"));
    }
}
