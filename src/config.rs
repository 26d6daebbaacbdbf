use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SPRINT_FIELD: &str = "customfield_10104";
pub const DEFAULT_EPIC_FIELD: &str = "customfield_10100";

/// Standard fields requested for every issue, in addition to the custom
/// fields named by [`FieldMap`].
const BASE_FIELDS: &[&str] = &[
    "key",
    "issuetype",
    "status",
    "created",
    "timeoriginalestimate",
    "timespent",
    "updated",
    "summary",
    "assignee",
    "reporter",
    "priority",
    "labels",
    "issuelinks",
];

/// Instance-specific custom field ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    pub sprint: String,
    pub epic: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            sprint: DEFAULT_SPRINT_FIELD.to_string(),
            epic: DEFAULT_EPIC_FIELD.to_string(),
        }
    }
}

impl FieldMap {
    /// Value for the `fields` query parameter of the search endpoint.
    pub fn fields_param(&self) -> String {
        let mut fields: Vec<&str> = BASE_FIELDS.to_vec();
        fields.push(&self.sprint);
        fields.push(&self.epic);
        fields.join(",")
    }
}

/// Connection parameters for the Jira server.
#[derive(Debug, Clone)]
pub struct JiraConfig {
    /// Server root, without a trailing slash.
    pub base_url: String,
    pub login: String,
    pub password: String,
    pub page_size: u32,
    pub timeout: Duration,
    pub fields: FieldMap,
}

impl JiraConfig {
    pub fn new(base_url: &str, login: &str, password: &str) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            login: login.to_string(),
            password: password.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            fields: FieldMap::default(),
        })
    }

    /// Build a config from `JIRA_*` environment variables.
    ///
    /// `JIRA_URL`, `JIRA_LOGIN` and `JIRA_PASSWORD` are required; the error
    /// lists every one that is missing. `JIRA_PAGE_SIZE`, `JIRA_TIMEOUT_SECS`,
    /// `JIRA_SPRINT_FIELD` and `JIRA_EPIC_FIELD` are optional.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let url = get("JIRA_URL");
        let login = get("JIRA_LOGIN");
        let password = get("JIRA_PASSWORD");

        let (url, login, password) = match (url, login, password) {
            (Some(u), Some(l), Some(p)) => (u, l, p),
            (u, l, p) => {
                let missing: Vec<&str> = [
                    ("JIRA_URL", u.is_none()),
                    ("JIRA_LOGIN", l.is_none()),
                    ("JIRA_PASSWORD", p.is_none()),
                ]
                .iter()
                .filter(|(_, absent)| *absent)
                .map(|(name, _)| *name)
                .collect();
                return Err(Error::Config(format!(
                    "missing environment variables: {}",
                    missing.join(", ")
                )));
            }
        };

        let mut config = Self::new(&url, &login, &password)?;

        if let Some(raw) = get("JIRA_PAGE_SIZE") {
            config.page_size = match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(Error::Config(format!(
                        "JIRA_PAGE_SIZE must be a positive integer, got '{raw}'"
                    )))
                }
            };
        }
        if let Some(raw) = get("JIRA_TIMEOUT_SECS") {
            let secs = match raw.trim().parse::<u64>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(Error::Config(format!(
                        "JIRA_TIMEOUT_SECS must be a positive integer, got '{raw}'"
                    )))
                }
            };
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(field) = get("JIRA_SPRINT_FIELD") {
            config.fields.sprint = field;
        }
        if let Some(field) = get("JIRA_EPIC_FIELD") {
            config.fields.epic = field;
        }

        Ok(config)
    }

    pub fn search_endpoint(&self) -> String {
        format!("{}/rest/api/2/search", self.base_url)
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| Error::Config(format!("invalid JIRA_URL '{raw}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(Error::Config(format!(
            "JIRA_URL must use http or https, got '{other}'"
        ))),
    }
}
