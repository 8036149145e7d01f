use crate::result::ContentFormat;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.firecrawl.dev";
pub const DEFAULT_PAGE_LIMIT: usize = 50;
/// Target used when checking whether an API key is accepted.
pub const VALIDATION_URL: &str = "https://example.com";

/// Settings for talking to the Firecrawl API
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub api_url: String,
    pub page_limit: usize,
    pub formats: Vec<ContentFormat>,
    pub timeout_secs: u64,
    pub poll_interval: Duration,
    pub max_polls: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            page_limit: DEFAULT_PAGE_LIMIT,
            formats: vec![ContentFormat::Markdown, ContentFormat::Html],
            timeout_secs: 30,
            poll_interval: Duration::from_secs(2),
            max_polls: 150,
        }
    }
}

impl CrawlerConfig {
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = limit.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_polls(mut self, max_polls: usize) -> Self {
        self.max_polls = max_polls.max(1);
        self
    }

    pub(crate) fn crawl_endpoint(&self) -> String {
        format!("{}/v1/crawl", self.api_url)
    }

    pub(crate) fn status_endpoint(&self, job_id: &str) -> String {
        format!("{}/v1/crawl/{}", self.api_url, job_id)
    }

    /// Whether `candidate` has the same scheme, host and port as `api_url`.
    pub(crate) fn is_api_origin(&self, candidate: &str) -> bool {
        match (Url::parse(&self.api_url), Url::parse(candidate)) {
            (Ok(api), Ok(candidate)) => api.origin() == candidate.origin(),
            _ => false,
        }
    }
}
