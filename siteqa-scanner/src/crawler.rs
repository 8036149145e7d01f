use crate::config::{CrawlerConfig, VALIDATION_URL};
use crate::credential::Credential;
use crate::error::{Result, ScanError};
use crate::result::{ContentFormat, CrawlProgress, CrawlResult, CrawledPage};
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub const MISSING_CREDENTIAL: &str = "API key not found";

pub type ProgressCallback = Arc<dyn Fn(CrawlProgress) + Send + Sync>;

/// Boundary to the external crawl provider.
///
/// Implementations never fail past this seam: every problem is folded into
/// `CrawlResult::Failure` or a `false` validation outcome.
pub trait CrawlClient: Send + Sync {
    fn crawl(
        &self,
        url: &str,
        credential: Option<&Credential>,
        progress: Option<ProgressCallback>,
    ) -> impl Future<Output = CrawlResult> + Send;

    fn validate_credential(&self, candidate: &Credential) -> impl Future<Output = bool> + Send;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CrawlRequest<'a> {
    url: &'a str,
    limit: usize,
    scrape_options: ScrapeOptions<'a>,
}

#[derive(Serialize)]
struct ScrapeOptions<'a> {
    formats: &'a [ContentFormat],
}

#[derive(serde::Deserialize)]
struct CrawlSubmission {
    id: Option<String>,
}

#[derive(serde::Deserialize)]
struct CrawlStatus {
    #[serde(default)]
    status: String,
    #[serde(default)]
    completed: usize,
    #[serde(default)]
    total: usize,
    #[serde(default)]
    data: Vec<CrawledPage>,
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Firecrawl v1 client: submits a crawl job, then polls it to completion.
pub struct FirecrawlClient {
    client: Client,
    config: CrawlerConfig,
}

impl FirecrawlClient {
    pub fn new(config: CrawlerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("SiteQA/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs((config.timeout_secs / 2).max(1)))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self { client, config })
    }

    async fn run_crawl(
        &self,
        url: &str,
        credential: &Credential,
        limit: usize,
        progress: Option<&ProgressCallback>,
    ) -> Result<Vec<CrawledPage>> {
        Url::parse(url).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))?;

        let job_id = self.start_job(url, credential, limit).await?;
        debug!("Crawl job {} accepted for {}", job_id, url);

        self.wait_for_job(&job_id, credential, limit, progress).await
    }

    async fn start_job(&self, url: &str, credential: &Credential, limit: usize) -> Result<String> {
        let request = CrawlRequest {
            url,
            limit,
            scrape_options: ScrapeOptions {
                formats: &self.config.formats,
            },
        };

        let response = self
            .client
            .post(self.config.crawl_endpoint())
            .bearer_auth(credential.expose())
            .json(&request)
            .send()
            .await?;

        let submission: CrawlSubmission = Self::read_reply(response).await?;
        submission
            .id
            .ok_or_else(|| ScanError::ParseError("crawl job id missing from response".to_string()))
    }

    async fn wait_for_job(
        &self,
        job_id: &str,
        credential: &Credential,
        limit: usize,
        progress: Option<&ProgressCallback>,
    ) -> Result<Vec<CrawledPage>> {
        let max_polls = self.config.max_polls;

        for attempt in 1..=max_polls {
            let response = self
                .client
                .get(self.config.status_endpoint(job_id))
                .bearer_auth(credential.expose())
                .send()
                .await?;
            let status: CrawlStatus = Self::read_reply(response).await?;

            if let Some(callback) = progress {
                callback(CrawlProgress {
                    completed: status.completed,
                    total: status.total,
                });
            }

            match status.status.as_str() {
                "completed" => return self.collect_pages(status, credential, limit).await,
                "failed" | "cancelled" => {
                    warn!("Crawl job {} ended with status {}", job_id, status.status);
                    return Err(ScanError::provider(status.error));
                }
                other => {
                    debug!(
                        "Crawl job {} is {} ({}/{}), check {}/{}",
                        job_id, other, status.completed, status.total, attempt, max_polls
                    );
                    if attempt < max_polls {
                        tokio::time::sleep(self.config.poll_interval).await;
                    }
                }
            }
        }

        Err(ScanError::Timeout(max_polls))
    }

    /// Gathers the page data, following `next` links while the provider
    /// splits a large result set. Stops at `limit` pages and never sends the
    /// key to a host other than the configured API.
    async fn collect_pages(
        &self,
        status: CrawlStatus,
        credential: &Credential,
        limit: usize,
    ) -> Result<Vec<CrawledPage>> {
        let mut pages = status.data;
        let mut next = status.next;

        while pages.len() < limit {
            let Some(next_url) = next.take() else {
                break;
            };
            if !self.config.is_api_origin(&next_url) {
                warn!("Ignoring next batch link outside the API host: {}", next_url);
                break;
            }

            debug!("Fetching next batch of crawl results from {}", next_url);
            let response = self
                .client
                .get(&next_url)
                .bearer_auth(credential.expose())
                .send()
                .await?;
            let batch: CrawlStatus = Self::read_reply(response).await?;
            if batch.data.is_empty() {
                break;
            }
            pages.extend(batch.data);
            next = batch.next;
        }

        pages.truncate(limit);
        Ok(pages)
    }

    /// Decodes a provider reply, turning `success: false` and non-2xx
    /// statuses into provider errors that carry the provider's message.
    async fn read_reply<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        let value: Value = match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(_) if !status.is_success() => {
                return Err(ScanError::UnexpectedStatus {
                    status: status.as_u16(),
                    body: body.chars().take(200).collect(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let reported_failure = value.get("success").and_then(Value::as_bool) == Some(false);
        if reported_failure || !status.is_success() {
            let message = value
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string);
            return Err(ScanError::provider(message));
        }

        Ok(serde_json::from_value(value)?)
    }
}

impl CrawlClient for FirecrawlClient {
    async fn crawl(
        &self,
        url: &str,
        credential: Option<&Credential>,
        progress: Option<ProgressCallback>,
    ) -> CrawlResult {
        let Some(credential) = credential.filter(|c| !c.is_empty()) else {
            return CrawlResult::failure(MISSING_CREDENTIAL);
        };

        info!(
            "Making crawl request to Firecrawl API for {} (limit {})",
            url, self.config.page_limit
        );

        match self
            .run_crawl(url, credential, self.config.page_limit, progress.as_ref())
            .await
        {
            Ok(pages) => {
                info!("Crawl successful. Received {} pages", pages.len());
                CrawlResult::Success { pages }
            }
            Err(e) => {
                warn!("Error during crawl of {}: {}", url, e);
                CrawlResult::failure(e.reason())
            }
        }
    }

    async fn validate_credential(&self, candidate: &Credential) -> bool {
        if candidate.is_empty() {
            return false;
        }

        info!("Testing API key {} with Firecrawl API", candidate);
        match self.run_crawl(VALIDATION_URL, candidate, 1, None).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Error testing API key: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path, query_param},
    };

    fn test_client(server: &MockServer) -> FirecrawlClient {
        let config = CrawlerConfig::default()
            .with_api_url(server.uri())
            .with_poll_interval(Duration::from_millis(10))
            .with_max_polls(5);
        FirecrawlClient::new(config).unwrap()
    }

    fn key() -> Credential {
        Credential::new("fc-test-key")
    }

    async fn mount_job(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/v1/crawl"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"success": true, "id": "job-1"})),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_crawl_submits_limit_and_formats() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/crawl"))
            .and(header("authorization", "Bearer fc-test-key"))
            .and(body_partial_json(json!({
                "url": "https://example.com",
                "limit": 50,
                "scrapeOptions": {"formats": ["markdown", "html"]}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"success": true, "id": "job-1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/crawl/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "status": "completed",
                "completed": 2,
                "total": 2,
                "data": [
                    {"markdown": "# Home", "metadata": {"url": "https://example.com/"}},
                    {"html": "<h1>About</h1>", "metadata": {"url": "https://example.com/about"}}
                ]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let result = client.crawl("https://example.com", Some(&key()), None).await;

        match result {
            CrawlResult::Success { pages } => {
                assert_eq!(pages.len(), 2);
                assert_eq!(pages[0].content(), "# Home");
                assert_eq!(pages[1].url(), Some("https://example.com/about"));
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_credential_never_hits_network() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let result = client.crawl("https://example.com", None, None).await;
        assert_eq!(result, CrawlResult::failure("API key not found"));

        let blank = Credential::new("  ");
        let result = client.crawl("https://example.com", Some(&blank), None).await;
        assert_eq!(result, CrawlResult::failure("API key not found"));
    }

    #[tokio::test]
    async fn test_provider_error_message_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/crawl"))
            .respond_with(
                ResponseTemplate::new(402)
                    .set_body_json(json!({"success": false, "error": "Insufficient credits"})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server);
        let result = client.crawl("https://example.com", Some(&key()), None).await;
        assert_eq!(result, CrawlResult::failure("Insufficient credits"));
    }

    #[tokio::test]
    async fn test_provider_failure_without_message_uses_fallback() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/crawl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let result = client.crawl("https://example.com", Some(&key()), None).await;
        assert_eq!(result, CrawlResult::failure("Failed to crawl website"));
    }

    #[tokio::test]
    async fn test_transport_error_becomes_failure() {
        let config = CrawlerConfig::default()
            .with_api_url("http://127.0.0.1:1")
            .with_timeout(2);
        let client = FirecrawlClient::new(config).unwrap();

        match client.crawl("https://example.com", Some(&key()), None).await {
            CrawlResult::Failure { reason } => assert!(!reason.is_empty()),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_polls_until_completed_and_reports_progress() {
        let server = MockServer::start().await;
        mount_job(&server).await;

        Mock::given(method("GET"))
            .and(path("/v1/crawl/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "status": "scraping", "completed": 1, "total": 4, "data": []
            })))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/crawl/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "status": "completed", "completed": 4, "total": 4,
                "data": [{"markdown": "page"}]
            })))
            .mount(&server)
            .await;

        let seen: Arc<Mutex<Vec<CrawlProgress>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let progress: ProgressCallback = Arc::new(move |p| seen_clone.lock().unwrap().push(p));

        let client = test_client(&server);
        let result = client
            .crawl("https://example.com", Some(&key()), Some(progress))
            .await;

        assert!(matches!(result, CrawlResult::Success { .. }));
        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                CrawlProgress { completed: 1, total: 4 },
                CrawlProgress { completed: 4, total: 4 },
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_job_status_is_failure() {
        let server = MockServer::start().await;
        mount_job(&server).await;

        Mock::given(method("GET"))
            .and(path("/v1/crawl/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "status": "failed", "error": "Target blocked the crawler"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let result = client.crawl("https://example.com", Some(&key()), None).await;
        assert_eq!(result, CrawlResult::failure("Target blocked the crawler"));
    }

    #[tokio::test]
    async fn test_poll_budget_exhaustion_times_out() {
        let server = MockServer::start().await;
        mount_job(&server).await;

        Mock::given(method("GET"))
            .and(path("/v1/crawl/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "status": "scraping", "completed": 0, "total": 10
            })))
            .expect(5)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let result = client.crawl("https://example.com", Some(&key()), None).await;
        assert_eq!(
            result,
            CrawlResult::failure("Crawl timed out after 5 status checks")
        );
    }

    #[tokio::test]
    async fn test_follows_next_batches() {
        let server = MockServer::start().await;
        mount_job(&server).await;

        Mock::given(method("GET"))
            .and(path("/v1/crawl/job-1"))
            .and(query_param("skip", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "status": "completed", "data": [{"markdown": "second"}]
            })))
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/crawl/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "status": "completed", "completed": 2, "total": 2,
                "data": [{"markdown": "first"}],
                "next": format!("{}/v1/crawl/job-1?skip=1", server.uri())
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        match client.crawl("https://example.com", Some(&key()), None).await {
            CrawlResult::Success { pages } => {
                let contents: Vec<&str> = pages.iter().map(|p| p.content()).collect();
                assert_eq!(contents, vec!["first", "second"]);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_next_batches_stop_at_page_limit() {
        let server = MockServer::start().await;
        mount_job(&server).await;

        Mock::given(method("GET"))
            .and(path("/v1/crawl/job-1"))
            .and(query_param("skip", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "status": "completed", "data": [{"markdown": "third"}]
            })))
            .with_priority(1)
            .expect(0)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/crawl/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "status": "completed", "completed": 3, "total": 3,
                "data": [{"markdown": "first"}, {"markdown": "second"}],
                "next": format!("{}/v1/crawl/job-1?skip=2", server.uri())
            })))
            .mount(&server)
            .await;

        let config = CrawlerConfig::default()
            .with_api_url(server.uri())
            .with_poll_interval(Duration::from_millis(10))
            .with_page_limit(1);
        let client = FirecrawlClient::new(config).unwrap();

        match client.crawl("https://example.com", Some(&key()), None).await {
            CrawlResult::Success { pages } => {
                let contents: Vec<&str> = pages.iter().map(|p| p.content()).collect();
                assert_eq!(contents, vec!["first"]);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_next_link_to_other_host_is_not_followed() {
        let server = MockServer::start().await;
        let elsewhere = MockServer::start().await;
        mount_job(&server).await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "status": "completed", "data": [{"markdown": "stolen"}]
            })))
            .expect(0)
            .mount(&elsewhere)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/crawl/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "status": "completed", "completed": 1, "total": 2,
                "data": [{"markdown": "first"}],
                "next": format!("{}/v1/crawl/job-1?skip=1", elsewhere.uri())
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        match client.crawl("https://example.com", Some(&key()), None).await {
            CrawlResult::Success { pages } => assert_eq!(pages.len(), 1),
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_url_is_failure() {
        let server = MockServer::start().await;
        let client = test_client(&server);

        match client.crawl("not a url", Some(&key()), None).await {
            CrawlResult::Failure { reason } => assert!(reason.starts_with("Invalid URL")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_validate_credential_accepts_working_key() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/crawl"))
            .and(body_partial_json(json!({"url": "https://example.com", "limit": 1})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"success": true, "id": "job-1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/crawl/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "status": "completed", "data": [{"markdown": "ok"}]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        assert!(client.validate_credential(&key()).await);
    }

    #[tokio::test]
    async fn test_validate_credential_rejects_unauthorized_key() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/crawl"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"success": false, "error": "Unauthorized: Invalid token"})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server);
        assert!(!client.validate_credential(&key()).await);
        assert!(!client.validate_credential(&Credential::new("")).await);
    }
}
