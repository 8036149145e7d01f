use serde::{Deserialize, Serialize};

/// Content formats requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    Markdown,
    Html,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, rename = "sourceURL", skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

/// One page record as returned by the crawl provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawledPage {
    #[serde(default)]
    pub markdown: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub metadata: Option<PageMetadata>,
}

impl CrawledPage {
    pub fn new(url: Option<&str>, markdown: &str, html: &str) -> Self {
        Self {
            markdown: Some(markdown.to_string()),
            html: Some(html.to_string()),
            metadata: url.map(|url| PageMetadata {
                url: Some(url.to_string()),
                ..PageMetadata::default()
            }),
        }
    }

    /// Markdown when non-empty, else HTML, else the empty string.
    pub fn content(&self) -> &str {
        [self.markdown.as_deref(), self.html.as_deref()]
            .into_iter()
            .flatten()
            .find(|content| !content.is_empty())
            .unwrap_or("")
    }

    /// The page URL reported in `metadata.url`, if any.
    pub fn url(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.url.as_deref())
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CrawlResult {
    Success { pages: Vec<CrawledPage> },
    Failure { reason: String },
}

impl CrawlResult {
    pub fn failure(reason: impl Into<String>) -> Self {
        CrawlResult::Failure {
            reason: reason.into(),
        }
    }
}

/// Provider-side crawl progress, as reported by each status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlProgress {
    pub completed: usize,
    pub total: usize,
}

impl CrawlProgress {
    /// Completed fraction in `0.0..=1.0`; zero while the total is unknown.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f64 / self.total as f64).clamp(0.0, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_prefers_markdown() {
        let page = CrawledPage::new(None, "# Title", "<h1>Title</h1>");
        assert_eq!(page.content(), "# Title");
    }

    #[test]
    fn test_content_falls_back_to_html_when_markdown_empty() {
        let page = CrawledPage::new(None, "", "<h1>Title</h1>");
        assert_eq!(page.content(), "<h1>Title</h1>");
    }

    #[test]
    fn test_content_empty_when_both_missing() {
        let page = CrawledPage::default();
        assert_eq!(page.content(), "");
    }

    #[test]
    fn test_page_deserializes_provider_shape() {
        let page: CrawledPage = serde_json::from_str(
            r#"{"markdown":"hi","metadata":{"url":"https://a.test/","sourceURL":"https://a.test","statusCode":200}}"#,
        )
        .unwrap();
        assert_eq!(page.url(), Some("https://a.test/"));
        assert_eq!(page.html, None);
        assert_eq!(page.metadata.unwrap().status_code, Some(200));
    }

    #[test]
    fn test_empty_metadata_url_is_absent() {
        let page = CrawledPage::new(Some(""), "x", "");
        assert_eq!(page.url(), None);
    }

    #[test]
    fn test_progress_fraction() {
        assert_eq!(CrawlProgress { completed: 0, total: 0 }.fraction(), 0.0);
        assert_eq!(CrawlProgress { completed: 5, total: 10 }.fraction(), 0.5);
        assert_eq!(CrawlProgress { completed: 12, total: 10 }.fraction(), 1.0);
    }
}
