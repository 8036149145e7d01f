use thiserror::Error;

pub const PROVIDER_FALLBACK: &str = "Failed to crawl website";
pub const TRANSPORT_FALLBACK: &str = "Failed to connect to Firecrawl API";

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("{0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("{0}")]
    Provider(String),

    #[error("Unexpected response from Firecrawl API ({status}): {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Crawl timed out after {0} status checks")]
    Timeout(usize),
}

impl ScanError {
    /// Provider-reported failure, falling back to a generic message when the
    /// provider sent none.
    pub fn provider(message: Option<String>) -> Self {
        match message {
            Some(message) if !message.trim().is_empty() => ScanError::Provider(message),
            _ => ScanError::Provider(PROVIDER_FALLBACK.to_string()),
        }
    }

    /// Human-readable reason surfaced in `CrawlResult::Failure`.
    pub fn reason(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            TRANSPORT_FALLBACK.to_string()
        } else {
            message
        }
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(e: serde_json::Error) -> Self {
        ScanError::ParseError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
