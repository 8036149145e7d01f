pub mod config;
pub mod crawler;
pub mod credential;
pub mod error;
pub mod result;

pub use config::CrawlerConfig;
pub use crawler::{CrawlClient, FirecrawlClient, ProgressCallback};
pub use credential::Credential;
pub use error::ScanError;
pub use result::{CrawlProgress, CrawlResult, CrawledPage, PageMetadata};
