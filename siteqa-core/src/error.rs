use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Credential store lock poisoned")]
    Poisoned,
}

/// Why a scan or credential operation did not complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanFailure {
    #[error("Please set your Firecrawl API key first")]
    MissingCredential,

    #[error("The stored API key has not been validated. Save it again to validate it")]
    UnvalidatedCredential,

    #[error("Invalid API key. Please check and try again.")]
    CredentialRejected,

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Crawl(String),

    #[error("Scan already in progress")]
    AlreadyInProgress,

    #[error("Scan cancelled")]
    Cancelled,

    #[error("Credential storage error: {0}")]
    Storage(String),
}

/// Coarse grouping of failures so callers can decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No usable credential; fix configuration before retrying.
    Configuration,
    /// The provider rejected a user-supplied credential; re-prompt.
    Validation,
    /// Bad user input such as an empty URL.
    Input,
    /// The provider could not be reached or reported failure.
    Transport,
    /// Another scan is still running.
    Busy,
    /// The credential store could not be read or written.
    Storage,
    Cancelled,
}

impl ScanFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            ScanFailure::MissingCredential | ScanFailure::UnvalidatedCredential => {
                FailureKind::Configuration
            }
            ScanFailure::Storage(_) => FailureKind::Storage,
            ScanFailure::CredentialRejected => FailureKind::Validation,
            ScanFailure::InvalidInput(_) => FailureKind::Input,
            ScanFailure::Crawl(_) => FailureKind::Transport,
            ScanFailure::AlreadyInProgress => FailureKind::Busy,
            ScanFailure::Cancelled => FailureKind::Cancelled,
        }
    }
}

impl From<StoreError> for ScanFailure {
    fn from(e: StoreError) -> Self {
        ScanFailure::Storage(e.to_string())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
