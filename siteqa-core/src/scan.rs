use crate::credential::CredentialStore;
use crate::error::ScanFailure;
use crate::normalize::normalize_url;
use crate::report::ScanReport;
use crate::rules;
use chrono::Utc;
use siteqa_scanner::{CrawlClient, CrawlProgress, CrawlResult, Credential, ProgressCallback};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Progress checkpoint set right before the crawl call.
pub const CRAWL_START_PROGRESS: u8 = 25;
/// Progress checkpoint once the crawl has returned successfully.
pub const ANALYSIS_PROGRESS: u8 = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Normalizing,
    Crawling,
    Analyzing,
    Done,
    Failed,
}

impl ScanState {
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            ScanState::Normalizing | ScanState::Crawling | ScanState::Analyzing
        )
    }

    /// States in which a cancellation request still takes effect.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, ScanState::Normalizing | ScanState::Crawling)
    }
}

/// Snapshot of an orchestrator for presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanStatus {
    pub state: ScanState,
    /// Advisory, 0 to 100.
    pub progress: u8,
    pub report: Option<ScanReport>,
    pub failure: Option<String>,
}

impl Default for ScanStatus {
    fn default() -> Self {
        Self {
            state: ScanState::Idle,
            progress: 0,
            report: None,
            failure: None,
        }
    }
}

/// Callback invoked after every status change
pub type StatusCallback = Arc<dyn Fn(&ScanStatus) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// When false, a stored credential is used even if it was never validated.
    pub require_validated_credential: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            require_validated_credential: true,
        }
    }
}

/// Coordinates the crawl client and rule engine for one scan at a time.
pub struct ScanOrchestrator<C, S> {
    client: C,
    store: S,
    config: ScanConfig,
    credential_validated: AtomicBool,
    status: Arc<Mutex<ScanStatus>>,
    status_callback: Option<StatusCallback>,
    cancel_requested: AtomicBool,
    cancel_notify: Notify,
}

impl<C: CrawlClient, S: CredentialStore> ScanOrchestrator<C, S> {
    /// A credential already present in the store is accepted as pre-existing.
    pub fn new(client: C, store: S, config: ScanConfig) -> Self {
        let pre_existing = match store.get() {
            Ok(credential) => credential.is_some(),
            Err(e) => {
                warn!("Could not read stored API key: {}", e);
                false
            }
        };

        Self {
            client,
            store,
            config,
            credential_validated: AtomicBool::new(pre_existing),
            status: Arc::new(Mutex::new(ScanStatus::default())),
            status_callback: None,
            cancel_requested: AtomicBool::new(false),
            cancel_notify: Notify::new(),
        }
    }

    pub fn with_status_callback(mut self, callback: StatusCallback) -> Self {
        self.status_callback = Some(callback);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn status(&self) -> ScanStatus {
        self.lock_status().clone()
    }

    pub fn state(&self) -> ScanState {
        self.lock_status().state
    }

    pub fn progress(&self) -> u8 {
        self.lock_status().progress
    }

    pub fn report(&self) -> Option<ScanReport> {
        self.lock_status().report.clone()
    }

    pub fn failure(&self) -> Option<String> {
        self.lock_status().failure.clone()
    }

    pub fn has_validated_credential(&self) -> bool {
        self.credential_validated.load(Ordering::SeqCst)
    }

    /// Ask the provider whether `candidate` is accepted. Never fails.
    pub async fn validate_credential(&self, candidate: &str) -> bool {
        let candidate = Credential::new(candidate.trim());
        if candidate.is_empty() {
            return false;
        }
        self.client.validate_credential(&candidate).await
    }

    /// Validate `candidate` and store it only if the provider accepts it.
    pub async fn save_credential(&self, candidate: &str) -> Result<(), ScanFailure> {
        let candidate = Credential::new(candidate.trim());
        if candidate.is_empty() {
            return Err(ScanFailure::InvalidInput(
                "Please enter a valid API key".to_string(),
            ));
        }

        if !self.client.validate_credential(&candidate).await {
            warn!("API key {} was rejected by the provider", candidate);
            return Err(ScanFailure::CredentialRejected);
        }

        self.store.set(&candidate)?;
        self.credential_validated.store(true, Ordering::SeqCst);
        info!("API key saved successfully");
        Ok(())
    }

    pub fn clear_credential(&self) -> Result<(), ScanFailure> {
        self.store.clear()?;
        self.credential_validated.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Request cancellation of the running scan.
    ///
    /// Returns false when no scan is running or analysis has already started;
    /// such a request is ignored.
    pub fn cancel(&self) -> bool {
        {
            let status = self.lock_status();
            if !status.state.is_cancellable() {
                return false;
            }
            self.cancel_requested.store(true, Ordering::SeqCst);
        }
        self.cancel_notify.notify_waiters();
        true
    }

    /// Run one scan to completion.
    ///
    /// The previous report is cleared on entry. A submission made while a
    /// scan is running is rejected with `AlreadyInProgress` and leaves the
    /// running scan untouched. Dropping the returned future before it
    /// completes leaves the orchestrator `Failed` with "Scan cancelled".
    pub async fn scan(&self, raw_url: &str) -> Result<ScanReport, ScanFailure> {
        {
            let mut status = self.lock_status();
            if status.state.is_running() {
                return Err(ScanFailure::AlreadyInProgress);
            }
            *status = ScanStatus {
                state: ScanState::Normalizing,
                ..ScanStatus::default()
            };
            self.cancel_requested.store(false, Ordering::SeqCst);
        }
        self.notify_status();

        // Settles the status if this future is dropped before `run` returns.
        let mut guard = RunGuard {
            status: &self.status,
            callback: self.status_callback.as_ref(),
            armed: true,
        };
        let outcome = self.run(raw_url).await;
        guard.armed = false;

        match outcome {
            Ok(report) => {
                info!("Scan Complete. {}", report.summary());
                self.update(|status| {
                    status.state = ScanState::Done;
                    status.progress = 100;
                    status.report = Some(report.clone());
                });
                Ok(report)
            }
            Err(failure) => {
                warn!("Scan failed: {}", failure);
                self.update(|status| {
                    status.state = ScanState::Failed;
                    status.report = None;
                    status.failure = Some(failure.to_string());
                });
                Err(failure)
            }
        }
    }

    async fn run(&self, raw_url: &str) -> Result<ScanReport, ScanFailure> {
        let started_at = Utc::now();

        if raw_url.trim().is_empty() {
            return Err(ScanFailure::InvalidInput(
                "Please enter a URL to scan".to_string(),
            ));
        }
        let credential = self.usable_credential()?;

        let url = normalize_url(raw_url);
        info!("Starting scan for URL: {}", url);
        self.update(|status| {
            status.state = ScanState::Crawling;
            status.progress = CRAWL_START_PROGRESS;
        });

        let crawl = self
            .client
            .crawl(url.as_str(), Some(&credential), Some(self.crawl_progress()));
        let result = tokio::select! {
            result = crawl => result,
            _ = self.cancelled() => return Err(ScanFailure::Cancelled),
        };
        if self.cancel_requested.load(Ordering::SeqCst) {
            return Err(ScanFailure::Cancelled);
        }

        let pages = match result {
            CrawlResult::Success { pages } => pages,
            CrawlResult::Failure { reason } => return Err(ScanFailure::Crawl(reason)),
        };

        self.update(|status| {
            status.state = ScanState::Analyzing;
            status.progress = ANALYSIS_PROGRESS;
        });
        debug!("Analyzing {} pages", pages.len());

        let issues = rules::evaluate(&pages);
        Ok(ScanReport::new(url.into_string(), pages.len(), issues, started_at))
    }

    fn usable_credential(&self) -> Result<Credential, ScanFailure> {
        let credential = self
            .store
            .get()?
            .filter(|c| !c.is_empty())
            .ok_or(ScanFailure::MissingCredential)?;

        if self.config.require_validated_credential && !self.has_validated_credential() {
            return Err(ScanFailure::UnvalidatedCredential);
        }
        Ok(credential)
    }

    /// Maps provider progress into the crawling band between the two
    /// checkpoints. Progress never moves backwards.
    fn crawl_progress(&self) -> ProgressCallback {
        let status = self.status.clone();
        let callback = self.status_callback.clone();

        Arc::new(move |crawl: CrawlProgress| {
            let band = f64::from(ANALYSIS_PROGRESS - CRAWL_START_PROGRESS);
            let mapped = (CRAWL_START_PROGRESS + (crawl.fraction() * band) as u8)
                .min(ANALYSIS_PROGRESS - 1);
            let snapshot = {
                let mut status = status.lock().unwrap_or_else(PoisonError::into_inner);
                if status.state != ScanState::Crawling || mapped <= status.progress {
                    return;
                }
                status.progress = mapped;
                status.clone()
            };
            if let Some(ref cb) = callback {
                cb(&snapshot);
            }
        })
    }

    async fn cancelled(&self) {
        loop {
            let notified = self.cancel_notify.notified();
            if self.cancel_requested.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }

    fn lock_status(&self) -> MutexGuard<'_, ScanStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, apply: impl FnOnce(&mut ScanStatus)) {
        let snapshot = {
            let mut status = self.lock_status();
            apply(&mut status);
            status.clone()
        };
        if let Some(ref cb) = self.status_callback {
            cb(&snapshot);
        }
    }

    fn notify_status(&self) {
        if let Some(ref cb) = self.status_callback {
            cb(&self.status());
        }
    }
}

struct RunGuard<'a> {
    status: &'a Mutex<ScanStatus>,
    callback: Option<&'a StatusCallback>,
    armed: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let snapshot = {
            let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
            if !status.state.is_running() {
                return;
            }
            status.state = ScanState::Failed;
            status.report = None;
            status.failure = Some(ScanFailure::Cancelled.to_string());
            status.clone()
        };
        debug!("Scan future dropped before completion");
        if let Some(cb) = self.callback {
            cb(&snapshot);
        }
    }
}
