//! Storage for the single Firecrawl API key.

use crate::data::Database;
use crate::error::{StoreError, StoreResult};
use siteqa_scanner::Credential;
use std::sync::RwLock;

/// Settings key the API key is stored under.
pub const API_KEY_SETTING: &str = "firecrawl_api_key";

/// Holds one opaque API credential.
///
/// Validation is not the store's job: the scan orchestrator checks a
/// candidate with the crawl provider before calling `set`.
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` when no key has been saved.
    fn get(&self) -> StoreResult<Option<Credential>>;

    fn set(&self, credential: &Credential) -> StoreResult<()>;

    /// Idempotent.
    fn clear(&self) -> StoreResult<()>;
}

/// Process-lifetime store, used by tests and headless embedding.
#[derive(Default)]
pub struct MemoryCredentialStore {
    credential: RwLock<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: impl Into<Credential>) -> Self {
        Self {
            credential: RwLock::new(Some(credential.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> StoreResult<Option<Credential>> {
        let guard = self.credential.read().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.clone())
    }

    fn set(&self, credential: &Credential) -> StoreResult<()> {
        let mut guard = self.credential.write().map_err(|_| StoreError::Poisoned)?;
        *guard = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        let mut guard = self.credential.write().map_err(|_| StoreError::Poisoned)?;
        *guard = None;
        Ok(())
    }
}

impl CredentialStore for Database {
    fn get(&self) -> StoreResult<Option<Credential>> {
        Ok(self
            .get_setting(API_KEY_SETTING)?
            .filter(|value| !value.trim().is_empty())
            .map(Credential::from))
    }

    fn set(&self, credential: &Credential) -> StoreResult<()> {
        self.set_setting(API_KEY_SETTING, credential.expose())
    }

    fn clear(&self) -> StoreResult<()> {
        self.delete_setting(API_KEY_SETTING).map(|_| ())
    }
}

impl<S: CredentialStore + ?Sized> CredentialStore for std::sync::Arc<S> {
    fn get(&self) -> StoreResult<Option<Credential>> {
        (**self).get()
    }

    fn set(&self, credential: &Credential) -> StoreResult<()> {
        (**self).set(credential)
    }

    fn clear(&self) -> StoreResult<()> {
        (**self).clear()
    }
}
