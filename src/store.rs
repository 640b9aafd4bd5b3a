//! Credential Store
//!
//! Holds the one credential set the tool works with: app ID, app secret and an
//! access token. The app access token and the readiness flag are derived on
//! every read, never cached.
//!
//! The set can be mirrored into a storage tier (see [`StorageMode`]). The store
//! keeps three rules:
//! - a tier owns the persisted set only if its own mode marker names that tier
//! - a tier switch writes the new tier before it clears the old one, and aborts
//!   without touching the old tier if the write fails
//! - storage failures never reach the caller; they are logged and the store
//!   carries on in memory
//!
//! # Example
//! ```rust
//! use meta_graph_doctor::storage::MemoryStorage;
//! use meta_graph_doctor::store::{CredentialStore, ModeSwitch, StorageMode, Tiers};
//! use std::sync::Arc;
//!
//! let tiers = Tiers::new(Arc::new(MemoryStorage::new()), Arc::new(MemoryStorage::new()));
//! let mut store = CredentialStore::open(tiers.clone());
//! store.set_app_id("1");
//! store.set_app_secret("s");
//! store.set_token("t");
//! assert_eq!(store.set_storage_mode(StorageMode::Session), ModeSwitch::Switched);
//!
//! // A fresh store over the same tiers hydrates from the session tier.
//! let reloaded = CredentialStore::open(tiers);
//! assert_eq!(reloaded.app_token(), "1|s");
//! assert_eq!(reloaded.storage_mode(), StorageMode::Session);
//! ```

use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::storage::{KeyValueStorage, StorageError};

/// Keys the store uses in every tier.
pub mod keys {
    pub const PREFIX: &str = "meta-graph-doctor:";
    pub const APP_ID: &str = "meta-graph-doctor:appId";
    pub const APP_SECRET: &str = "meta-graph-doctor:appSecret";
    pub const TOKEN: &str = "meta-graph-doctor:token";
    pub const STORAGE_MODE: &str = "meta-graph-doctor:storageMode";

    /// Every key, mode marker last.
    pub const ALL: [&str; 4] = [APP_ID, APP_SECRET, TOKEN, STORAGE_MODE];
}

/// Where the credential set is persisted.
#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Memory only.
    #[default]
    None,
    /// Until the process (browsing session) ends.
    Session,
    /// Indefinitely.
    Local,
}

impl StorageMode {
    /// The marker value a tier stores to claim ownership.
    pub fn as_str(self) -> &'static str {
        match self {
            StorageMode::None => "none",
            StorageMode::Session => "session",
            StorageMode::Local => "local",
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown storage mode {0:?}, expected none, session or local")]
pub struct ParseStorageModeError(String);

impl FromStr for StorageMode {
    type Err = ParseStorageModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(StorageMode::None),
            "session" => Ok(StorageMode::Session),
            "local" => Ok(StorageMode::Local),
            other => Err(ParseStorageModeError(other.to_owned())),
        }
    }
}

/// The two storage tiers a store can persist into.
#[derive(Clone, Debug)]
pub struct Tiers {
    session: Arc<dyn KeyValueStorage>,
    local: Arc<dyn KeyValueStorage>,
}

impl Tiers {
    pub fn new(session: Arc<dyn KeyValueStorage>, local: Arc<dyn KeyValueStorage>) -> Self {
        Self { session, local }
    }

    /// The tier backing `mode`; `None` has no tier.
    pub fn get(&self, mode: StorageMode) -> Option<&Arc<dyn KeyValueStorage>> {
        match mode {
            StorageMode::None => None,
            StorageMode::Session => Some(&self.session),
            StorageMode::Local => Some(&self.local),
        }
    }
}

/// The three credential fields, with the values derived from them.
#[derive(PartialEq, Eq, Clone, Default)]
pub struct Credentials {
    pub app_id: String,
    pub app_secret: String,
    pub token: String,
}

impl Credentials {
    pub fn new(
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            token: token.into(),
        }
    }

    /// `{app_id}|{app_secret}`, the app access token.
    pub fn app_token(&self) -> String {
        format!("{}|{}", self.app_id, self.app_secret)
    }

    /// All three fields are non-empty.
    pub fn is_ready(&self) -> bool {
        !self.app_id.is_empty() && !self.app_secret.is_empty() && !self.token.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &redacted(&self.app_secret))
            .field("token", &redacted(&self.token))
            .finish()
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() {
        ""
    } else {
        "REDACTED"
    }
}

/// What [`CredentialStore::set_storage_mode`] did.
#[must_use]
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum ModeSwitch {
    /// The requested mode was already active.
    Unchanged,
    /// The set now lives in the requested tier only.
    Switched,
    /// The new tier could not be written; the old mode and tier are untouched.
    Aborted,
}

/// The credential store. Construct one per process and pass it where needed.
#[derive(Debug)]
pub struct CredentialStore {
    credentials: Credentials,
    storage_mode: StorageMode,
    tiers: Tiers,
}

impl CredentialStore {
    /// Opens the store, hydrating from whichever tier claims ownership.
    ///
    /// The session tier is active if its marker reads `"session"`, the local
    /// tier if its marker reads `"local"`; otherwise the mode is `none` and
    /// nothing is loaded. Missing keys load as empty strings.
    pub fn open(tiers: Tiers) -> Self {
        let storage_mode = [StorageMode::Session, StorageMode::Local]
            .into_iter()
            .find(|&mode| {
                tiers.get(mode).is_some_and(|tier| {
                    read(tier.as_ref(), mode, keys::STORAGE_MODE).as_deref() == Some(mode.as_str())
                })
            })
            .unwrap_or_default();

        let credentials = match tiers.get(storage_mode) {
            Some(tier) => {
                let field = |key| read(tier.as_ref(), storage_mode, key).unwrap_or_default();
                Credentials {
                    app_id: field(keys::APP_ID),
                    app_secret: field(keys::APP_SECRET),
                    token: field(keys::TOKEN),
                }
            }
            None => Credentials::default(),
        };

        Self {
            credentials,
            storage_mode,
            tiers,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn app_id(&self) -> &str {
        &self.credentials.app_id
    }

    pub fn app_secret(&self) -> &str {
        &self.credentials.app_secret
    }

    pub fn token(&self) -> &str {
        &self.credentials.token
    }

    pub fn set_app_id(&mut self, app_id: impl Into<String>) {
        self.credentials.app_id = app_id.into();
    }

    pub fn set_app_secret(&mut self, app_secret: impl Into<String>) {
        self.credentials.app_secret = app_secret.into();
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.credentials.token = token.into();
    }

    /// Replaces all three fields at once.
    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.credentials = credentials;
    }

    /// `{app_id}|{app_secret}`, computed from the current fields.
    pub fn app_token(&self) -> String {
        self.credentials.app_token()
    }

    /// Whether all three fields are non-empty.
    pub fn is_ready(&self) -> bool {
        self.credentials.is_ready()
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.storage_mode
    }

    pub fn tiers(&self) -> &Tiers {
        &self.tiers
    }

    /// Writes the fields and the mode marker into the current tier.
    ///
    /// No-op for [`StorageMode::None`]. Failures are logged and otherwise ignored.
    pub fn save_to_storage(&self) {
        let Some(tier) = self.tiers.get(self.storage_mode) else {
            return;
        };

        if let Err(err) = write_all(tier.as_ref(), self.storage_mode, &self.credentials) {
            warn!(tier = %self.storage_mode, error = %err, "failed to save credentials");
        }
    }

    /// Moves the persisted set to the tier named by `mode`.
    ///
    /// The new tier is written first, then the old tier's keys are removed, then
    /// the in-memory mode changes. If the write fails the switch is aborted:
    /// keys partially written to the new tier are removed, and the old tier and
    /// mode stay as they were.
    pub fn set_storage_mode(&mut self, mode: StorageMode) -> ModeSwitch {
        if mode == self.storage_mode {
            return ModeSwitch::Unchanged;
        }

        if let Some(target) = self.tiers.get(mode).cloned() {
            if let Err(err) = write_all(target.as_ref(), mode, &self.credentials) {
                warn!(from = %self.storage_mode, to = %mode, error = %err, "storage mode switch aborted");
                remove_all(target.as_ref(), mode);
                return ModeSwitch::Aborted;
            }
        }

        if let Some(previous) = self.tiers.get(self.storage_mode) {
            remove_all(previous.as_ref(), self.storage_mode);
        }

        info!(from = %self.storage_mode, to = %mode, "storage mode switched");
        self.storage_mode = mode;
        ModeSwitch::Switched
    }

    /// Wipes the four keys from both tiers and resets the store.
    pub fn clear(&mut self) {
        remove_all(self.tiers.session.as_ref(), StorageMode::Session);
        remove_all(self.tiers.local.as_ref(), StorageMode::Local);

        self.credentials = Credentials::default();
        self.storage_mode = StorageMode::None;
        info!("credentials cleared");
    }
}

fn read(tier: &dyn KeyValueStorage, mode: StorageMode, key: &str) -> Option<String> {
    tier.get(key).unwrap_or_else(|err| {
        warn!(tier = %mode, key, error = %err, "storage read failed");
        None
    })
}

// Marker goes last so a partial write never claims ownership.
fn write_all(
    tier: &dyn KeyValueStorage,
    mode: StorageMode,
    credentials: &Credentials,
) -> Result<(), StorageError> {
    tier.set(keys::APP_ID, &credentials.app_id)?;
    tier.set(keys::APP_SECRET, &credentials.app_secret)?;
    tier.set(keys::TOKEN, &credentials.token)?;
    tier.set(keys::STORAGE_MODE, mode.as_str())
}

fn remove_all(tier: &dyn KeyValueStorage, mode: StorageMode) {
    for key in keys::ALL {
        if let Err(err) = tier.remove(key) {
            warn!(tier = %mode, key, error = %err, "storage remove failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, UnavailableStorage};

    fn memory_tiers() -> (Arc<MemoryStorage>, Arc<MemoryStorage>, Tiers) {
        let session = Arc::new(MemoryStorage::new());
        let local = Arc::new(MemoryStorage::new());
        let tiers = Tiers::new(session.clone(), local.clone());
        (session, local, tiers)
    }

    fn filled(tiers: Tiers) -> CredentialStore {
        let mut store = CredentialStore::open(tiers);
        store.set_app_id("123");
        store.set_app_secret("secret");
        store.set_token("EAAG");
        store
    }

    #[test]
    fn derived_values_follow_fields() {
        let (_, _, tiers) = memory_tiers();
        let mut store = CredentialStore::open(tiers);

        assert!(!store.is_ready());
        assert_eq!(store.app_token(), "|");

        store.set_app_id("1");
        store.set_app_secret("2");
        assert!(!store.is_ready());
        assert_eq!(store.app_token(), "1|2");

        store.set_token("3");
        assert!(store.is_ready());

        store.set_app_secret("");
        assert!(!store.is_ready());
        assert_eq!(store.app_token(), "1|");
    }

    #[test]
    fn fresh_tiers_mean_no_mode() {
        let (_, _, tiers) = memory_tiers();
        let store = CredentialStore::open(tiers);

        assert_eq!(store.storage_mode(), StorageMode::None);
        assert_eq!(store.credentials(), &Credentials::default());
    }

    #[test]
    fn marker_must_name_its_own_tier() {
        let (session, local, tiers) = memory_tiers();
        // A stale "local" marker left in the session tier claims nothing.
        session.set(keys::STORAGE_MODE, "local").unwrap();
        session.set(keys::APP_ID, "stale").unwrap();
        local.set(keys::STORAGE_MODE, "session").unwrap();

        let store = CredentialStore::open(tiers);

        assert_eq!(store.storage_mode(), StorageMode::None);
        assert_eq!(store.app_id(), "");
    }

    #[test]
    fn missing_keys_load_empty() {
        let (_, local, tiers) = memory_tiers();
        local.set(keys::STORAGE_MODE, "local").unwrap();
        local.set(keys::TOKEN, "EAAG").unwrap();

        let store = CredentialStore::open(tiers);

        assert_eq!(store.storage_mode(), StorageMode::Local);
        assert_eq!(store.token(), "EAAG");
        assert_eq!(store.app_id(), "");
        assert_eq!(store.app_secret(), "");
    }

    #[test]
    fn unavailable_storage_degrades_to_memory() {
        let tiers = Tiers::new(Arc::new(UnavailableStorage), Arc::new(UnavailableStorage));
        let mut store = filled(tiers);

        store.save_to_storage();
        assert_eq!(store.set_storage_mode(StorageMode::Local), ModeSwitch::Aborted);
        assert_eq!(store.storage_mode(), StorageMode::None);
        assert!(store.is_ready());

        store.clear();
        assert!(!store.is_ready());
    }

    #[test]
    fn same_mode_is_a_no_op() {
        let (session, _, tiers) = memory_tiers();
        let mut store = filled(tiers);

        assert_eq!(store.set_storage_mode(StorageMode::None), ModeSwitch::Unchanged);
        assert!(session.is_empty());
    }

    #[test]
    fn save_without_mode_writes_nothing() {
        let (session, local, tiers) = memory_tiers();
        let store = filled(tiers);

        store.save_to_storage();

        assert!(session.is_empty());
        assert!(local.is_empty());
    }

    #[test]
    fn switch_to_none_clears_old_tier() {
        let (session, _, tiers) = memory_tiers();
        let mut store = filled(tiers);
        assert_eq!(store.set_storage_mode(StorageMode::Session), ModeSwitch::Switched);
        assert_eq!(session.len(), 4);

        assert_eq!(store.set_storage_mode(StorageMode::None), ModeSwitch::Switched);

        assert!(session.is_empty());
        assert_eq!(store.storage_mode(), StorageMode::None);
        assert!(store.is_ready());
    }

    #[test]
    fn aborted_switch_rolls_back_partial_write() {
        let session = Arc::new(MemoryStorage::new());
        // Room for the app id and secret but not the token.
        let local = Arc::new(MemoryStorage::with_quota(
            keys::APP_ID.len() + 3 + keys::APP_SECRET.len() + 6,
        ));
        let tiers = Tiers::new(session.clone(), local.clone());
        let mut store = filled(tiers);
        assert_eq!(store.set_storage_mode(StorageMode::Session), ModeSwitch::Switched);

        assert_eq!(store.set_storage_mode(StorageMode::Local), ModeSwitch::Aborted);

        assert!(local.is_empty());
        assert_eq!(session.len(), 4);
        assert_eq!(
            session.get(keys::STORAGE_MODE).unwrap().as_deref(),
            Some("session")
        );
        assert_eq!(store.storage_mode(), StorageMode::Session);
    }

    #[test]
    fn parse_storage_mode() {
        assert_eq!("local".parse(), Ok(StorageMode::Local));
        assert_eq!("session".parse(), Ok(StorageMode::Session));
        assert_eq!("none".parse(), Ok(StorageMode::None));
        assert!("Local".parse::<StorageMode>().is_err());
    }

    #[test]
    fn debug_hides_secrets() {
        let printed = format!("{:?}", Credentials::new("1", "hunter2", "EAAG"));

        assert!(printed.contains("\"1\""));
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("EAAG"));
    }
}
