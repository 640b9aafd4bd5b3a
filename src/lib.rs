#![deny(clippy::future_not_send)]
#![deny(clippy::large_enum_variant)]

//! # meta_graph_doctor
//!
//! A diagnostic toolkit for Meta platform credentials. Given an app ID/secret pair
//! and a user or system access token, it reports on token validity, app webhook
//! subscriptions, and the business assets the token can reach: WhatsApp Business
//! Accounts (WABAs), their phone numbers and subscribed apps, Facebook Pages and
//! the Instagram accounts linked to them.
//!
//! ## ✨ Features
//!
//! - **Credential Store**: holds one credential set, derives the app access token
//!   and a readiness flag, and mirrors the set into a session or local storage
//!   tier without ever losing it during a tier switch.
//! - **Graph API Client**: typed, stateless operations over the Graph API that
//!   normalize Meta's error envelope (including errors reported on HTTP 200) and
//!   its inconsistent response shapes.
//! - **Diagnosis**: a runner that walks the dependent call sequence and gathers
//!   every result, success or failure, into one report.
//!
//! ## 🚀 Examples
//!
//! ### Inspect a token
//! ```rust,no_run
//! use meta_graph_doctor::Client;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new()?;
//!
//! let info = client
//!     .app("YOUR_APP_ID")
//!     .debug_token("USER_TOKEN", "YOUR_APP_ID|YOUR_APP_SECRET")
//!     .await?;
//!
//! println!("valid: {}, scopes: {:?}", info.is_valid, info.scopes);
//! # Ok(()) }
//! ```
//!
//! ---
//!
//! ### Keep credentials across runs
//! ```rust,no_run
//! use meta_graph_doctor::storage::{FileStorage, MemoryStorage};
//! use meta_graph_doctor::store::{CredentialStore, StorageMode, Tiers};
//! use std::sync::Arc;
//!
//! let tiers = Tiers::new(
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(FileStorage::new("/tmp/meta-graph-doctor.json")),
//! );
//!
//! let mut store = CredentialStore::open(tiers);
//! store.set_app_id("123456789");
//! store.set_app_secret("shhh");
//! store.set_token("EAAG...");
//! let _ = store.set_storage_mode(StorageMode::Local);
//!
//! assert!(store.is_ready());
//! assert_eq!(store.app_token(), "123456789|shhh");
//! ```
//!
//! ---
//!
//! ### Find the Instagram account behind each Page
//! ```rust,no_run
//! use meta_graph_doctor::Client;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new()?;
//!
//! for page in client.me().pages("USER_TOKEN").await? {
//!     // Per-Page calls use the Page's own token.
//!     let ig = client.page(&page.id).instagram_account(&page.access_token).await?;
//!     println!("{} -> {:?}", page.name, ig.map(|account| account.username));
//! }
//! # Ok(()) }
//! ```

pub mod app;
pub mod business;
pub mod client;
pub mod diagnose;
pub mod error;
pub mod guard;
pub mod me;
pub mod page;
mod rest;
pub mod storage;
pub mod store;
pub mod waba;

pub use client::{Client, ClientBuilder};
pub use error::{Error, GraphError, GraphErrorKind};
pub use store::{CredentialStore, StorageMode};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents an **error object returned directly by Meta's Graph API**.
///
/// This is the object nested under the top-level `error` key of a Graph response.
/// Meta does not always send it with a failing status code, so the client checks
/// for it on every response.
///
/// Every field is optional on the wire: when `code` or `message` is missing the
/// client falls back to the HTTP status.
///
/// # Example (from Meta API response)
/// ```json
/// {
///   "error": {
///     "message": "(#100) Tried accessing nonexisting field (instagram_business_account)",
///     "type": "OAuthException",
///     "code": 100,
///     "error_subcode": 33,
///     "fbtrace_id": "A4K..."
///   }
/// }
/// ```
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
#[non_exhaustive]
pub struct MetaError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_subcode: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fbtrace_id: Option<String>,
}

impl fmt::Display for MetaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "(code: {code})")?,
            None => f.write_str("(code: unknown)")?,
        }

        if let Some(r#type) = &self.r#type {
            write!(f, " (type: {type})")?;
        }

        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }

        if let Some(id) = &self.fbtrace_id {
            write!(f, " [trace: {id}]")?;
        }

        Ok(())
    }
}

/// Represents a timestamp returned by the Graph API.
///
/// Meta uses UNIX timestamps (seconds since epoch) for token expiry fields.
/// A value of `0` means "never", e.g. a system-user token that does not expire.
#[derive(Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug, Default)]
#[serde(transparent)]
pub struct Timestamp {
    pub(crate) inner: i64,
}

impl Timestamp {
    /// Returns the raw timestamp in seconds.
    pub fn seconds(&self) -> i64 {
        self.inner
    }

    /// Whether this timestamp is Meta's "does not expire" sentinel.
    pub fn is_never(&self) -> bool {
        self.inner == 0
    }

    /// Whether this timestamp is in the past relative to `now` (UNIX seconds).
    ///
    /// The "never" sentinel is never in the past.
    pub fn is_before(&self, now: i64) -> bool {
        !self.is_never() && self.inner <= now
    }
}

impl From<i64> for Timestamp {
    fn from(inner: i64) -> Self {
        Self { inner }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_never() {
            f.write_str("never")
        } else {
            write!(f, "{}", self.inner)
        }
    }
}
