//! Error Handling
//!
//! This module defines the crate's error types. Every failure of a Graph API call
//! is funneled into one typed [`GraphError`] carrying a human-readable message, a
//! numeric code and an optional subcode, whatever the way Meta chose to report it.
//! Transport problems stay separate as [`Error::Network`].

use std::{error::Error as StdError, fmt};

use reqwest::StatusCode;

use crate::MetaError;

/// The **top-level error enum** for the `meta-graph-doctor` crate.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The request never produced an HTTP response (DNS, connection refused,
    /// TLS, timeout). There is no API error code in this case.
    #[error("A network error occurred: {0}")]
    Network(#[from] BoxError),

    /// The Graph API answered, but the answer is a failure: an error envelope,
    /// a non-JSON body, an unexpected shape, or a write that was not acknowledged.
    #[error("Graph API error: {0}")]
    Graph(#[from] GraphError),

    /// The request could not be built, e.g. an invalid base URL.
    ///
    /// These errors typically indicate misconfiguration rather than a problem
    /// with Meta's API.
    #[error("An internal library error occurred: {0}")]
    Internal(BoxError),
}

impl Error {
    pub(crate) fn network(err: BoxError) -> Self {
        Self::Network(err)
    }

    pub(crate) fn internal(err: BoxError) -> Self {
        Self::Internal(err)
    }

    /// Returns the Graph error, if this is one.
    pub fn as_graph(&self) -> Option<&GraphError> {
        match self {
            Self::Graph(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the Graph error code, if the failure carries one.
    pub fn code(&self) -> Option<i64> {
        self.as_graph().map(GraphError::code)
    }
}

/// A failure reported by, or determined from, a Graph API response.
///
/// `code` is Meta's error code when the response carried an error envelope,
/// the HTTP status code when it did not, and `0` for a write whose
/// `success` flag came back `false`.
#[derive(thiserror::Error, PartialEq, Eq, Clone, Debug)]
#[non_exhaustive]
pub struct GraphError {
    pub(crate) message: String,
    pub(crate) code: i64,
    pub(crate) subcode: Option<i64>,
    pub(crate) status: Option<StatusCode>,
    pub(crate) kind: GraphErrorKind,
}

/// What kind of response produced a [`GraphError`].
#[derive(PartialEq, Eq, Clone, Debug)]
#[non_exhaustive]
pub enum GraphErrorKind {
    /// Meta sent an error envelope, with a failing status or embedded in a
    /// nominally successful one.
    Api {
        r#type: Option<String>,
        fbtrace_id: Option<String>,
    },

    /// The body was not JSON at all (proxy pages, empty bodies, outages).
    NonJson,

    /// The body was JSON but did not have the shape the operation expects.
    Decode,

    /// A write operation answered `{"success": false}`.
    NotAcknowledged,
}

impl GraphError {
    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Numeric error code.
    pub fn code(&self) -> i64 {
        self.code
    }

    /// Meta's `error_subcode`, when present.
    pub fn subcode(&self) -> Option<i64> {
        self.subcode
    }

    /// HTTP status of the response this error was built from.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn kind(&self) -> &GraphErrorKind {
        &self.kind
    }

    pub(crate) fn api(status: StatusCode, error: MetaError) -> Self {
        Self {
            message: error
                .message
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            code: error.code.unwrap_or_else(|| i64::from(status.as_u16())),
            subcode: error.error_subcode,
            status: Some(status),
            kind: GraphErrorKind::Api {
                r#type: error.r#type,
                fbtrace_id: error.fbtrace_id,
            },
        }
    }

    pub(crate) fn non_json(status: StatusCode) -> Self {
        Self {
            message: format!("HTTP {} (non-JSON response)", status.as_u16()),
            code: i64::from(status.as_u16()),
            subcode: None,
            status: Some(status),
            kind: GraphErrorKind::NonJson,
        }
    }

    pub(crate) fn decode(status: StatusCode, err: serde_json::Error) -> Self {
        Self {
            message: format!("HTTP {} (unexpected response shape: {err})", status.as_u16()),
            code: i64::from(status.as_u16()),
            subcode: None,
            status: Some(status),
            kind: GraphErrorKind::Decode,
        }
    }

    pub(crate) fn not_acknowledged(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: 0,
            subcode: None,
            status: None,
            kind: GraphErrorKind::NotAcknowledged,
        }
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {}", self.message, self.code)?;
        if let Some(subcode) = self.subcode {
            write!(f, ", subcode: {subcode}")?;
        }
        f.write_str(")")
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        if value.is_builder() || value.is_redirect() {
            // Builder and redirect errors point to request composition, not the wire.
            Self::internal(value.into())
        } else {
            Self::network(value.into())
        }
    }
}

/// A boxed, trait-object error that can be sent across threads.
pub type BoxError = Box<dyn StdError + Send + Sync>;
