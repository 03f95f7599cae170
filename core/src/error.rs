//! Error types for the catalog client.
//!
//! # Design
//! Every failure a call can produce is an `ApiError`. The variants that
//! describe the API's own error contract carry a [`Fault`]: the HTTP status
//! plus the ordered error entries, either copied from the server or
//! synthesized locally. Callers pick the variant to decide what happened and
//! read `user_message` from the entries to tell the user about it.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::TransportError;

/// One entry of an API error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    pub developer_message: String,
    #[serde(default)]
    pub user_message: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorEntry {
    pub fn new(
        kind: impl Into<String>,
        developer_message: impl Into<String>,
        user_message: impl Into<String>,
    ) -> Self {
        Self {
            developer_message: developer_message.into(),
            user_message: user_message.into(),
            kind: kind.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// HTTP status plus the error entries that explain it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub http_code: u16,
    pub entries: Vec<ErrorEntry>,
}

impl Fault {
    pub fn new(http_code: u16, entries: Vec<ErrorEntry>) -> Self {
        Self { http_code, entries }
    }

    pub fn single(http_code: u16, entry: ErrorEntry) -> Self {
        Self::new(http_code, vec![entry])
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entries.first() {
            Some(entry) if !entry.developer_message.is_empty() => {
                f.write_str(&entry.developer_message)
            }
            _ => f.write_str("Unknown error."),
        }
    }
}

/// Errors returned by `PhyloPicClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Rejected before dispatch: missing credential, invalid payload or range.
    #[error("{0}")]
    LocalPrecondition(Fault),

    /// The API answered with structured error entries.
    #[error("{0}")]
    Upstream(Fault),

    /// The API answered with a failure status and no usable error body.
    #[error("{0}")]
    Unexpected(Fault),

    /// The API broke its own response format (e.g. a malformed Content-Range).
    #[error("{0}")]
    ContractViolation(Fault),

    /// A creation call was redirected, meaning the entity already exists.
    #[error("{0}")]
    RedirectConflict(Fault),

    /// The transport failed before a response arrived.
    #[error("transport failed: {0}")]
    Transport(TransportError),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// A local file could not be read for upload.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            ApiError::LocalPrecondition(fault)
            | ApiError::Upstream(fault)
            | ApiError::Unexpected(fault)
            | ApiError::ContractViolation(fault)
            | ApiError::RedirectConflict(fault) => Some(fault),
            _ => None,
        }
    }

    pub fn http_code(&self) -> Option<u16> {
        self.fault().map(|fault| fault.http_code)
    }

    /// Error entries, empty for transport, I/O and (de)serialization failures.
    pub fn entries(&self) -> &[ErrorEntry] {
        self.fault().map(|fault| fault.entries.as_slice()).unwrap_or(&[])
    }
}
