//! Request header composition.
//!
//! # Design
//! Each builder returns a small [`HeaderSet`]; request shapes are unions of
//! them, applied left to right so later sets override earlier keys. Builders
//! that need a credential fail with `ApiError::LocalPrecondition` when it is
//! missing, so the call is rejected before anything reaches the transport.

use crate::config::{ApiKeyPolicy, ClientConfig};
use crate::error::{ApiError, ErrorEntry, Fault};
use crate::options::ItemRange;

/// Media type of the API's JSON representation, version 2.
pub const DATA_MEDIA_TYPE: &str = "application/vnd.phylopic.v2+json";

pub const ACCEPT: &str = "Accept";
pub const AUTHORIZATION: &str = "Authorization";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const IF_MATCH: &str = "If-Match";
pub const IF_NONE_MATCH: &str = "If-None-Match";
pub const RANGE: &str = "Range";
pub const X_API_KEY: &str = "X-API-Key";

/// Ordered header list with case-insensitive keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet(Vec<(String, String)>);

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name`, replacing any existing value under a case-insensitive match.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name.to_string(), value)),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Union of two sets; keys in `other` win.
    pub fn merge(mut self, other: HeaderSet) -> Self {
        for (name, value) in other.0 {
            self.set(&name, value);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<(String, String)> {
        self.0
    }
}

pub fn accept() -> HeaderSet {
    HeaderSet::new().with(ACCEPT, DATA_MEDIA_TYPE)
}

pub fn content_type(media_type: &str) -> HeaderSet {
    HeaderSet::new().with(CONTENT_TYPE, media_type)
}

fn e_tag_header(name: &str, e_tag: Option<&str>) -> HeaderSet {
    match e_tag.filter(|tag| !tag.is_empty()) {
        Some(tag) => HeaderSet::new().with(name, tag),
        None => HeaderSet::new(),
    }
}

/// Freshness check for a single-entity GET.
pub fn if_none_match(e_tag: Option<&str>) -> HeaderSet {
    e_tag_header(IF_NONE_MATCH, e_tag)
}

/// Optimistic-concurrency precondition for list GETs and mutations.
pub fn if_match(e_tag: Option<&str>) -> HeaderSet {
    e_tag_header(IF_MATCH, e_tag)
}

pub fn range(range: ItemRange) -> Result<HeaderSet, ApiError> {
    if !range.is_ordered() {
        return Err(ApiError::LocalPrecondition(Fault::single(
            400,
            ErrorEntry::new(
                "BAD_REQUEST_PARAMETERS",
                format!(
                    "Invalid item range: start ({}) is after end ({}).",
                    range.start, range.end
                ),
                "Invalid range.",
            )
            .with_field(RANGE),
        )));
    }
    Ok(HeaderSet::new().with(RANGE, format!("items={}-{}", range.start, range.end)))
}

/// `X-API-Key` when a key is configured. Without one, the call proceeds
/// unidentified under `ApiKeyPolicy::Optional` and fails under `Required`.
pub fn identification(config: &ClientConfig) -> Result<HeaderSet, ApiError> {
    match (&config.api_key, config.api_key_policy) {
        (Some(key), _) => Ok(HeaderSet::new().with(X_API_KEY, key.as_str())),
        (None, ApiKeyPolicy::Optional) => Ok(HeaderSet::new()),
        (None, ApiKeyPolicy::Required) => Err(ApiError::LocalPrecondition(Fault::single(
            401,
            ErrorEntry::new(
                "INVALID_API_KEY",
                "This method requires an API Key.",
                "You must register for an API Key for this operation.",
            )
            .with_field(X_API_KEY),
        ))),
    }
}

pub fn authorization(config: &ClientConfig) -> Result<HeaderSet, ApiError> {
    match &config.bearer_token {
        Some(token) => Ok(HeaderSet::new().with(AUTHORIZATION, format!("Bearer {token}"))),
        None => Err(ApiError::LocalPrecondition(Fault::single(
            401,
            ErrorEntry::new(
                "MISSING_AUTHENTICATION_TOKEN",
                "You are not authorized for this method.",
                "Please sign in before attempting this operation.",
            )
            .with_field(AUTHORIZATION),
        ))),
    }
}

/// Accept plus identification: the base of every read.
pub fn identified(config: &ClientConfig) -> Result<HeaderSet, ApiError> {
    Ok(accept().merge(identification(config)?))
}

/// Single-entity GET with optional revalidation.
pub fn cacheable(config: &ClientConfig, e_tag: Option<&str>) -> Result<HeaderSet, ApiError> {
    Ok(identified(config)?.merge(if_none_match(e_tag)))
}

/// Ranged listing with optional `If-Match`.
pub fn list(
    config: &ClientConfig,
    items: ItemRange,
    e_tag: Option<&str>,
) -> Result<HeaderSet, ApiError> {
    Ok(identified(config)?.merge(range(items)?).merge(if_match(e_tag)))
}

/// Authenticated mutation. The bearer token identifies the caller, so no
/// API key is sent.
pub fn mutation(config: &ClientConfig, e_tag: Option<&str>) -> Result<HeaderSet, ApiError> {
    Ok(accept().merge(authorization(config)?).merge(if_match(e_tag)))
}
