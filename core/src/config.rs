//! Client configuration.
//!
//! # Design
//! A `ClientConfig` is an immutable snapshot. The client keeps it behind an
//! `Arc` and swaps in a fresh one on `authorize`/`deauthorize`, so a call
//! that already built its headers keeps the credentials it started with.

use std::fmt;

pub const DEFAULT_BASE_URL: &str = "https://api.phylopic.org/";

const ENV_URL: &str = "PHYLOPIC_API_URL";
const ENV_KEY: &str = "PHYLOPIC_API_KEY";
const ENV_TOKEN: &str = "PHYLOPIC_API_TOKEN";
const ENV_REQUIRE_KEY: &str = "PHYLOPIC_REQUIRE_API_KEY";

/// Whether identified calls may go out without an `X-API-Key` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiKeyPolicy {
    /// Attach the key when configured, otherwise send the call without it.
    #[default]
    Optional,
    /// Fail identified calls before dispatch when no key is configured.
    Required,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
    pub api_key_policy: ApiKeyPolicy,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            api_key: None,
            bearer_token: None,
            api_key_policy: ApiKeyPolicy::default(),
        }
    }

    /// Configuration from `PHYLOPIC_API_URL`, `PHYLOPIC_API_KEY`,
    /// `PHYLOPIC_API_TOKEN` and `PHYLOPIC_REQUIRE_API_KEY`. The key becomes
    /// required when the last one is `1` or `true` (any case).
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let present = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let base_url = present(ENV_URL).unwrap_or_default();
        let api_key_policy = match present(ENV_REQUIRE_KEY).as_deref().map(str::trim) {
            Some(flag) if flag == "1" || flag.eq_ignore_ascii_case("true") => {
                ApiKeyPolicy::Required
            }
            _ => ApiKeyPolicy::Optional,
        };
        Self {
            base_url: normalize_base_url(&base_url),
            api_key: present(ENV_KEY),
            bearer_token: present(ENV_TOKEN),
            api_key_policy,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into()).filter(|key| !key.is_empty());
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into()).filter(|token| !token.is_empty());
        self
    }

    pub fn with_api_key_policy(mut self, policy: ApiKeyPolicy) -> Self {
        self.api_key_policy = policy;
        self
    }

    /// Always ends with `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path relative to the base URL.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Resolve a `Location` header against the base URL. Absolute URLs pass
    /// through; paths are appended to the base URL without its trailing slash.
    pub fn resolve_location(&self, location: &str) -> String {
        if location.starts_with("http://") || location.starts_with("https://") {
            return location.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if location.starts_with('/') {
            format!("{base}{location}")
        } else {
            format!("{base}/{location}")
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("bearer_token", &redact(&self.bearer_token))
            .field("api_key_policy", &self.api_key_policy)
            .finish()
    }
}

fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        DEFAULT_BASE_URL.to_string()
    } else if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}
