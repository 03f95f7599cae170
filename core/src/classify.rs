//! Response classification.
//!
//! Every response lands in exactly one outcome: success (2xx, or 304 on a
//! conditional GET), a rejected redirect, a structured API error, or an
//! unexpected failure. The outcome depends on the response alone.

use crate::error::{ApiError, ErrorEntry, Fault};
use crate::headers::DATA_MEDIA_TYPE;
use crate::http::{HttpResponse, RedirectPolicy};

const UNEXPECTED_USER_MESSAGE: &str = "An unexpected error occurred.";

/// Pass successful responses through; turn everything else into an `ApiError`.
///
/// Under `RedirectPolicy::Manual` a 3xx is handed back for the caller to
/// follow. Under `RedirectPolicy::Error` it becomes `ApiError::RedirectConflict`.
pub fn classify(response: HttpResponse, redirect: RedirectPolicy) -> Result<HttpResponse, ApiError> {
    if response.is_success() || response.status == 304 {
        return Ok(response);
    }
    if response.is_redirect() {
        match redirect {
            RedirectPolicy::Manual => return Ok(response),
            RedirectPolicy::Error => return Err(redirect_conflict(&response)),
            RedirectPolicy::Follow => {}
        }
    }
    if let Some(entries) = structured_entries(&response) {
        return Err(ApiError::Upstream(Fault::new(response.status, entries)));
    }
    Err(unexpected(&response))
}

/// True when the content type names the API's media type, ignoring parameters.
pub fn is_data_media_type(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| value.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case(DATA_MEDIA_TYPE))
        .unwrap_or(false)
}

fn structured_entries(response: &HttpResponse) -> Option<Vec<ErrorEntry>> {
    if !is_data_media_type(response.header("content-type")) {
        return None;
    }
    let entries: Vec<ErrorEntry> = serde_json::from_slice(&response.body).ok()?;
    if entries.is_empty() {
        None
    } else {
        Some(entries)
    }
}

fn redirect_conflict(response: &HttpResponse) -> ApiError {
    let location = response.header("location").unwrap_or_default();
    ApiError::RedirectConflict(Fault::single(
        response.status,
        ErrorEntry::new(
            "CONFLICT",
            format!("{}: {}", response.status_text(), location),
            "That entity was already created.",
        ),
    ))
}

fn unexpected(response: &HttpResponse) -> ApiError {
    let kind = if response.status < 500 {
        "DEFAULT_4XX"
    } else {
        "DEFAULT_5XX"
    };
    ApiError::Unexpected(Fault::single(
        response.status,
        ErrorEntry::new(kind, response.status_text(), UNEXPECTED_USER_MESSAGE),
    ))
}
