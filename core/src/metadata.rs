//! Metadata read from response headers.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ApiError, ErrorEntry, Fault};
use crate::http::HttpResponse;

lazy_static! {
    static ref CONTENT_RANGE: Regex =
        Regex::new(r"^\s*(?i:items)\s+(?:\*|(\d+)-(\d+))/(?:\*|(\d+))\s*$")
            .expect("Invalid Content-Range regex");
}

/// Slice of a collection described by `Content-Range: items a-b/total`.
///
/// `None` stands for the server's `*`: an unknown range or total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentRange {
    pub range: Option<(u64, u64)>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Metadata {
    pub e_tag: Option<String>,
    pub content_range: Option<ContentRange>,
}

impl Metadata {
    /// Shallow merge: fields present in `other` win.
    pub fn merge(self, other: Metadata) -> Metadata {
        Metadata {
            e_tag: other.e_tag.or(self.e_tag),
            content_range: other.content_range.or(self.content_range),
        }
    }
}

pub type Extractor = fn(&HttpResponse) -> Result<Metadata, ApiError>;

/// Extractors for single-entity responses.
pub const ENTITY: &[Extractor] = &[extract_e_tag];
/// Extractors for ranged listings.
pub const LIST: &[Extractor] = &[extract_content_range, extract_e_tag];
pub const NONE: &[Extractor] = &[];

pub fn extract_e_tag(response: &HttpResponse) -> Result<Metadata, ApiError> {
    Ok(Metadata {
        e_tag: response
            .header("etag")
            .filter(|tag| !tag.is_empty())
            .map(str::to_string),
        ..Metadata::default()
    })
}

pub fn extract_content_range(response: &HttpResponse) -> Result<Metadata, ApiError> {
    let header = response.header("content-range").unwrap_or_default();
    let content_range = parse_content_range(header).ok_or_else(invalid_range)?;
    Ok(Metadata {
        content_range: Some(content_range),
        ..Metadata::default()
    })
}

pub fn parse_content_range(header: &str) -> Option<ContentRange> {
    let captures = CONTENT_RANGE.captures(header)?;
    let number = |index: usize| -> Option<Option<u64>> {
        match captures.get(index) {
            Some(found) => found.as_str().parse().ok().map(Some),
            None => Some(None),
        }
    };
    let range = match (number(1)?, number(2)?) {
        (Some(start), Some(end)) => Some((start, end)),
        _ => None,
    };
    Some(ContentRange {
        range,
        total: number(3)?,
    })
}

fn invalid_range() -> ApiError {
    ApiError::ContractViolation(Fault::single(
        500,
        ErrorEntry::new(
            "DEFAULT_5XX",
            "Invalid range from API.",
            "There was an error in the data response. You may want to report this.",
        )
        .with_field("Content-Range"),
    ))
}

/// Run every extractor against the same response and merge the results in order.
pub fn compose(extractors: &[Extractor], response: &HttpResponse) -> Result<Metadata, ApiError> {
    extractors
        .iter()
        .try_fold(Metadata::default(), |merged, extract| {
            Ok(merged.merge(extract(response)?))
        })
}
