//! Response envelope returned by every data-bearing operation.

use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::http::HttpResponse;
use crate::metadata::{compose, Extractor, Metadata};

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    /// `None` when the status carries no body (204, 304).
    pub data: Option<T>,
    pub metadata: Metadata,
    pub status: u16,
}

impl<T> ApiResponse<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            data: self.data.map(f),
            metadata: self.metadata,
            status: self.status,
        }
    }

    pub fn is_not_modified(&self) -> bool {
        self.status == 304
    }
}

pub fn has_body(status: u16) -> bool {
    !matches!(status, 204 | 304)
}

/// Extract metadata and parse the body of a successful response.
pub fn create_api_response<T: DeserializeOwned>(
    response: &HttpResponse,
    extractors: &[Extractor],
) -> Result<ApiResponse<T>, ApiError> {
    let metadata = compose(extractors, response)?;
    let data = if has_body(response.status) {
        let parsed = serde_json::from_slice(&response.body)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))?;
        Some(parsed)
    } else {
        None
    };
    Ok(ApiResponse {
        data,
        metadata,
        status: response.status,
    })
}

/// Envelope for operations whose body is ignored, such as deletes.
pub fn create_empty_response(
    response: &HttpResponse,
    extractors: &[Extractor],
) -> Result<ApiResponse<()>, ApiError> {
    Ok(ApiResponse {
        data: has_body(response.status).then_some(()),
        metadata: compose(extractors, response)?,
        status: response.status,
    })
}
