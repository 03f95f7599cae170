//! Typed asynchronous client for the PhyloPic catalog API.
//!
//! # Overview
//! Builds `HttpRequest` values and interprets `HttpResponse` values; a
//! caller-supplied [`Transport`] performs the actual round-trip
//! (host-does-IO pattern). That keeps the client deterministic and lets
//! tests drive it without a network.
//!
//! # Design
//! - Request shaping is a set of small pure functions: [`query`] builds the
//!   canonical query string, [`headers`] composes header sets.
//! - [`classify`] maps every response to success or one `ApiError` variant,
//!   and [`metadata`] reads `ETag` and `Content-Range`.
//! - [`PhyloPicClient`] wires them together behind one method per operation.
//!   Its configuration is an immutable snapshot replaced on
//!   `authorize`/`deauthorize`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod http;
pub mod metadata;
pub mod options;
pub mod query;
pub mod response;
pub mod types;
pub mod validate;

pub use client::PhyloPicClient;
pub use config::{ApiKeyPolicy, ClientConfig};
pub use error::{ApiError, ErrorEntry, Fault};
pub use crate::http::{HttpMethod, HttpRequest, HttpResponse, RedirectPolicy, Transport, TransportError};
pub use metadata::{ContentRange, Metadata};
pub use options::{
    CacheableOptions, EntityOptions, ImageEmbedField, ImageListOptions, ImageSortField, ItemRange,
    LicenseComponent, ListOptions, NodeEmbedField, NodeListOptions, NodeSortField,
};
pub use response::ApiResponse;
pub use types::{
    Account, Image, ImagePatch, ImagePost, List, NameComponent, Node, NodeChoices, NodePatch,
    NodePost, QueryMatches, Resolution, Root, TitledLink,
};
pub use validate::{Validate, ValidationFault};
