//! Domain DTOs for the catalog API.
//!
//! # Design
//! These types cover the fields the client and its callers read. Anything
//! else the API sends is kept in a flattened `extra` map, and HAL sections
//! (`_links`, `_embedded`) stay raw JSON objects, so a newer API version does
//! not break deserialization. The mock-server defines its own copies; the
//! integration tests catch drift between the two.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A HAL section such as `_links` or `_embedded`.
pub type JsonObject = Map<String, Value>;

/// `href` of the link stored under `rel`, if any.
pub fn href<'a>(links: &'a JsonObject, rel: &str) -> Option<&'a str> {
    links.get(rel)?.get("href")?.as_str()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitledLink {
    pub href: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Root {
    #[serde(rename = "_links", default)]
    pub links: JsonObject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<u64>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "_links", default)]
    pub links: JsonObject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub uuid: Uuid,
    #[serde(rename = "_links", default)]
    pub links: JsonObject,
    #[serde(rename = "_embedded", default, skip_serializing_if = "Map::is_empty")]
    pub embedded: JsonObject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

/// One component of a taxon name, e.g. `{"class":"scientific","text":"Homo"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameComponent {
    pub class: String,
    pub text: String,
}

impl NameComponent {
    pub fn new(class: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            text: text.into(),
        }
    }
}

pub type Name = Vec<NameComponent>;

/// A phylogenetic node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub uuid: Uuid,
    #[serde(default)]
    pub names: Vec<Name>,
    #[serde(rename = "_links", default)]
    pub links: JsonObject,
    #[serde(rename = "_embedded", default, skip_serializing_if = "Map::is_empty")]
    pub embedded: JsonObject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEmbedded<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> Default for ListEmbedded<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

/// One page of a ranged listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct List<T> {
    pub total_items: u64,
    #[serde(rename = "_embedded", default)]
    pub embedded: ListEmbedded<T>,
    #[serde(rename = "_links", default)]
    pub links: JsonObject,
}

impl<T> List<T> {
    pub fn items(&self) -> &[T] {
        &self.embedded.items
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoicesEmbedded {
    #[serde(default)]
    pub choices: Vec<Node>,
}

/// Candidate nodes for an ambiguous `resolve` lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeChoices {
    #[serde(rename = "_embedded")]
    pub embedded: ChoicesEmbedded,
    #[serde(rename = "_links", default)]
    pub links: JsonObject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatches {
    #[serde(default)]
    pub matches: Vec<String>,
    #[serde(rename = "_links", default)]
    pub links: JsonObject,
}

/// Outcome of `resolve`.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The URI named one node; the client followed the redirect to it.
    Resolved(Node),
    /// The URI was ambiguous; pick one of these.
    Choices(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePost {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub general_node: Option<Uuid>,
    pub license: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sponsor: Option<String>,
    pub specific_node: Uuid,
}

impl ImagePost {
    pub fn new(specific_node: Uuid, license: impl Into<String>) -> Self {
        Self {
            attribution: None,
            general_node: None,
            license: license.into(),
            sponsor: None,
            specific_node,
        }
    }
}

/// Only the fields present are applied; omitted fields stay unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub general_node: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sponsor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specific_node: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePost {
    pub names: Vec<Name>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<Name>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Uuid>,
}
