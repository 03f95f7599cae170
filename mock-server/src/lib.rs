//! In-memory fake of the catalog API.
//!
//! Serves a fixed node tree plus a mutable image collection, with enough of
//! the real API's HTTP contract (ETags, conditional requests, item ranges,
//! redirects, structured error bodies) to drive the client end to end.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub const DATA_MEDIA_TYPE: &str = "application/vnd.phylopic.v2+json";

pub const ROOT_NODE: Uuid = Uuid::from_u128(1);
pub const HUMAN_NODE: Uuid = Uuid::from_u128(2);
pub const HUMAN_URI: &str = "https://www.ncbi.nlm.nih.gov/taxonomy/9606";
/// Claimed by two nodes, so resolving it yields a choice list.
pub const AMBIGUOUS_URI: &str = "urn:example:ambiguous";

const BUILD: u64 = 1;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    pub developer_message: String,
    pub user_message: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Image {
    pub uuid: Uuid,
    #[serde(rename = "_links")]
    pub links: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    pub license: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sponsor: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub uuid: Uuid,
    pub names: Value,
    #[serde(rename = "_links")]
    pub links: Value,
    #[serde(skip)]
    pub external: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePost {
    pub attribution: Option<String>,
    pub license: String,
    pub sponsor: Option<String>,
    pub specific_node: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePatch {
    pub attribution: Option<String>,
    pub license: Option<String>,
    pub sponsor: Option<String>,
}

#[derive(Deserialize)]
pub struct ResolveParams {
    pub uri: String,
}

struct Versioned<T> {
    value: T,
    version: u64,
}

impl<T> Versioned<T> {
    fn e_tag(&self) -> String {
        format!("\"v{}\"", self.version)
    }
}

pub struct Catalog {
    nodes: Vec<Node>,
    images: Vec<Versioned<Image>>,
}

pub type Db = Arc<RwLock<Catalog>>;

fn node(uuid: Uuid, text: &str, parent: Option<Uuid>, external: &[&str]) -> Node {
    let mut links = json!({ "self": { "href": format!("/nodes/{uuid}") } });
    if let Some(parent) = parent {
        links["parentNode"] = json!({ "href": format!("/nodes/{parent}") });
    }
    Node {
        uuid,
        names: json!([[{ "class": "scientific", "text": text }]]),
        links,
        external: external.iter().map(|uri| uri.to_string()).collect(),
    }
}

impl Catalog {
    fn seeded() -> Self {
        Self {
            nodes: vec![
                node(ROOT_NODE, "Pan-Biota", None, &[]),
                node(HUMAN_NODE, "Homo sapiens", Some(ROOT_NODE), &[HUMAN_URI]),
                node(Uuid::from_u128(3), "Pan troglodytes", Some(ROOT_NODE), &[AMBIGUOUS_URI]),
                node(Uuid::from_u128(4), "Pan paniscus", Some(ROOT_NODE), &[AMBIGUOUS_URI]),
            ],
            images: Vec::new(),
        }
    }

    fn image(&self, uuid: Uuid) -> Option<&Versioned<Image>> {
        self.images.iter().find(|stored| stored.value.uuid == uuid)
    }
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Catalog::seeded()));
    Router::new()
        .route("/", get(get_root))
        .route("/ping", get(ping))
        .route("/licenses", get(get_licenses))
        .route("/images", get(list_images))
        .route(
            "/images/{uuid}",
            get(get_image)
                .post(create_image)
                .patch(update_image)
                .delete(delete_image),
        )
        .route("/nodes/{uuid}", get(get_node))
        .route("/rootnode", get(root_node))
        .route("/resolve", get(resolve))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// A structured error response in the API media type.
pub struct Failure {
    status: StatusCode,
    entry: ErrorEntry,
}

impl Failure {
    fn new(status: StatusCode, kind: &str, message: &str, field: Option<&str>) -> Self {
        Self {
            status,
            entry: ErrorEntry {
                developer_message: message.to_string(),
                user_message: message.to_string(),
                kind: kind.to_string(),
                field: field.map(str::to_string),
            },
        }
    }

    fn not_found(what: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "RESOURCE_NOT_FOUND",
            &format!("{what} not found."),
            None,
        )
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        data(self.status, None, &[self.entry])
    }
}

fn data<T: Serialize + ?Sized>(status: StatusCode, e_tag: Option<&str>, value: &T) -> Response {
    let body = match serde_json::to_vec(value) {
        Ok(body) => body,
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(DATA_MEDIA_TYPE));
    if let Some(value) = e_tag.and_then(|tag| HeaderValue::from_str(tag).ok()) {
        headers.insert(header::ETAG, value);
    }
    (status, headers, body).into_response()
}

fn redirect(status: StatusCode, location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (status, [(header::LOCATION, value)]).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

fn not_modified(e_tag: &str) -> Response {
    match HeaderValue::from_str(e_tag) {
        Ok(value) => (StatusCode::NOT_MODIFIED, [(header::ETAG, value)]).into_response(),
        Err(_) => StatusCode::NOT_MODIFIED.into_response(),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn require_bearer(headers: &HeaderMap) -> Result<(), Failure> {
    match header_str(headers, header::AUTHORIZATION).and_then(|v| v.strip_prefix("Bearer ")) {
        Some(token) if !token.is_empty() => Ok(()),
        _ => Err(Failure::new(
            StatusCode::UNAUTHORIZED,
            "MISSING_AUTHENTICATION_TOKEN",
            "You are not authorized for this method.",
            Some("Authorization"),
        )),
    }
}

fn require_match(headers: &HeaderMap, e_tag: &str) -> Result<(), Failure> {
    match header_str(headers, header::IF_MATCH) {
        Some(given) if given == e_tag => Ok(()),
        _ => Err(Failure::new(
            StatusCode::PRECONDITION_FAILED,
            "PRECONDITION_FAILED",
            "The entity has changed.",
            Some("If-Match"),
        )),
    }
}

fn is_fresh(headers: &HeaderMap, e_tag: &str) -> bool {
    header_str(headers, header::IF_NONE_MATCH) == Some(e_tag)
}

/// Parse `Range: items=a-b` into inclusive bounds.
fn item_range(headers: &HeaderMap) -> Result<(usize, usize), Failure> {
    let invalid = || {
        Failure::new(
            StatusCode::BAD_REQUEST,
            "BAD_REQUEST_HEADER",
            "Expected a header of the form `Range: items=<start>-<end>`.",
            Some("Range"),
        )
    };
    let bounds = header_str(headers, header::RANGE)
        .and_then(|value| value.trim().strip_prefix("items="))
        .ok_or_else(invalid)?;
    let (start, end) = bounds.split_once('-').ok_or_else(invalid)?;
    let start: usize = start.trim().parse().map_err(|_| invalid())?;
    let end: usize = end.trim().parse().map_err(|_| invalid())?;
    if start > end {
        return Err(invalid());
    }
    Ok((start, end))
}

fn image_links(uuid: Uuid, specific_node: Uuid, license: &str) -> Value {
    json!({
        "self": { "href": format!("/images/{uuid}") },
        "specificNode": { "href": format!("/nodes/{specific_node}") },
        "license": { "href": license },
    })
}

async fn get_root() -> Response {
    let root = json!({
        "_links": {
            "self": { "href": "/" },
            "rootNode": { "href": format!("/nodes/{ROOT_NODE}") },
            "images": { "href": "/images" },
        },
        "build": BUILD,
    });
    data(StatusCode::OK, Some(&format!("\"build-{BUILD}\"")), &root)
}

async fn ping() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn get_licenses(headers: HeaderMap) -> Response {
    let e_tag = "\"licenses-1\"";
    if is_fresh(&headers, e_tag) {
        return not_modified(e_tag);
    }
    let licenses = json!([
        { "href": "https://creativecommons.org/publicdomain/zero/1.0/", "title": "Public Domain Dedication 1.0" },
        { "href": "https://creativecommons.org/licenses/by/4.0/", "title": "Attribution 4.0 International" },
    ]);
    data(StatusCode::OK, Some(e_tag), &licenses)
}

async fn list_images(State(db): State<Db>, headers: HeaderMap) -> Result<Response, Failure> {
    let (start, end) = item_range(&headers)?;
    let catalog = db.read().await;
    let total = catalog.images.len();
    let items: Vec<&Image> = catalog
        .images
        .iter()
        .skip(start)
        .take((end - start).saturating_add(1))
        .map(|stored| &stored.value)
        .collect();
    let content_range = if items.is_empty() {
        format!("items */{total}")
    } else {
        format!("items {}-{}/{total}", start, start + items.len() - 1)
    };
    let page = json!({
        "totalItems": total,
        "_embedded": { "items": items },
        "_links": { "self": { "href": "/images" } },
    });
    let mut response = data(StatusCode::OK, None, &page);
    if let Ok(value) = HeaderValue::from_str(&content_range) {
        response.headers_mut().insert(header::CONTENT_RANGE, value);
    }
    Ok(response)
}

async fn get_image(
    State(db): State<Db>,
    Path(uuid): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, Failure> {
    let catalog = db.read().await;
    let stored = catalog.image(uuid).ok_or_else(|| Failure::not_found("Image"))?;
    let e_tag = stored.e_tag();
    if is_fresh(&headers, &e_tag) {
        return Ok(not_modified(&e_tag));
    }
    Ok(data(StatusCode::OK, Some(&e_tag), &stored.value))
}

async fn create_image(
    State(db): State<Db>,
    Path(uuid): Path<Uuid>,
    headers: HeaderMap,
    Json(input): Json<ImagePost>,
) -> Result<Response, Failure> {
    require_bearer(&headers)?;
    let mut catalog = db.write().await;
    if catalog.image(uuid).is_some() {
        return Ok(redirect(StatusCode::SEE_OTHER, &format!("/images/{uuid}")));
    }
    if !catalog.nodes.iter().any(|node| node.uuid == input.specific_node) {
        return Err(Failure::new(
            StatusCode::BAD_REQUEST,
            "BAD_REQUEST_BODY",
            "The specific node does not exist.",
            Some("specificNode"),
        ));
    }
    let stored = Versioned {
        value: Image {
            uuid,
            links: image_links(uuid, input.specific_node, &input.license),
            attribution: input.attribution,
            license: input.license,
            sponsor: input.sponsor,
        },
        version: 1,
    };
    let response = data(StatusCode::CREATED, Some(&stored.e_tag()), &stored.value);
    catalog.images.push(stored);
    debug!(%uuid, "created image");
    Ok(response)
}

async fn update_image(
    State(db): State<Db>,
    Path(uuid): Path<Uuid>,
    headers: HeaderMap,
    Json(input): Json<ImagePatch>,
) -> Result<Response, Failure> {
    require_bearer(&headers)?;
    let mut catalog = db.write().await;
    let stored = catalog
        .images
        .iter_mut()
        .find(|stored| stored.value.uuid == uuid)
        .ok_or_else(|| Failure::not_found("Image"))?;
    require_match(&headers, &stored.e_tag())?;
    if let Some(attribution) = input.attribution {
        stored.value.attribution = Some(attribution);
    }
    if let Some(license) = input.license {
        stored.value.links["license"] = json!({ "href": license });
        stored.value.license = license;
    }
    if let Some(sponsor) = input.sponsor {
        stored.value.sponsor = Some(sponsor);
    }
    stored.version += 1;
    debug!(%uuid, version = stored.version, "updated image");
    Ok(data(StatusCode::OK, Some(&stored.e_tag()), &stored.value))
}

async fn delete_image(
    State(db): State<Db>,
    Path(uuid): Path<Uuid>,
    headers: HeaderMap,
) -> Result<StatusCode, Failure> {
    require_bearer(&headers)?;
    let mut catalog = db.write().await;
    let index = catalog
        .images
        .iter()
        .position(|stored| stored.value.uuid == uuid)
        .ok_or_else(|| Failure::not_found("Image"))?;
    require_match(&headers, &catalog.images[index].e_tag())?;
    catalog.images.remove(index);
    debug!(%uuid, "deleted image");
    Ok(StatusCode::NO_CONTENT)
}

async fn get_node(
    State(db): State<Db>,
    Path(uuid): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, Failure> {
    let catalog = db.read().await;
    let node = catalog
        .nodes
        .iter()
        .find(|node| node.uuid == uuid)
        .ok_or_else(|| Failure::not_found("Node"))?;
    let e_tag = format!("\"node-{BUILD}\"");
    if is_fresh(&headers, &e_tag) {
        return Ok(not_modified(&e_tag));
    }
    Ok(data(StatusCode::OK, Some(&e_tag), node))
}

async fn root_node() -> Response {
    redirect(StatusCode::TEMPORARY_REDIRECT, &format!("/nodes/{ROOT_NODE}"))
}

async fn resolve(State(db): State<Db>, Query(params): Query<ResolveParams>) -> Response {
    let catalog = db.read().await;
    let matches: Vec<&Node> = catalog
        .nodes
        .iter()
        .filter(|node| node.external.iter().any(|uri| *uri == params.uri))
        .collect();
    if let [only] = matches.as_slice() {
        return redirect(StatusCode::TEMPORARY_REDIRECT, &format!("/nodes/{}", only.uuid));
    }
    let choices = json!({
        "_embedded": { "choices": matches },
        "_links": { "self": { "href": "/resolve" } },
    });
    data(StatusCode::OK, None, &choices)
}
