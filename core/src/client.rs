//! Asynchronous client for the catalog API.
//!
//! # Design
//! `PhyloPicClient` owns a caller-supplied [`Transport`] and an immutable
//! configuration snapshot. Every operation follows the same pipeline: build
//! headers and query, describe the request as an `HttpRequest`, hand it to
//! the transport, classify the response, then extract metadata and parse the
//! body into an [`ApiResponse`]. Credential and payload checks run before the
//! transport is touched.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::classify::classify;
use crate::config::ClientConfig;
use crate::error::{ApiError, ErrorEntry, Fault};
use crate::headers::{self, HeaderSet};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RedirectPolicy, Transport};
use crate::metadata::{self, Extractor};
use crate::options::{
    CacheableOptions, EntityOptions, ImageEmbedField, ImageListOptions, ItemRange,
    NodeEmbedField, NodeListOptions,
};
use crate::query::{
    create_entity_query, create_image_list_query, create_list_query, format_query, Query,
};
use crate::response::{create_api_response, create_empty_response, ApiResponse};
use crate::types::{Account, Image, List, Node, NodeChoices, QueryMatches, Resolution, Root, TitledLink};
use crate::validate::{check, Validate};

const IMAGES: &str = "images";
const NODES: &str = "nodes";
const SUBMISSIONS: &str = "submissions";

/// A request before it is bound to a base URL.
struct Call {
    method: HttpMethod,
    path: String,
    query: Query,
    headers: HeaderSet,
    body: Option<Vec<u8>>,
    redirect: RedirectPolicy,
}

impl Call {
    fn new(method: HttpMethod, path: impl Into<String>, headers: HeaderSet) -> Self {
        Self {
            method,
            path: path.into(),
            query: Query::new(),
            headers,
            body: None,
            redirect: RedirectPolicy::Follow,
        }
    }

    fn get(path: impl Into<String>, headers: HeaderSet) -> Self {
        Self::new(HttpMethod::Get, path, headers)
    }

    fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    fn with_redirect(mut self, redirect: RedirectPolicy) -> Self {
        self.redirect = redirect;
        self
    }

    fn into_request(self, config: &ClientConfig) -> HttpRequest {
        HttpRequest {
            method: self.method,
            url: format!("{}{}", config.url_for(&self.path), format_query(&self.query)),
            headers: self.headers.into_vec(),
            body: self.body,
            redirect: self.redirect,
        }
    }
}

fn missing_location(status: u16) -> ApiError {
    ApiError::ContractViolation(Fault::single(
        500,
        ErrorEntry::new(
            "DEFAULT_5XX",
            format!("Redirect ({status}) without a location from API."),
            "There was an error in the data response. You may want to report this.",
        )
        .with_field("Location"),
    ))
}

fn to_json<P: Serialize>(payload: &P) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec(payload).map_err(|e| ApiError::SerializationError(e.to_string()))
}

/// Typed client for the catalog API.
pub struct PhyloPicClient<T> {
    transport: T,
    config: RwLock<Arc<ClientConfig>>,
}

impl<T: Transport> PhyloPicClient<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config: RwLock::new(Arc::new(config)),
        }
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<ClientConfig> {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_config(&self, config: ClientConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
    }

    /// Use `token` as the bearer token for subsequent calls.
    pub fn authorize(&self, token: impl Into<String>) {
        let next = (*self.config()).clone().with_bearer_token(token);
        self.replace_config(next);
    }

    pub fn deauthorize(&self) {
        let mut next = (*self.config()).clone();
        next.bearer_token = None;
        self.replace_config(next);
    }

    async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let redirect = request.redirect;
        debug!(method = request.method.as_str(), url = %request.url, "dispatching request");
        let response = self
            .transport
            .send(request)
            .await
            .map_err(ApiError::Transport)?;
        debug!(status = response.status, "received response");
        classify(response, redirect)
    }

    /// Re-issue a GET to the `Location` of a redirect. Non-redirect responses
    /// are returned as they are.
    async fn follow(
        &self,
        config: &ClientConfig,
        response: HttpResponse,
        headers: HeaderSet,
        query: &Query,
    ) -> Result<HttpResponse, ApiError> {
        if !response.is_redirect() {
            return Ok(response);
        }
        let location = response
            .header("location")
            .filter(|location| !location.is_empty())
            .ok_or_else(|| missing_location(response.status))?;
        let mut url = config.resolve_location(location);
        let extra = format_query(query);
        if !extra.is_empty() {
            let separator = if url.contains('?') { '&' } else { '?' };
            url.push(separator);
            url.push_str(extra.trim_start_matches('?'));
        }
        debug!(status = response.status, url = %url, "following redirect");
        self.dispatch(HttpRequest {
            method: HttpMethod::Get,
            url,
            headers: headers.into_vec(),
            body: None,
            redirect: RedirectPolicy::Follow,
        })
        .await
    }

    async fn get_entity<R: DeserializeOwned>(
        &self,
        path: String,
        query: Query,
        e_tag: Option<&str>,
        signed_in: bool,
    ) -> Result<ApiResponse<R>, ApiError> {
        let config = self.config();
        let mut request_headers = headers::cacheable(&config, e_tag)?;
        if signed_in {
            request_headers = request_headers.merge(headers::authorization(&config)?);
        }
        let request = Call::get(path, request_headers)
            .with_query(query)
            .into_request(&config);
        let response = self.dispatch(request).await?;
        create_api_response(&response, metadata::ENTITY)
    }

    async fn get_list<R: DeserializeOwned>(
        &self,
        path: String,
        range: ItemRange,
        e_tag: Option<&str>,
        query: Query,
        signed_in: bool,
    ) -> Result<ApiResponse<List<R>>, ApiError> {
        let config = self.config();
        let mut request_headers = headers::list(&config, range, e_tag)?;
        if signed_in {
            request_headers = request_headers.merge(headers::authorization(&config)?);
        }
        let request = Call::get(path, request_headers)
            .with_query(query)
            .into_request(&config);
        let response = self.dispatch(request).await?;
        create_api_response(&response, metadata::LIST)
    }

    async fn get_image_list(
        &self,
        path: String,
        options: &ImageListOptions,
        mut query: Query,
        signed_in: bool,
    ) -> Result<ApiResponse<List<Image>>, ApiError> {
        query.extend(create_image_list_query(options));
        self.get_list(path, options.list.range, options.list.e_tag.as_deref(), query, signed_in)
            .await
    }

    async fn get_node_list(
        &self,
        path: String,
        options: &NodeListOptions,
        mut query: Query,
    ) -> Result<ApiResponse<List<Node>>, ApiError> {
        query.extend(create_list_query(options));
        self.get_list(path, options.range, options.e_tag.as_deref(), query, false)
            .await
    }

    async fn mutate<R: DeserializeOwned>(
        &self,
        call: Call,
        extractors: &[Extractor],
    ) -> Result<ApiResponse<R>, ApiError> {
        let config = self.config();
        let response = self.dispatch(call.into_request(&config)).await?;
        create_api_response(&response, extractors)
    }

    async fn post_entity<P, R>(&self, path: &str, uuid: Uuid, post: &P) -> Result<ApiResponse<R>, ApiError>
    where
        P: Serialize + Validate,
        R: DeserializeOwned,
    {
        check(post.validate())?;
        let config = self.config();
        let request_headers = headers::mutation(&config, None)?.merge(headers::content_type(headers::DATA_MEDIA_TYPE));
        let call = Call::new(HttpMethod::Post, format!("{path}/{uuid}"), request_headers)
            .with_body(to_json(post)?)
            .with_redirect(RedirectPolicy::Error);
        self.mutate(call, metadata::ENTITY).await
    }

    async fn patch_entity<P, R>(
        &self,
        path: &str,
        uuid: Uuid,
        e_tag: &str,
        patch: &P,
    ) -> Result<ApiResponse<R>, ApiError>
    where
        P: Serialize + Validate,
        R: DeserializeOwned,
    {
        check(patch.validate())?;
        let config = self.config();
        let request_headers = headers::mutation(&config, Some(e_tag))?.merge(headers::content_type(headers::DATA_MEDIA_TYPE));
        let call = Call::new(HttpMethod::Patch, format!("{path}/{uuid}"), request_headers)
            .with_body(to_json(patch)?);
        self.mutate(call, metadata::ENTITY).await
    }

    async fn delete_entity(&self, path: &str, uuid: Uuid, e_tag: &str) -> Result<ApiResponse<()>, ApiError> {
        let config = self.config();
        let request_headers = headers::mutation(&config, Some(e_tag))?;
        let request = Call::new(HttpMethod::Delete, format!("{path}/{uuid}"), request_headers)
            .into_request(&config);
        let response = self.dispatch(request).await?;
        create_empty_response(&response, metadata::NONE)
    }

    /// Liveness check. Sends no credentials.
    pub async fn ping(&self) -> Result<(), ApiError> {
        let config = self.config();
        let request = Call::get("ping", headers::accept()).into_request(&config);
        self.dispatch(request).await?;
        Ok(())
    }

    pub async fn get_root(&self, options: &CacheableOptions) -> Result<ApiResponse<Root>, ApiError> {
        self.get_entity(String::new(), Query::new(), options.e_tag.as_deref(), false)
            .await
    }

    /// The root of the phylogenetic tree. The API answers with a redirect to
    /// the canonical node, which is followed here.
    pub async fn get_root_node(
        &self,
        options: &EntityOptions<NodeEmbedField>,
    ) -> Result<ApiResponse<Node>, ApiError> {
        let config = self.config();
        let request_headers = headers::cacheable(&config, options.e_tag.as_deref())?;
        let query = create_entity_query(options);
        let request = Call::get("rootnode", request_headers.clone())
            .with_query(query.clone())
            .with_redirect(RedirectPolicy::Manual)
            .into_request(&config);
        let response = self.dispatch(request).await?;
        let response = self.follow(&config, response, request_headers, &query).await?;
        create_api_response(&response, metadata::ENTITY)
    }

    pub async fn get_account(
        &self,
        uuid: Uuid,
        options: &CacheableOptions,
    ) -> Result<ApiResponse<Account>, ApiError> {
        self.get_entity(format!("accounts/{uuid}"), Query::new(), options.e_tag.as_deref(), false)
            .await
    }

    pub async fn get_autocomplete(&self, query: &str) -> Result<ApiResponse<QueryMatches>, ApiError> {
        let config = self.config();
        let mut params = Query::new();
        params.insert("query".to_string(), query.to_string());
        let request = Call::get("autocomplete", headers::identified(&config)?)
            .with_query(params)
            .into_request(&config);
        let response = self.dispatch(request).await?;
        create_api_response(&response, metadata::NONE)
    }

    pub async fn get_licenses(
        &self,
        options: &CacheableOptions,
    ) -> Result<ApiResponse<Vec<TitledLink>>, ApiError> {
        self.get_entity("licenses".to_string(), Query::new(), options.e_tag.as_deref(), false)
            .await
    }

    pub async fn get_image(
        &self,
        uuid: Uuid,
        options: &EntityOptions<ImageEmbedField>,
    ) -> Result<ApiResponse<Image>, ApiError> {
        self.get_entity(
            format!("{IMAGES}/{uuid}"),
            create_entity_query(options),
            options.e_tag.as_deref(),
            false,
        )
        .await
    }

    pub async fn get_images(&self, options: &ImageListOptions) -> Result<ApiResponse<List<Image>>, ApiError> {
        self.get_image_list(IMAGES.to_string(), options, Query::new(), false)
            .await
    }

    /// Images of a node and all its descendants.
    pub async fn get_clade_images(
        &self,
        uuid: Uuid,
        options: &ImageListOptions,
    ) -> Result<ApiResponse<List<Image>>, ApiError> {
        self.get_image_list(format!("cladeimages/{uuid}"), options, Query::new(), false)
            .await
    }

    pub async fn get_node_images(
        &self,
        uuid: Uuid,
        options: &ImageListOptions,
    ) -> Result<ApiResponse<List<Image>>, ApiError> {
        self.get_image_list(format!("nodeimages/{uuid}"), options, Query::new(), false)
            .await
    }

    pub async fn get_node(
        &self,
        uuid: Uuid,
        options: &EntityOptions<NodeEmbedField>,
    ) -> Result<ApiResponse<Node>, ApiError> {
        self.get_entity(
            format!("{NODES}/{uuid}"),
            create_entity_query(options),
            options.e_tag.as_deref(),
            false,
        )
        .await
    }

    pub async fn get_nodes(&self, options: &NodeListOptions) -> Result<ApiResponse<List<Node>>, ApiError> {
        self.get_node_list(NODES.to_string(), options, Query::new()).await
    }

    /// Ancestors of a node, nearest first.
    pub async fn get_lineage(
        &self,
        uuid: Uuid,
        options: &NodeListOptions,
    ) -> Result<ApiResponse<List<Node>>, ApiError> {
        self.get_node_list(format!("lineage/{uuid}"), options, Query::new())
            .await
    }

    pub async fn search_nodes(
        &self,
        query: &str,
        options: &NodeListOptions,
    ) -> Result<ApiResponse<List<Node>>, ApiError> {
        let mut params = Query::new();
        params.insert("query".to_string(), query.to_string());
        self.get_node_list("search/nodes".to_string(), options, params)
            .await
    }

    pub async fn search_images(
        &self,
        query: &str,
        options: &ImageListOptions,
    ) -> Result<ApiResponse<List<Image>>, ApiError> {
        let mut params = Query::new();
        params.insert("query".to_string(), query.to_string());
        self.get_image_list("search/images".to_string(), options, params, false)
            .await
    }

    /// Look up the node an external URI identifies.
    ///
    /// A unique match arrives as a 307 and is followed (two requests); the
    /// `e_tag` of `options` applies to that second request. An ambiguous URI
    /// yields the candidate list unchanged.
    pub async fn resolve(
        &self,
        uri: &str,
        options: &EntityOptions<NodeEmbedField>,
    ) -> Result<ApiResponse<Resolution>, ApiError> {
        let config = self.config();
        let embed = create_entity_query(options);
        let mut params = embed.clone();
        params.insert("uri".to_string(), uri.to_string());
        let request = Call::get("resolve", headers::identified(&config)?)
            .with_query(params)
            .with_redirect(RedirectPolicy::Manual)
            .into_request(&config);
        let response = self.dispatch(request).await?;
        if response.is_redirect() {
            let follow_headers = headers::cacheable(&config, options.e_tag.as_deref())?;
            let response = self.follow(&config, response, follow_headers, &embed).await?;
            let resolved: ApiResponse<Node> = create_api_response(&response, metadata::ENTITY)?;
            return Ok(resolved.map(Resolution::Resolved));
        }
        let choices: ApiResponse<NodeChoices> = create_api_response(&response, metadata::NONE)?;
        Ok(choices.map(|choices| Resolution::Choices(choices.embedded.choices)))
    }

    /// A submission is an image that has not been accepted yet; only signed-in
    /// callers can read them.
    pub async fn get_submission(
        &self,
        uuid: Uuid,
        options: &EntityOptions<ImageEmbedField>,
    ) -> Result<ApiResponse<Image>, ApiError> {
        self.get_entity(
            format!("{SUBMISSIONS}/{uuid}"),
            create_entity_query(options),
            options.e_tag.as_deref(),
            true,
        )
        .await
    }

    pub async fn get_submissions(
        &self,
        options: &ImageListOptions,
    ) -> Result<ApiResponse<List<Image>>, ApiError> {
        self.get_image_list(SUBMISSIONS.to_string(), options, Query::new(), true)
            .await
    }

    /// Create an image. A redirect means the image already exists and
    /// surfaces as `ApiError::RedirectConflict`.
    pub async fn post_image<P: Serialize + Validate>(
        &self,
        uuid: Uuid,
        post: &P,
    ) -> Result<ApiResponse<Image>, ApiError> {
        self.post_entity(IMAGES, uuid, post).await
    }

    pub async fn post_node<P: Serialize + Validate>(
        &self,
        uuid: Uuid,
        post: &P,
    ) -> Result<ApiResponse<Node>, ApiError> {
        self.post_entity(NODES, uuid, post).await
    }

    pub async fn patch_image<P: Serialize + Validate>(
        &self,
        uuid: Uuid,
        e_tag: &str,
        patch: &P,
    ) -> Result<ApiResponse<Image>, ApiError> {
        self.patch_entity(IMAGES, uuid, e_tag, patch).await
    }

    pub async fn patch_node<P: Serialize + Validate>(
        &self,
        uuid: Uuid,
        e_tag: &str,
        patch: &P,
    ) -> Result<ApiResponse<Node>, ApiError> {
        self.patch_entity(NODES, uuid, e_tag, patch).await
    }

    pub async fn patch_submission<P: Serialize + Validate>(
        &self,
        uuid: Uuid,
        e_tag: &str,
        patch: &P,
    ) -> Result<ApiResponse<Image>, ApiError> {
        self.patch_entity(SUBMISSIONS, uuid, e_tag, patch).await
    }

    pub async fn delete_image(&self, uuid: Uuid, e_tag: &str) -> Result<ApiResponse<()>, ApiError> {
        self.delete_entity(IMAGES, uuid, e_tag).await
    }

    pub async fn delete_node(&self, uuid: Uuid, e_tag: &str) -> Result<ApiResponse<()>, ApiError> {
        self.delete_entity(NODES, uuid, e_tag).await
    }

    pub async fn delete_submission(&self, uuid: Uuid, e_tag: &str) -> Result<ApiResponse<()>, ApiError> {
        self.delete_entity(SUBMISSIONS, uuid, e_tag).await
    }

    /// Upload the image file of a submission. Uploading a file that already
    /// exists is answered with a redirect and surfaces as
    /// `ApiError::RedirectConflict`.
    pub async fn put_submission_file(
        &self,
        uuid: Uuid,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<ApiResponse<Image>, ApiError> {
        let config = self.config();
        let request_headers = headers::mutation(&config, None)?.merge(headers::content_type(content_type));
        let call = Call::new(HttpMethod::Put, format!("{SUBMISSIONS}/{uuid}"), request_headers)
            .with_body(bytes)
            .with_redirect(RedirectPolicy::Error);
        self.mutate(call, metadata::ENTITY).await
    }

    /// Read `path` and upload it, guessing the media type from the extension.
    pub async fn upload_submission_file(
        &self,
        uuid: Uuid,
        path: impl AsRef<Path>,
    ) -> Result<ApiResponse<Image>, ApiError> {
        let path = path.as_ref();
        let content_type = mime_guess::from_path(path).first_or_octet_stream();
        let bytes = tokio::fs::read(path).await?;
        debug!(path = %path.display(), content_type = %content_type, size = bytes.len(), "uploading submission file");
        self.put_submission_file(uuid, content_type.essence_str(), bytes)
            .await
    }
}
