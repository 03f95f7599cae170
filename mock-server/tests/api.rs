use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, ErrorEntry, AMBIGUOUS_URI, DATA_MEDIA_TYPE, HUMAN_NODE, HUMAN_URI, ROOT_NODE};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

const IMAGE: Uuid = Uuid::from_u128(100);
const CC_BY: &str = "https://creativecommons.org/licenses/by/4.0/";

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn header<'a>(response: &'a axum::response::Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

fn get(uri: &str) -> http::request::Builder {
    Request::builder().method("GET").uri(uri)
}

fn signed(method: &str, uri: &str) -> http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, "Bearer test-token")
        .header(http::header::CONTENT_TYPE, DATA_MEDIA_TYPE)
}

fn post_body() -> String {
    format!(r#"{{"license":"{CC_BY}","specificNode":"{HUMAN_NODE}","attribution":"A. Artist"}}"#)
}

/// Runs a sequence of requests against one router instance.
async fn send_all(requests: Vec<Request<String>>) -> Vec<axum::response::Response> {
    let router = app();
    let mut responses = Vec::new();
    for request in requests {
        responses.push(router.clone().oneshot(request).await.unwrap());
    }
    responses
}

// --- read-only ---

#[tokio::test]
async fn ping_returns_no_content() {
    let resp = app()
        .oneshot(get("/ping").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn root_links_to_root_node() {
    let resp = app()
        .oneshot(get("/").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "content-type"), Some(DATA_MEDIA_TYPE));
    assert!(header(&resp, "etag").is_some());
    let root: Value = body_json(resp).await;
    assert_eq!(root["_links"]["rootNode"]["href"], format!("/nodes/{ROOT_NODE}"));
}

#[tokio::test]
async fn licenses_honor_if_none_match() {
    let resp = app()
        .oneshot(get("/licenses").body(String::new()).unwrap())
        .await
        .unwrap();
    let e_tag = header(&resp, "etag").unwrap().to_string();
    let licenses: Vec<Value> = body_json(resp).await;
    assert_eq!(licenses.len(), 2);

    let resp = app()
        .oneshot(
            get("/licenses")
                .header(http::header::IF_NONE_MATCH, &e_tag)
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(header(&resp, "etag"), Some(e_tag.as_str()));
}

#[tokio::test]
async fn unknown_node_is_structured_404() {
    let resp = app()
        .oneshot(get(&format!("/nodes/{}", Uuid::from_u128(99))).body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(header(&resp, "content-type"), Some(DATA_MEDIA_TYPE));
    let errors: Vec<ErrorEntry> = body_json(resp).await;
    assert_eq!(errors[0].kind, "RESOURCE_NOT_FOUND");
}

#[tokio::test]
async fn root_node_redirects() {
    let resp = app()
        .oneshot(get("/rootnode").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(header(&resp, "location"), Some(format!("/nodes/{ROOT_NODE}").as_str()));
}

#[tokio::test]
async fn resolve_unique_uri_redirects() {
    let uri = format!("/resolve?uri={HUMAN_URI}");
    let resp = app()
        .oneshot(get(&uri).body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(header(&resp, "location"), Some(format!("/nodes/{HUMAN_NODE}").as_str()));
}

#[tokio::test]
async fn resolve_ambiguous_uri_lists_choices() {
    let uri = format!("/resolve?uri={AMBIGUOUS_URI}");
    let resp = app()
        .oneshot(get(&uri).body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["_embedded"]["choices"].as_array().unwrap().len(), 2);
}

// --- listing ---

#[tokio::test]
async fn list_requires_range() {
    let resp = app()
        .oneshot(get("/images").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let errors: Vec<ErrorEntry> = body_json(resp).await;
    assert_eq!(errors[0].field.as_deref(), Some("Range"));
}

#[tokio::test]
async fn empty_list_reports_unknown_range() {
    let resp = app()
        .oneshot(
            get("/images")
                .header(http::header::RANGE, "items=0-9")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "content-range"), Some("items */0"));
    let page: Value = body_json(resp).await;
    assert_eq!(page["totalItems"], 0);
}

#[tokio::test]
async fn list_reports_served_slice() {
    let responses = send_all(vec![
        signed("POST", &format!("/images/{IMAGE}")).body(post_body()).unwrap(),
        signed("POST", &format!("/images/{}", Uuid::from_u128(101))).body(post_body()).unwrap(),
        get("/images")
            .header(http::header::RANGE, "items=1-5")
            .body(String::new())
            .unwrap(),
    ])
    .await;
    let page = responses.into_iter().last().unwrap();
    assert_eq!(header(&page, "content-range"), Some("items 1-1/2"));
    let body: Value = body_json(page).await;
    assert_eq!(body["_embedded"]["items"][0]["uuid"], Uuid::from_u128(101).to_string());
}

// --- mutations ---

#[tokio::test]
async fn create_requires_bearer() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/images/{IMAGE}"))
                .header(http::header::CONTENT_TYPE, DATA_MEDIA_TYPE)
                .body(post_body())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let errors: Vec<ErrorEntry> = body_json(resp).await;
    assert_eq!(errors[0].kind, "MISSING_AUTHENTICATION_TOKEN");
}

#[tokio::test]
async fn create_rejects_unknown_node() {
    let body = format!(r#"{{"license":"{CC_BY}","specificNode":"{}"}}"#, Uuid::from_u128(99));
    let resp = app()
        .oneshot(signed("POST", &format!("/images/{IMAGE}")).body(body).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let errors: Vec<ErrorEntry> = body_json(resp).await;
    assert_eq!(errors[0].field.as_deref(), Some("specificNode"));
}

#[tokio::test]
async fn duplicate_create_redirects() {
    let path = format!("/images/{IMAGE}");
    let responses = send_all(vec![
        signed("POST", &path).body(post_body()).unwrap(),
        signed("POST", &path).body(post_body()).unwrap(),
    ])
    .await;
    assert_eq!(responses[0].status(), StatusCode::CREATED);
    assert_eq!(header(&responses[0], "etag"), Some("\"v1\""));
    assert_eq!(responses[1].status(), StatusCode::SEE_OTHER);
    assert_eq!(header(&responses[1], "location"), Some(path.as_str()));
}

#[tokio::test]
async fn update_checks_if_match_and_bumps_version() {
    let path = format!("/images/{IMAGE}");
    let patch = r#"{"attribution":"B. Artist"}"#;
    let responses = send_all(vec![
        signed("POST", &path).body(post_body()).unwrap(),
        signed("PATCH", &path)
            .header(http::header::IF_MATCH, "\"v0\"")
            .body(patch.to_string())
            .unwrap(),
        signed("PATCH", &path)
            .header(http::header::IF_MATCH, "\"v1\"")
            .body(patch.to_string())
            .unwrap(),
    ])
    .await;
    let mut responses = responses.into_iter();
    responses.next();
    let stale = responses.next().unwrap();
    assert_eq!(stale.status(), StatusCode::PRECONDITION_FAILED);
    let fresh = responses.next().unwrap();
    assert_eq!(fresh.status(), StatusCode::OK);
    assert_eq!(header(&fresh, "etag"), Some("\"v2\""));
    let image: Value = body_json(fresh).await;
    assert_eq!(image["attribution"], "B. Artist");
}

#[tokio::test]
async fn get_image_honors_if_none_match() {
    let path = format!("/images/{IMAGE}");
    let responses = send_all(vec![
        signed("POST", &path).body(post_body()).unwrap(),
        get(&path)
            .header(http::header::IF_NONE_MATCH, "\"v1\"")
            .body(String::new())
            .unwrap(),
        get(&path)
            .header(http::header::IF_NONE_MATCH, "\"v0\"")
            .body(String::new())
            .unwrap(),
    ])
    .await;
    assert_eq!(responses[1].status(), StatusCode::NOT_MODIFIED);
    assert_eq!(responses[2].status(), StatusCode::OK);
}

#[tokio::test]
async fn delete_then_get_is_404() {
    let path = format!("/images/{IMAGE}");
    let responses = send_all(vec![
        signed("POST", &path).body(post_body()).unwrap(),
        signed("DELETE", &path)
            .header(http::header::IF_MATCH, "\"v1\"")
            .body(String::new())
            .unwrap(),
        get(&path).body(String::new()).unwrap(),
        signed("DELETE", &path)
            .header(http::header::IF_MATCH, "\"v1\"")
            .body(String::new())
            .unwrap(),
    ])
    .await;
    assert_eq!(responses[1].status(), StatusCode::NO_CONTENT);
    assert_eq!(responses[2].status(), StatusCode::NOT_FOUND);
    assert_eq!(responses[3].status(), StatusCode::NOT_FOUND);
}
