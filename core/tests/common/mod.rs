//! Transports shared across the integration test files.
//!
//! Not every test file uses every helper, hence the module-level allow.
#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use axum::body::Body;
use axum::Router;
use http_body_util::BodyExt;
use phylopic_client::{
    ClientConfig, HttpRequest, HttpResponse, PhyloPicClient, RedirectPolicy, Transport,
    TransportError,
};
use tower::ServiceExt;

pub const BASE_URL: &str = "http://catalog.test/";

// ===== Recording Transport =====

/// Answers every request with the same response and remembers what was sent.
pub struct RecordingTransport {
    reply: HttpResponse,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingTransport {
    pub fn replying(reply: HttpResponse) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers 500; tests use it to check that nothing was dispatched.
    pub fn silent() -> Self {
        Self::replying(HttpResponse {
            status: 500,
            headers: Vec::new(),
            body: Vec::new(),
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        Ok(self.reply.clone())
    }
}

// ===== In-Process Router Transport =====

/// Drives an axum router directly, without sockets.
///
/// Honors `RedirectPolicy::Follow` the way a browser fetch would, re-issuing
/// a GET for up to five hops; other policies return the 3xx as is.
pub struct RouterTransport {
    router: Router,
}

impl RouterTransport {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    async fn round_trip(
        &self,
        method: &str,
        url: &str,
        headers: &[(String, String)],
        body: Vec<u8>,
    ) -> Result<HttpResponse, TransportError> {
        let mut builder = axum::http::Request::builder().method(method).uri(url);
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let request = builder.body(Body::from(body))?;
        let response = self.router.clone().oneshot(request).await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.into_body().collect().await?.to_bytes().to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Transport for RouterTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut response = self
            .round_trip(
                request.method.as_str(),
                &request.url,
                &request.headers,
                request.body.clone().unwrap_or_default(),
            )
            .await?;
        if request.redirect != RedirectPolicy::Follow {
            return Ok(response);
        }
        for _ in 0..5 {
            if !response.is_redirect() {
                break;
            }
            let Some(location) = response.header("location").map(str::to_string) else {
                break;
            };
            let url = ClientConfig::new(BASE_URL).resolve_location(&location);
            response = self
                .round_trip("GET", &url, &request.headers, Vec::new())
                .await?;
        }
        Ok(response)
    }
}

/// A client talking to a fresh in-process mock catalog.
pub fn mock_client() -> PhyloPicClient<RouterTransport> {
    PhyloPicClient::new(
        RouterTransport::new(mock_server::app()),
        ClientConfig::new(BASE_URL),
    )
}
