use hyper::client::HttpConnector;
use hyper::header::{HeaderName, HeaderValue, AUTHORIZATION, USER_AGENT};
use hyper::{Body as HyperBody, Client, HeaderMap, Method, Request, StatusCode, Uri};
use hyper_tls::HttpsConnector;
use crate::error::{LoadError, Result};
use crate::models::dsl_model::{ApiKeyLocation, Auth, RunConfig};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::time::Duration;
use thiserror::Error;

pub type HttpsClient = Client<HttpsConnector<HttpConnector>>;

pub fn build_client() -> HttpsClient {
    let https = HttpsConnector::new();
    Client::builder().build::<_, HyperBody>(https)
}

/// Why a request produced no status code.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("connection refused or host unreachable: {0}")]
    Connect(#[source] hyper::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection closed unexpectedly: {0}")]
    Closed(#[source] hyper::Error),
    #[error("network error: {0}")]
    Other(#[source] hyper::Error),
}

impl RequestError {
    /// Label used in the status breakdown.
    pub fn label(&self) -> &'static str {
        match self {
            RequestError::Connect(_) => "CONNECTION_ERROR",
            RequestError::Timeout(_) => "TIMEOUT",
            RequestError::Closed(_) => "CONNECTION_CLOSED",
            RequestError::Other(_) => "REQUEST_ERROR",
        }
    }

    fn classify(e: hyper::Error) -> Self {
        if e.is_connect() {
            RequestError::Connect(e)
        } else if e.is_closed() || e.is_incomplete_message() {
            RequestError::Closed(e)
        } else {
            RequestError::Other(e)
        }
    }
}

/// A fully resolved GET: the URL and headers are worked out once per run,
/// every iteration only clones them into a fresh request.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    uri: Uri,
    headers: HeaderMap,
    timeout: Duration,
}

impl PreparedRequest {
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let mut url = config.target_url()?;

        if let Some(params) = config.query_params.as_ref().filter(|p| !p.is_empty()) {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params.iter() {
                pairs.append_pair(key, value);
            }
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("loadforge-runner/", env!("CARGO_PKG_VERSION"))),
        );

        if let Some(extra) = &config.headers {
            for (name, value) in extra {
                headers.insert(header_name(name)?, header_value(value)?);
            }
        }

        match &config.auth {
            Some(Auth::Basic { username, password }) => {
                let encoded = BASE64.encode(format!("{}:{}", username, password));
                headers.insert(AUTHORIZATION, header_value(&format!("Basic {}", encoded))?);
            }
            Some(Auth::Bearer { token }) => {
                headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", token))?);
            }
            Some(Auth::ApiKey { key_name, key_value, add_to: ApiKeyLocation::Header }) => {
                headers.insert(header_name(key_name)?, header_value(key_value)?);
            }
            Some(Auth::ApiKey { key_name, key_value, add_to: ApiKeyLocation::Query }) => {
                url.query_pairs_mut().append_pair(key_name, key_value);
            }
            Some(Auth::None) | None => {}
        }

        let uri: Uri = url
            .as_str()
            .parse::<Uri>()
            .map_err(|e| LoadError::InvalidConfig(format!("target '{}': {}", config.target, e)))?;

        Ok(Self {
            uri,
            headers,
            timeout: config.request_timeout(),
        })
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn build(&self) -> Request<HyperBody> {
        let mut request = Request::new(HyperBody::empty());
        *request.method_mut() = Method::GET;
        *request.uri_mut() = self.uri.clone();
        *request.headers_mut() = self.headers.clone();
        request
    }
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| LoadError::InvalidConfig(format!("header name '{}': {}", name, e)))
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| LoadError::InvalidConfig(format!("invalid header value: {}", e)))
}

/// Status and drained body size of a completed response.
#[derive(Debug, Clone, Copy)]
pub struct Response {
    pub status: StatusCode,
    pub bytes: u64,
}

/// Issues one GET and drains the body so the connection goes back to the pool.
pub async fn send_request(
    client: &HttpsClient,
    prepared: &PreparedRequest,
) -> std::result::Result<Response, RequestError> {
    let request = prepared.build();

    let exchange = async {
        let response = client.request(request).await.map_err(RequestError::classify)?;
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body())
            .await
            .map_err(RequestError::classify)?;
        Ok(Response {
            status,
            bytes: body.len() as u64,
        })
    };

    match tokio::time::timeout(prepared.timeout, exchange).await {
        Ok(result) => result,
        Err(_) => Err(RequestError::Timeout(prepared.timeout)),
    }
}
