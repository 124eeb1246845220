//! HTTP transport for chat-completion requests.
//!
//! [`Transport`] is the seam between a [`ChatSession`](crate::ChatSession) and the network: it
//! takes a fully resolved endpoint, a credential and a request body, and hands back the raw
//! response body as a byte stream.  [`HttpTransport`] is the `reqwest` implementation.

use std::pin::Pin;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::Stream;
use futures::stream::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CHAT_REQUEST_DURATION, CHAT_REQUEST_ERRORS, CHAT_REQUESTS};
use crate::types::{ChatCompletionRequest, Provider};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// A response body, chunk by chunk.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Opens streaming chat-completion requests.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// POST `request` to `url` with `api_key` as the bearer credential.
    ///
    /// Returns the response body once a success status has been received.  A non-success
    /// status is reported as [`Error::RequestFailed`].
    async fn open_stream(
        &self,
        url: &Url,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<ByteStream>;
}

/// [`Transport`] over `reqwest`.
///
/// Only connection establishment is bounded; a response stream may stay open as long as the
/// server keeps it open.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
}

impl HttpTransport {
    /// Create a transport with the default connect timeout.
    pub fn new() -> Result<Self> {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a transport with a custom connect timeout.
    pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self> {
        let client = ReqwestClient::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;
        Ok(Self { client })
    }

    /// Wrap an existing `reqwest` client.
    pub fn with_client(client: ReqwestClient) -> Self {
        Self { client }
    }

    /// Check `api_key` against the provider's account endpoint.
    ///
    /// Succeeds when the provider accepts the credential.
    pub async fn verify_credentials(&self, provider: Provider, api_key: &str) -> Result<()> {
        let url = provider.user_info_url()?;
        let response = self
            .client
            .get(url)
            .headers(auth_headers(api_key)?)
            .send()
            .await
            .map_err(map_send_error)?;
        if !response.status().is_success() {
            return Err(process_error_response(response).await);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn open_stream(
        &self,
        url: &Url,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<ByteStream> {
        let mut headers = auth_headers(api_key)?;
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );

        CHAT_REQUESTS.click();
        let start = Instant::now();
        let response = self
            .client
            .post(url.clone())
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                CHAT_REQUEST_ERRORS.click();
                map_send_error(e)
            })?;
        CHAT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        if !response.status().is_success() {
            CHAT_REQUEST_ERRORS.click();
            return Err(process_error_response(response).await);
        }

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::stream_interrupted(format!("Error in HTTP stream: {e}"), Some(Box::new(e)))
            })
        });
        Ok(Box::pin(stream))
    }
}

/// Headers common to every provider request.
fn auth_headers(api_key: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| {
        Error::validation(
            "API key contains characters not allowed in a header",
            Some("apiKey".to_string()),
        )
    })?;
    bearer.set_sensitive(true);
    headers.insert(header::AUTHORIZATION, bearer);
    Ok(headers)
}

fn map_send_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::timeout(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
    } else {
        Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
    }
}

/// Read a failed response and convert it to [`Error::RequestFailed`].
async fn process_error_response(response: Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    error_from_parts(status, &body)
}

pub(crate) fn error_from_parts(status: StatusCode, body: &str) -> Error {
    #[derive(Deserialize)]
    struct ErrorResponse {
        error: Option<ErrorDetail>,
        message: Option<String>,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ErrorDetail {
        Object { message: Option<String> },
        Text(String),
    }

    let parsed = serde_json::from_str::<ErrorResponse>(body).ok();
    let message = parsed
        .and_then(|e| match e.error {
            Some(ErrorDetail::Object { message }) => message,
            Some(ErrorDetail::Text(text)) => Some(text),
            None => e.message,
        })
        .or_else(|| {
            let body = body.trim();
            (!body.is_empty()).then(|| body.to_string())
        });

    Error::request_failed(
        status.as_u16(),
        status.canonical_reason().unwrap_or_default(),
        message,
    )
}
