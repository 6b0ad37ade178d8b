//! Request executor: one HTTP exchange in, one [`ResponseEnvelope`] out.
//!
//! Every failure mode is folded into the envelope. Requests that never got a
//! response (connect errors, timeouts, requests that could not be built)
//! resolve to a failure with [`xiaoli_shared::NO_RESPONSE_STATUS`]; replies with a non-2xx
//! status or a body that does not decode resolve to a failure carrying the
//! HTTP status.

use std::{collections::BTreeMap, fmt, sync::Arc, time::Duration};

use bytes::Bytes;
use futures::StreamExt;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE},
    multipart::{Form, Part},
    Method, RequestBuilder,
};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::Value;
use thiserror::Error;
use tokio::time::Instant;
use url::Url;
use xiaoli_shared::{ResponseEnvelope, GENERIC_ERROR_MESSAGE};

use crate::{
    config::ClientConfig,
    progress::{ProgressReporter, UploadObserver},
};

/// Size of the chunks an observed upload body is streamed in.
pub const UPLOAD_CHUNK_SIZE: usize = 16 * 1024;

/// Methods the executor issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `PATCH`
    Patch,
}

impl HttpMethod {
    fn to_reqwest(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
            Self::Put => Method::PUT,
            Self::Delete => Method::DELETE,
            Self::Patch => Method::PATCH,
        }
    }

    /// Whether a request body is sent for this method.
    pub fn allows_body(self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_reqwest().as_str())
    }
}

/// A file sent as `multipart/form-data`.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    /// Form field name.
    pub field_name: String,
    /// File name reported to the server.
    pub file_name: String,
    /// MIME type of the content.
    pub mime_type: String,
    /// File content.
    pub content: Bytes,
}

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// `application/json`
    Json(Value),
    /// Raw bytes with an explicit content type.
    Bytes {
        /// Payload.
        content: Bytes,
        /// `Content-Type` header value.
        content_type: String,
    },
    /// Single-file multipart upload.
    File(FileUpload),
}

/// Per-request options.
#[derive(Clone, Default)]
pub struct RequestOptions {
    /// Headers merged over the client defaults.
    pub headers: BTreeMap<String, String>,
    /// Query parameters.
    pub params: BTreeMap<String, Value>,
    /// Body, ignored for `GET`.
    pub data: Option<RequestBody>,
    /// Deadline for the whole exchange; the client default when `None`.
    pub timeout: Option<Duration>,
    /// Receives progress while the body is sent.
    pub upload_progress: Option<Arc<dyn UploadObserver>>,
}

impl RequestOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set one query parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Send `body` as JSON.
    pub fn json(mut self, body: Value) -> Self {
        self.data = Some(RequestBody::Json(body));
        self
    }

    /// Send an arbitrary body.
    pub fn body(mut self, body: RequestBody) -> Self {
        self.data = Some(body);
        self
    }

    /// Override the deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Observe upload progress.
    pub fn on_upload_progress(mut self, observer: Arc<dyn UploadObserver>) -> Self {
        self.upload_progress = Some(observer);
        self
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field("data", &self.data)
            .field("timeout", &self.timeout)
            .field("upload_progress", &self.upload_progress.is_some())
            .finish()
    }
}

#[derive(Debug, Error)]
enum ExchangeError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

/// HTTP client bound to one backend.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl HttpClient {
    /// Build a client for `config`.
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent())
            .build()?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    /// Settings this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `GET path`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> ResponseEnvelope<T> {
        self.execute(HttpMethod::Get, path, options).await
    }

    /// `POST path`.
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> ResponseEnvelope<T> {
        self.execute(HttpMethod::Post, path, options).await
    }

    /// Issue one request and normalize whatever happens into an envelope.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> ResponseEnvelope<T> {
        let started_at = Instant::now();
        let timeout = options.timeout.unwrap_or(self.config.request_timeout());

        let (request, reporter) = match self.build_request(method, path, options) {
            Ok(built) => built,
            Err(err) => {
                tracing::warn!(%method, path, error = %err, "request not sent");
                return ResponseEnvelope::no_response(err.to_string());
            },
        };

        tracing::debug!(%method, path, timeout_ms = timeout.as_millis(), "sending request");
        let outcome = tokio::time::timeout(timeout, exchange::<T>(request)).await;
        if let Some(reporter) = &reporter {
            reporter.close();
        }

        let envelope = match outcome {
            Ok(Ok(envelope)) => envelope,
            Ok(Err(err)) => ResponseEnvelope::no_response(err.to_string()),
            Err(_) => ResponseEnvelope::no_response(ExchangeError::Timeout(timeout).to_string()),
        };

        let elapsed_ms = started_at.elapsed().as_millis();
        match envelope.error() {
            Some(error) => tracing::warn!(
                %method,
                path,
                status = envelope.status(),
                elapsed_ms,
                error,
                "request failed"
            ),
            None => tracing::debug!(
                %method,
                path,
                status = envelope.status(),
                elapsed_ms,
                "request completed"
            ),
        }
        envelope
    }

    fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> Result<(RequestBuilder, Option<Arc<ProgressReporter>>), ExchangeError> {
        let mut url = self
            .config
            .endpoint_url(path)
            .map_err(|err| ExchangeError::InvalidRequest(format!("bad path `{path}`: {err}")))?;
        append_query(&mut url, &options.params);

        let headers = merge_headers(self.config.default_headers(), &options.headers)?;
        let mut request = self
            .client
            .request(method.to_reqwest(), url)
            .headers(headers);

        let mut reporter = None;
        match options.data {
            Some(body) if method.allows_body() => {
                let (with_body, body_reporter) =
                    attach_body(request, body, options.upload_progress)?;
                request = with_body;
                reporter = body_reporter;
            },
            Some(_) => tracing::debug!(%method, path, "ignoring request body"),
            None => {},
        }
        Ok((request, reporter))
    }
}

async fn exchange<T: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<ResponseEnvelope<T>, ExchangeError> {
    let response = request.send().await.map_err(ExchangeError::Network)?;
    let status = response.status().as_u16();
    let body = response.bytes().await.map_err(ExchangeError::Network)?;
    Ok(normalize_reply(status, &body))
}

/// Fold an HTTP status and raw body into an envelope.
pub fn normalize_reply<T: DeserializeOwned>(status: u16, body: &[u8]) -> ResponseEnvelope<T> {
    if (200..300).contains(&status) {
        if body.iter().all(u8::is_ascii_whitespace) {
            return ResponseEnvelope::success(status, String::new(), None);
        }
        return match serde_json::from_slice::<ResponseEnvelope<T>>(body) {
            Ok(envelope) => envelope.normalized(),
            Err(err) => {
                tracing::debug!(status, error = %err, "response body does not match envelope");
                ResponseEnvelope::failure(status, GENERIC_ERROR_MESSAGE)
            },
        };
    }

    match serde_json::from_slice::<ResponseEnvelope<IgnoredAny>>(body) {
        Ok(ResponseEnvelope::Failure {
            error, ..
        }) => ResponseEnvelope::failure(status, error),
        _ => ResponseEnvelope::failure(status, format!("HTTP error: {status}")),
    }
}

fn append_query(url: &mut Url, params: &BTreeMap<String, Value>) {
    let mut pairs = Vec::new();
    for (name, value) in params {
        flatten_param(name, value, &mut pairs);
    }
    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }
}

fn flatten_param(name: &str, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {},
        Value::String(text) => pairs.push((name.to_string(), text.clone())),
        Value::Bool(_) | Value::Number(_) | Value::Object(_) => {
            pairs.push((name.to_string(), value.to_string()))
        },
        Value::Array(items) => {
            for item in items {
                flatten_param(name, item, pairs);
            }
        },
    }
}

fn merge_headers(
    defaults: &BTreeMap<String, String>,
    overrides: &BTreeMap<String, String>,
) -> Result<HeaderMap, ExchangeError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    for (name, value) in defaults.iter().chain(overrides) {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| ExchangeError::InvalidRequest(format!("header `{name}`: {err}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| ExchangeError::InvalidRequest(format!("header `{name}`: {err}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn attach_body(
    request: RequestBuilder,
    body: RequestBody,
    observer: Option<Arc<dyn UploadObserver>>,
) -> Result<(RequestBuilder, Option<Arc<ProgressReporter>>), ExchangeError> {
    match body {
        RequestBody::Json(value) => {
            let content = serde_json::to_vec(&value)
                .map_err(|err| ExchangeError::InvalidRequest(err.to_string()))?;
            Ok(raw_body(request, Bytes::from(content), "application/json", observer))
        },
        RequestBody::Bytes {
            content,
            content_type,
        } => Ok(raw_body(request, content, &content_type, observer)),
        RequestBody::File(upload) => {
            let length = upload.content.len() as u64;
            let (part, reporter) = match observer {
                Some(observer) => {
                    let reporter = Arc::new(ProgressReporter::new(observer, Some(length)));
                    let body = progress_body(upload.content, reporter.clone());
                    (Part::stream_with_length(body, length), Some(reporter))
                },
                None => (Part::bytes(upload.content.to_vec()), None),
            };
            let part = part
                .file_name(upload.file_name)
                .mime_str(&upload.mime_type)
                .map_err(|err| ExchangeError::InvalidRequest(format!("mime type: {err}")))?;
            let form = Form::new().part(upload.field_name, part);
            Ok((request.multipart(form), reporter))
        },
    }
}

fn raw_body(
    request: RequestBuilder,
    content: Bytes,
    content_type: &str,
    observer: Option<Arc<dyn UploadObserver>>,
) -> (RequestBuilder, Option<Arc<ProgressReporter>>) {
    let request = request.header(CONTENT_TYPE, content_type);
    match observer {
        Some(observer) => {
            let reporter =
                Arc::new(ProgressReporter::new(observer, Some(content.len() as u64)));
            let body = progress_body(content, reporter.clone());
            (request.body(body), Some(reporter))
        },
        None => (request.body(content), None),
    }
}

fn progress_body(content: Bytes, reporter: Arc<ProgressReporter>) -> reqwest::Body {
    let chunks = (0..content.len())
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(|start| content.slice(start..(start + UPLOAD_CHUNK_SIZE).min(content.len())))
        .collect::<Vec<_>>();
    let stream = futures::stream::iter(chunks).map(move |chunk| {
        reporter.advance(chunk.len() as u64);
        Ok::<Bytes, std::io::Error>(chunk)
    });
    reqwest::Body::wrap_stream(stream)
}
