//! Test execution: issue one resolved request, time it, and classify the outcome.
//!
//! Every call produces a well-formed [`TestResult`]. Transport failures (DNS, refused
//! connections, timeouts, unreadable bodies) are reported *as data* (`success = false`,
//! `status = 0`, `error` set) rather than returned as errors. Any HTTP response, including 4xx
//! and 5xx, counts as `success = true`.

use crate::error::{RegistryError, TransportError};
use crate::model::{HeaderList, ResolvedRequest, TestResult};
use crate::safety::{ExecutionLimits, classify_reqwest_error, redact_url};
use base64::Engine as _;
use mime::Mime;
use reqwest::Client;
use reqwest::header::HeaderMap;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinError;
use tracing::{info, warn};
use url::Url;

#[derive(Clone)]
pub struct TestExecutor {
    inner: Arc<ExecutorInner>,
}

struct ExecutorInner {
    client: Client,
    limits: ExecutionLimits,
}

struct RawResponse {
    status: u16,
    headers: HeaderList,
    body_text: String,
}

impl TestExecutor {
    /// Executor with the default limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self, RegistryError> {
        Self::with_limits(ExecutionLimits::default())
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built for the requested limits.
    pub fn with_limits(limits: ExecutionLimits) -> Result<Self, RegistryError> {
        let client = limits
            .build_client()
            .map_err(|e| RegistryError::Config(e.to_string()))?;
        Ok(Self {
            inner: Arc::new(ExecutorInner { client, limits }),
        })
    }

    #[must_use]
    pub fn limits(&self) -> &ExecutionLimits {
        &self.inner.limits
    }

    /// Execute a request. A zero `timeout` disables the deadline.
    ///
    /// On timeout the in-flight request is aborted and the result carries `error = "timeout"`.
    pub async fn execute(&self, req: &ResolvedRequest, timeout: Duration) -> TestResult {
        let started = Instant::now();
        let outcome = self.run(req, timeout).await;
        let response_time_ms = elapsed_ms(started);

        match outcome {
            Ok(raw) => {
                info!(
                    method = %req.method,
                    url = %display_url(&req.url),
                    status = raw.status,
                    response_time_ms,
                    "test request completed"
                );
                TestResult {
                    success: true,
                    url: req.url.clone(),
                    method: req.method.as_str().to_string(),
                    headers: raw.headers,
                    status: raw.status,
                    body_text: raw.body_text,
                    response_time_ms,
                    error: None,
                    curl_equivalent: None,
                }
            }
            Err(e) => {
                warn!(
                    method = %req.method,
                    url = %display_url(&req.url),
                    error = %e,
                    response_time_ms,
                    "test request failed"
                );
                TestResult::failure(req, response_time_ms, e.to_string())
            }
        }
    }

    /// Equivalent cURL command for a request.
    #[must_use]
    pub fn to_curl(req: &ResolvedRequest) -> String {
        crate::curl::to_curl(req)
    }

    async fn run(
        &self,
        req: &ResolvedRequest,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        let task = tokio::spawn(send(Arc::clone(&self.inner), req.clone(), timeout));
        if timeout.is_zero() {
            return flatten_join(task.await);
        }

        let abort = task.abort_handle();
        if let Ok(joined) = tokio::time::timeout(timeout, task).await {
            flatten_join(joined)
        } else {
            abort.abort();
            Err(TransportError::Timeout)
        }
    }
}

fn flatten_join(
    joined: Result<Result<RawResponse, TransportError>, JoinError>,
) -> Result<RawResponse, TransportError> {
    match joined {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "request task ended without a response");
            Err(TransportError::NoResponse)
        }
    }
}

async fn send(
    inner: Arc<ExecutorInner>,
    req: ResolvedRequest,
    timeout: Duration,
) -> Result<RawResponse, TransportError> {
    let url = Url::parse(&req.url)
        .map_err(|e| TransportError::InvalidRequest(format!("invalid URL: {e}")))?;

    let mut request = inner.client.request(req.method.clone(), url);
    for (name, value) in req.headers.iter() {
        request = request.header(name, value);
    }
    if let Some(body) = req.body {
        request = request.body(body);
    }
    if !timeout.is_zero() {
        request = request.timeout(timeout);
    }

    let response = request
        .send()
        .await
        .map_err(|e| classify_reqwest_error(&e))?;

    let status = response.status().as_u16();
    let headers = response_headers(response.headers());
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = read_body_limited(response, inner.limits.max_response_bytes).await?;

    Ok(RawResponse {
        status,
        headers,
        body_text: bytes_to_text(&bytes, content_type.as_deref()),
    })
}

async fn read_body_limited(
    mut response: reqwest::Response,
    max_bytes: Option<usize>,
) -> Result<Vec<u8>, TransportError> {
    let Some(max) = max_bytes else {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        return Ok(bytes.to_vec());
    };

    if let Some(len) = response.content_length()
        && len > max as u64
    {
        return Err(TransportError::ResponseTooLarge(format!(
            "{len} bytes (limit {max})"
        )));
    }

    let mut out: Vec<u8> = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| classify_reqwest_error(&e))?
    {
        if out.len().saturating_add(chunk.len()) > max {
            return Err(TransportError::ResponseTooLarge(format!(
                "exceeded {max} bytes"
            )));
        }
        out.extend_from_slice(&chunk);
    }

    Ok(out)
}

/// Response headers as an ordered list; repeated headers are joined with `", "`.
fn response_headers(map: &HeaderMap) -> HeaderList {
    let mut out = HeaderList::new();
    for (name, value) in map {
        let value = String::from_utf8_lossy(value.as_bytes());
        let merged = out
            .get(name.as_str())
            .map(|existing| format!("{existing}, {value}"));
        out.set(name.as_str(), merged.unwrap_or_else(|| value.into_owned()));
    }
    out
}

fn is_binary_content_type(content_type: Option<&str>) -> bool {
    let Some(m) = content_type.and_then(|ct| ct.parse::<Mime>().ok()) else {
        return false;
    };
    m.type_() == mime::IMAGE
        || m.type_() == mime::AUDIO
        || m.type_() == mime::VIDEO
        || m.essence_str() == mime::APPLICATION_OCTET_STREAM.essence_str()
}

/// UTF-8 bodies pass through; anything else becomes a base64 JSON envelope.
fn bytes_to_text(bytes: &[u8], content_type: Option<&str>) -> String {
    if !is_binary_content_type(content_type)
        && let Ok(s) = std::str::from_utf8(bytes)
    {
        return s.to_string();
    }
    let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
    json!({
        "encoding": "base64",
        "mimeType": content_type,
        "data": b64
    })
    .to_string()
}

fn display_url(raw: &str) -> String {
    Url::parse(raw).map_or_else(|_| "<invalid url>".to_string(), |u| redact_url(&u))
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
