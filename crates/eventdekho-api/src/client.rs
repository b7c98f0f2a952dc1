// REST client for the EventDekho backend
//
// Wraps `reqwest::Client` with base-URL joining, cookie credentials,
// query parameter encoding, and `{ message }` error-body extraction.
// Payloads are opaque `serde_json::Value`s; callers that want typed
// data deserialize through the generic helpers.

use reqwest::Method;
use reqwest::header::{ACCEPT, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::base_url;
use crate::error::Error;
use crate::sse::SseStream;
use crate::transport::TransportConfig;

/// Error body shape returned by the backend.
#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Query parameters as ordered key/value pairs.
pub type Query = [(String, String)];

/// Async client for the backend's REST surface.
///
/// Every request is resolved relative to `base_url` and carries the
/// session cookies held by the transport's jar.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client from a base URL and transport config.
    pub fn new(base_url: &Url, transport: &TransportConfig) -> Result<Self, Error> {
        let base_url = base_url::normalize(base_url.as_str())?;
        let http = transport.build_client(&base_url)?;
        Ok(Self { http, base_url })
    }

    /// Wrap an existing `reqwest::Client` (caller manages cookies).
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, Error> {
        let base_url = base_url::normalize(base_url)?;
        Ok(Self { http, base_url })
    }

    /// The resolved backend base URL (always ends in `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join an endpoint path (e.g. `"/events/42"`) onto the base URL.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    /// Issue a request and return the decoded JSON body.
    ///
    /// Empty success bodies decode to `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        params: &Query,
    ) -> Result<Value, Error> {
        self.request_as(method, path, body, params).await
    }

    /// Typed variant of [`request`](Self::request).
    pub async fn request_as<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        params: &Query,
    ) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let url = self.url(path)?;
        debug!(%method, %url, ?params, "sending request");

        let mut builder = self.http.request(method, url);
        if !params.is_empty() {
            builder = builder.query(params);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        self.handle_response(resp).await
    }

    pub async fn get(&self, path: &str, params: &Query) -> Result<Value, Error> {
        self.request(Method::GET, path, None, params).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, Error> {
        self.request(Method::POST, path, Some(body), &[]).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, Error> {
        self.request(Method::PUT, path, Some(body), &[]).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value, Error> {
        self.request(Method::PATCH, path, Some(body), &[]).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, Error> {
        self.request(Method::DELETE, path, None, &[]).await
    }

    // ── Server push ──────────────────────────────────────────────────

    /// Open a server-sent event stream at `path`.
    pub async fn open_stream(&self, path: &str) -> Result<SseStream, Error> {
        let url = self.url(path)?;
        debug!(%url, "opening event stream");

        let resp = self
            .http
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(parse_error(status, resp).await);
        }
        Ok(SseStream::from_response(resp))
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if !status.is_success() {
            return Err(parse_error(status, resp).await);
        }

        let body = resp.text().await?;
        trace!(status = status.as_u16(), len = body.len(), "response body received");

        let text = if body.trim().is_empty() { "null" } else { &body };
        serde_json::from_str(text).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }
}

/// Build an `Error::Http`, preferring the body's `message` field.
async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|e| e.message.or(e.error))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_owned)
        });

    debug!(status = status.as_u16(), %message, "request failed");
    Error::Http {
        status: status.as_u16(),
        message,
        body,
    }
}
