//! eventdekho-api: async HTTP adapter for the EventDekho backend.
//!
//! - [`ApiClient`] — verb helpers over `reqwest` with cookie credentials
//!   and `{ message }` error extraction.
//! - [`resolve_base_url`] — env override, else local-vs-deployed default.
//! - [`SseStream`] / [`SseDecoder`] — server-sent event decoding for the
//!   `<endpoint>/stream` convention.

pub mod base_url;
pub mod client;
pub mod error;
pub mod sse;
pub mod transport;

pub use base_url::{DEPLOYED_API_URL, LOCAL_API_URL, resolve_base_url};
pub use client::ApiClient;
pub use error::Error;
pub use sse::{SseDecoder, SseEvent, SseStream};
pub use transport::{TlsMode, TransportConfig};

pub use reqwest::Method;
