use thiserror::Error;

/// Top-level error type for the `eventdekho-api` crate.
///
/// Covers every failure the adapter can observe: the server answered
/// with a non-2xx status, the request never got an answer, or the body
/// could not be decoded. `eventdekho-core` maps these into the plain
/// strings its controllers expose.
#[derive(Debug, Error)]
pub enum Error {
    // ── Server responses ────────────────────────────────────────────
    /// The backend answered with a non-2xx status.
    ///
    /// `message` comes from the `{ "message": ... }` field of the error
    /// body when present, otherwise the canonical status text.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        body: String,
    },

    // ── Transport ───────────────────────────────────────────────────
    /// The request never reached the server (DNS, refused connection, reset).
    #[error("Network error: {message}")]
    Network { message: String },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or HTTP client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A server-push stream broke mid-read.
    #[error("Stream error: {0}")]
    Stream(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::Http {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_owned(),
                body: String::new(),
            };
        }
        if err.is_decode() || err.is_body() {
            return Self::Stream(err.to_string());
        }
        Self::Network {
            message: err.to_string(),
        }
    }
}

impl Error {
    /// HTTP status code, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Http { status: 404, .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Stream(_) => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Human-readable text for display in a UI.
    ///
    /// Server errors surface the body's `message` verbatim; everything
    /// else falls back to the error's own description.
    pub fn user_message(&self) -> String {
        match self {
            Self::Http { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
