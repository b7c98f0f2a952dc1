// ── Core error types ──
//
// User-facing errors from eventdekho-core. Controllers surface these as
// plain strings in their observable state; the CRUD facade also returns
// them. The `From<eventdekho_api::Error>` impl keeps the backend's own
// message wording intact.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// The backend rejected the request.
    #[error("{message}")]
    Api { message: String, status: u16 },

    /// The backend could not be reached.
    #[error("{message}")]
    Network { message: String },

    /// A payload could not be decoded.
    #[error("Invalid response: {message}")]
    Parse { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A resource id that cannot be sent as a single path segment.
    #[error("Invalid resource id: {id:?}")]
    InvalidId { id: String },
}

impl CoreError {
    /// HTTP status code, if the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<eventdekho_api::Error> for CoreError {
    fn from(err: eventdekho_api::Error) -> Self {
        use eventdekho_api::Error as Api;

        match err {
            Api::Http {
                status, message, ..
            } => Self::Api { message, status },
            Api::Network { .. } | Api::Stream(_) => Self::Network {
                message: err.user_message(),
            },
            Api::Deserialization { message, .. } => Self::Parse { message },
            Api::InvalidUrl(_) | Api::Tls(_) => Self::Config {
                message: err.to_string(),
            },
        }
    }
}
