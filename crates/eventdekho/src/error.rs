//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use eventdekho_config::ConfigError;
use eventdekho_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const API: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the backend: {reason}")]
    #[diagnostic(
        code(eventdekho::connection_failed),
        help(
            "Check that the backend is running and reachable.\n\
             Point at another one with --api-url or EVENTDEKHO_API_URL."
        )
    )]
    ConnectionFailed { reason: String },

    // ── Backend responses ────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(
        code(eventdekho::not_found),
        help("Run: eventdekho list <endpoint> to see available records")
    )]
    NotFound { message: String },

    #[error("API error ({status}): {message}")]
    #[diagnostic(code(eventdekho::api_error))]
    Api { status: u16, message: String },

    #[error("Unexpected response: {message}")]
    #[diagnostic(code(eventdekho::bad_response))]
    BadResponse { message: String },

    // ── Input ────────────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(eventdekho::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(eventdekho::config),
        help("Inspect the file shown by: eventdekho config path")
    )]
    Config(#[from] ConfigError),

    #[error("Config file already exists at {path}")]
    #[diagnostic(code(eventdekho::config_exists), help("Use --force to overwrite it."))]
    ConfigExists { path: String },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to render TOML: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Api { .. } | Self::BadResponse { .. } => exit_code::API,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Wrap a failure message recorded in a controller's observable state.
    pub fn from_state_message(message: String) -> Self {
        Self::BadResponse { message }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Api {
                message,
                status: 404,
            } => CliError::NotFound { message },
            CoreError::Api { message, status } => CliError::Api { status, message },
            CoreError::Network { message } => CliError::ConnectionFailed { reason: message },
            CoreError::Parse { message } => CliError::BadResponse { message },
            CoreError::Config { message } => CliError::Validation {
                field: "api_url".into(),
                reason: message,
            },
            CoreError::InvalidId { id } => CliError::Validation {
                field: "id".into(),
                reason: format!("{id:?} is not a valid resource id"),
            },
        }
    }
}
