// Shared transport configuration for building reqwest::Client instances.
//
// Every request carries the session cookie jar; TLS and the optional
// timeout live here so the REST and streaming paths build identical clients.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::Error;

const USER_AGENT: &str = concat!("eventdekho/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the bundled webpki roots.
    #[default]
    System,
    /// Trust an additional CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (local development servers only).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub timeout: Option<Duration>,
    pub cookie_jar: Option<Arc<Jar>>,
    /// Pre-existing session cookie (`name=value`) seeded into the jar.
    pub session_cookie: Option<SecretString>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: None,
            cookie_jar: Some(Arc::new(Jar::default())),
            session_cookie: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` for requests under `base_url`.
    ///
    /// The cookie jar is always attached so the backend's session cookie
    /// rides along on every request, including the stream upgrade.
    pub fn build_client(&self, base_url: &Url) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        let jar = self
            .cookie_jar
            .clone()
            .unwrap_or_else(|| Arc::new(Jar::default()));
        if let Some(ref cookie) = self.session_cookie {
            jar.add_cookie_str(cookie.expose_secret(), base_url);
        }
        builder = builder.cookie_provider(jar);

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Seed a session cookie (`name=value`) for the base URL.
    pub fn with_session_cookie(mut self, cookie: SecretString) -> Self {
        self.session_cookie = Some(cookie);
        self
    }
}
