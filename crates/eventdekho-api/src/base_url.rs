//! Backend base URL resolution.
//!
//! An explicit override (normally `EVENTDEKHO_API_URL`) always wins.
//! Without one, the origin host decides between the local development
//! backend and the deployed one.

use url::Url;

use crate::error::Error;

/// Backend used when the front end is served from a loopback host.
pub const LOCAL_API_URL: &str = "http://localhost:5000/api/";

/// Backend used for every non-local origin.
pub const DEPLOYED_API_URL: &str = "https://apnaevents-backend.onrender.com/api/";

const LOCAL_HOSTS: [&str; 4] = ["localhost", "127.0.0.1", "::1", "0.0.0.0"];

/// Returns `true` if `host` names the local machine.
pub fn is_local_host(host: &str) -> bool {
    let host = host.trim().trim_start_matches('[').trim_end_matches(']');
    LOCAL_HOSTS.iter().any(|h| host.eq_ignore_ascii_case(h))
}

/// Resolve the backend base URL.
///
/// The returned URL always ends in `/`, so relative endpoint paths join
/// beneath it instead of replacing its last segment.
pub fn resolve_base_url(override_url: Option<&str>, origin_host: &str) -> Result<Url, Error> {
    let raw = match override_url.map(str::trim) {
        Some(url) if !url.is_empty() => url,
        _ if is_local_host(origin_host) => LOCAL_API_URL,
        _ => DEPLOYED_API_URL,
    };
    normalize(raw)
}

/// Parse `raw` and force a trailing slash on its path.
pub fn normalize(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
