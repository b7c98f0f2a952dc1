// ── Backend configuration ──
//
// Everything a `Backend` needs to build its adapter and controllers.
// The config crate produces this from TOML + environment; tests build it
// directly.

use std::time::Duration;

use eventdekho_api::TransportConfig;
use url::Url;

/// Cached responses older than this are refetched.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(300_000);

/// Fixed delay between stream reconnection attempts.
pub const DEFAULT_STREAM_RETRY_DELAY: Duration = Duration::from_millis(5_000);

/// Quiet period before a search query is sent.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Queries shorter than this clear results instead of searching.
pub const DEFAULT_MIN_QUERY_LENGTH: usize = 2;

/// Items requested per page when the caller does not specify a limit.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Configuration for a [`Backend`](crate::Backend).
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: Url,
    pub transport: TransportConfig,
    pub cache_ttl: Duration,
    pub stream_retry_delay: Duration,
    pub search_debounce: Duration,
    pub min_query_length: usize,
    pub page_size: u32,
}

impl BackendConfig {
    /// Config with default tuning for the given backend URL.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            transport: TransportConfig::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
            stream_retry_delay: DEFAULT_STREAM_RETRY_DELAY,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            min_query_length: DEFAULT_MIN_QUERY_LENGTH,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}
