// ── Backend facade ──
//
// One adapter, one shared response cache, one config. Every controller
// a UI needs is built from here, so they all share cookies and cache.

use std::sync::Arc;

use eventdekho_api::ApiClient;
use tracing::debug;

use crate::cache::{MemoryCache, ResponseCache};
use crate::config::BackendConfig;
use crate::crud::ResourceCrud;
use crate::error::CoreError;
use crate::fetch::{FetchOptions, ResourceFetch};
use crate::pagination::PaginatedFetch;
use crate::search::{DebouncedSearch, SearchOptions};
use crate::stream::{SseSource, StreamController};

/// Entry point for consumers.
///
/// Cheaply cloneable via `Arc<BackendInner>`.
#[derive(Clone)]
pub struct Backend {
    inner: Arc<BackendInner>,
}

struct BackendInner {
    config: BackendConfig,
    client: Arc<ApiClient>,
    cache: Arc<dyn ResponseCache>,
}

impl Backend {
    /// Build the adapter from `config` with a fresh in-memory cache.
    pub fn new(config: BackendConfig) -> Result<Self, CoreError> {
        Self::with_cache(config, Arc::new(MemoryCache::new()))
    }

    /// Build the adapter from `config` with an injected cache.
    pub fn with_cache(
        config: BackendConfig,
        cache: Arc<dyn ResponseCache>,
    ) -> Result<Self, CoreError> {
        let client = ApiClient::new(&config.base_url, &config.transport)?;
        debug!(base_url = %client.base_url(), "backend ready");
        Ok(Self::from_parts(config, client, cache))
    }

    /// Assemble from a pre-built client.
    pub fn from_parts(
        config: BackendConfig,
        client: ApiClient,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        Self {
            inner: Arc::new(BackendInner {
                config,
                client: Arc::new(client),
                cache,
            }),
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.inner.client
    }

    pub fn cache(&self) -> &Arc<dyn ResponseCache> {
        &self.inner.cache
    }

    // ── Controller factories ─────────────────────────────────────────

    /// Fetch controller for `endpoint`.
    pub fn fetch(&self, endpoint: &str, options: FetchOptions) -> ResourceFetch {
        ResourceFetch::new(
            Arc::clone(&self.inner.client),
            Arc::clone(&self.inner.cache),
            endpoint,
            self.with_default_ttl(options),
        )
    }

    /// Pagination controller using the configured page size.
    pub fn paginated(&self, endpoint: &str, options: FetchOptions) -> PaginatedFetch {
        self.paginated_with_limit(endpoint, options, self.inner.config.page_size)
    }

    pub fn paginated_with_limit(
        &self,
        endpoint: &str,
        options: FetchOptions,
        limit: u32,
    ) -> PaginatedFetch {
        PaginatedFetch::new(
            Arc::clone(&self.inner.client),
            Arc::clone(&self.inner.cache),
            endpoint,
            self.with_default_ttl(options),
            limit,
        )
    }

    pub fn crud(&self, endpoint: &str) -> ResourceCrud {
        ResourceCrud::new(Arc::clone(&self.inner.client), endpoint)
    }

    /// Search controller using the configured debounce and minimum length.
    pub fn search(&self, endpoint: &str) -> DebouncedSearch {
        let options = SearchOptions {
            debounce: self.inner.config.search_debounce,
            min_query_length: self.inner.config.min_query_length,
            transform: None,
        };
        self.search_with(endpoint, options)
    }

    pub fn search_with(&self, endpoint: &str, options: SearchOptions) -> DebouncedSearch {
        DebouncedSearch::new(Arc::clone(&self.inner.client), endpoint, options)
    }

    /// Start streaming `<endpoint>/stream`. Must be called within a Tokio runtime.
    pub fn stream(&self, endpoint: &str) -> StreamController {
        let source = SseSource::for_endpoint(Arc::clone(&self.inner.client), endpoint);
        StreamController::spawn(source, self.inner.config.stream_retry_delay)
    }

    fn with_default_ttl(&self, mut options: FetchOptions) -> FetchOptions {
        if options.cache_ttl.is_none() {
            options.cache_ttl = Some(self.inner.config.cache_ttl);
        }
        options
    }
}
