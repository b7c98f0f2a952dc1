// ── Resource fetch controller ──
//
// Loads one endpoint and publishes its lifecycle through a `watch`
// channel. Failures never escape `fetch()`: they land in `error` while
// `data` keeps its last good value.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use eventdekho_api::ApiClient;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, trace, warn};

use crate::cache::ResponseCache;
use crate::config::{DEFAULT_CACHE_TTL, DEFAULT_PAGE_SIZE};

/// Query parameters keyed by name; later merges overwrite earlier values.
pub type Params = BTreeMap<String, String>;

/// Reshapes a raw response before it is stored as `data`.
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

// ── PaginationInfo ───────────────────────────────────────────────────

/// Page cursor and totals derived from a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub page_size: u32,
}

impl PaginationInfo {
    /// Cursor before any response has been seen.
    pub fn first(page_size: u32) -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
            total_items: 0,
            page_size: page_size.max(1),
        }
    }

    /// Build from a response's `pagination` object, if it has one.
    ///
    /// Fields the server omits fall back to the request's `page` and
    /// `limit` parameters.
    pub fn from_response(raw: &Value, params: &Params) -> Option<Self> {
        let pagination = raw.get("pagination")?;
        let page_size = params
            .get("limit")
            .and_then(|l| l.parse().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let mut info = Self::first(page_size);
        if let Some(page) = params.get("page").and_then(|p| p.parse::<u32>().ok()) {
            info.current_page = page.max(1);
        }
        info.merge(pagination);
        Some(info)
    }

    /// Apply the totals reported in a `pagination` object.
    ///
    /// `totalPages` is used verbatim when present; otherwise it is the
    /// ceiling of `totalItems / pageSize`. Never below 1.
    pub fn merge(&mut self, pagination: &Value) {
        if let Some(size) = read_u64(pagination, &["limit", "pageSize"]) {
            if size > 0 {
                self.page_size = u32::try_from(size).unwrap_or(u32::MAX);
            }
        }
        if let Some(page) = read_u64(pagination, &["currentPage", "page"]) {
            self.current_page = u32::try_from(page).unwrap_or(u32::MAX).max(1);
        }
        if let Some(items) = read_u64(pagination, &["totalItems", "total"]) {
            self.total_items = items;
        }
        self.total_pages = match read_u64(pagination, &["totalPages"]) {
            Some(pages) => u32::try_from(pages).unwrap_or(u32::MAX),
            None => total_pages_for(self.total_items, self.page_size),
        }
        .max(1);
    }
}

/// `ceil(total_items / page_size)`, at least 1.
pub fn total_pages_for(total_items: u64, page_size: u32) -> u32 {
    let pages = total_items.div_ceil(u64::from(page_size.max(1)));
    u32::try_from(pages).unwrap_or(u32::MAX).max(1)
}

fn read_u64(obj: &Value, names: &[&str]) -> Option<u64> {
    names.iter().find_map(|name| {
        let v = obj.get(*name)?;
        v.as_u64().or_else(|| v.as_str()?.parse().ok())
    })
}

// ── FetchState ───────────────────────────────────────────────────────

/// Observable lifecycle of one fetch controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchState {
    pub data: Option<Value>,
    pub loading: bool,
    pub error: Option<String>,
    pub pagination: Option<PaginationInfo>,
}

// ── FetchOptions ─────────────────────────────────────────────────────

/// Per-controller configuration.
#[derive(Clone, Default)]
pub struct FetchOptions {
    /// Base query parameters sent with every request.
    pub params: Params,
    /// Enables caching under this key.
    pub cache_key: Option<String>,
    /// Cache lifetime; `None` uses the backend default.
    pub cache_ttl: Option<Duration>,
    pub transform: Option<Transform>,
    /// Start the first fetch as soon as the controller is built.
    pub immediate: bool,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    pub fn cache(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn transform(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.transform = Some(Arc::new(f));
        self
    }

    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("params", &self.params)
            .field("cache_key", &self.cache_key)
            .field("cache_ttl", &self.cache_ttl)
            .field("transform", &self.transform.is_some())
            .field("immediate", &self.immediate)
            .finish()
    }
}

// ── ResourceFetch ────────────────────────────────────────────────────

/// Fetch controller bound to a single endpoint.
///
/// Cheaply cloneable; clones share state. The most recently *completed*
/// request determines `data`.
#[derive(Clone)]
pub struct ResourceFetch {
    inner: Arc<FetchInner>,
}

struct FetchInner {
    client: Arc<ApiClient>,
    cache: Arc<dyn ResponseCache>,
    endpoint: String,
    options: FetchOptions,
    state: watch::Sender<FetchState>,
    in_flight: AtomicUsize,
}

impl ResourceFetch {
    /// Build a controller. With `options.immediate`, the first fetch is
    /// spawned on the current Tokio runtime.
    pub fn new(
        client: Arc<ApiClient>,
        cache: Arc<dyn ResponseCache>,
        endpoint: impl Into<String>,
        options: FetchOptions,
    ) -> Self {
        let (state, _) = watch::channel(FetchState::default());
        let fetch = Self {
            inner: Arc::new(FetchInner {
                client,
                cache,
                endpoint: endpoint.into(),
                options,
                state,
                in_flight: AtomicUsize::new(0),
            }),
        };

        if fetch.inner.options.immediate {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let ctrl = fetch.clone();
                    handle.spawn(async move {
                        ctrl.fetch(None).await;
                    });
                }
                Err(_) => warn!(
                    endpoint = %fetch.inner.endpoint,
                    "immediate fetch skipped: no Tokio runtime"
                ),
            }
        }

        fetch
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    pub fn options(&self) -> &FetchOptions {
        &self.inner.options
    }

    /// Current state snapshot.
    pub fn state(&self) -> FetchState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.inner.state.subscribe()
    }

    /// State transitions as a `Stream`, starting with the current state.
    pub fn changes(&self) -> WatchStream<FetchState> {
        WatchStream::new(self.inner.state.subscribe())
    }

    /// Load the endpoint, merging `custom` over the base params.
    ///
    /// Returns the new `data` on success and `None` on failure; the
    /// failure itself is only visible through [`state`](Self::state).
    pub async fn fetch(&self, custom: Option<&Params>) -> Option<Value> {
        let key = self.inner.options.cache_key.clone();
        self.fetch_keyed(custom, key.as_deref()).await
    }

    /// Same as [`fetch`](Self::fetch); provided for caller-driven retry.
    pub async fn refetch(&self, custom: Option<&Params>) -> Option<Value> {
        self.fetch(custom).await
    }

    /// Overwrite `data` locally without a network round-trip.
    pub fn mutate(&self, data: Value) {
        self.inner.state.send_modify(|s| s.data = Some(data));
    }

    /// Drop this controller's cache entry so the next fetch hits the network.
    pub fn invalidate(&self) {
        if let Some(ref key) = self.inner.options.cache_key {
            self.inner.cache.remove(key);
        }
    }

    pub(crate) async fn fetch_keyed(
        &self,
        custom: Option<&Params>,
        cache_key: Option<&str>,
    ) -> Option<Value> {
        let inner = &self.inner;
        let mut params = inner.options.params.clone();
        if let Some(custom) = custom {
            params.extend(custom.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        if let Some(key) = cache_key {
            if let Some(raw) = inner.cache.get(key) {
                debug!(endpoint = %inner.endpoint, cache_key = key, "cache hit");
                let (data, pagination) = self.shape(raw, &params);
                inner.state.send_modify(|s| {
                    s.error = None;
                    publish(s, data.clone(), pagination);
                });
                return Some(data);
            }
            trace!(endpoint = %inner.endpoint, cache_key = key, "cache miss");
        }

        let query: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let guard = InFlight::start(inner);
        match inner.client.get(&inner.endpoint, &query).await {
            Ok(raw) => {
                if let Some(key) = cache_key {
                    let ttl = inner.options.cache_ttl.unwrap_or(DEFAULT_CACHE_TTL);
                    inner.cache.set(key, raw.clone(), ttl);
                }
                let (data, pagination) = self.shape(raw, &params);
                guard.finish(|s| publish(s, data.clone(), pagination));
                Some(data)
            }
            Err(e) => {
                let message = e.user_message();
                warn!(endpoint = %inner.endpoint, error = %message, "fetch failed");
                guard.finish(|s| s.error = Some(message));
                None
            }
        }
    }

    /// Extract pagination and run the transform.
    fn shape(&self, raw: Value, params: &Params) -> (Value, Option<PaginationInfo>) {
        let pagination = PaginationInfo::from_response(&raw, params);
        let data = match self.inner.options.transform {
            Some(ref f) => f(raw),
            None => raw,
        };
        (data, pagination)
    }
}

fn publish(state: &mut FetchState, data: Value, pagination: Option<PaginationInfo>) {
    state.data = Some(data);
    if pagination.is_some() {
        state.pagination = pagination;
    }
}

/// Marks a request in flight; `loading` stays true while any are.
///
/// Starting clears `error`. [`finish`](Self::finish) writes the outcome
/// in the same update that may clear `loading`; a guard dropped without
/// finishing (the fetch was cancelled) only decrements.
struct InFlight<'a> {
    inner: &'a FetchInner,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn start(inner: &'a FetchInner) -> Self {
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        inner.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        Self { inner, armed: true }
    }

    fn finish(mut self, outcome: impl FnOnce(&mut FetchState)) {
        self.armed = false;
        let remaining = self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        self.inner.state.send_modify(|s| {
            outcome(s);
            if remaining == 0 {
                s.loading = false;
            }
        });
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let remaining = self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining == 0 {
            self.inner.state.send_modify(|s| s.loading = false);
        }
    }
}
