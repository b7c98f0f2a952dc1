// ── Debounced search controller ──
//
// Turns a rapidly changing query into rate-limited `GET
// <endpoint>/search?q=` requests. Each keystroke re-arms the quiet-period
// timer; each issued request carries a generation number and its result
// is dropped unless it is still the newest, so a slow response for an
// older query can never overwrite a newer one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use eventdekho_api::ApiClient;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::config::{DEFAULT_MIN_QUERY_LENGTH, DEFAULT_SEARCH_DEBOUNCE};
use crate::fetch::Transform;
use crate::timer::Debouncer;

/// Observable search state. `results` is replaced wholesale, never merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub query: String,
    pub results: Vec<Value>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct SearchOptions {
    pub debounce: Duration,
    /// Queries shorter than this (in characters) clear results.
    pub min_query_length: usize,
    pub transform: Option<Transform>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_SEARCH_DEBOUNCE,
            min_query_length: DEFAULT_MIN_QUERY_LENGTH,
            transform: None,
        }
    }
}

impl SearchOptions {
    pub fn transform(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.transform = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for SearchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchOptions")
            .field("debounce", &self.debounce)
            .field("min_query_length", &self.min_query_length)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// Debounced search over `<endpoint>/search`.
///
/// Dropping the controller cancels a pending timer.
pub struct DebouncedSearch {
    inner: Arc<SearchInner>,
}

struct SearchInner {
    client: Arc<ApiClient>,
    path: String,
    options: SearchOptions,
    state: watch::Sender<SearchState>,
    debouncer: Debouncer,
    generation: AtomicU64,
}

impl DebouncedSearch {
    pub fn new(client: Arc<ApiClient>, endpoint: &str, options: SearchOptions) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            inner: Arc::new(SearchInner {
                client,
                path: format!("{}/search", endpoint.trim_end_matches('/')),
                debouncer: Debouncer::new(options.debounce),
                options,
                state,
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn state(&self) -> SearchState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.inner.state.subscribe()
    }

    pub fn query(&self) -> String {
        self.inner.state.borrow().query.clone()
    }

    /// Record a new query and (re)start the quiet-period timer.
    ///
    /// Must be called within a Tokio runtime.
    pub fn set_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.inner.state.send_modify(|s| s.query.clone_from(&query));
        trace!(query = %query, "search query changed");

        let weak: Weak<SearchInner> = Arc::downgrade(&self.inner);
        self.inner.debouncer.arm(async move {
            if let Some(inner) = weak.upgrade() {
                inner.run(query).await;
            }
        });
    }

    /// Search immediately, skipping the quiet period.
    pub async fn search_now(&self, query: impl Into<String>) -> SearchState {
        let query = query.into();
        self.inner.debouncer.cancel();
        self.inner.state.send_modify(|s| s.query.clone_from(&query));
        self.inner.run(query).await;
        self.state()
    }

    /// Reset query, results and error; any pending or in-flight search is discarded.
    pub fn clear_search(&self) {
        self.inner.debouncer.cancel();
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.state.send_replace(SearchState::default());
    }

    /// Whether a debounce timer is waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.inner.debouncer.is_armed()
    }
}

impl Drop for DebouncedSearch {
    fn drop(&mut self) {
        self.inner.debouncer.cancel();
    }
}

impl SearchInner {
    async fn run(&self, query: String) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if query.chars().count() < self.options.min_query_length {
            trace!(query = %query, "query below minimum length, clearing results");
            self.state.send_modify(|s| {
                s.results.clear();
                s.loading = false;
                s.error = None;
            });
            return;
        }

        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        debug!(path = %self.path, query = %query, generation, "searching");

        let result = self
            .client
            .get(&self.path, &[("q".to_owned(), query.clone())])
            .await;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(query = %query, generation, "discarding stale search response");
            return;
        }

        match result {
            Ok(raw) => {
                let shaped = match self.options.transform {
                    Some(ref f) => f(raw),
                    None => raw,
                };
                let items = into_items(shaped);
                self.state.send_modify(|s| {
                    s.results = items;
                    s.loading = false;
                });
            }
            Err(e) => {
                let message = e.user_message();
                warn!(query = %query, error = %message, "search failed");
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(message);
                });
            }
        }
    }
}

/// Flatten a search response into a result list.
///
/// Accepts a bare array, a `{ data: [...] }` or `{ results: [...] }`
/// envelope, or `null`; any other value becomes a single result.
fn into_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        Value::Object(mut map) => {
            for key in ["data", "results"] {
                if let Some(Value::Array(items)) = map.get_mut(key) {
                    return std::mem::take(items);
                }
            }
            vec![Value::Object(map)]
        }
        other => vec![other],
    }
}
