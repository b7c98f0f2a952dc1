// ── Pagination controller ──
//
// Page cursor layered over a `ResourceFetch`. Each cursor change issues
// a fetch with `page` and `limit` added to the query; totals are
// captured from the response through the fetch controller's transform.

use std::sync::Arc;

use eventdekho_api::ApiClient;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use crate::cache::ResponseCache;
use crate::fetch::{FetchOptions, FetchState, PaginationInfo, Params, ResourceFetch};

/// Page-cursor controller.
///
/// `go_to_page` does not clamp the upper bound: out-of-range pages are
/// sent to the server, which answers with an empty page. `next_page`
/// and `prev_page` stay within `1..=total_pages`.
#[derive(Clone)]
pub struct PaginatedFetch {
    fetch: ResourceFetch,
    cursor: Arc<watch::Sender<PaginationInfo>>,
}

impl PaginatedFetch {
    pub fn new(
        client: Arc<ApiClient>,
        cache: Arc<dyn ResponseCache>,
        endpoint: impl Into<String>,
        mut options: FetchOptions,
        page_size: u32,
    ) -> Self {
        let (cursor, _) = watch::channel(PaginationInfo::first(page_size));
        let cursor = Arc::new(cursor);

        let capture = Arc::clone(&cursor);
        let user_transform = options.transform.take();
        options.transform = Some(Arc::new(move |raw: Value| {
            if let Some(pagination) = raw.get("pagination") {
                capture.send_modify(|info| {
                    let page = info.current_page;
                    info.merge(pagination);
                    // the cursor is ours; the server only reports totals
                    info.current_page = page;
                });
            }
            let items = unwrap_items(raw);
            match user_transform {
                Some(ref f) => f(items),
                None => items,
            }
        }));

        let immediate = std::mem::take(&mut options.immediate);
        let paginated = Self {
            fetch: ResourceFetch::new(client, cache, endpoint, options),
            cursor,
        };

        if immediate {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let ctrl = paginated.clone();
                handle.spawn(async move {
                    ctrl.load().await;
                });
            }
        }

        paginated
    }

    /// The underlying fetch controller.
    pub fn fetch(&self) -> &ResourceFetch {
        &self.fetch
    }

    pub fn state(&self) -> FetchState {
        self.fetch.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.fetch.subscribe()
    }

    /// Subscribe to cursor and totals changes.
    pub fn subscribe_pages(&self) -> watch::Receiver<PaginationInfo> {
        self.cursor.subscribe()
    }

    pub fn page_info(&self) -> PaginationInfo {
        *self.cursor.borrow()
    }

    pub fn current_page(&self) -> u32 {
        self.cursor.borrow().current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.cursor.borrow().total_pages
    }

    pub fn total_items(&self) -> u64 {
        self.cursor.borrow().total_items
    }

    pub fn page_size(&self) -> u32 {
        self.cursor.borrow().page_size
    }

    /// Fetch the current page.
    pub async fn load(&self) -> Option<Value> {
        let info = self.page_info();
        let mut params = Params::new();
        params.insert("page".into(), info.current_page.to_string());
        params.insert("limit".into(), info.page_size.to_string());

        let key = self
            .fetch
            .options()
            .cache_key
            .as_ref()
            .map(|k| format!("{k}:page={}:limit={}", info.current_page, info.page_size));

        debug!(
            endpoint = self.fetch.endpoint(),
            page = info.current_page,
            limit = info.page_size,
            "loading page"
        );
        self.fetch.fetch_keyed(Some(&params), key.as_deref()).await
    }

    /// Alias for [`load`](Self::load).
    pub async fn reload(&self) -> Option<Value> {
        self.load().await
    }

    /// Jump to `page` (0 is treated as 1). Returns the new current page.
    pub async fn go_to_page(&self, page: u32) -> u32 {
        self.move_to(page.max(1)).await
    }

    /// Advance one page, stopping at `total_pages`.
    pub async fn next_page(&self) -> u32 {
        let info = self.page_info();
        self.move_to(info.current_page.saturating_add(1).min(info.total_pages))
            .await
    }

    /// Go back one page, stopping at 1.
    pub async fn prev_page(&self) -> u32 {
        let info = self.page_info();
        self.move_to(info.current_page.saturating_sub(1).max(1)).await
    }

    /// Set the cursor and fetch, unless it is already at `page`.
    async fn move_to(&self, page: u32) -> u32 {
        let changed = self.cursor.send_if_modified(|info| {
            if info.current_page == page {
                false
            } else {
                info.current_page = page;
                true
            }
        });
        if changed {
            self.load().await;
        }
        page
    }
}

/// Pull the item list out of a `{ data, pagination }` envelope.
fn unwrap_items(raw: Value) -> Value {
    match raw {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}
