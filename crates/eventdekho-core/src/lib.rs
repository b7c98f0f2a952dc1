//! Observable data-access controllers for the EventDekho backend.
//!
//! Each controller binds to one endpoint and publishes its lifecycle
//! through `tokio::sync::watch` channels, so any UI can observe it:
//!
//! - **[`ResourceFetch`]** — load/error/data for one endpoint, with an
//!   optional transform and an optional TTL cache. Errors are recorded,
//!   never returned, and `data` survives failures.
//! - **[`PaginatedFetch`]** — page cursor over a fetch controller.
//! - **[`StreamController`]** — `<endpoint>/stream` server push with a
//!   fixed-delay, unbounded reconnect loop.
//! - **[`ResourceCrud`]** — create/read/update/remove/list; errors are
//!   recorded *and* returned.
//! - **[`DebouncedSearch`]** — quiet-period search with stale-response
//!   suppression.
//!
//! [`Backend`] wires them all to one [`ApiClient`](eventdekho_api::ApiClient)
//! and one shared [`ResponseCache`].

pub mod backend;
pub mod cache;
pub mod config;
pub mod crud;
pub mod error;
pub mod fetch;
pub mod pagination;
pub mod search;
pub mod stream;
pub mod timer;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::Backend;
pub use cache::{CacheEntry, MemoryCache, NoopCache, ResponseCache};
pub use config::BackendConfig;
pub use crud::{CrudOp, CrudState, OpStatus, ResourceCrud};
pub use error::CoreError;
pub use fetch::{FetchOptions, FetchState, PaginationInfo, Params, ResourceFetch, Transform};
pub use pagination::PaginatedFetch;
pub use search::{DebouncedSearch, SearchOptions, SearchState};
pub use stream::{
    EventConnection, EventSource, SseSource, StreamController, StreamSnapshot, StreamState,
};
pub use timer::{Debouncer, DelayedTask};
