// ── CRUD facade ──
//
// create/read/update/remove/list against one endpoint. Unlike the read
// controllers, failures here are both recorded in observable state and
// returned to the caller: a failed write must never look successful.
//
// State is tracked per operation kind, and `in_flight` is a counter, so
// overlapping calls on one facade never clear each other's flags. Ids
// are sent as a single percent-encoded path segment.

use std::future::Future;
use std::sync::Arc;

use eventdekho_api::ApiClient;
use serde_json::Value;
use strum::{Display, EnumIter};
use tokio::sync::watch;
use tracing::{debug, warn};
use url::Url;

use crate::error::CoreError;
use crate::fetch::Params;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum CrudOp {
    Create,
    Read,
    Update,
    Remove,
    List,
}

/// Status of one operation kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpStatus {
    pub in_flight: usize,
    pub error: Option<String>,
}

/// Observable state of a [`ResourceCrud`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrudState {
    create: OpStatus,
    read: OpStatus,
    update: OpStatus,
    remove: OpStatus,
    list: OpStatus,
    /// Kinds with an outstanding error, oldest first.
    failures: Vec<CrudOp>,
}

impl CrudState {
    pub fn status(&self, op: CrudOp) -> &OpStatus {
        match op {
            CrudOp::Create => &self.create,
            CrudOp::Read => &self.read,
            CrudOp::Update => &self.update,
            CrudOp::Remove => &self.remove,
            CrudOp::List => &self.list,
        }
    }

    fn status_mut(&mut self, op: CrudOp) -> &mut OpStatus {
        match op {
            CrudOp::Create => &mut self.create,
            CrudOp::Read => &mut self.read,
            CrudOp::Update => &mut self.update,
            CrudOp::Remove => &mut self.remove,
            CrudOp::List => &mut self.list,
        }
    }

    /// True while any operation is in flight.
    pub fn loading(&self) -> bool {
        [&self.create, &self.read, &self.update, &self.remove, &self.list]
            .iter()
            .any(|s| s.in_flight > 0)
    }

    /// Message of the most recent failure that has not been superseded
    /// by a new call of the same kind.
    ///
    /// Retrying one kind falls back to any older failure of another kind
    /// that is still outstanding.
    pub fn error(&self) -> Option<&str> {
        self.failed_op()
            .and_then(|op| self.status(op).error.as_deref())
    }

    /// Which operation produced [`error`](Self::error).
    pub fn failed_op(&self) -> Option<CrudOp> {
        self.failures.last().copied()
    }

    fn record_failure(&mut self, op: CrudOp, message: String) {
        self.status_mut(op).error = Some(message);
        self.failures.retain(|o| *o != op);
        self.failures.push(op);
    }

    fn clear_failure(&mut self, op: CrudOp) {
        self.status_mut(op).error = None;
        self.failures.retain(|o| *o != op);
    }
}

/// Create/read/update/remove/list facade over one endpoint.
#[derive(Clone)]
pub struct ResourceCrud {
    client: Arc<ApiClient>,
    endpoint: String,
    state: Arc<watch::Sender<CrudState>>,
}

impl ResourceCrud {
    pub fn new(client: Arc<ApiClient>, endpoint: impl Into<String>) -> Self {
        let (state, _) = watch::channel(CrudState::default());
        Self {
            client,
            endpoint: endpoint.into(),
            state: Arc::new(state),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> CrudState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CrudState> {
        self.state.subscribe()
    }

    /// `POST <endpoint>`.
    pub async fn create(&self, body: &Value) -> Result<Value, CoreError> {
        self.run(CrudOp::Create, self.client.post(&self.endpoint, body))
            .await
    }

    /// `GET <endpoint>/<id>`.
    pub async fn read(&self, id: &str) -> Result<Value, CoreError> {
        self.run(CrudOp::Read, async {
            let url = self.item_url(id)?;
            Ok::<_, CoreError>(self.client.get(url.as_str(), &[]).await?)
        })
        .await
    }

    /// `PUT <endpoint>/<id>`.
    pub async fn update(&self, id: &str, body: &Value) -> Result<Value, CoreError> {
        self.run(CrudOp::Update, async {
            let url = self.item_url(id)?;
            Ok::<_, CoreError>(self.client.put(url.as_str(), body).await?)
        })
        .await
    }

    /// `DELETE <endpoint>/<id>`; resolves with the response body unchanged.
    pub async fn remove(&self, id: &str) -> Result<Value, CoreError> {
        self.run(CrudOp::Remove, async {
            let url = self.item_url(id)?;
            Ok::<_, CoreError>(self.client.delete(url.as_str()).await?)
        })
        .await
    }

    /// `GET <endpoint>` with query parameters.
    pub async fn list(&self, params: &Params) -> Result<Value, CoreError> {
        let query: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.run(CrudOp::List, self.client.get(&self.endpoint, &query))
            .await
    }

    /// `<endpoint>/<id>` as an absolute URL, with `id` encoded as one
    /// path segment.
    fn item_url(&self, id: &str) -> Result<Url, CoreError> {
        if id.is_empty() || id == "." || id == ".." {
            return Err(CoreError::InvalidId { id: id.to_owned() });
        }
        let mut url = self.client.url(&self.endpoint)?;
        url.path_segments_mut()
            .map_err(|()| CoreError::Config {
                message: format!("endpoint {:?} cannot take an id", self.endpoint),
            })?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    async fn run<F, E>(&self, op: CrudOp, request: F) -> Result<Value, CoreError>
    where
        F: Future<Output = Result<Value, E>>,
        CoreError: From<E>,
    {
        let guard = OpGuard::start(&self.state, op);
        debug!(endpoint = %self.endpoint, %op, "crud request");

        match request.await.map_err(CoreError::from) {
            Ok(body) => {
                guard.finish(None);
                Ok(body)
            }
            Err(err) => {
                let message = err.to_string();
                warn!(endpoint = %self.endpoint, %op, error = %message, "crud request failed");
                guard.finish(Some(message));
                Err(err)
            }
        }
    }
}

/// Counts a call in flight for its operation kind.
///
/// [`finish`](Self::finish) publishes the outcome together with the
/// decrement. A guard dropped without finishing (the call was cancelled)
/// only decrements.
struct OpGuard<'a> {
    state: &'a watch::Sender<CrudState>,
    op: CrudOp,
    armed: bool,
}

impl<'a> OpGuard<'a> {
    fn start(state: &'a watch::Sender<CrudState>, op: CrudOp) -> Self {
        state.send_modify(|s| {
            s.status_mut(op).in_flight += 1;
            s.clear_failure(op);
        });
        Self {
            state,
            op,
            armed: true,
        }
    }

    fn finish(mut self, error: Option<String>) {
        self.armed = false;
        let op = self.op;
        self.state.send_modify(|s| {
            let status = s.status_mut(op);
            status.in_flight = status.in_flight.saturating_sub(1);
            if let Some(message) = error {
                s.record_failure(op, message);
            }
        });
    }
}

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let op = self.op;
        self.state.send_modify(|s| {
            let status = s.status_mut(op);
            status.in_flight = status.in_flight.saturating_sub(1);
        });
    }
}
