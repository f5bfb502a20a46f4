//! Segment definitions, actions and query results.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::DataProvider;
use crate::store::error::Rejection;

/// A mutation addressed to one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub segment_id: String,
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

/// Handle returned by `SegmentStore::register`, used to build actions for
/// that segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCreator {
    segment_id: String,
}

impl ActionCreator {
    pub(crate) fn new(segment_id: impl Into<String>) -> Self {
        Self {
            segment_id: segment_id.into(),
        }
    }

    pub fn segment_id(&self) -> &str {
        &self.segment_id
    }

    /// Build an action of `kind` carrying `payload`.
    pub fn create(&self, kind: impl Into<String>, payload: Value) -> Action {
        Action {
            segment_id: self.segment_id.clone(),
            kind: kind.into(),
            payload,
        }
    }
}

/// Whether subscribing should start loading the queried data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HydrationPolicy {
    /// Load on subscribe (queued for hydration on the server).
    #[default]
    Eager,
    /// Never load automatically; the consumer only reads what is there.
    Never,
}

/// The view a query computes over a segment's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub data: Value,
    pub loaded: bool,
}

impl QueryResult {
    pub fn loaded(data: Value) -> Self {
        Self { data, loaded: true }
    }

    pub fn pending() -> Self {
        Self {
            data: Value::Null,
            loaded: false,
        }
    }
}

/// Asynchronous load producing the action that stores its result.
pub type LoadFuture = BoxFuture<'static, Result<Action, Rejection>>;

/// A named slice of application state with its own reducer.
///
/// Definitions are shared across requests; each store keeps its own state.
pub trait Segment: Send + Sync {
    /// Stable identifier, unique within a store.
    fn id(&self) -> &str;

    /// State before any action has been applied.
    fn initial_state(&self) -> Value {
        Value::Null
    }

    /// Compute the next state. Must be pure.
    fn reduce(&self, state: &Value, action: &Action) -> Value;

    /// Compute the view selected by `query`.
    ///
    /// The default treats a null state as not loaded and otherwise returns the
    /// whole state.
    fn query(&self, state: &Value, _query: &Value) -> QueryResult {
        if state.is_null() {
            QueryResult::pending()
        } else {
            QueryResult::loaded(state.clone())
        }
    }

    /// Start loading the data `query` needs, or `None` when it is already
    /// present.
    fn load(
        &self,
        _query: &Value,
        _state: &Value,
        _provider: &Arc<dyn DataProvider>,
    ) -> Option<LoadFuture> {
        None
    }
}
