//! Data providers consumed by segment loads.
//!
//! # Data Flow
//! ```text
//! consumer subscribes (eager policy)
//!     → Segment::load(query, state, provider)
//!     → DataProvider::fetch(resource, query)
//!     → Action applied to the store (hydrate or client load)
//! ```
//!
//! # Design Decisions
//! - Providers are process-wide and shared via Arc
//! - Fetch futures are 'static so they can outlive the subscribe call
//! - Failures travel as `Rejection`, never as panics

pub mod http;

use std::collections::BTreeMap;

use futures_util::future::{self, BoxFuture};
use serde_json::Value;

use crate::store::Rejection;

pub use http::HttpDataProvider;

/// Future returned by [`DataProvider::fetch`].
pub type FetchFuture = BoxFuture<'static, Result<Value, Rejection>>;

/// Source of the data segments hydrate from.
pub trait DataProvider: Send + Sync {
    /// Fetch `resource`, narrowed by the consumer's `query`.
    fn fetch(&self, resource: &str, query: &Value) -> FetchFuture;
}

/// In-memory provider backed by a fixed resource map.
#[derive(Debug, Clone, Default)]
pub struct StaticDataProvider {
    resources: BTreeMap<String, Value>,
}

impl StaticDataProvider {
    pub fn new(resources: BTreeMap<String, Value>) -> Self {
        Self { resources }
    }

    /// Add or replace a resource.
    pub fn with(mut self, resource: impl Into<String>, value: Value) -> Self {
        self.resources.insert(resource.into(), value);
        self
    }
}

impl DataProvider for StaticDataProvider {
    fn fetch(&self, resource: &str, _query: &Value) -> FetchFuture {
        let result = match self.resources.get(resource) {
            Some(value) => Ok(value.clone()),
            None => Err(Rejection::Message(format!("unknown resource '{}'", resource))),
        };
        Box::pin(future::ready(result))
    }
}
