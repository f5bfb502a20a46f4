//! Client runtime.
//!
//! # Responsibilities
//! - Own the page-load store, seeded from the server snapshot
//! - Register segments and connect consumers against that store
//! - Apply client-side loads started by eager subscriptions
//!
//! # Design Decisions
//! - One runtime value per page load, passed explicitly; no ambient state
//! - The store runs in `ClientInteractive` mode from bootstrap on
//! - With hot reload enabled, a reloaded segment definition replaces the
//!   old one and keeps its state

use std::sync::Arc;

use serde_json::Value;

use crate::data::DataProvider;
use crate::render::document::extract_state;
use crate::store::{
    Action, ActionCreator, Connect, Connection, Props, Rejection, RenderMode, Segment, SegmentStore, StoreError,
};

/// The state snapshot embedded in a server-rendered document.
pub fn snapshot_from_html(html: &str) -> Option<Value> {
    extract_state(html)
}

pub struct ClientRuntime {
    store: SegmentStore,
    hot_reload: bool,
}

impl ClientRuntime {
    /// Create the page-load store, restoring `snapshot` when present.
    pub fn bootstrap(
        snapshot: Option<&Value>,
        provider: Arc<dyn DataProvider>,
        hot_reload: bool,
    ) -> Result<Self, StoreError> {
        let mut store = SegmentStore::new(provider).without_discovery();
        if let Some(snapshot) = snapshot {
            store.restore(snapshot)?;
        }
        store.set_render_mode(RenderMode::ClientInteractive);
        tracing::debug!(hot_reload, restored = snapshot.is_some(), "Client runtime started");
        Ok(Self { store, hot_reload })
    }

    /// Bootstrap from a server-rendered document.
    pub fn from_html(html: &str, provider: Arc<dyn DataProvider>, hot_reload: bool) -> Result<Self, StoreError> {
        let snapshot = snapshot_from_html(html);
        Self::bootstrap(snapshot.as_ref(), provider, hot_reload)
    }

    pub fn hot_reload(&self) -> bool {
        self.hot_reload
    }

    pub fn register(&mut self, segment: Arc<dyn Segment>) -> Result<ActionCreator, StoreError> {
        match self.store.register(segment.clone()) {
            Err(StoreError::ConflictingSegment(_)) if self.hot_reload => Ok(self.store.replace_definition(segment)),
            other => other,
        }
    }

    /// Wrap `consumer` and run its first subscription pass.
    pub fn connect<C: Connect>(&mut self, consumer: C, props: Props) -> Result<Connection<C>, StoreError> {
        let mut connection = Connection::new(&mut self.store, consumer);
        connection.mount(&mut self.store, props)?;
        Ok(connection)
    }

    pub fn receive_props<C: Connect>(&mut self, connection: &mut Connection<C>, props: Props) -> Result<bool, StoreError> {
        connection.receive_props(&mut self.store, props)
    }

    pub fn disconnect<C: Connect>(&mut self, connection: &mut Connection<C>) {
        connection.unmount(&mut self.store);
    }

    pub fn dispatch(&mut self, action: Action) -> Result<(), StoreError> {
        self.store.dispatch(action)
    }

    /// Apply loads that already finished.
    pub fn poll(&mut self) -> Result<usize, Rejection> {
        self.store.apply_completed_loads()
    }

    /// Wait for every in-flight load and apply it.
    pub async fn settle(&mut self) -> Result<usize, Rejection> {
        self.store.settle().await
    }

    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SegmentStore {
        &mut self.store
    }
}

impl std::fmt::Debug for ClientRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRuntime")
            .field("store", &self.store)
            .field("hot_reload", &self.hot_reload)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::PageDependencies;
    use crate::data::StaticDataProvider;
    use crate::render::Document;
    use crate::store::{HydrationPolicy, LoadFuture, Subscriber};
    use serde_json::json;

    struct Counter {
        step: i64,
    }

    impl Segment for Counter {
        fn id(&self) -> &str {
            "counter"
        }

        fn reduce(&self, state: &Value, action: &Action) -> Value {
            match action.kind.as_str() {
                "loaded" => action.payload.clone(),
                "increment" => json!({"count": state["count"].as_i64().unwrap_or(0) + self.step}),
                _ => state.clone(),
            }
        }

        fn load(&self, _query: &Value, state: &Value, provider: &Arc<dyn DataProvider>) -> Option<LoadFuture> {
            if !state.is_null() {
                return None;
            }
            let fetch = provider.fetch("counter", &Value::Null);
            Some(Box::pin(async move {
                Ok(Action {
                    segment_id: "counter".into(),
                    kind: "loaded".into(),
                    payload: fetch.await?,
                })
            }))
        }
    }

    struct CountView;

    impl Connect for CountView {
        fn subscribe_queries(&self, _props: &Props, subscriber: &mut Subscriber<'_>) -> Result<(), StoreError> {
            subscriber.subscribe("count", "counter", Value::Null, HydrationPolicy::Eager)?;
            Ok(())
        }
    }

    fn provider() -> Arc<dyn DataProvider> {
        Arc::new(StaticDataProvider::default().with("counter", json!({"count": 5})))
    }

    #[tokio::test]
    async fn test_bootstrap_from_server_document() {
        let state = json!({"counter": {"count": 1}});
        let html = Document::new(&PageDependencies::default())
            .body("<p>1</p>")
            .state(Some(&state))
            .render();

        let mut runtime = ClientRuntime::from_html(&html, provider(), false).unwrap();
        assert_eq!(runtime.store().render_mode(), RenderMode::ClientInteractive);

        let creator = runtime.register(Arc::new(Counter { step: 1 })).unwrap();
        let mut view = runtime.connect(CountView, Props::new()).unwrap();
        assert_eq!(view.result("count").unwrap().data, json!({"count": 1}));

        // Restored state means no client load.
        assert_eq!(runtime.settle().await.unwrap(), 0);

        runtime.dispatch(creator.create("increment", Value::Null)).unwrap();
        assert_eq!(view.result("count").unwrap().data, json!({"count": 2}));
        assert_eq!(view.updates(), 1);

        runtime.disconnect(&mut view);
        assert_eq!(runtime.store().subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_eager_subscribe_loads_on_client() {
        let mut runtime = ClientRuntime::bootstrap(None, provider(), false).unwrap();
        runtime.register(Arc::new(Counter { step: 1 })).unwrap();
        let view = runtime.connect(CountView, Props::new()).unwrap();
        assert!(!view.result("count").unwrap().loaded);

        assert_eq!(runtime.settle().await.unwrap(), 1);
        assert_eq!(view.result("count").unwrap().data, json!({"count": 5}));
    }

    #[test]
    fn test_hot_reload_replaces_definition() {
        let snapshot = json!({"counter": {"count": 10}});
        let mut strict = ClientRuntime::bootstrap(Some(&snapshot), provider(), false).unwrap();
        strict.register(Arc::new(Counter { step: 1 })).unwrap();
        assert!(strict.register(Arc::new(Counter { step: 5 })).is_err());

        let mut runtime = ClientRuntime::bootstrap(Some(&snapshot), provider(), true).unwrap();
        runtime.register(Arc::new(Counter { step: 1 })).unwrap();
        let creator = runtime.register(Arc::new(Counter { step: 5 })).unwrap();
        runtime.dispatch(creator.create("increment", Value::Null)).unwrap();
        assert_eq!(runtime.store().get_state(), json!({"counter": {"count": 15}}));
    }
}
