//! Consumer-side subscription management.
//!
//! A [`Connection`] wraps a consumer and owns its slot subscriptions. When
//! new props arrive it asks the consumer whether its data dependencies
//! changed; only then does it tear down and re-declare the subscriptions.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::store::error::StoreError;
use crate::store::segment::{HydrationPolicy, QueryResult};
use crate::store::store::{Callback, ConsumerId, Notification, SegmentStore};

/// The connected props of a consumer.
///
/// Values are reference counted so that "the same value" can be told apart
/// from "an equal value" the way a shallow comparison expects.
#[derive(Debug, Clone, Default)]
pub struct Props {
    values: BTreeMap<String, Arc<Value>>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly allocated value.
    pub fn with(self, key: impl Into<String>, value: Value) -> Self {
        self.with_shared(key, Arc::new(value))
    }

    /// Insert an already shared value.
    pub fn with_shared(mut self, key: impl Into<String>, value: Arc<Value>) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).map(|v| v.as_ref())
    }

    pub fn shared(&self, key: &str) -> Option<&Arc<Value>> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Same keys, and per key either the same allocation or equal scalars.
pub fn shallow_equal(prev: &Props, next: &Props) -> bool {
    if prev.values.len() != next.values.len() {
        return false;
    }
    prev.values.iter().all(|(key, a)| match next.values.get(key) {
        Some(b) => Arc::ptr_eq(a, b) || scalar_eq(a, b),
        None => false,
    })
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        _ => false,
    }
}

/// A consumer that declares data subscriptions from its props.
pub trait Connect: Send {
    /// Declare the subscriptions these props need.
    fn subscribe_queries(&self, props: &Props, subscriber: &mut Subscriber<'_>) -> Result<(), StoreError>;

    /// Whether moving from `prev` to `next` requires re-subscribing.
    fn should_resubscribe(&self, prev: &Props, next: &Props) -> bool {
        !shallow_equal(prev, next)
    }
}

#[derive(Debug, Default)]
struct ConnectionResults {
    results: BTreeMap<String, QueryResult>,
    updates: u64,
}

/// Subscription surface handed to [`Connect::subscribe_queries`].
pub struct Subscriber<'s> {
    store: &'s mut SegmentStore,
    consumer: ConsumerId,
    sink: Arc<Mutex<ConnectionResults>>,
}

impl Subscriber<'_> {
    /// Subscribe `slot` to `query` over `segment_id`. Returns the current
    /// result; later changes arrive through the connection.
    pub fn subscribe(
        &mut self,
        slot: &str,
        segment_id: &str,
        query: Value,
        policy: HydrationPolicy,
    ) -> Result<QueryResult, StoreError> {
        let sink = self.sink.clone();
        let callback: Callback = Arc::new(move |notification: &Notification| {
            let mut results = sink.lock().expect("connection results mutex poisoned");
            results
                .results
                .insert(notification.slot.clone(), notification.result.clone());
            results.updates += 1;
        });

        let handle = self
            .store
            .subscribe(segment_id, query, callback, self.consumer, slot, policy)?;

        self.sink
            .lock()
            .expect("connection results mutex poisoned")
            .results
            .insert(slot.to_string(), handle.result.clone());

        Ok(handle.result)
    }

    pub fn consumer(&self) -> ConsumerId {
        self.consumer
    }
}

/// A consumer bound to a store.
pub struct Connection<C: Connect> {
    consumer: ConsumerId,
    inner: C,
    props: Option<Props>,
    results: Arc<Mutex<ConnectionResults>>,
    passes: u64,
}

impl<C: Connect> Connection<C> {
    /// Wrap `inner`, allocating a consumer identity from `store`.
    pub fn new(store: &mut SegmentStore, inner: C) -> Self {
        Self {
            consumer: store.next_consumer_id(),
            inner,
            props: None,
            results: Arc::new(Mutex::new(ConnectionResults::default())),
            passes: 0,
        }
    }

    pub fn consumer_id(&self) -> ConsumerId {
        self.consumer
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// First subscription pass.
    pub fn mount(&mut self, store: &mut SegmentStore, props: Props) -> Result<(), StoreError> {
        self.run_subscriptions(store, &props)?;
        self.props = Some(props);
        Ok(())
    }

    /// Handle new props. Returns `true` when subscriptions were rebuilt.
    pub fn receive_props(&mut self, store: &mut SegmentStore, props: Props) -> Result<bool, StoreError> {
        let resubscribe = match &self.props {
            Some(prev) => self.inner.should_resubscribe(prev, &props),
            None => true,
        };

        if resubscribe {
            let removed = store.unsubscribe(self.consumer);
            tracing::trace!(consumer = %self.consumer, removed, "Props changed, resubscribing");
            self.lock_results().results.clear();
            self.run_subscriptions(store, &props)?;
        }
        self.props = Some(props);
        Ok(resubscribe)
    }

    /// Drop every subscription this consumer holds.
    pub fn unmount(&mut self, store: &mut SegmentStore) {
        store.unsubscribe(self.consumer);
        self.lock_results().results.clear();
        self.props = None;
    }

    fn run_subscriptions(&mut self, store: &mut SegmentStore, props: &Props) -> Result<(), StoreError> {
        let mut subscriber = Subscriber {
            store,
            consumer: self.consumer,
            sink: self.results.clone(),
        };
        self.inner.subscribe_queries(props, &mut subscriber)?;
        self.passes += 1;
        Ok(())
    }

    fn lock_results(&self) -> std::sync::MutexGuard<'_, ConnectionResults> {
        self.results.lock().expect("connection results mutex poisoned")
    }

    /// Current result for `slot`.
    pub fn result(&self, slot: &str) -> Option<QueryResult> {
        self.lock_results().results.get(slot).cloned()
    }

    /// All current results keyed by slot.
    pub fn results(&self) -> BTreeMap<String, QueryResult> {
        self.lock_results().results.clone()
    }

    /// Number of change notifications received so far.
    pub fn updates(&self) -> u64 {
        self.lock_results().updates
    }

    /// Number of subscription passes run (mount plus resubscriptions).
    pub fn subscription_passes(&self) -> u64 {
        self.passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataProvider, StaticDataProvider};
    use crate::store::segment::{Action, Segment};
    use serde_json::json;

    struct Posts;

    impl Segment for Posts {
        fn id(&self) -> &str {
            "posts"
        }

        fn initial_state(&self) -> Value {
            json!({})
        }

        fn reduce(&self, state: &Value, action: &Action) -> Value {
            let mut next = state.clone();
            if let (Some(map), Some(id)) = (next.as_object_mut(), action.payload["id"].as_str()) {
                map.insert(id.to_string(), action.payload.clone());
            }
            next
        }

        fn query(&self, state: &Value, query: &Value) -> QueryResult {
            match query.as_str().and_then(|id| state.get(id)) {
                Some(post) => QueryResult::loaded(post.clone()),
                None => QueryResult::pending(),
            }
        }
    }

    struct PostView;

    impl Connect for PostView {
        fn subscribe_queries(&self, props: &Props, subscriber: &mut Subscriber<'_>) -> Result<(), StoreError> {
            let id = props.get("id").cloned().unwrap_or(Value::Null);
            subscriber.subscribe("post", "posts", id.clone(), HydrationPolicy::Never)?;
            // Same slot twice in one pass collapses to the latter.
            subscriber.subscribe("post", "posts", id, HydrationPolicy::Never)?;
            Ok(())
        }
    }

    fn store() -> SegmentStore {
        let provider: Arc<dyn DataProvider> = Arc::new(StaticDataProvider::default());
        let mut store = SegmentStore::new(provider);
        store.register(Arc::new(Posts)).unwrap();
        store
    }

    #[test]
    fn test_shallow_equal_semantics() {
        let shared = Arc::new(json!({"deep": [1, 2]}));
        let a = Props::new().with("id", json!("p1")).with_shared("filter", shared.clone());
        let b = Props::new().with("id", json!("p1")).with_shared("filter", shared);
        assert!(shallow_equal(&a, &b));

        // Equal but separately allocated objects are not shallow-equal.
        let c = Props::new().with("id", json!("p1")).with("filter", json!({"deep": [1, 2]}));
        assert!(!shallow_equal(&a, &c));

        let d = Props::new().with("id", json!("p1"));
        assert!(!shallow_equal(&a, &d));
    }

    #[test]
    fn test_shallow_equal_props_keep_subscriptions() {
        let mut store = store();
        let mut conn = Connection::new(&mut store, PostView);
        conn.mount(&mut store, Props::new().with("id", json!("p1"))).unwrap();
        assert_eq!(conn.subscription_passes(), 1);

        // A new Props value with equal scalars: no churn.
        let changed = conn
            .receive_props(&mut store, Props::new().with("id", json!("p1")))
            .unwrap();
        assert!(!changed);
        assert_eq!(conn.subscription_passes(), 1);
        assert_eq!(store.subscription_count(), 1);
    }

    #[test]
    fn test_changed_props_resubscribe() {
        let mut store = store();
        let mut conn = Connection::new(&mut store, PostView);
        conn.mount(&mut store, Props::new().with("id", json!("p1"))).unwrap();

        let changed = conn
            .receive_props(&mut store, Props::new().with("id", json!("p2")))
            .unwrap();
        assert!(changed);
        assert_eq!(conn.subscription_passes(), 2);
        assert_eq!(store.subscriptions_of(conn.consumer_id()), vec!["post".to_string()]);
        assert_eq!(store.subscription_count(), 1);
    }

    #[test]
    fn test_notifications_update_results() {
        let mut store = store();
        store.set_render_mode(crate::store::RenderMode::ClientInteractive);
        let mut conn = Connection::new(&mut store, PostView);
        conn.mount(&mut store, Props::new().with("id", json!("p1"))).unwrap();
        assert_eq!(conn.result("post"), Some(QueryResult::pending()));

        store
            .dispatch(Action {
                segment_id: "posts".into(),
                kind: "add".into(),
                payload: json!({"id": "p1", "title": "Hello"}),
            })
            .unwrap();

        assert_eq!(conn.updates(), 1);
        assert_eq!(conn.result("post").unwrap().data["title"], json!("Hello"));
    }

    #[test]
    fn test_unmount_clears_store() {
        let mut store = store();
        let mut conn = Connection::new(&mut store, PostView);
        conn.mount(&mut store, Props::new().with("id", json!("p1"))).unwrap();
        conn.unmount(&mut store);
        conn.unmount(&mut store);
        assert_eq!(store.subscription_count(), 0);
        assert!(conn.results().is_empty());
    }
}
