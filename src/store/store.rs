//! The per-request segment store.
//!
//! # Responsibilities
//! - Hold segment definitions and their current state
//! - Track subscriptions keyed by (consumer, slot)
//! - Fire callbacks on mutation, depending on the render mode
//! - Queue eager loads for hydration (server) or run them (client)
//!
//! # Render Modes
//! ```text
//! Discovery          no notifications, eager loads queued for hydrate()
//! ServerHydrate      no notifications, no loads
//! ClientInteractive  every dispatch notifies, eager loads spawned
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use futures_util::future::try_join_all;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::data::DataProvider;
use crate::store::error::{Rejection, StoreError};
use crate::store::segment::{Action, ActionCreator, HydrationPolicy, LoadFuture, QueryResult, Segment};

/// Store-wide behavior switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Discovery,
    ServerHydrate,
    ClientInteractive,
}

/// Identity of a subscribing consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsumerId(u64);

impl ConsumerId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer-{}", self.0)
    }
}

/// Identity of a single subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Payload delivered to subscription callbacks.
#[derive(Debug, Clone)]
pub struct Notification {
    pub consumer: ConsumerId,
    pub slot: String,
    pub segment_id: String,
    pub result: QueryResult,
}

/// Callback fired when a subscribed segment changes.
pub type Callback = Arc<dyn Fn(&Notification) + Send + Sync>;

/// Returned by [`SegmentStore::subscribe`].
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    pub result: QueryResult,
}

struct Subscription {
    id: SubscriptionId,
    segment_id: String,
    query: Value,
    callback: Callback,
}

struct PendingLoad {
    segment_id: String,
    future: LoadFuture,
}

type CompletedLoad = (String, Result<Action, Rejection>);

/// State container scoped to one request (server) or one page load (client).
pub struct SegmentStore {
    definitions: HashMap<String, Arc<dyn Segment>>,
    states: BTreeMap<String, Value>,
    seeded: Map<String, Value>,
    mode: RenderMode,
    subscriptions: BTreeMap<ConsumerId, BTreeMap<String, Subscription>>,
    pending: Vec<PendingLoad>,
    load_keys: HashSet<(String, String)>,
    completed_tx: mpsc::UnboundedSender<CompletedLoad>,
    completed_rx: mpsc::UnboundedReceiver<CompletedLoad>,
    in_flight: usize,
    provider: Arc<dyn DataProvider>,
    needs_discovery: bool,
    next_subscription: u64,
    next_consumer: u64,
}

impl SegmentStore {
    /// Create an empty store in `Discovery` mode.
    pub fn new(provider: Arc<dyn DataProvider>) -> Self {
        let (completed_tx, completed_rx) = mpsc::unbounded_channel();
        Self {
            definitions: HashMap::new(),
            states: BTreeMap::new(),
            seeded: Map::new(),
            mode: RenderMode::Discovery,
            subscriptions: BTreeMap::new(),
            pending: Vec::new(),
            load_keys: HashSet::new(),
            completed_tx,
            completed_rx,
            in_flight: 0,
            provider,
            needs_discovery: true,
            next_subscription: 0,
            next_consumer: 0,
        }
    }

    /// Mark the store as not needing a discovery render before hydration.
    pub fn without_discovery(mut self) -> Self {
        self.needs_discovery = false;
        self
    }

    pub fn needs_discovery(&self) -> bool {
        self.needs_discovery
    }

    pub fn render_mode(&self) -> RenderMode {
        self.mode
    }

    pub(crate) fn set_render_mode(&mut self, mode: RenderMode) {
        if self.mode != mode {
            tracing::trace!(from = ?self.mode, to = ?mode, "Store render mode changed");
        }
        self.mode = mode;
    }

    /// Allocate a consumer identity unique within this store.
    pub fn next_consumer_id(&mut self) -> ConsumerId {
        self.next_consumer += 1;
        ConsumerId(self.next_consumer)
    }

    /// Register a segment definition.
    ///
    /// Registering the same `Arc` again is a no-op; a different definition
    /// under an existing id is rejected.
    pub fn register(&mut self, segment: Arc<dyn Segment>) -> Result<ActionCreator, StoreError> {
        let id = segment.id().to_string();

        if let Some(existing) = self.definitions.get(&id) {
            if std::ptr::addr_eq(Arc::as_ptr(existing), Arc::as_ptr(&segment)) {
                return Ok(ActionCreator::new(id));
            }
            return Err(StoreError::ConflictingSegment(id));
        }

        let state = self
            .seeded
            .remove(&id)
            .unwrap_or_else(|| segment.initial_state());
        self.states.insert(id.clone(), state);
        self.definitions.insert(id.clone(), segment);

        tracing::trace!(segment = %id, "Segment registered");
        Ok(ActionCreator::new(id))
    }

    /// Swap the definition under an existing id, keeping its state. Used by
    /// hot reload, where a reloaded module brings a new definition.
    pub(crate) fn replace_definition(&mut self, segment: Arc<dyn Segment>) -> ActionCreator {
        let id = segment.id().to_string();
        if !self.states.contains_key(&id) {
            let state = self
                .seeded
                .remove(&id)
                .unwrap_or_else(|| segment.initial_state());
            self.states.insert(id.clone(), state);
        }
        self.definitions.insert(id.clone(), segment);
        tracing::debug!(segment = %id, "Segment definition replaced");
        ActionCreator::new(id)
    }

    pub fn is_registered(&self, segment_id: &str) -> bool {
        self.definitions.contains_key(segment_id)
    }

    /// Subscribe `consumer` to `query` over `segment_id` under `slot`.
    ///
    /// An existing subscription in the same slot is torn down first. The
    /// current query result is returned synchronously.
    pub fn subscribe(
        &mut self,
        segment_id: &str,
        query: Value,
        callback: Callback,
        consumer: ConsumerId,
        slot: &str,
        policy: HydrationPolicy,
    ) -> Result<SubscriptionHandle, StoreError> {
        let segment = self
            .definitions
            .get(segment_id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownSegment(segment_id.to_string()))?;

        self.remove_slot(consumer, slot);

        let state = self.state_of(segment_id);
        let result = segment.query(&state, &query);

        if policy == HydrationPolicy::Eager {
            self.start_load(&segment, &query, &state);
        }

        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscriptions.entry(consumer).or_default().insert(
            slot.to_string(),
            Subscription {
                id,
                segment_id: segment_id.to_string(),
                query,
                callback,
            },
        );

        Ok(SubscriptionHandle { id, result })
    }

    /// Remove every subscription owned by `consumer`. Returns how many were
    /// removed; zero is not an error.
    pub fn unsubscribe(&mut self, consumer: ConsumerId) -> usize {
        self.subscriptions
            .remove(&consumer)
            .map(|slots| slots.len())
            .unwrap_or(0)
    }

    /// Remove a single subscription by id.
    pub fn unsubscribe_one(&mut self, id: SubscriptionId) -> bool {
        let mut found = None;
        for (consumer, slots) in &self.subscriptions {
            if let Some((slot, _)) = slots.iter().find(|(_, s)| s.id == id) {
                found = Some((*consumer, slot.clone()));
                break;
            }
        }
        match found {
            Some((consumer, slot)) => self.remove_slot(consumer, &slot),
            None => false,
        }
    }

    fn remove_slot(&mut self, consumer: ConsumerId, slot: &str) -> bool {
        let Some(slots) = self.subscriptions.get_mut(&consumer) else {
            return false;
        };
        let removed = slots.remove(slot).is_some();
        if slots.is_empty() {
            self.subscriptions.remove(&consumer);
        }
        removed
    }

    /// Total number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.values().map(|slots| slots.len()).sum()
    }

    /// Slot names currently held by `consumer`.
    pub fn subscriptions_of(&self, consumer: ConsumerId) -> Vec<String> {
        self.subscriptions
            .get(&consumer)
            .map(|slots| slots.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Apply `action` to its segment.
    pub fn dispatch(&mut self, action: Action) -> Result<(), StoreError> {
        let segment = self
            .definitions
            .get(&action.segment_id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownSegment(action.segment_id.clone()))?;

        let current = self.state_of(&action.segment_id);
        let next = segment.reduce(&current, &action);
        self.states.insert(action.segment_id.clone(), next);

        if self.mode == RenderMode::ClientInteractive {
            self.notify(&segment);
        }
        Ok(())
    }

    fn notify(&self, segment: &Arc<dyn Segment>) {
        let segment_id = segment.id();
        let state = self.state_of(segment_id);

        for (consumer, slots) in &self.subscriptions {
            for (slot, subscription) in slots {
                if subscription.segment_id != segment_id {
                    continue;
                }
                let notification = Notification {
                    consumer: *consumer,
                    slot: slot.clone(),
                    segment_id: segment_id.to_string(),
                    result: segment.query(&state, &subscription.query),
                };
                (subscription.callback)(&notification);
            }
        }
    }

    fn state_of(&self, segment_id: &str) -> Value {
        self.states.get(segment_id).cloned().unwrap_or(Value::Null)
    }

    fn start_load(&mut self, segment: &Arc<dyn Segment>, query: &Value, state: &Value) {
        if self.mode == RenderMode::ServerHydrate {
            return;
        }

        let key = (segment.id().to_string(), query.to_string());
        if self.load_keys.contains(&key) {
            return;
        }
        let Some(future) = segment.load(query, state, &self.provider) else {
            return;
        };
        self.load_keys.insert(key);

        match (self.mode, tokio::runtime::Handle::try_current()) {
            (RenderMode::ClientInteractive, Ok(handle)) => {
                let tx = self.completed_tx.clone();
                let segment_id = segment.id().to_string();
                self.in_flight += 1;
                handle.spawn(async move {
                    let outcome = future.await;
                    let _ = tx.send((segment_id, outcome));
                });
            }
            _ => self.pending.push(PendingLoad {
                segment_id: segment.id().to_string(),
                future,
            }),
        }
    }

    /// Number of loads queued for the next `hydrate()`.
    pub fn pending_loads(&self) -> usize {
        self.pending.len()
    }

    /// Resolve every queued load and apply the resulting actions.
    ///
    /// Resolves immediately when nothing is queued. The first failing load
    /// rejects the whole step and no action is applied.
    pub async fn hydrate(&mut self) -> Result<(), Rejection> {
        let pending = std::mem::take(&mut self.pending);
        self.load_keys.clear();

        if pending.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            loads = pending.len(),
            segments = ?pending.iter().map(|p| p.segment_id.as_str()).collect::<Vec<_>>(),
            "Hydrating store"
        );

        let actions = try_join_all(pending.into_iter().map(|p| p.future)).await?;
        for action in actions {
            self.dispatch(action)?;
        }
        Ok(())
    }

    /// Apply client-side loads that have finished, without waiting.
    pub fn apply_completed_loads(&mut self) -> Result<usize, Rejection> {
        let mut applied = 0;
        while let Ok(completed) = self.completed_rx.try_recv() {
            applied += self.apply_completed(completed)?;
        }
        Ok(applied)
    }

    /// Wait for every in-flight client load and apply it.
    pub async fn settle(&mut self) -> Result<usize, Rejection> {
        let mut applied = 0;
        while self.in_flight > 0 {
            match self.completed_rx.recv().await {
                Some(completed) => applied += self.apply_completed(completed)?,
                None => break,
            }
        }
        Ok(applied)
    }

    fn apply_completed(&mut self, (segment_id, outcome): CompletedLoad) -> Result<usize, Rejection> {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.load_keys.retain(|(id, _)| id != &segment_id);
        let action = outcome?;
        self.dispatch(action)?;
        Ok(1)
    }

    /// Serializable snapshot: segment id → state.
    pub fn get_state(&self) -> Value {
        let map: Map<String, Value> = self
            .states
            .iter()
            .map(|(id, state)| (id.clone(), state.clone()))
            .collect();
        Value::Object(map)
    }

    /// Seed state from a server snapshot.
    ///
    /// Registered segments take the value immediately; the rest pick it up
    /// when they register.
    pub fn restore(&mut self, snapshot: &Value) -> Result<(), StoreError> {
        let Value::Object(map) = snapshot else {
            return Err(StoreError::InvalidSnapshot(json_kind(snapshot)));
        };
        for (id, state) in map {
            if self.definitions.contains_key(id) {
                self.states.insert(id.clone(), state.clone());
            } else {
                self.seeded.insert(id.clone(), state.clone());
            }
        }
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl fmt::Debug for SegmentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentStore")
            .field("segments", &self.states.keys().collect::<Vec<_>>())
            .field("mode", &self.mode)
            .field("subscriptions", &self.subscription_count())
            .field("pending_loads", &self.pending.len())
            .field("in_flight", &self.in_flight)
            .finish()
    }
}
