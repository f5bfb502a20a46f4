//! Segment store and subscription engine.
//!
//! # Data Flow
//! ```text
//! Page::create_store
//!     → store.rs (SegmentStore, one per request)
//!     → segment.rs (definitions registered, state seeded)
//!
//! Discovery render:
//!     Connection::mount (subscription.rs)
//!     → SegmentStore::subscribe (eager loads queued)
//!
//! Hydration:
//!     SegmentStore::hydrate → loads resolve → actions dispatched
//!
//! Final render:
//!     Connection::mount again, results read synchronously
//! ```
//!
//! # Design Decisions
//! - A store is exclusively owned by its request; no locks around it
//! - Slot name is the only subscription identity per consumer
//! - Notifications are gated by render mode, not by caller discipline

pub mod error;
pub mod segment;
#[allow(clippy::module_inception)]
pub mod store;
pub mod subscription;

pub use error::{HydrationError, Rejection, StoreError};
pub use segment::{Action, ActionCreator, HydrationPolicy, LoadFuture, QueryResult, Segment};
pub use store::{
    Callback, ConsumerId, Notification, RenderMode, SegmentStore, SubscriptionHandle, SubscriptionId,
};
pub use subscription::{shallow_equal, Connect, Connection, Props, Subscriber};
