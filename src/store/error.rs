//! Store and hydration error definitions.

use serde_json::Value;
use thiserror::Error;

/// Errors raised by synchronous store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Subscribe or dispatch against a segment that was never registered.
    #[error("segment '{0}' is not registered")]
    UnknownSegment(String),

    /// A different definition already owns this segment id.
    #[error("segment '{0}' is already registered with a different definition")]
    ConflictingSegment(String),

    /// The state snapshot handed to `restore` was not a JSON object.
    #[error("state snapshot must be a JSON object, got {0}")]
    InvalidSnapshot(&'static str),
}

/// The value a segment load future fails with.
///
/// Loads may fail with a real error, a bare message or an arbitrary JSON
/// value. All three are normalized into [`HydrationError`] before they reach
/// the error boundary.
#[derive(Debug)]
pub enum Rejection {
    Error(Box<dyn std::error::Error + Send + Sync>),
    Message(String),
    Value(Value),
}

impl Rejection {
    /// Wrap a concrete error.
    pub fn error(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Rejection::Error(Box::new(err))
    }
}

impl From<&str> for Rejection {
    fn from(message: &str) -> Self {
        Rejection::Message(message.to_string())
    }
}

impl From<String> for Rejection {
    fn from(message: String) -> Self {
        Rejection::Message(message)
    }
}

impl From<Value> for Rejection {
    fn from(value: Value) -> Self {
        Rejection::Value(value)
    }
}

impl From<StoreError> for Rejection {
    fn from(err: StoreError) -> Self {
        Rejection::error(err)
    }
}

/// A failed hydration step.
#[derive(Debug, Error)]
pub enum HydrationError {
    #[error("hydration failed: {0}")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("hydration rejected with non-error value: {0}")]
    NonError(String),

    #[error("hydration did not complete within {0} ms")]
    TimedOut(u64),
}

impl From<Rejection> for HydrationError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Error(err) => HydrationError::Failed(err),
            Rejection::Message(message) => HydrationError::NonError(message),
            Rejection::Value(Value::String(message)) => HydrationError::NonError(message),
            Rejection::Value(other) => HydrationError::NonError(other.to_string()),
        }
    }
}
