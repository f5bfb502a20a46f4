//! Per-request error type.

use thiserror::Error;

use crate::render::{PageError, RenderError};
use crate::store::StoreError;

/// Everything that can end a request on the error path.
#[derive(Debug, Error)]
pub enum SoyaError {
    /// No route matched. A 404 is a route to a not-found page, so this is a
    /// routing configuration error.
    #[error("no route matches {method} {path}")]
    NoRoute { method: String, path: String },

    #[error("page '{0}' is not registered")]
    UnknownPage(String),

    #[error("no compiled dependencies for page '{0}'")]
    MissingDependencies(String),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Page(#[from] PageError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid response header '{0}'")]
    InvalidHeader(String),

    #[error("response headers already sent")]
    HeadersSent,

    #[error("middleware '{name}' failed: {message}")]
    Middleware { name: String, message: String },

    #[error("request handler panicked: {0}")]
    Panic(String),

    #[error("startup check failed: {0}")]
    Startup(String),
}

impl SoyaError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SoyaError::NoRoute { .. } => "no_route",
            SoyaError::UnknownPage(_) => "unknown_page",
            SoyaError::MissingDependencies(_) => "missing_dependencies",
            SoyaError::Render(err) => err.stage(),
            SoyaError::Page(_) => "page",
            SoyaError::Store(_) => "store",
            SoyaError::InvalidHeader(_) | SoyaError::HeadersSent => "response",
            SoyaError::Middleware { .. } => "middleware",
            SoyaError::Panic(_) => "panic",
            SoyaError::Startup(_) => "startup",
        }
    }
}
