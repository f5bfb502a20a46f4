//! What a page hands back to the coordinator, and what the coordinator
//! hands back to the dispatcher.

use axum::http::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::compiler::PageDependencies;
use crate::render::phase::RenderPhase;
use crate::store::StoreError;

/// Errors raised by page code.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("{0}")]
    Render(String),

    #[error("page requires a store during the {0} pass but none was provided")]
    MissingStore(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Renders page content; supplied by the UI layer.
pub trait ContentRenderer: Send + Sync {
    fn render(&self, deps: &PageDependencies, phase: &mut RenderPhase<'_>) -> Result<String, PageError>;
}

/// Result of `Page::render`: response metadata plus a content renderer bound
/// to the route arguments.
pub struct RenderResult {
    pub status: StatusCode,
    pub status_message: Option<String>,
    pub headers: Vec<(String, String)>,
    pub content: Box<dyn ContentRenderer>,
}

impl RenderResult {
    pub fn new(content: impl ContentRenderer + 'static) -> Self {
        Self {
            status: StatusCode::OK,
            status_message: None,
            headers: Vec::new(),
            content: Box::new(content),
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_status_message(mut self, message: impl Into<String>) -> Self {
        self.status_message = Some(message.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl std::fmt::Debug for RenderResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderResult")
            .field("status", &self.status)
            .field("status_message", &self.status_message)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Fully rendered response, ready to be written.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub status: StatusCode,
    pub status_message: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Hydrated snapshot shipped to the client, if the page had a store.
    pub state: Option<Value>,
}
