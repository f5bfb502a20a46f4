//! Render/hydration subsystem.
//!
//! # Data Flow
//! ```text
//! Page::render → RenderResult (status, headers, ContentRenderer)
//!     → coordinator.rs
//!         discovery pass (phase.rs: RenderPhase::Discovery)
//!         store.hydrate()
//!         final pass (RenderPhase::Final with snapshot)
//!     → RenderOutcome (body, status, headers, state)
//!     → document.rs helps renderers wrap content in the HTML shell
//! ```

pub mod coordinator;
pub mod document;
pub mod phase;
pub mod result;

pub use coordinator::{CoordinatorState, RenderCoordinator, RenderError};
pub use document::Document;
pub use phase::RenderPhase;
pub use result::{ContentRenderer, PageError, RenderOutcome, RenderResult};
