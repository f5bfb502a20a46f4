//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build application → Bind listener → ready.rs
//!
//! Shutdown (shutdown.rs):
//!     SIGTERM/SIGINT → broadcast → stop accepting → drain connections → exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then pages and compiler, then listener
//! - The ready signal goes out only after the listener is bound

pub mod ready;
pub mod shutdown;

pub use ready::ReadyNotifier;
pub use shutdown::Shutdown;
