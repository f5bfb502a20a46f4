//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, query)
//!     → router.rs (route lookup)
//!     → matcher.rs (host + path pattern conditions)
//!     → Return: RouteResult { page_id, args } or NoMatch
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Parse path patterns
//!     → Sort by priority (stable)
//!     → Freeze as immutable PatternRouter
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by priority)

pub mod matcher;
pub mod router;

pub use matcher::{HostMatcher, PathPattern};
pub use router::{PatternRouter, RouteArgs, RouteError, RouteResult, Router};
