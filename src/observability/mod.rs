//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Application::dispatch  → record_request (status, page, latency)
//! RenderCoordinator      → record_hydration, record_render_failure
//! every subsystem        → tracing events
//!
//! tracing events → logging.rs (pretty or JSON on stdout)
//! metrics        → metrics.rs (Prometheus scrape listener)
//! ```
//!
//! # Design Decisions
//! - The request id from the `x-request-id` header appears on request logs
//! - Metrics calls are no-ops until a recorder is installed, so tests and
//!   library users pay nothing

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
