//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, limits, favicon)
//!     → exchange.rs (request + buffered response writer)
//!     → middleware.rs (chain: compiler middleware, then the application)
//!     → response.rs (rendered page → status, headers, cookies, body)
//!     → error_handler.rs (one boundary per request)
//!     → Send to client
//! ```

pub mod cookies;
pub mod error_handler;
pub mod exchange;
pub mod middleware;
pub mod response;
pub mod server;

pub use cookies::{CookieJar, SameSite, SetCookie};
pub use error_handler::{DefaultErrorHandler, ErrorHandler};
pub use exchange::{Exchange, ResponseWriter, HTML_CONTENT_TYPE};
pub use middleware::{Middleware, MiddlewareChain, Next};
pub use response::write_render_outcome;
pub use server::HttpServer;
