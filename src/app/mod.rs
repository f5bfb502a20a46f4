//! Application object: pages, dispatch and startup wiring.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     PageRegistry + Router + DataProvider
//!     → Application::new (route check, page preflight)
//!     → Application::build_chain (compiler → manifest → MiddlewareChain)
//!
//! Per request (terminal middleware):
//!     Application::dispatch → page → store → coordinator → response
//! ```

pub mod application;
pub mod page;

pub use application::{build_provider, Application};
pub use page::{
    Page, PageCapabilities, PageContext, PageFactory, PageRegistry, PageRequest, RegisteredPage, RegistryError,
};
