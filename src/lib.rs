//! Soya: server-side rendering orchestration.
//!
//! Routing, a compiler abstraction, per-request page lifecycle and a
//! segment/query data-binding layer, combined into HTML responses with
//! hydrated client state.

pub mod app;
pub mod client;
pub mod compiler;
pub mod config;
pub mod data;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pages;
pub mod render;
pub mod routing;
pub mod store;

pub use app::{Application, Page, PageContext, PageFactory, PageRegistry, PageRequest};
pub use client::ClientRuntime;
pub use config::SoyaConfig;
pub use error::SoyaError;
pub use http::HttpServer;
pub use lifecycle::{ReadyNotifier, Shutdown};
pub use store::SegmentStore;
