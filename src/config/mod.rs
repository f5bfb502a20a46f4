//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SoyaConfig (validated, immutable)
//!     → read once at startup by the binary
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only the asset manifest hot-reloads
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CompilerConfig, DataConfig, ObservabilityConfig, RenderConfig, RouteConfig, ServerConfig,
    SoyaConfig, SupervisorConfig, SupervisorMode,
};
pub use validation::ValidationError;
