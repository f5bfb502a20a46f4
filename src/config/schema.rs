//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SoyaConfig {
    /// Listener and transport settings.
    pub server: ServerConfig,

    /// Compiled asset handling.
    pub compiler: CompilerConfig,

    /// Route definitions mapping requests to pages.
    pub routes: Vec<RouteConfig>,

    /// Static pages: page id → template file.
    pub pages: BTreeMap<String, PathBuf>,

    /// Render and error-page settings.
    pub render: RenderConfig,

    /// Data provider used by segment loads.
    pub data: DataConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Supervising-process integration.
    pub supervisor: SupervisorConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// File served for `GET /favicon.ico`, outside the middleware chain.
    pub favicon_path: Option<PathBuf>,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            favicon_path: None,
            request_timeout_secs: 30,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Compiler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Read a prebuilt manifest instead of scanning the asset dir at boot.
    pub precompile: bool,

    /// Location of the JSON manifest.
    pub manifest_path: PathBuf,

    /// Directory holding compiled `.js`/`.css` files.
    pub asset_dir: PathBuf,

    /// URL prefix the assets are served under.
    pub asset_url_prefix: String,

    /// Reload the manifest when it changes on disk.
    pub hot_reload: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            precompile: false,
            manifest_path: PathBuf::from("build/manifest.json"),
            asset_dir: PathBuf::from("build/assets"),
            asset_url_prefix: "/assets".to_string(),
            hot_reload: false,
        }
    }
}

/// Route configuration mapping requests to pages.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging.
    pub name: String,

    /// Path pattern, e.g. `/users/{id}` or `/docs/{*rest}`.
    pub path: String,

    /// Host header to match (case-insensitive, port ignored).
    pub host: Option<String>,

    /// Page id the route resolves to.
    pub page: String,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,
}

/// Render configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Status used by the default error handler.
    pub error_status: u16,

    /// Include error details in error pages. Development only.
    pub expose_error_details: bool,

    /// Upper bound on hydration. Unbounded when absent.
    pub hydration_timeout_ms: Option<u64>,

    /// Register a lowest-priority catch-all route to the not-found page.
    pub not_found_route: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            error_status: 500,
            expose_error_details: false,
            hydration_timeout_ms: None,
            not_found_route: true,
        }
    }
}

/// Data provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataConfig {
    /// Base URL of the JSON API. In-memory resources are used when absent.
    pub api_base_url: Option<String>,

    /// API request timeout in seconds.
    pub timeout_secs: u64,

    /// In-memory resources: name → JSON value.
    pub resources: BTreeMap<String, serde_json::Value>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            timeout_secs: 10,
            resources: BTreeMap::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Where the "ready" signal goes once the listener is bound.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SupervisorMode {
    /// No supervising parent.
    None,
    /// Write `ready` on stdout.
    Stdout,
    /// Write `ready` on stdout only when `SOYA_SUPERVISED` is set.
    #[default]
    Auto,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SupervisorConfig {
    pub mode: SupervisorMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: SoyaConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.render.error_status, 500);
        assert!(config.render.hydration_timeout_ms.is_none());
        assert_eq!(config.supervisor.mode, SupervisorMode::Auto);
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_full_config_parses() {
        let config: SoyaConfig = toml::from_str(
            r#"
            [server]
            bind_address = "127.0.0.1:3000"
            favicon_path = "static/favicon.ico"

            [compiler]
            precompile = true
            manifest_path = "out/manifest.json"

            [[routes]]
            name = "user"
            path = "/users/{id}"
            page = "user"
            priority = 10

            [pages]
            about = "templates/about.html"

            [render]
            hydration_timeout_ms = 2500

            [data.resources]
            greeting = { text = "hi" }

            [supervisor]
            mode = "stdout"
            "#,
        )
        .unwrap();

        assert_eq!(config.routes[0].priority, 10);
        assert!(config.routes[0].host.is_none());
        assert_eq!(config.pages["about"], PathBuf::from("templates/about.html"));
        assert_eq!(config.render.hydration_timeout_ms, Some(2500));
        assert_eq!(config.data.resources["greeting"]["text"], "hi");
        assert_eq!(config.supervisor.mode, SupervisorMode::Stdout);
        assert!(config.compiler.precompile);
    }
}
