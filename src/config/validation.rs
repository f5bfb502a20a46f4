//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (status codes, timeouts, addresses)
//! - Detect duplicate route names and unparsable path patterns
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SoyaConfig → Result<(), Vec<ValidationError>>
//! - Page ids are checked later, against the registry, at application start

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::SoyaConfig;
use crate::routing::PathPattern;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("error status {0} is not a 4xx/5xx code")]
    ErrorStatus(u16),

    #[error("duplicate route name '{0}'")]
    DuplicateRoute(String),

    #[error("route '{name}' has an invalid path pattern: {reason}")]
    RoutePattern { name: String, reason: String },

    #[error("route '{0}' has an empty page id")]
    EmptyPage(String),

    #[error("asset url prefix '{0}' must start with '/'")]
    AssetPrefix(String),

    #[error("unknown log format '{0}'")]
    LogFormat(String),
}

pub fn validate_config(config: &SoyaConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.server.bind_address.clone()));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if !(400..=599).contains(&config.render.error_status) {
        errors.push(ValidationError::ErrorStatus(config.render.error_status));
    }
    if !config.compiler.asset_url_prefix.starts_with('/') {
        errors.push(ValidationError::AssetPrefix(config.compiler.asset_url_prefix.clone()));
    }

    let mut names = HashSet::new();
    for route in &config.routes {
        if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }
        if let Err(reason) = PathPattern::parse(&route.path) {
            errors.push(ValidationError::RoutePattern {
                name: route.name.clone(),
                reason,
            });
        }
        if route.page.trim().is_empty() {
            errors.push(ValidationError::EmptyPage(route.name.clone()));
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }
    if !matches!(observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::LogFormat(observability.log_format.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
