//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up matching route for request
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) pattern scan (acceptable for typical route counts)
//! - Explicit NoMatch rather than silent default; a 404 page is a route
//! - Query string arguments are merged into the route args, path params win

use std::collections::BTreeMap;

use axum::body::Body;
use axum::http::Request;
use thiserror::Error;

use crate::config::RouteConfig;
use crate::routing::matcher::{HostMatcher, PathPattern};

/// Arguments extracted by the router, handed to the page.
pub type RouteArgs = BTreeMap<String, String>;

/// A successful route: which page, with which arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteResult {
    pub page_id: String,
    pub args: RouteArgs,
}

/// Maps a request to a page.
pub trait Router: Send + Sync {
    fn route(&self, req: &Request<Body>) -> Option<RouteResult>;

    /// Every page id this router can produce.
    fn page_ids(&self) -> Vec<String>;
}

#[derive(Debug, Error)]
#[error("route '{name}': {reason}")]
pub struct RouteError {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
struct CompiledRoute {
    name: String,
    host: Option<HostMatcher>,
    pattern: PathPattern,
    page_id: String,
    priority: u32,
}

/// Router over configured path patterns.
#[derive(Debug, Clone, Default)]
pub struct PatternRouter {
    routes: Vec<CompiledRoute>,
}

impl PatternRouter {
    /// Compile routes. Higher priority is checked first; ties keep config order.
    pub fn from_config(routes: &[RouteConfig]) -> Result<Self, RouteError> {
        let mut compiled = routes
            .iter()
            .map(|route| {
                let pattern = PathPattern::parse(&route.path).map_err(|reason| RouteError {
                    name: route.name.clone(),
                    reason,
                })?;
                Ok(CompiledRoute {
                    name: route.name.clone(),
                    host: route.host.as_deref().map(HostMatcher::new),
                    pattern,
                    page_id: route.page.clone(),
                    priority: route.priority,
                })
            })
            .collect::<Result<Vec<_>, RouteError>>()?;

        compiled.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(Self { routes: compiled })
    }

    /// Append a catch-all route to `page_id`, checked after every other route.
    pub fn with_fallback(mut self, page_id: impl Into<String>) -> Self {
        let pattern = PathPattern::parse("/{*path}");
        if let Ok(pattern) = pattern {
            self.routes.push(CompiledRoute {
                name: "fallback".to_string(),
                host: None,
                pattern,
                page_id: page_id.into(),
                priority: 0,
            });
        }
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Router for PatternRouter {
    fn route(&self, req: &Request<Body>) -> Option<RouteResult> {
        let path = req.uri().path();
        for route in &self.routes {
            if let Some(host) = &route.host {
                if !host.matches(req) {
                    continue;
                }
            }
            let Some(params) = route.pattern.match_path(path) else {
                continue;
            };

            let mut args = query_args(req.uri().query());
            args.extend(params);
            tracing::trace!(route = %route.name, page = %route.page_id, "Route matched");
            return Some(RouteResult {
                page_id: route.page_id.clone(),
                args,
            });
        }
        None
    }

    fn page_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.routes.iter().map(|r| r.page_id.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

fn query_args(query: Option<&str>) -> RouteArgs {
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(name: &str, path: &str, page: &str, priority: u32) -> RouteConfig {
        RouteConfig {
            name: name.into(),
            path: path.into(),
            host: None,
            page: page.into(),
            priority,
        }
    }

    fn request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_priority_then_config_order() {
        let router = PatternRouter::from_config(&[
            route("generic", "/users/{id}", "user", 0),
            route("me", "/users/me", "profile", 10),
            route("shadowed", "/users/{name}", "other", 0),
        ])
        .unwrap();

        assert_eq!(router.route(&request("/users/me")).unwrap().page_id, "profile");
        let result = router.route(&request("/users/7")).unwrap();
        assert_eq!(result.page_id, "user");
        assert_eq!(result.args["id"], "7");
    }

    #[test]
    fn test_query_args_merge_with_path_winning() {
        let router = PatternRouter::from_config(&[route("user", "/users/{id}", "user", 0)]).unwrap();
        let result = router.route(&request("/users/7?id=9&tab=posts%20new")).unwrap();
        assert_eq!(result.args["id"], "7");
        assert_eq!(result.args["tab"], "posts new");
    }

    #[test]
    fn test_host_condition() {
        let mut admin = route("admin", "/", "admin", 0);
        admin.host = Some("admin.example.com".into());
        let router = PatternRouter::from_config(&[admin, route("home", "/", "home", 0)]).unwrap();

        let req = Request::builder()
            .uri("/")
            .header("host", "Admin.Example.com")
            .body(Body::empty())
            .unwrap();
        assert_eq!(router.route(&req).unwrap().page_id, "admin");
        assert_eq!(router.route(&request("/")).unwrap().page_id, "home");
    }

    #[test]
    fn test_no_match_and_fallback() {
        let router = PatternRouter::from_config(&[route("home", "/", "home", 0)]).unwrap();
        assert!(router.route(&request("/missing")).is_none());

        let router = router.with_fallback("not-found");
        assert_eq!(router.route(&request("/missing")).unwrap().page_id, "not-found");
        assert_eq!(router.route(&request("/")).unwrap().page_id, "home");
        assert_eq!(router.page_ids(), vec!["home".to_string(), "not-found".to_string()]);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = PatternRouter::from_config(&[route("bad", "nope", "x", 0)]).unwrap_err();
        assert_eq!(err.name, "bad");
    }
}
