//! Route matching logic.
//!
//! # Responsibilities
//! - Match host header (exact match, case-insensitive, port ignored)
//! - Match path patterns with named parameters and a trailing catch-all
//!
//! # Design Decisions
//! - Host matching is case-insensitive (RFC 9110)
//! - Path matching is case-sensitive and segment-wise
//! - Empty path segments are ignored, so a trailing slash never matters
//! - No regex to guarantee O(n) matching

use std::collections::BTreeMap;

use axum::body::Body;
use axum::http::header::HOST;
use axum::http::Request;

/// Matches the Host header.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// Create a new host matcher.
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }

    pub fn matches(&self, req: &Request<Body>) -> bool {
        let host = req
            .headers()
            .get(HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| req.uri().host());
        match host {
            Some(host) => strip_port(host).eq_ignore_ascii_case(&self.expected_host),
            None => false,
        }
    }
}

fn strip_port(host: &str) -> &str {
    // Leave bracketed IPv6 literals alone.
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split_once(':').map(|(h, _)| h).unwrap_or(host)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSegment {
    Static(String),
    Param(String),
    CatchAll(String),
}

/// A compiled path pattern such as `/users/{id}` or `/docs/{*rest}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<PatternSegment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, String> {
        if !pattern.starts_with('/') {
            return Err(format!("'{}' must start with '/'", pattern));
        }

        let parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(parts.len());
        let mut names = Vec::new();

        for (index, part) in parts.iter().enumerate() {
            let segment = match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some(inner) => {
                    let (catch_all, name) = match inner.strip_prefix('*') {
                        Some(name) => (true, name),
                        None => (false, inner),
                    };
                    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                        return Err(format!("invalid parameter name '{}'", name));
                    }
                    if names.contains(&name) {
                        return Err(format!("duplicate parameter '{}'", name));
                    }
                    names.push(name);
                    if catch_all {
                        if index + 1 != parts.len() {
                            return Err(format!("catch-all '{}' must be the last segment", name));
                        }
                        PatternSegment::CatchAll(name.to_string())
                    } else {
                        PatternSegment::Param(name.to_string())
                    }
                }
                None if part.contains('{') || part.contains('}') => {
                    return Err(format!("unbalanced braces in '{}'", part));
                }
                None => PatternSegment::Static((*part).to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match `path`, returning the captured parameters.
    pub fn match_path(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = BTreeMap::new();

        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                PatternSegment::CatchAll(name) => {
                    let rest = parts.get(index..).unwrap_or(&[]).join("/");
                    params.insert(name.clone(), rest);
                    return Some(params);
                }
                PatternSegment::Static(expected) => {
                    if parts.get(index) != Some(&expected.as_str()) {
                        return None;
                    }
                }
                PatternSegment::Param(name) => {
                    let value = parts.get(index)?;
                    params.insert(name.clone(), (*value).to_string());
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_matcher() {
        let matcher = HostMatcher::new("example.com");

        let req1 = Request::builder()
            .header("Host", "example.com")
            .body(Body::default())
            .unwrap();
        assert!(matcher.matches(&req1));

        let req2 = Request::builder()
            .header("Host", "EXAMPLE.COM:8080")
            .body(Body::default())
            .unwrap();
        assert!(matcher.matches(&req2)); // Case insensitive, port ignored

        let req3 = Request::builder()
            .header("Host", "other.com")
            .body(Body::default())
            .unwrap();
        assert!(!matcher.matches(&req3));

        let req4 = Request::builder().body(Body::default()).unwrap();
        assert!(!matcher.matches(&req4));
    }

    #[test]
    fn test_params_and_statics() {
        let pattern = PathPattern::parse("/users/{id}/posts/{post_id}").unwrap();
        let params = pattern.match_path("/users/42/posts/7/").unwrap();
        assert_eq!(params["id"], "42");
        assert_eq!(params["post_id"], "7");

        assert!(pattern.match_path("/users/42/posts").is_none());
        assert!(pattern.match_path("/users/42/comments/7").is_none());
        assert!(pattern.match_path("/users/42/posts/7/extra").is_none());
    }

    #[test]
    fn test_root_and_catch_all() {
        let root = PathPattern::parse("/").unwrap();
        assert!(root.match_path("/").is_some());
        assert!(root.match_path("/x").is_none());

        let docs = PathPattern::parse("/docs/{*rest}").unwrap();
        assert_eq!(docs.match_path("/docs/a/b/c").unwrap()["rest"], "a/b/c");
        assert_eq!(docs.match_path("/docs").unwrap()["rest"], "");
        assert!(docs.match_path("/blog/a").is_none());

        let everything = PathPattern::parse("/{*path}").unwrap();
        assert_eq!(everything.match_path("/any/thing").unwrap()["path"], "any/thing");
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(PathPattern::parse("users").is_err());
        assert!(PathPattern::parse("/{*rest}/more").is_err());
        assert!(PathPattern::parse("/{id}/{id}").is_err());
        assert!(PathPattern::parse("/a{b").is_err());
        assert!(PathPattern::parse("/{}").is_err());
    }
}
