//! Request-scoped cookie access.
//!
//! # Responsibilities
//! - Parse the inbound `Cookie` header once per request
//! - Collect outgoing mutations made by page code
//! - Serialize mutations as `Set-Cookie` header values, in order
//!
//! # Design Decisions
//! - A jar is cloned into the page context; clones share state
//! - Setting the same name twice keeps only the latest mutation, at the
//!   position of the first one

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// An outgoing cookie mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub max_age: Option<i64>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<SameSite>,
}

impl SetCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: Some("/".to_string()),
            domain: None,
            max_age: None,
            http_only: false,
            secure: false,
            same_site: None,
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    pub fn to_header_value(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        if let Some(path) = &self.path {
            out.push_str(&format!("; Path={}", path));
        }
        if let Some(domain) = &self.domain {
            out.push_str(&format!("; Domain={}", domain));
        }
        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={}", max_age));
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        match self.same_site {
            Some(SameSite::Strict) => out.push_str("; SameSite=Strict"),
            Some(SameSite::Lax) => out.push_str("; SameSite=Lax"),
            Some(SameSite::None) => out.push_str("; SameSite=None"),
            None => {}
        }
        out
    }
}

#[derive(Debug, Default)]
struct JarState {
    incoming: BTreeMap<String, String>,
    outgoing: Vec<SetCookie>,
}

/// Cookies of one request plus the mutations made while handling it.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    inner: Arc<Mutex<JarState>>,
}

impl CookieJar {
    /// Parse every `Cookie` header of the request.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut incoming = BTreeMap::new();
        for value in headers.get_all(COOKIE) {
            let Ok(raw) = value.to_str() else {
                continue;
            };
            for pair in raw.split(';') {
                if let Some((name, value)) = pair.trim().split_once('=') {
                    let name = name.trim();
                    if !name.is_empty() {
                        incoming
                            .entry(name.to_string())
                            .or_insert_with(|| value.trim().trim_matches('"').to_string());
                    }
                }
            }
        }
        Self {
            inner: Arc::new(Mutex::new(JarState {
                incoming,
                outgoing: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JarState> {
        self.inner.lock().expect("cookie jar mutex poisoned")
    }

    /// Current value of `name`, including mutations made during this request.
    pub fn get(&self, name: &str) -> Option<String> {
        let state = self.lock();
        if let Some(cookie) = state.outgoing.iter().find(|c| c.name == name) {
            if cookie.max_age == Some(0) {
                return None;
            }
            return Some(cookie.value.clone());
        }
        state.incoming.get(name).cloned()
    }

    pub fn set(&self, cookie: SetCookie) {
        let mut state = self.lock();
        match state.outgoing.iter_mut().find(|c| c.name == cookie.name) {
            Some(existing) => *existing = cookie,
            None => state.outgoing.push(cookie),
        }
    }

    /// Expire `name` on the client.
    pub fn remove(&self, name: &str) {
        self.set(SetCookie::new(name, "").max_age(0));
    }

    /// `Set-Cookie` header values for every mutation, in order.
    pub fn generate_header_values(&self) -> Vec<String> {
        self.lock()
            .outgoing
            .iter()
            .map(SetCookie::to_header_value)
            .collect()
    }
}
