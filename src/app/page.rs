//! Pages and the page registry.
//!
//! # Responsibilities
//! - Define the page contract (store creation, render result)
//! - Register page factories by id with their capabilities
//! - Check at startup that every routed page exists and instantiates
//!
//! # Design Decisions
//! - A page instance lives for one request; factories are shared
//! - Capabilities are captured once at registration, never re-queried
//! - Startup checks fail fast; request-time lookups still handle misses

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::{HeaderMap, Method, Uri};
use thiserror::Error;

use crate::compiler::EntryPoint;
use crate::data::DataProvider;
use crate::http::CookieJar;
use crate::render::{PageError, RenderResult};
use crate::routing::{RouteArgs, Router};
use crate::store::SegmentStore;

/// What a page gets when it is created.
#[derive(Clone)]
pub struct PageContext {
    pub provider: Arc<dyn DataProvider>,
    pub cookies: CookieJar,
    pub is_server: bool,
}

impl std::fmt::Debug for PageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageContext")
            .field("cookies", &self.cookies)
            .field("is_server", &self.is_server)
            .finish_non_exhaustive()
    }
}

/// The routed request, as seen by a page.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    pub page_id: &'a str,
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub headers: &'a HeaderMap,
    pub args: &'a RouteArgs,
}

/// One page instance, created per request.
pub trait Page: Send {
    /// A fresh store for this request, or `None` for pages without data.
    fn create_store(&self, _args: &RouteArgs) -> Option<SegmentStore> {
        None
    }

    fn render(&self, request: &PageRequest<'_>) -> Result<RenderResult, PageError>;
}

/// Static facts about a page type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCapabilities {
    /// The page creates a store.
    pub has_store: bool,
    /// The compiler should build a client entry for the page.
    pub client_entry: bool,
}

impl Default for PageCapabilities {
    fn default() -> Self {
        Self {
            has_store: false,
            client_entry: true,
        }
    }
}

pub trait PageFactory: Send + Sync {
    fn create(&self, context: PageContext) -> Box<dyn Page>;

    fn capabilities(&self) -> PageCapabilities {
        PageCapabilities::default()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("page '{0}' is registered twice")]
    Duplicate(String),

    #[error("routes reference unregistered pages: {}", .0.join(", "))]
    Unregistered(Vec<String>),
}

#[derive(Clone)]
pub struct RegisteredPage {
    pub factory: Arc<dyn PageFactory>,
    pub capabilities: PageCapabilities,
}

/// Page factories by id.
#[derive(Clone, Default)]
pub struct PageRegistry {
    pages: BTreeMap<String, RegisteredPage>,
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, page_id: impl Into<String>, factory: Arc<dyn PageFactory>) -> Result<(), RegistryError> {
        let page_id = page_id.into();
        if self.pages.contains_key(&page_id) {
            return Err(RegistryError::Duplicate(page_id));
        }
        let capabilities = factory.capabilities();
        tracing::debug!(
            page = %page_id,
            has_store = capabilities.has_store,
            client_entry = capabilities.client_entry,
            "Page registered"
        );
        self.pages.insert(
            page_id,
            RegisteredPage {
                factory,
                capabilities,
            },
        );
        Ok(())
    }

    pub fn get(&self, page_id: &str) -> Option<&RegisteredPage> {
        self.pages.get(page_id)
    }

    pub fn contains(&self, page_id: &str) -> bool {
        self.pages.contains_key(page_id)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Pages the compiler should build client entries for.
    pub fn entry_points(&self) -> Vec<EntryPoint> {
        self.pages
            .iter()
            .filter(|(_, page)| page.capabilities.client_entry)
            .map(|(id, _)| EntryPoint { page_id: id.clone() })
            .collect()
    }

    /// Every page id the router can produce must be registered.
    pub fn verify_routes(&self, router: &dyn Router) -> Result<(), RegistryError> {
        let missing: Vec<String> = router
            .page_ids()
            .into_iter()
            .filter(|id| !self.pages.contains_key(id))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::Unregistered(missing))
        }
    }

    /// Instantiate every page once so construction problems surface at boot.
    pub fn preflight(&self, provider: &Arc<dyn DataProvider>) -> usize {
        for (page_id, page) in &self.pages {
            let context = PageContext {
                provider: provider.clone(),
                cookies: CookieJar::default(),
                is_server: true,
            };
            drop(page.factory.create(context));
            tracing::trace!(page = %page_id, "Page instantiated");
        }
        self.pages.len()
    }
}

impl std::fmt::Debug for PageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRegistry")
            .field("pages", &self.pages.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::PageDependencies;
    use crate::config::RouteConfig;
    use crate::data::StaticDataProvider;
    use crate::render::{ContentRenderer, RenderPhase};
    use crate::routing::PatternRouter;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Text;

    impl ContentRenderer for Text {
        fn render(&self, _deps: &PageDependencies, _phase: &mut RenderPhase<'_>) -> Result<String, PageError> {
            Ok("text".into())
        }
    }

    struct TextPage;

    impl Page for TextPage {
        fn render(&self, _request: &PageRequest<'_>) -> Result<RenderResult, PageError> {
            Ok(RenderResult::new(Text))
        }
    }

    #[derive(Default)]
    struct Counting {
        created: AtomicUsize,
        server_only: bool,
    }

    impl PageFactory for Counting {
        fn create(&self, context: PageContext) -> Box<dyn Page> {
            assert!(context.is_server);
            self.created.fetch_add(1, Ordering::SeqCst);
            Box::new(TextPage)
        }

        fn capabilities(&self) -> PageCapabilities {
            PageCapabilities {
                has_store: false,
                client_entry: !self.server_only,
            }
        }
    }

    fn router(pages: &[&str]) -> PatternRouter {
        let routes: Vec<RouteConfig> = pages
            .iter()
            .map(|page| RouteConfig {
                name: (*page).to_string(),
                path: format!("/{}", page),
                host: None,
                page: (*page).to_string(),
                priority: 0,
            })
            .collect();
        PatternRouter::from_config(&routes).unwrap()
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = PageRegistry::new();
        registry.register("home", Arc::new(Counting::default())).unwrap();
        assert_eq!(
            registry.register("home", Arc::new(Counting::default())),
            Err(RegistryError::Duplicate("home".into()))
        );
    }

    #[test]
    fn test_verify_routes_lists_missing_pages() {
        let mut registry = PageRegistry::new();
        registry.register("home", Arc::new(Counting::default())).unwrap();

        assert!(registry.verify_routes(&router(&["home"])).is_ok());
        assert_eq!(
            registry.verify_routes(&router(&["home", "about", "blog"])),
            Err(RegistryError::Unregistered(vec!["about".into(), "blog".into()]))
        );
    }

    #[test]
    fn test_entry_points_follow_capabilities() {
        let mut registry = PageRegistry::new();
        registry.register("home", Arc::new(Counting::default())).unwrap();
        registry
            .register(
                "health",
                Arc::new(Counting {
                    server_only: true,
                    ..Default::default()
                }),
            )
            .unwrap();

        assert_eq!(
            registry.entry_points(),
            vec![EntryPoint {
                page_id: "home".into()
            }]
        );
    }

    #[test]
    fn test_preflight_instantiates_each_page() {
        let factory = Arc::new(Counting::default());
        let mut registry = PageRegistry::new();
        registry.register("a", factory.clone()).unwrap();
        registry.register("b", factory.clone()).unwrap();

        let provider: Arc<dyn DataProvider> = Arc::new(StaticDataProvider::default());
        assert_eq!(registry.preflight(&provider), 2);
        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
    }
}
