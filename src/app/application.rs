//! The application: request dispatch and startup wiring.
//!
//! # Responsibilities
//! - Route each request to a page and run it through the coordinator
//! - Serialize the outcome with cookies, content type and length
//! - Run the compiler once at boot and hold its result
//! - Swap in reloaded manifests without blocking requests
//!
//! # Data Flow
//! ```text
//! Exchange
//!     → Router::route            (NoRoute)
//!     → PageRegistry::get        (UnknownPage)
//!     → manifest lookup          (MissingDependencies)
//!     → PageFactory::create(PageContext)
//!     → Page::create_store + Page::render
//!     → RenderCoordinator::run   (discovery → hydrate → final)
//!     → write_render_outcome
//! ```
//!
//! # Design Decisions
//! - Every error returns to the chain's boundary; nothing is written here on
//!   the error path
//! - Pages without a client entry render with empty dependencies
//! - The manifest is read once per request; a concurrent swap affects only
//!   later requests

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use futures_util::future::BoxFuture;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use url::Url;

use crate::app::page::{PageContext, PageRegistry, PageRequest};
use crate::compiler::{CompileResult, Compiler, PageDependencies};
use crate::config::{DataConfig, SoyaConfig};
use crate::data::{DataProvider, HttpDataProvider, StaticDataProvider};
use crate::error::SoyaError;
use crate::http::{write_render_outcome, CookieJar, ErrorHandler, Exchange, Middleware, MiddlewareChain, Next};
use crate::observability::metrics;
use crate::pages::{NotFoundPageFactory, StaticPageFactory, NOT_FOUND_PAGE};
use crate::render::RenderCoordinator;
use crate::routing::{PatternRouter, Router};

pub struct Application {
    registry: PageRegistry,
    router: Arc<dyn Router>,
    provider: Arc<dyn DataProvider>,
    manifest: Arc<ArcSwap<CompileResult>>,
    hydration_timeout: Option<Duration>,
}

impl Application {
    /// Check routes against the registry and instantiate every page once.
    pub fn new(
        registry: PageRegistry,
        router: Arc<dyn Router>,
        provider: Arc<dyn DataProvider>,
    ) -> Result<Self, SoyaError> {
        registry
            .verify_routes(router.as_ref())
            .map_err(|e| SoyaError::Startup(e.to_string()))?;
        let pages = registry.preflight(&provider);
        tracing::info!(pages, "Pages verified");

        Ok(Self {
            registry,
            router,
            provider,
            manifest: Arc::new(ArcSwap::from_pointee(CompileResult::default())),
            hydration_timeout: None,
        })
    }

    /// Build from configuration plus the application's own pages.
    ///
    /// Configured static pages and the not-found page are added to
    /// `registry` unless it already has a page with that id.
    pub fn from_config(config: &SoyaConfig, mut registry: PageRegistry) -> Result<Self, SoyaError> {
        for (page_id, path) in &config.pages {
            if registry.contains(page_id) {
                continue;
            }
            let factory = StaticPageFactory::from_file(path)
                .map_err(|e| SoyaError::Startup(format!("page '{}' template {}: {}", page_id, path.display(), e)))?;
            registry
                .register(page_id.clone(), Arc::new(factory))
                .map_err(|e| SoyaError::Startup(e.to_string()))?;
        }

        let mut router =
            PatternRouter::from_config(&config.routes).map_err(|e| SoyaError::Startup(e.to_string()))?;
        if config.render.not_found_route {
            if !registry.contains(NOT_FOUND_PAGE) {
                registry
                    .register(NOT_FOUND_PAGE, Arc::new(NotFoundPageFactory))
                    .map_err(|e| SoyaError::Startup(e.to_string()))?;
            }
            router = router.with_fallback(NOT_FOUND_PAGE);
        }

        let provider = build_provider(&config.data)?;
        let app = Self::new(registry, Arc::new(router), provider)?;
        Ok(app.with_hydration_timeout(config.render.hydration_timeout_ms.map(Duration::from_millis)))
    }

    pub fn with_hydration_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.hydration_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &PageRegistry {
        &self.registry
    }

    pub fn provider(&self) -> &Arc<dyn DataProvider> {
        &self.provider
    }

    /// The current compile result.
    pub fn manifest(&self) -> Arc<CompileResult> {
        self.manifest.load_full()
    }

    /// Atomically replace the compile result.
    pub fn replace_manifest(&self, result: CompileResult) {
        tracing::info!(pages = result.pages.len(), "Manifest updated");
        self.manifest.store(Arc::new(result));
    }

    /// Run the compiler, wait for its result and assemble the chain:
    /// compiler middleware first, this application last.
    pub async fn build_chain(
        self: &Arc<Self>,
        compiler: &dyn Compiler,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Result<MiddlewareChain, SoyaError> {
        let (tx, rx) = oneshot::channel();
        let entries = self.registry.entry_points();
        let middleware = compiler
            .run(
                &entries,
                Box::new(move |result| {
                    let _ = tx.send(result);
                }),
            )
            .map_err(|e| SoyaError::Startup(e.to_string()))?;

        let result = rx
            .await
            .map_err(|_| SoyaError::Startup("compiler finished without a result".into()))?;
        self.replace_manifest(result);

        let terminal: Arc<dyn Middleware> = self.clone();
        Ok(MiddlewareChain::new(middleware, terminal, error_handler))
    }

    /// Apply manifest updates until the channel closes or shutdown fires.
    pub fn watch_manifest(
        self: &Arc<Self>,
        mut updates: mpsc::UnboundedReceiver<CompileResult>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let app = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = updates.recv() => match update {
                        Some(result) => app.replace_manifest(result),
                        None => break,
                    },
                    _ = shutdown.recv() => break,
                }
            }
            tracing::debug!("Manifest reload task stopped");
        })
    }

    fn dependencies(&self, page_id: &str, client_entry: bool) -> Result<PageDependencies, SoyaError> {
        match self.manifest.load().dependencies(page_id) {
            Some(deps) => Ok(deps.clone()),
            None if !client_entry => Ok(PageDependencies::default()),
            None => Err(SoyaError::MissingDependencies(page_id.to_string())),
        }
    }

    /// Handle one routed request end to end.
    pub async fn dispatch(&self, exchange: &mut Exchange) -> Result<(), SoyaError> {
        let started = Instant::now();

        let route = self
            .router
            .route(&exchange.request)
            .ok_or_else(|| SoyaError::NoRoute {
                method: exchange.request.method().to_string(),
                path: exchange.path().to_string(),
            })?;
        let registered = self
            .registry
            .get(&route.page_id)
            .ok_or_else(|| SoyaError::UnknownPage(route.page_id.clone()))?;
        let deps = self.dependencies(&route.page_id, registered.capabilities.client_entry)?;

        let cookies = CookieJar::from_headers(exchange.request.headers());
        let page = registered.factory.create(PageContext {
            provider: self.provider.clone(),
            cookies: cookies.clone(),
            is_server: true,
        });
        let store = page.create_store(&route.args);
        let result = page.render(&PageRequest {
            page_id: &route.page_id,
            method: exchange.request.method(),
            uri: exchange.request.uri(),
            headers: exchange.request.headers(),
            args: &route.args,
        })?;

        let mut coordinator = RenderCoordinator::new(self.hydration_timeout);
        let outcome = coordinator.run(result, store, &deps).await?;
        let status = outcome.status.as_u16();

        write_render_outcome(&mut exchange.response, outcome, &cookies)?;

        metrics::record_request(status, &route.page_id, started);
        tracing::info!(
            request_id = %exchange.request_id(),
            page = %route.page_id,
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Page rendered"
        );
        Ok(())
    }
}

impl Middleware for Application {
    fn name(&self) -> &str {
        "application"
    }

    fn handle<'a>(&'a self, exchange: &'a mut Exchange, _next: Next<'a>) -> BoxFuture<'a, Result<(), SoyaError>> {
        Box::pin(self.dispatch(exchange))
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("registry", &self.registry)
            .field("hydration_timeout", &self.hydration_timeout)
            .finish_non_exhaustive()
    }
}

/// HTTP provider when an API base URL is configured, in-memory otherwise.
pub fn build_provider(config: &DataConfig) -> Result<Arc<dyn DataProvider>, SoyaError> {
    match &config.api_base_url {
        Some(base) => {
            let url = Url::parse(base).map_err(|e| SoyaError::Startup(format!("api_base_url '{}': {}", base, e)))?;
            let provider = HttpDataProvider::new(url, Duration::from_secs(config.timeout_secs))
                .map_err(|e| SoyaError::Startup(e.to_string()))?;
            Ok(Arc::new(provider))
        }
        None => Ok(Arc::new(StaticDataProvider::new(config.resources.clone()))),
    }
}
