//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use serde_json::{json, Value};

use soya::app::{Application, Page, PageCapabilities, PageContext, PageFactory, PageRegistry, PageRequest};
use soya::compiler::{CompileError, CompileResult, Compiler, EntryPoint, OnReady, PageDependencies};
use soya::config::RouteConfig;
use soya::data::{DataProvider, StaticDataProvider};
use soya::error::SoyaError;
use soya::http::{ErrorHandler, Exchange, Middleware, MiddlewareChain, ResponseWriter, SetCookie};
use soya::render::{ContentRenderer, Document, PageError, RenderPhase, RenderResult};
use soya::routing::{PatternRouter, RouteArgs};
use soya::store::{Action, HydrationPolicy, LoadFuture, Notification, Rejection, Segment, SegmentStore};

/// Loads `{"count": 1}` from the provider's `counter` resource.
pub struct CounterSegment;

impl Segment for CounterSegment {
    fn id(&self) -> &str {
        "counter"
    }

    fn reduce(&self, state: &Value, action: &Action) -> Value {
        match action.kind.as_str() {
            "loaded" => action.payload.clone(),
            _ => state.clone(),
        }
    }

    fn load(&self, _query: &Value, state: &Value, provider: &Arc<dyn DataProvider>) -> Option<LoadFuture> {
        if !state.is_null() {
            return None;
        }
        let fetch = provider.fetch("counter", &Value::Null);
        Some(Box::pin(async move {
            Ok(Action {
                segment_id: "counter".into(),
                kind: "loaded".into(),
                payload: fetch.await?,
            })
        }))
    }
}

/// Always rejects its load with "boom".
pub struct BrokenSegment;

impl Segment for BrokenSegment {
    fn id(&self) -> &str {
        "counter"
    }

    fn reduce(&self, state: &Value, _action: &Action) -> Value {
        state.clone()
    }

    fn load(&self, _query: &Value, _state: &Value, _provider: &Arc<dyn DataProvider>) -> Option<LoadFuture> {
        Some(Box::pin(async { Err(Rejection::from("boom")) }))
    }
}

/// Renders the counter and sets a `last_page` cookie.
pub struct CounterPageFactory {
    pub broken: bool,
}

impl PageFactory for CounterPageFactory {
    fn create(&self, context: PageContext) -> Box<dyn Page> {
        Box::new(CounterPage {
            broken: self.broken,
            context,
        })
    }

    fn capabilities(&self) -> PageCapabilities {
        PageCapabilities {
            has_store: true,
            client_entry: true,
        }
    }
}

struct CounterPage {
    broken: bool,
    context: PageContext,
}

impl Page for CounterPage {
    fn create_store(&self, _args: &RouteArgs) -> Option<SegmentStore> {
        let mut store = SegmentStore::new(self.context.provider.clone());
        let segment: Arc<dyn Segment> = if self.broken {
            Arc::new(BrokenSegment)
        } else {
            Arc::new(CounterSegment)
        };
        store.register(segment).ok()?;
        Some(store)
    }

    fn render(&self, request: &PageRequest<'_>) -> Result<RenderResult, PageError> {
        self.context
            .cookies
            .set(SetCookie::new("last_page", request.page_id).http_only());
        Ok(RenderResult::new(CounterContent).with_header("X-Page", request.page_id))
    }
}

struct CounterContent;

impl ContentRenderer for CounterContent {
    fn render(&self, deps: &PageDependencies, phase: &mut RenderPhase<'_>) -> Result<String, PageError> {
        let name = phase.name();
        let state = phase.state();
        let store = phase.store().ok_or(PageError::MissingStore(name))?;
        let consumer = store.next_consumer_id();
        let handle = store.subscribe(
            "counter",
            Value::Null,
            Arc::new(|_: &Notification| {}),
            consumer,
            "count",
            HydrationPolicy::Eager,
        )?;
        let count = handle.result.data.get("count").cloned().unwrap_or(Value::Null);
        Ok(Document::new(deps)
            .title("Counter")
            .body(format!("<p id=\"count\">{}</p>", count))
            .state(state)
            .render())
    }
}

/// Panics while rendering.
pub struct PanickingPageFactory;

impl PageFactory for PanickingPageFactory {
    fn create(&self, _context: PageContext) -> Box<dyn Page> {
        Box::new(PanickingPage)
    }

    fn capabilities(&self) -> PageCapabilities {
        PageCapabilities {
            has_store: false,
            client_entry: false,
        }
    }
}

struct PanickingPage;

impl Page for PanickingPage {
    fn render(&self, _request: &PageRequest<'_>) -> Result<RenderResult, PageError> {
        panic!("page exploded")
    }
}

/// One entry per error handler call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledError {
    pub kind: &'static str,
    pub message: String,
    pub sent: bool,
}

/// Records every call and writes a plain 500 when it still can.
#[derive(Default)]
pub struct RecordingErrorHandler {
    calls: Mutex<Vec<HandledError>>,
}

impl RecordingErrorHandler {
    pub fn calls(&self) -> Vec<HandledError> {
        self.calls.lock().expect("recording lock poisoned").clone()
    }

    fn record(&self, error: &SoyaError, sent: bool) {
        self.calls.lock().expect("recording lock poisoned").push(HandledError {
            kind: error.kind(),
            message: error.to_string(),
            sent,
        });
    }
}

impl ErrorHandler for RecordingErrorHandler {
    fn response_sent_error(&self, error: &SoyaError, _request: &Request<Body>, _response: &ResponseWriter) {
        self.record(error, true);
    }

    fn response_not_sent_error(&self, error: &SoyaError, _request: &Request<Body>, response: &mut ResponseWriter) {
        self.record(error, false);
        let _ = response
            .reset()
            .and_then(|_| response.set_status(StatusCode::INTERNAL_SERVER_ERROR))
            .and_then(|_| response.send(format!("error: {}", error.kind())));
    }
}

/// Hands a fixed result to `on_ready` and serves nothing.
pub struct FixedCompiler {
    pub result: CompileResult,
}

impl FixedCompiler {
    pub fn with_pages(pages: &[&str]) -> Self {
        let pages = pages
            .iter()
            .map(|page| {
                (
                    page.to_string(),
                    PageDependencies {
                        js: vec![format!("/assets/{}.js", page)],
                        css: vec![format!("/assets/{}.css", page)],
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();
        Self {
            result: CompileResult { pages },
        }
    }
}

impl Compiler for FixedCompiler {
    fn run(&self, _entries: &[EntryPoint], on_ready: OnReady) -> Result<Vec<Arc<dyn Middleware>>, CompileError> {
        on_ready(self.result.clone());
        Ok(Vec::new())
    }
}

pub fn route(name: &str, path: &str, page: &str) -> RouteConfig {
    RouteConfig {
        name: name.into(),
        path: path.into(),
        host: None,
        page: page.into(),
        priority: 0,
    }
}

pub fn counter_provider() -> Arc<dyn DataProvider> {
    Arc::new(StaticDataProvider::default().with("counter", json!({"count": 1})))
}

/// Registry with `counter`, `broken` and `panics` pages.
pub fn test_registry() -> PageRegistry {
    let mut registry = PageRegistry::new();
    registry
        .register("counter", Arc::new(CounterPageFactory { broken: false }))
        .unwrap();
    registry
        .register("broken", Arc::new(CounterPageFactory { broken: true }))
        .unwrap();
    registry.register("panics", Arc::new(PanickingPageFactory)).unwrap();
    registry
}

pub fn test_routes() -> Vec<RouteConfig> {
    vec![
        route("counter", "/counter", "counter"),
        route("broken", "/broken", "broken"),
        route("panics", "/panics", "panics"),
    ]
}

pub fn build_app(registry: PageRegistry, routes: &[RouteConfig]) -> Arc<Application> {
    let router = PatternRouter::from_config(routes).unwrap();
    Arc::new(Application::new(registry, Arc::new(router), counter_provider()).unwrap())
}

/// App over `test_registry()` with a manifest for the `counter` and
/// `broken` pages, plus the recording handler the chain reports to.
pub async fn build_chain(routes: &[RouteConfig]) -> (Arc<Application>, MiddlewareChain, Arc<RecordingErrorHandler>) {
    let app = build_app(test_registry(), routes);
    let handler = Arc::new(RecordingErrorHandler::default());
    let chain = app
        .build_chain(&FixedCompiler::with_pages(&["counter", "broken"]), handler.clone())
        .await
        .unwrap();
    (app, chain, handler)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn execute(chain: &MiddlewareChain, request: Request<Body>) -> Response<Body> {
    let mut exchange = Exchange::new(request);
    chain.execute(&mut exchange).await;
    exchange.response.into_response()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
