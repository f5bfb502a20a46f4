//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the favicon route and the chain fallback
//! - Wire up middleware (tracing, limits, request ID, timeout)
//! - Bind server to listener and signal readiness
//! - Stop on the shutdown broadcast

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::SoyaConfig;
use crate::http::exchange::Exchange;
use crate::http::middleware::MiddlewareChain;
use crate::lifecycle::ReadyNotifier;

/// HTTP server in front of the middleware chain.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &SoyaConfig, chain: Arc<MiddlewareChain>) -> Self {
        Self {
            router: Self::build_router(config, chain),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &SoyaConfig, chain: Arc<MiddlewareChain>) -> Router {
        let mut router = Router::new();

        if let Some(path) = config.server.favicon_path.clone() {
            let path = Arc::new(path);
            router = router.route(
                "/favicon.ico",
                get(move || favicon(path.clone())).fallback(dispatch),
            );
        }

        router
            .fallback(dispatch)
            .with_state(chain)
            .layer(RequestBodyLimitLayer::new(config.server.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, e.g. for `tower::ServiceExt::oneshot`.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        ready: ReadyNotifier,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");
        ready.notify(addr);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Every request except the favicon runs through the chain.
async fn dispatch(State(chain): State<Arc<MiddlewareChain>>, request: Request<Body>) -> Response {
    let mut exchange = Exchange::new(request);
    tracing::debug!(
        request_id = %exchange.request_id(),
        method = %exchange.request.method(),
        path = %exchange.path(),
        "Dispatching request"
    );
    chain.execute(&mut exchange).await;
    exchange.response.into_response()
}

async fn favicon(path: Arc<PathBuf>) -> Response {
    match tokio::fs::read(path.as_ref()).await {
        Ok(bytes) => ([(CONTENT_TYPE, "image/x-icon")], bytes).into_response(),
        Err(e) => {
            tracing::debug!(path = ?path, error = %e, "Favicon not readable");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
