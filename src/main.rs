//! Soya server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ MiddlewareChain
//!                     (request id,       │
//!                      limits, favicon)  ├─▶ compiler middleware (assets)
//!                                        └─▶ Application (terminal)
//!                                              │ routing → page → store
//!                                              │ coordinator: discovery
//!                                              │   → hydrate → final render
//!     Client Response                          ▼
//!     ◀────────────── ResponseWriter ◀── write_render_outcome
//!                     (or ErrorHandler boundary)
//! ```
//!
//! Startup order: config → logging/metrics → application (route check,
//! page preflight) → compiler → listener → ready signal.

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;
use clap::Parser;
use tokio::net::TcpListener;

use soya::app::{Application, PageRegistry};
use soya::compiler::{Compiler, ManifestWatcher, PrecompiledCompiler, ScanningCompiler};
use soya::config::{load_config, SoyaConfig};
use soya::http::{DefaultErrorHandler, HttpServer};
use soya::lifecycle::{ReadyNotifier, Shutdown};
use soya::observability::{init_logging, init_metrics};

#[derive(Parser)]
#[command(name = "soya")]
#[command(about = "Server-side rendering server", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SoyaConfig::default(),
    };
    init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), config = ?cli.config, "soya starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        routes = config.routes.len(),
        precompile = config.compiler.precompile,
        hot_reload = config.compiler.hot_reload,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let app = Arc::new(Application::from_config(&config, PageRegistry::new())?);

    let compiler: Box<dyn Compiler> = if config.compiler.precompile {
        Box::new(PrecompiledCompiler::from_config(&config.compiler))
    } else {
        Box::new(ScanningCompiler::from_config(&config.compiler))
    };
    let error_handler = Arc::new(DefaultErrorHandler::new(
        StatusCode::from_u16(config.render.error_status)?,
        config.render.expose_error_details,
    ));
    let chain = Arc::new(app.build_chain(compiler.as_ref(), error_handler).await?);
    tracing::info!(handlers = chain.len(), "Middleware chain ready");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    // Keep the watcher alive for the lifetime of the server.
    let _watcher = if config.compiler.hot_reload {
        let (watcher, updates) = ManifestWatcher::new(&config.compiler.manifest_path);
        let handle = watcher.run()?;
        app.watch_manifest(updates, shutdown.subscribe());
        Some(handle)
    } else {
        None
    };

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let server = HttpServer::new(&config, chain);
    server
        .run(
            listener,
            ReadyNotifier::from_mode(config.supervisor.mode),
            shutdown.subscribe(),
        )
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
