//! Compiler abstraction.
//!
//! # Data Flow
//! ```text
//! PageRegistry::entry_points()
//!     → Compiler::run(entries, on_ready)
//!         → middleware list (asset serving) returned synchronously
//!         → on_ready(CompileResult) invoked exactly once
//!     → Application stores CompileResult (ArcSwap)
//!
//! Hot reload (watcher.rs):
//!     manifest file changes → reload → Application swaps CompileResult
//! ```
//!
//! # Design Decisions
//! - Only `js` and `css` per page are consumed from the manifest
//! - A page missing from the manifest is a request-time error, not a
//!   startup error; the compiler logs it as a warning
//! - The manifest is replaced whole, never patched in place

pub mod assets;
pub mod manifest;
pub mod precompiled;
pub mod watcher;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::Middleware;

pub use assets::AssetMiddleware;
pub use manifest::{load_manifest, save_manifest, ManifestBuilder};
pub use precompiled::{PrecompiledCompiler, ScanningCompiler};
pub use watcher::ManifestWatcher;

/// Compiled assets a page needs on the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDependencies {
    #[serde(default)]
    pub js: Vec<String>,
    #[serde(default)]
    pub css: Vec<String>,
}

/// Output of a compile: page id → dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompileResult {
    pub pages: BTreeMap<String, PageDependencies>,
}

impl CompileResult {
    pub fn dependencies(&self, page_id: &str) -> Option<&PageDependencies> {
        self.pages.get(page_id)
    }
}

/// A page the compiler should build a client entry for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub page_id: String,
}

/// Callback receiving the compile result.
pub type OnReady = Box<dyn FnOnce(CompileResult) + Send>;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Manifest(#[from] manifest::ManifestError),

    #[error("asset directory {path} is unreadable: {source}")]
    AssetDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Produces page dependency metadata and the middleware that serves it.
pub trait Compiler: Send + Sync {
    /// Start compiling `entries`. `on_ready` is called once with the result.
    fn run(&self, entries: &[EntryPoint], on_ready: OnReady) -> Result<Vec<Arc<dyn Middleware>>, CompileError>;
}

/// Warn about entries the compile result has no dependencies for.
pub(crate) fn report_missing(entries: &[EntryPoint], result: &CompileResult) {
    for entry in entries {
        if !result.pages.contains_key(&entry.page_id) {
            tracing::warn!(page = %entry.page_id, "No compiled dependencies for page");
        }
    }
}
