//! Compilers backed by prebuilt assets.
//!
//! # Responsibilities
//! - `PrecompiledCompiler`: read the manifest written by `soya-build`
//! - `ScanningCompiler`: build the manifest at boot from the asset dir
//!
//! # Design Decisions
//! - Both call `on_ready` before returning; bundling happens out of process
//! - Both hand back an `AssetMiddleware` for the asset dir

use std::path::PathBuf;
use std::sync::Arc;

use crate::compiler::assets::AssetMiddleware;
use crate::compiler::manifest::{load_manifest, ManifestBuilder};
use crate::compiler::{report_missing, CompileError, CompileResult, Compiler, EntryPoint, OnReady};
use crate::config::CompilerConfig;
use crate::http::Middleware;

#[derive(Debug, Clone)]
pub struct PrecompiledCompiler {
    manifest_path: PathBuf,
    assets: AssetMiddleware,
}

impl PrecompiledCompiler {
    pub fn new(manifest_path: impl Into<PathBuf>, assets: AssetMiddleware) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            assets,
        }
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self::new(
            &config.manifest_path,
            AssetMiddleware::new(&config.asset_dir, &config.asset_url_prefix),
        )
    }
}

impl Compiler for PrecompiledCompiler {
    fn run(&self, entries: &[EntryPoint], on_ready: OnReady) -> Result<Vec<Arc<dyn Middleware>>, CompileError> {
        let result = load_manifest(&self.manifest_path)?;
        tracing::info!(
            manifest = ?self.manifest_path,
            pages = result.pages.len(),
            "Loaded precompiled manifest"
        );
        report_missing(entries, &result);
        on_ready(result);
        Ok(vec![Arc::new(self.assets.clone())])
    }
}

#[derive(Debug, Clone)]
pub struct ScanningCompiler {
    asset_dir: PathBuf,
    builder: ManifestBuilder,
    assets: AssetMiddleware,
}

impl ScanningCompiler {
    pub fn new(asset_dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        let asset_dir = asset_dir.into();
        let url_prefix = url_prefix.into();
        Self {
            builder: ManifestBuilder::new(&asset_dir, &url_prefix),
            assets: AssetMiddleware::new(&asset_dir, url_prefix),
            asset_dir,
        }
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self::new(&config.asset_dir, &config.asset_url_prefix)
    }
}

impl Compiler for ScanningCompiler {
    fn run(&self, entries: &[EntryPoint], on_ready: OnReady) -> Result<Vec<Arc<dyn Middleware>>, CompileError> {
        let mut result = if self.asset_dir.exists() {
            self.builder.scan().map_err(|source| CompileError::AssetDir {
                path: self.asset_dir.display().to_string(),
                source,
            })?
        } else {
            tracing::warn!(asset_dir = ?self.asset_dir, "Asset directory missing, pages ship without assets");
            CompileResult::default()
        };

        // Pages without client assets still render.
        for entry in entries {
            result.pages.entry(entry.page_id.clone()).or_default();
        }

        tracing::info!(pages = result.pages.len(), "Scanned asset directory");
        on_ready(result);
        Ok(vec![Arc::new(self.assets.clone())])
    }
}
