//! The on-disk dependency manifest.
//!
//! ```json
//! { "home": { "js": ["/assets/home.3f2a.js"], "css": [] } }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::compiler::{CompileResult, PageDependencies};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write manifest {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read the manifest written by `soya-build`.
pub fn load_manifest(path: &Path) -> Result<CompileResult, ManifestError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `result` as pretty JSON, creating parent directories.
pub fn save_manifest(path: &Path, result: &CompileResult) -> Result<(), ManifestError> {
    let write_err = |source: std::io::Error| ManifestError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let json = serde_json::to_string_pretty(result).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(write_err)
}

/// Builds a manifest by scanning an asset directory.
///
/// A file belongs to page `p` when its name is `p.js`, `p.css`, or
/// `p.<hash>.js` / `p.<hash>.css`. Files are listed in name order.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    asset_dir: PathBuf,
    url_prefix: String,
}

impl ManifestBuilder {
    pub fn new(asset_dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            asset_dir: asset_dir.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn scan(&self) -> std::io::Result<CompileResult> {
        let mut names: Vec<String> = fs::read_dir(&self.asset_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();

        let mut pages: BTreeMap<String, PageDependencies> = BTreeMap::new();
        for name in names {
            let Some((page, kind)) = classify(&name) else {
                continue;
            };
            let url = format!("{}/{}", self.url_prefix, name);
            let deps = pages.entry(page.to_string()).or_default();
            match kind {
                AssetKind::Js => deps.js.push(url),
                AssetKind::Css => deps.css.push(url),
            }
        }

        Ok(CompileResult { pages })
    }
}

enum AssetKind {
    Js,
    Css,
}

fn classify(file_name: &str) -> Option<(&str, AssetKind)> {
    let (stem, kind) = if let Some(stem) = file_name.strip_suffix(".js") {
        (stem, AssetKind::Js)
    } else if let Some(stem) = file_name.strip_suffix(".css") {
        (stem, AssetKind::Css)
    } else {
        return None;
    };
    let page = stem.split('.').next().filter(|p| !p.is_empty())?;
    Some((page, kind))
}
