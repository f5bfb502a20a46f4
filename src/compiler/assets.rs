//! Serving compiled assets.

use std::path::{Component, Path, PathBuf};

use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::Method;
use futures_util::future::BoxFuture;

use crate::error::SoyaError;
use crate::http::{Exchange, Middleware, Next};

/// Serves files from the asset directory under a URL prefix. Requests
/// outside the prefix, or for missing files, continue down the chain.
#[derive(Debug, Clone)]
pub struct AssetMiddleware {
    asset_dir: PathBuf,
    url_prefix: String,
}

impl AssetMiddleware {
    pub fn new(asset_dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            asset_dir: asset_dir.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// Map a request path to a file, refusing anything that leaves the
    /// asset directory.
    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let rest = url_path.strip_prefix(&self.url_prefix)?.strip_prefix('/')?;
        let mut path = self.asset_dir.clone();
        let mut pushed = false;
        for component in Path::new(rest).components() {
            match component {
                Component::Normal(part) => {
                    path.push(part);
                    pushed = true;
                }
                Component::CurDir => {}
                _ => return None,
            }
        }
        pushed.then_some(path)
    }

    fn content_type(path: &Path) -> &'static str {
        match path.extension().and_then(|s| s.to_str()).unwrap_or("") {
            "js" | "mjs" => "application/javascript",
            "css" => "text/css",
            "map" | "json" => "application/json",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "woff2" => "font/woff2",
            _ => "application/octet-stream",
        }
    }
}

impl Middleware for AssetMiddleware {
    fn name(&self) -> &str {
        "assets"
    }

    fn handle<'a>(&'a self, exchange: &'a mut Exchange, next: Next<'a>) -> BoxFuture<'a, Result<(), SoyaError>> {
        Box::pin(async move {
            let method = exchange.request.method();
            if method != Method::GET && method != Method::HEAD {
                return next.run(exchange).await;
            }
            let Some(path) = self.map_path(exchange.path()) else {
                return next.run(exchange).await;
            };

            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!(path = ?path, error = %e, "Asset not found, continuing");
                    return next.run(exchange).await;
                }
            };

            let response = &mut exchange.response;
            response.set_header(CONTENT_TYPE.as_str(), Self::content_type(&path))?;
            response.set_header(CONTENT_LENGTH.as_str(), &bytes.len().to_string())?;
            response.set_header(CACHE_CONTROL.as_str(), "public, max-age=31536000, immutable")?;
            if exchange.request.method() == Method::HEAD {
                response.send(Vec::new())
            } else {
                response.send(bytes)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{DefaultErrorHandler, MiddlewareChain};
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;

    struct Fallthrough;

    impl Middleware for Fallthrough {
        fn handle<'a>(&'a self, exchange: &'a mut Exchange, _next: Next<'a>) -> BoxFuture<'a, Result<(), SoyaError>> {
            Box::pin(async move { exchange.response.send("page") })
        }
    }

    fn chain(dir: &Path) -> MiddlewareChain {
        MiddlewareChain::new(
            vec![Arc::new(AssetMiddleware::new(dir, "/assets/"))],
            Arc::new(Fallthrough),
            Arc::new(DefaultErrorHandler::default()),
        )
    }

    async fn get(chain: &MiddlewareChain, uri: &str) -> Exchange {
        let mut exchange = Exchange::new(Request::builder().uri(uri).body(Body::empty()).unwrap());
        chain.execute(&mut exchange).await;
        exchange
    }

    #[test]
    fn test_map_path_prevents_traversal() {
        let assets = AssetMiddleware::new("/srv/assets", "/assets");
        assert_eq!(
            assets.map_path("/assets/home.js"),
            Some(PathBuf::from("/srv/assets/home.js"))
        );
        assert!(assets.map_path("/assets/../secret").is_none());
        assert!(assets.map_path("/assets/").is_none());
        assert!(assets.map_path("/assetsx/home.js").is_none());
        assert!(assets.map_path("/other/home.js").is_none());
    }

    #[tokio::test]
    async fn test_serves_file_or_falls_through() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("home.js"), "console.log(1)").unwrap();
        let chain = chain(dir.path());

        let hit = get(&chain, "/assets/home.js").await;
        assert_eq!(hit.response.body(), b"console.log(1)");
        assert_eq!(hit.response.headers()[CONTENT_TYPE], "application/javascript");

        let miss = get(&chain, "/assets/missing.js").await;
        assert_eq!(miss.response.body(), b"page");

        let page = get(&chain, "/home").await;
        assert_eq!(page.response.body(), b"page");
    }
}
