//! The not-found page.

use axum::http::StatusCode;

use crate::app::{Page, PageCapabilities, PageContext, PageFactory, PageRequest};
use crate::compiler::PageDependencies;
use crate::render::document::escape_html;
use crate::render::{ContentRenderer, Document, PageError, RenderPhase, RenderResult};

/// Page id the fallback route points at.
pub const NOT_FOUND_PAGE: &str = "not-found";

#[derive(Debug, Clone, Copy, Default)]
pub struct NotFoundPageFactory;

impl PageFactory for NotFoundPageFactory {
    fn create(&self, _context: PageContext) -> Box<dyn Page> {
        Box::new(NotFoundPage)
    }

    fn capabilities(&self) -> PageCapabilities {
        PageCapabilities {
            has_store: false,
            client_entry: false,
        }
    }
}

struct NotFoundPage;

impl Page for NotFoundPage {
    fn render(&self, request: &PageRequest<'_>) -> Result<RenderResult, PageError> {
        Ok(RenderResult::new(NotFoundContent {
            path: request.uri.path().to_string(),
        })
        .with_status(StatusCode::NOT_FOUND))
    }
}

struct NotFoundContent {
    path: String,
}

impl ContentRenderer for NotFoundContent {
    fn render(&self, deps: &PageDependencies, _phase: &mut RenderPhase<'_>) -> Result<String, PageError> {
        Ok(Document::new(deps)
            .title("404 Not Found")
            .body(format!(
                "<h1>404 Not Found</h1>\n<p>Nothing here: <code>{}</code></p>",
                escape_html(&self.path)
            ))
            .render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataProvider, StaticDataProvider};
    use crate::http::CookieJar;
    use crate::routing::RouteArgs;
    use axum::http::{HeaderMap, Method, Uri};
    use std::sync::Arc;

    #[test]
    fn test_renders_404_with_path() {
        let provider: Arc<dyn DataProvider> = Arc::new(StaticDataProvider::default());
        let page = NotFoundPageFactory.create(PageContext {
            provider,
            cookies: CookieJar::default(),
            is_server: true,
        });
        let uri = Uri::from_static("/missing/page?x=1");
        let args = RouteArgs::new();
        let headers = HeaderMap::new();
        let request = PageRequest {
            page_id: NOT_FOUND_PAGE,
            method: &Method::GET,
            uri: &uri,
            headers: &headers,
            args: &args,
        };

        let result = page.render(&request).unwrap();
        assert_eq!(result.status, StatusCode::NOT_FOUND);

        let mut phase = RenderPhase::Final {
            store: None,
            state: None,
        };
        let html = result.content.render(&PageDependencies::default(), &mut phase).unwrap();
        assert!(html.contains("404 Not Found"));
        assert!(html.contains("<code>/missing/page</code>"));
    }
}
