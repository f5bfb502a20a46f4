//! Template-backed pages.
//!
//! A template is compiled once when the factory is built, so syntax errors
//! surface at startup. Route args are the render context; output is
//! HTML-escaped by the engine.

use std::path::Path;
use std::sync::Arc;

use minijinja::{AutoEscape, Environment};
use thiserror::Error;

use crate::app::{Page, PageCapabilities, PageContext, PageFactory, PageRequest};
use crate::compiler::PageDependencies;
use crate::render::{ContentRenderer, Document, PageError, RenderPhase, RenderResult};

const TEMPLATE_NAME: &str = "page.html";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid template: {0}")]
    Syntax(#[from] minijinja::Error),
}

/// Serves one template. `{{ name }}` expands to the route argument of that
/// name; undefined names render empty.
#[derive(Debug, Clone)]
pub struct StaticPageFactory {
    title: Option<String>,
    env: Arc<Environment<'static>>,
}

impl StaticPageFactory {
    pub fn new(template: impl Into<String>) -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.add_template_owned(TEMPLATE_NAME, template.into())?;
        Ok(Self {
            title: None,
            env: Arc::new(env),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let template = std::fs::read_to_string(path)?;
        Self::new(template)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

impl PageFactory for StaticPageFactory {
    fn create(&self, _context: PageContext) -> Box<dyn Page> {
        Box::new(StaticPage {
            title: self.title.clone(),
            env: self.env.clone(),
        })
    }

    fn capabilities(&self) -> PageCapabilities {
        PageCapabilities {
            has_store: false,
            client_entry: false,
        }
    }
}

struct StaticPage {
    title: Option<String>,
    env: Arc<Environment<'static>>,
}

impl Page for StaticPage {
    fn render(&self, request: &PageRequest<'_>) -> Result<RenderResult, PageError> {
        let markup = self
            .env
            .get_template(TEMPLATE_NAME)
            .and_then(|template| template.render(request.args))
            .map_err(|e| PageError::Render(format!("template for page '{}': {}", request.page_id, e)))?;
        Ok(RenderResult::new(StaticContent {
            title: self.title.clone(),
            markup,
        }))
    }
}

struct StaticContent {
    title: Option<String>,
    markup: String,
}

impl ContentRenderer for StaticContent {
    fn render(&self, deps: &PageDependencies, phase: &mut RenderPhase<'_>) -> Result<String, PageError> {
        let mut document = Document::new(deps).body(self.markup.as_str()).state(phase.state());
        if let Some(title) = &self.title {
            document = document.title(title.as_str());
        }
        Ok(document.render())
    }
}
