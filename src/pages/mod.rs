//! Built-in pages.
//!
//! - `StaticPage`: a template file rendered into the document shell
//! - `NotFoundPage`: the page the fallback route resolves to (404)
//!
//! Neither page has a store or a client entry.

pub mod not_found;
pub mod static_page;

pub use not_found::{NotFoundPageFactory, NOT_FOUND_PAGE};
pub use static_page::{StaticPageFactory, TemplateError};
