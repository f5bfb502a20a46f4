//! Error responses.
//!
//! # Responsibilities
//! - Render an error page when nothing has been sent yet
//! - Report errors that happen after headers went out, without touching the
//!   response
//!
//! # Design Decisions
//! - The boundary picks the channel from `ResponseWriter::headers_sent`
//! - Details are only rendered when explicitly enabled (development)

use axum::body::Body;
use axum::http::{Request, StatusCode};

use crate::error::SoyaError;
use crate::http::exchange::ResponseWriter;
use crate::render::document::escape_html;

/// Receives every per-request error, exactly once.
pub trait ErrorHandler: Send + Sync {
    /// Headers are already out; the response can no longer change.
    fn response_sent_error(&self, error: &SoyaError, request: &Request<Body>, response: &ResponseWriter);

    /// Nothing sent yet; write a complete error response.
    fn response_not_sent_error(&self, error: &SoyaError, request: &Request<Body>, response: &mut ResponseWriter);
}

/// Logs every error and renders a minimal HTML error page.
#[derive(Debug, Clone)]
pub struct DefaultErrorHandler {
    status: StatusCode,
    expose_details: bool,
}

impl DefaultErrorHandler {
    pub fn new(status: StatusCode, expose_details: bool) -> Self {
        Self {
            status,
            expose_details,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn page(&self, error: &SoyaError) -> String {
        let reason = self.status.canonical_reason().unwrap_or("Error");
        let mut html = format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"UTF-8\"><title>{code} {reason}</title></head>\n<body>\n<h1>{code} {reason}</h1>\n",
            code = self.status.as_u16(),
        );
        if self.expose_details {
            html.push_str(&format!("<pre>{}</pre>\n", escape_html(&error.to_string())));
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

impl Default for DefaultErrorHandler {
    fn default() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, false)
    }
}

impl ErrorHandler for DefaultErrorHandler {
    fn response_sent_error(&self, error: &SoyaError, request: &Request<Body>, response: &ResponseWriter) {
        tracing::error!(
            error = %error,
            path = %request.uri().path(),
            status = response.status().as_u16(),
            "Error after response headers were sent"
        );
    }

    fn response_not_sent_error(&self, error: &SoyaError, request: &Request<Body>, response: &mut ResponseWriter) {
        tracing::error!(
            error = %error,
            kind = error.kind(),
            method = %request.method(),
            path = %request.uri().path(),
            "Request failed"
        );

        let written = response
            .reset()
            .and_then(|_| response.set_status(self.status))
            .and_then(|_| response.send_html(self.page(error)));
        if let Err(err) = written {
            tracing::error!(error = %err, "Failed to write error response");
        }
    }
}
