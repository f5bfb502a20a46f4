//! Request/response pair flowing through the middleware chain.

use axum::body::{Body, Bytes};
use axum::http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, Request, Response, StatusCode};

use crate::error::SoyaError;

/// Content type of every dispatched page.
pub const HTML_CONTENT_TYPE: &str = "text/html;charset=UTF-8";

/// One in-flight request and the response being built for it.
#[derive(Debug)]
pub struct Exchange {
    pub request: Request<Body>,
    pub response: ResponseWriter,
    request_id: String,
}

impl Exchange {
    pub fn new(request: Request<Body>) -> Self {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        Self {
            request,
            response: ResponseWriter::new(),
            request_id,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn path(&self) -> &str {
        self.request.uri().path()
    }
}

/// Buffered response with an explicit "headers sent" flag.
///
/// Once headers are sent the status and headers are frozen; errors after that
/// point must go to the sent-response channel.
#[derive(Debug)]
pub struct ResponseWriter {
    status: StatusCode,
    reason: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    headers_sent: bool,
    finished: bool,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            reason: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            headers_sent: false,
            finished: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn ensure_open(&self) -> Result<(), SoyaError> {
        if self.headers_sent {
            return Err(SoyaError::HeadersSent);
        }
        Ok(())
    }

    pub fn set_status(&mut self, status: StatusCode) -> Result<(), SoyaError> {
        self.ensure_open()?;
        self.status = status;
        Ok(())
    }

    /// Custom reason phrase for the status line.
    pub fn set_reason(&mut self, reason: impl Into<String>) -> Result<(), SoyaError> {
        self.ensure_open()?;
        self.reason = Some(reason.into());
        Ok(())
    }

    /// Append a header, keeping earlier values of the same name.
    pub fn append_header(&mut self, name: &str, value: &str) -> Result<(), SoyaError> {
        self.ensure_open()?;
        let (name, value) = parse_header(name, value)?;
        self.headers.append(name, value);
        Ok(())
    }

    /// Set a header, replacing earlier values of the same name.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), SoyaError> {
        self.ensure_open()?;
        let (name, value) = parse_header(name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Mark headers as flushed without finishing the body.
    pub fn flush_headers(&mut self) {
        self.headers_sent = true;
    }

    /// Write `body` and finish the response. Allowed after `flush_headers`,
    /// but only once.
    pub fn send(&mut self, body: impl Into<Bytes>) -> Result<(), SoyaError> {
        if self.finished {
            return Err(SoyaError::HeadersSent);
        }
        self.body = body.into();
        self.headers_sent = true;
        self.finished = true;
        Ok(())
    }

    /// Write an HTML body with `Content-Type` and `Content-Length` set.
    pub fn send_html(&mut self, html: String) -> Result<(), SoyaError> {
        self.set_header(CONTENT_TYPE.as_str(), HTML_CONTENT_TYPE)?;
        self.set_header(CONTENT_LENGTH.as_str(), &html.len().to_string())?;
        self.send(html)
    }

    /// Throw away everything written so far. Only valid before headers are sent.
    pub fn reset(&mut self) -> Result<(), SoyaError> {
        self.ensure_open()?;
        *self = Self::new();
        Ok(())
    }

    pub fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;

        if let Some(reason) = self.reason {
            if self.status.canonical_reason() != Some(reason.as_str()) {
                match hyper::ext::ReasonPhrase::try_from(reason) {
                    Ok(phrase) => {
                        response.extensions_mut().insert(phrase);
                    }
                    Err(_) => tracing::debug!("Dropping invalid reason phrase"),
                }
            }
        }
        response
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), SoyaError> {
    let header_name =
        HeaderName::try_from(name).map_err(|_| SoyaError::InvalidHeader(name.to_string()))?;
    let header_value =
        HeaderValue::try_from(value).map_err(|_| SoyaError::InvalidHeader(name.to_string()))?;
    Ok((header_name, header_value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_freezes_headers() {
        let mut writer = ResponseWriter::new();
        writer.set_status(StatusCode::CREATED).unwrap();
        writer.append_header("x-one", "1").unwrap();
        writer.send("done").unwrap();

        assert!(writer.headers_sent());
        assert!(matches!(writer.set_status(StatusCode::OK), Err(SoyaError::HeadersSent)));
        assert!(matches!(writer.append_header("x-two", "2"), Err(SoyaError::HeadersSent)));
        assert!(writer.reset().is_err());

        let response = writer.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-one"], "1");
    }

    #[test]
    fn test_send_html_sets_length_in_bytes() {
        let mut writer = ResponseWriter::new();
        writer.send_html("héllo".to_string()).unwrap();
        assert_eq!(writer.headers()[CONTENT_LENGTH], "6");
        assert_eq!(writer.headers()[CONTENT_TYPE], HTML_CONTENT_TYPE);
    }

    #[test]
    fn test_invalid_header_rejected() {
        let mut writer = ResponseWriter::new();
        assert!(matches!(
            writer.append_header("bad header", "x"),
            Err(SoyaError::InvalidHeader(_))
        ));
        assert!(writer.append_header("x-ok", "line\nbreak").is_err());
    }
}
