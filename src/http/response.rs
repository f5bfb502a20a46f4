//! Writing a rendered page to the response.
//!
//! # Responsibilities
//! - Apply status, reason phrase and page headers in order
//! - Emit one `Set-Cookie` header per cookie mutation
//! - Set `Content-Type` and a byte-accurate `Content-Length`
//!
//! # Design Decisions
//! - Page headers are appended, never merged, so repeated names survive
//! - The body is sent in one piece; headers are sent with it

use axum::http::header::SET_COOKIE;

use crate::error::SoyaError;
use crate::http::cookies::CookieJar;
use crate::http::exchange::ResponseWriter;
use crate::render::RenderOutcome;

/// Write `outcome` and the jar's cookie mutations, then finish the response.
pub fn write_render_outcome(
    response: &mut ResponseWriter,
    outcome: RenderOutcome,
    cookies: &CookieJar,
) -> Result<(), SoyaError> {
    response.set_status(outcome.status)?;
    if let Some(reason) = outcome.status_message {
        response.set_reason(reason)?;
    }
    for (name, value) in &outcome.headers {
        response.append_header(name, value)?;
    }
    for cookie in cookies.generate_header_values() {
        response.append_header(SET_COOKIE.as_str(), &cookie)?;
    }
    response.send_html(outcome.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::cookies::SetCookie;
    use crate::http::exchange::HTML_CONTENT_TYPE;
    use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
    use axum::http::StatusCode;

    fn outcome(body: &str) -> RenderOutcome {
        RenderOutcome {
            status: StatusCode::ACCEPTED,
            status_message: Some("Queued".into()),
            headers: vec![
                ("x-page".into(), "one".into()),
                ("x-page".into(), "two".into()),
            ],
            body: body.to_string(),
            state: None,
        }
    }

    #[test]
    fn test_writes_status_headers_and_cookies() {
        let mut response = ResponseWriter::new();
        let cookies = CookieJar::default();
        cookies.set(SetCookie::new("a", "1"));
        cookies.set(SetCookie::new("b", "2").secure());

        write_render_outcome(&mut response, outcome("<p>ok</p>"), &cookies).unwrap();

        assert!(response.is_finished());
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let pages: Vec<_> = response.headers().get_all("x-page").iter().collect();
        assert_eq!(pages, vec!["one", "two"]);
        let set: Vec<_> = response.headers().get_all(SET_COOKIE).iter().collect();
        assert_eq!(set, vec!["a=1; Path=/", "b=2; Path=/; Secure"]);
        assert_eq!(response.headers()[CONTENT_TYPE], HTML_CONTENT_TYPE);
        assert_eq!(response.body(), b"<p>ok</p>");
    }

    #[test]
    fn test_content_length_counts_bytes() {
        let mut response = ResponseWriter::new();
        write_render_outcome(&mut response, outcome("ünïcödé"), &CookieJar::default()).unwrap();
        assert_eq!(
            response.headers()[CONTENT_LENGTH],
            "ünïcödé".len().to_string().as_str()
        );
    }

    #[test]
    fn test_fails_once_headers_sent() {
        let mut response = ResponseWriter::new();
        response.flush_headers();
        let err = write_render_outcome(&mut response, outcome(""), &CookieJar::default()).unwrap_err();
        assert!(matches!(err, SoyaError::HeadersSent));
    }
}
