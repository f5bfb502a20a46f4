//! HTML document shell around rendered page content.

use serde_json::Value;

use crate::compiler::PageDependencies;

/// Element id of the script tag carrying the hydrated state.
pub const STATE_ELEMENT_ID: &str = "__soya_state";

/// Builder for the final HTML document.
#[derive(Debug)]
pub struct Document<'a> {
    deps: &'a PageDependencies,
    title: Option<String>,
    body: String,
    state: Option<&'a Value>,
}

impl<'a> Document<'a> {
    pub fn new(deps: &'a PageDependencies) -> Self {
        Self {
            deps,
            title: None,
            body: String::new(),
            state: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Pre-rendered body markup. Inserted as-is.
    pub fn body(mut self, markup: impl Into<String>) -> Self {
        self.body = markup.into();
        self
    }

    pub fn state(mut self, state: Option<&'a Value>) -> Self {
        self.state = state;
        self
    }

    pub fn render(&self) -> String {
        let mut html = String::with_capacity(self.body.len() + 512);
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n");
        if let Some(title) = &self.title {
            html.push_str(&format!("<title>{}</title>\n", escape_html(title)));
        }
        for href in &self.deps.css {
            html.push_str(&format!(
                "<link rel=\"stylesheet\" href=\"{}\">\n",
                escape_html(href)
            ));
        }
        html.push_str("</head>\n<body>\n<div id=\"__soya_root\">");
        html.push_str(&self.body);
        html.push_str("</div>\n");

        if let Some(state) = self.state {
            html.push_str(&format!(
                "<script type=\"application/json\" id=\"{}\">{}</script>\n",
                STATE_ELEMENT_ID,
                escape_state(state)
            ));
        }
        for src in &self.deps.js {
            html.push_str(&format!("<script src=\"{}\"></script>\n", escape_html(src)));
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

/// Escape text for use in element content or a quoted attribute.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serialize state so it cannot terminate its script element early.
///
/// `<`, `>` and `&` only occur inside JSON strings, so rewriting them as
/// `\uXXXX` escapes keeps the output valid JSON. U+2028/U+2029 are escaped
/// for older JavaScript parsers.
fn escape_state(state: &Value) -> String {
    let json = state.to_string();
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    out
}

/// Extract the state snapshot embedded by [`Document::render`].
pub fn extract_state(html: &str) -> Option<Value> {
    script_body(html).and_then(|body| serde_json::from_str(body).ok())
}

fn script_body(html: &str) -> Option<&str> {
    let marker = format!("id=\"{}\">", STATE_ELEMENT_ID);
    let start = html.find(&marker)? + marker.len();
    let end = start + html[start..].find("</script>")?;
    Some(&html[start..end])
}
