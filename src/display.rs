//! Notebook display payloads.
//!
//! Formats data for a Jupyter front end as an nbformat `display_data` output.
//! Rendering is the front end's job; this module only builds the MIME bundle.

use serde_json::{Value, json};
use strum::{Display, EnumString};

/// Kind of payload, as named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum PayloadKind {
    Json,
    Html,
    Markdown,
    Heading,
}

/// Content handed to the notebook front end.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayPayload {
    /// Structured data
    Json(Value),
    /// Raw HTML markup
    Html(String),
    /// Markdown source
    Markdown(String),
    /// Heading text; level is clamped to 1..=6
    Heading { level: u8, text: String },
}

impl DisplayPayload {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::Heading {
            level: level.clamp(1, 6),
            text: text.into(),
        }
    }

    /// MIME type → representation.
    pub fn mime_data(&self) -> Value {
        match self {
            Self::Json(value) => json!({
                "application/json": value,
                "text/plain": serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
            }),
            Self::Html(html) => json!({
                "text/html": html,
                "text/plain": "<IPython.core.display.HTML object>",
            }),
            Self::Markdown(md) => json!({
                "text/markdown": md,
                "text/plain": md,
            }),
            Self::Heading { level, text } => {
                let level = (*level).clamp(1, 6);
                json!({
                    "text/html": format!("<h{0}>{1}</h{0}>", level, escape_html(text)),
                    "text/markdown": format!("{} {}", "#".repeat(level as usize), text),
                    "text/plain": text,
                })
            }
        }
    }

    /// Full nbformat `display_data` output.
    pub fn to_mime_bundle(&self) -> Value {
        json!({
            "output_type": "display_data",
            "data": self.mime_data(),
            "metadata": {},
        })
    }
}

/// Escape text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_bundle() {
        let payload = DisplayPayload::Json(json!({"loss": 0.5}));
        let bundle = payload.to_mime_bundle();
        assert_eq!(bundle["output_type"], "display_data");
        assert_eq!(bundle["data"]["application/json"]["loss"], 0.5);
        assert!(bundle["data"]["text/plain"].as_str().unwrap().contains("\"loss\""));
    }

    #[test]
    fn test_html_passthrough() {
        let bundle = DisplayPayload::Html("<b>hi</b>".to_string()).to_mime_bundle();
        assert_eq!(bundle["data"]["text/html"], "<b>hi</b>");
    }

    #[test]
    fn test_heading_escaped_and_clamped() {
        let payload = DisplayPayload::heading(9, "a < b");
        assert_eq!(payload, DisplayPayload::Heading { level: 6, text: "a < b".to_string() });

        let data = payload.mime_data();
        assert_eq!(data["text/html"], "<h6>a &lt; b</h6>");
        assert_eq!(data["text/markdown"], "###### a < b");

        let data = DisplayPayload::heading(0, "Top").mime_data();
        assert_eq!(data["text/html"], "<h1>Top</h1>");
    }

    #[test]
    fn test_payload_kind_parse() {
        assert_eq!("markdown".parse::<PayloadKind>().ok(), Some(PayloadKind::Markdown));
        assert!("xml".parse::<PayloadKind>().is_err());
    }
}
