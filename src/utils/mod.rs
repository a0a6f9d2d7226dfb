//! Utility functions and helpers.

pub mod http;
pub mod time;

/// Collapse runs of whitespace (including newlines) into single spaces and trim.
///
/// This is the natural-key normalization for titles within a source.
pub fn normalize_title(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape text for HTML-flavoured chat markup.
pub fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
