//! Field sanitizers
//!
//! Three policies apply to incoming fields:
//! - plain text (identifiers, composer, form, rhythm, maqam): all markup removed,
//!   whitespace collapsed, trimmed
//! - rich text (about, text, translation, analysis): HTML kept through an
//!   allow-list, so `<strong>` survives while `<script>` and its content do not
//! - URLs: must parse as absolute http(s) URLs with a host; empty means "no URL"

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

use crate::error::SyncError;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

static EXTERNAL_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("static regex"));

/// Strip every tag (and script/style content) and collapse whitespace
///
/// Entities in the input come back as the characters they name.
pub fn plain_text(input: &str) -> String {
    let cleaned = ammonia::Builder::empty()
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(input)
        .to_string();
    let text = unescape_serialized(&cleaned);
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Reverse the escapes the HTML serializer applies to text nodes
fn unescape_serialized(html: &str) -> String {
    html.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

/// Allow-list tags used by long-form fields
const EXTRA_RICH_TAGS: &[&str] = &["span", "figure", "figcaption"];

/// Sanitize long-form rich text, keeping permitted markup
///
/// Line breaks are preserved; disallowed tags are dropped, and the content of
/// `script`/`style` is removed entirely.
pub fn rich_text(input: &str) -> String {
    ammonia::Builder::default()
        .add_tags(EXTRA_RICH_TAGS)
        .clean(input)
        .to_string()
}

/// Validate a URL-shaped field
///
/// Returns the trimmed value. An empty value is accepted and means "no URL".
pub fn url_field(field: &'static str, input: &str) -> Result<String, SyncError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    let parsed = Url::parse(trimmed).map_err(|e| SyncError::InvalidField {
        field,
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SyncError::InvalidField {
            field,
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    if !parsed.has_host() {
        return Err(SyncError::InvalidField {
            field,
            reason: "URL has no host".to_string(),
        });
    }

    Ok(trimmed.to_string())
}

/// Whether a string is usable as an external identifier (and as a path segment)
pub fn is_valid_external_id(value: &str) -> bool {
    EXTERNAL_ID.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_strips_markup_and_whitespace() {
        assert_eq!(plain_text("  <b>Muhammad</b>\n  Abd   al-Wahhab "), "Muhammad Abd al-Wahhab");
        assert_eq!(plain_text("Rast<script>alert(1)</script>"), "Rast");
        assert_eq!(plain_text("Rock & Roll"), "Rock & Roll");
        assert_eq!(plain_text("<style>p { color: red }</style>Bayati"), "Bayati");
        assert_eq!(plain_text(""), "");
    }

    #[test]
    fn test_plain_text_keeps_stray_angle_brackets_and_decodes_entities() {
        assert_eq!(plain_text("Fish < Chips > x"), "Fish < Chips > x");
        assert_eq!(plain_text("Caf&eacute; &amp; Bar"), "Café & Bar");
        assert_eq!(plain_text("a &lt;b&gt; c"), "a <b> c");
        assert_eq!(plain_text("&amp;lt;"), "&lt;");
        assert_eq!(plain_text("Sama&nbsp;i"), "Sama i");
    }

    #[test]
    fn test_rich_text_keeps_allowed_markup() {
        let cleaned = rich_text("<p>A <strong>bold</strong> line<br>next</p>");
        assert!(cleaned.contains("<strong>bold</strong>"));
        assert!(cleaned.contains("<p>"));
        assert!(cleaned.contains("<br>"));
    }

    #[test]
    fn test_rich_text_removes_scripts() {
        let cleaned = rich_text("<p>ok</p><script>document.cookie</script><img src=x onerror=alert(1)>");
        assert!(!cleaned.contains("script"));
        assert!(!cleaned.contains("document.cookie"));
        assert!(!cleaned.contains("onerror"));
        assert!(cleaned.contains("<p>ok</p>"));
    }

    #[test]
    fn test_rich_text_preserves_line_breaks_and_arabic() {
        let cleaned = rich_text("يا ليل\nيا عين");
        assert_eq!(cleaned, "يا ليل\nيا عين");
    }

    #[test]
    fn test_url_field_accepts_http_urls() {
        assert_eq!(
            url_field("pdfUrl", " https://cdn.example.com/scores/longa.pdf ").unwrap(),
            "https://cdn.example.com/scores/longa.pdf"
        );
        assert_eq!(url_field("pdfUrl", "").unwrap(), "");
    }

    #[test]
    fn test_url_field_rejects_malformed() {
        for bad in ["not-a-url", "/relative/path.pdf", "javascript:alert(1)", "file:///etc/passwd"] {
            let err = url_field("pdfUrl", bad).unwrap_err();
            assert!(
                matches!(err, SyncError::InvalidField { field: "pdfUrl", .. }),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_external_id_pattern() {
        assert!(is_valid_external_id("5KsDBWseXY6QegucYAoacS"));
        assert!(is_valid_external_id("entry_01-b"));
        assert!(!is_valid_external_id(""));
        assert!(!is_valid_external_id("has space"));
        assert!(!is_valid_external_id("slash/inside"));
    }
}
