//! Cleanup of generated answers before they are cached and shown

use once_cell::sync::Lazy;
use regex::Regex;

static BARE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^<])(https?://[^\s>]+)").expect("valid url regex"));
static BACKSLASH_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\{2,}").expect("valid regex"));
static LONE_BACKSLASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"([^\\])\\").expect("valid regex"));

/// Wrap bare URLs in angle brackets and drop stray escape characters
pub fn format_response(text: &str) -> String {
    let text = BARE_URL.replace_all(text, "${1}<${2}>");
    let text = BACKSLASH_RUN.replace_all(&text, r"\");
    let text = LONE_BACKSLASH.replace_all(&text, "${1}");
    text.trim().to_string()
}
