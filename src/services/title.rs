//! Display titles derived from screenshot file names.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

pub const FALLBACK_TITLE: &str = "Game Screenshot";

static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[_-]").unwrap());
static PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(screenshot|screen|capture|ss)\s*").unwrap());
static DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}[-_.\s]\d{2}[-_.\s]\d{2}(?:[-_.\sT]\d{2}[-_.\s]\d{2}[-_.\s]\d{2})?").unwrap()
});
static PAREN_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(\d+\)").unwrap());
static LONG_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{10,}").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

pub fn generate_title(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let title = SEPARATORS.replace_all(&stem, " ");
    let title = PREFIX.replace(&title, "");
    let title = DATE_TIME.replace_all(&title, "");
    let title = PAREN_NUMBER.replace_all(&title, "");
    let title = LONG_DIGITS.replace_all(&title, "");
    let title = WHITESPACE.replace_all(&title, " ");
    let title = title.trim();

    if title.chars().count() < 3 {
        return title_case(FALLBACK_TITLE);
    }
    title_case(title)
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
