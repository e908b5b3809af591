//! HTML body to printable text.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use super::pdf::COLUMNS;

static RE_SCRIPT_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>").unwrap()
});
static RE_BLOCK_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|tr|li|h[1-6]|table|blockquote)\s*>").unwrap()
});
static RE_CELL_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</t[dh]\s*>").unwrap());
static RE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static RE_BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n[ \t]*(\n[ \t]*){2,}").unwrap());

/// Converts an HTML body into structured plain text.
///
/// Scripts and styles are dropped. Headings, lists, tables and line breaks
/// keep their shape, with table rows laid out on one line each. Text is
/// wrapped to the PDF column width. Never fails: when conversion errors, tags
/// are stripped instead.
pub fn html_to_text(html: &str) -> String {
    let cleaned = RE_SCRIPT_STYLE.replace_all(html, "");

    let text = match html2text::from_read(cleaned.as_bytes(), COLUMNS) {
        Ok(text) => ascii_rules(&text),
        Err(e) => {
            warn!(error = %e, "HTML conversion failed, falling back to tag stripping");
            strip_tags(html)
        }
    };

    let trimmed: Vec<&str> = text.lines().map(str::trim_end).collect();
    collapse_blank_lines(trimmed.join("\n").trim())
}

/// Replaces table box-drawing characters with ASCII the PDF font can show.
fn ascii_rules(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2500}' | '\u{2501}' | '\u{2550}' => '-',
            '\u{2502}' | '\u{2503}' | '\u{2551}' => '|',
            '\u{2500}'..='\u{257F}' => '+',
            other => other,
        })
        .collect()
}

/// Best-effort text extraction for markup the converter cannot handle.
pub fn strip_tags(html: &str) -> String {
    let without_code = RE_SCRIPT_STYLE.replace_all(html, "");
    let with_breaks = RE_BLOCK_END.replace_all(&without_code, "\n");
    let with_cells = RE_CELL_END.replace_all(&with_breaks, " | ");
    let bare = RE_TAG.replace_all(&with_cells, "");
    decode_entities(&bare)
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn collapse_blank_lines(text: &str) -> String {
    RE_BLANK_RUN.replace_all(text, "\n\n").into_owned()
}
