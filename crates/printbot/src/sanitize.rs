//! Helpers for shaping message data before it enters log fields.
//!
//! Message ids can be long and bodies can hold personal data, so log
//! fields carry bounded, single-line excerpts only.

/// Longest message id written into a log field.
pub const MAX_LOGGED_ID_CHARS: usize = 60;

/// Shortens an id for logging, keeping its tail where ids usually differ.
pub fn truncate_id(id: &str) -> String {
    let count = id.chars().count();
    if count <= MAX_LOGGED_ID_CHARS {
        return id.to_string();
    }
    let tail: String = id.chars().skip(count - (MAX_LOGGED_ID_CHARS - 3)).collect();
    format!("...{}", tail)
}

/// Single-line excerpt of at most `max_chars` characters.
///
/// Whitespace runs (including newlines) collapse into one space; an
/// ellipsis marks a cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.push('…');
    cut
}
