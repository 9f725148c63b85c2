//! Idea-text parsing.
//!
//! Submissions arrive as free text of the form `PI: <title> | <description>`.
//! The trigger token is case-insensitive and the colon is optional; the first
//! `|` splits title from description. Parsing is pure and total - malformed
//! input degrades to "everything is the title", and empty input yields two
//! empty strings.

/// The token that marks a channel message as an idea submission.
pub const TRIGGER: &str = "PI";

/// Returns true when the text opens with the trigger token, in any case.
pub fn is_idea_submission(text: &str) -> bool {
    text.trim_start()
        .get(..TRIGGER.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(TRIGGER))
}

/// Strips the leading trigger token, an optional colon, and any whitespace
/// that follows. Text without the trigger is returned trimmed of leading
/// whitespace, unchanged otherwise.
pub fn strip_trigger(text: &str) -> &str {
    let trimmed = text.trim_start();
    if !is_idea_submission(trimmed) {
        return trimmed;
    }

    let rest = &trimmed[TRIGGER.len()..];
    rest.strip_prefix(':').unwrap_or(rest).trim_start()
}

/// Parses submission text into `(title, description)`.
///
/// The segment before the first `|` (trimmed) is the title and the remainder
/// (trimmed) the description; with no separator the whole remainder is the
/// title and the description is empty.
pub fn parse_idea_text(text: &str) -> (String, String) {
    let remainder = strip_trigger(text).trim();

    match remainder.split_once('|') {
        Some((title, description)) => (title.trim().to_owned(), description.trim().to_owned()),
        None => (remainder.to_owned(), String::new()),
    }
}
