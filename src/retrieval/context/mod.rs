#[cfg(test)]
mod tests;

use crate::database::RetrievalResult;

/// Returned instead of an empty context so prompt templates stay well formed
pub const NO_CONTEXT_PLACEHOLDER: &str = "no relevant context found";

pub const SEPARATOR: &str = "\n---\n";

pub const ELLIPSIS: &str = "...";

/// Join the closest `max_items` results into one context string.
///
/// Results keep their ranked order. Any text longer than `max_chars_per_item`
/// characters is cut to that length and marked with an ellipsis.
#[inline]
pub fn assemble(
    results: &[RetrievalResult],
    max_items: usize,
    max_chars_per_item: usize,
) -> String {
    let items: Vec<String> = results
        .iter()
        .take(max_items)
        .map(|result| truncate_chars(&result.text, max_chars_per_item))
        .collect();

    if items.is_empty() {
        return NO_CONTEXT_PLACEHOLDER.to_string();
    }

    let context = items.join(SEPARATOR);
    // A lone record with no text still has to yield a usable context
    if context.is_empty() {
        ELLIPSIS.to_string()
    } else {
        context
    }
}

/// Cut `text` to at most `max_chars` characters, appending [`ELLIPSIS`] when cut
#[inline]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => {
            let mut truncated = text.get(..byte_index).unwrap_or(text).to_string();
            truncated.push_str(ELLIPSIS);
            truncated
        }
        None => text.to_string(),
    }
}
