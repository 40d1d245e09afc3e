//! Pull the JSON payload out of a model's free-text answer.

/// Return the slice of `text` most likely to hold the JSON answer.
///
/// Tries, in order: a ```` ```json ```` fenced block, any other fenced
/// block, the span from the first `{` to the last `}`, and finally the
/// trimmed text itself.
pub fn extract_json(text: &str) -> &str {
    if let Some(body) = fenced_block(text, "```json") {
        return body;
    }
    if let Some(body) = fenced_block(text, "```") {
        return body;
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text.trim(),
    }
}

fn fenced_block<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let start = text.find(opener)? + opener.len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}
