//! Text cleanup helpers for model responses
//!
//! Models often wrap JSON in markdown fences or add a sentence before or
//! after the payload. These helpers peel that off before parsing.

/// Remove markdown code fences and surrounding whitespace
///
/// Handles a leading ```` ``` ```` or ```` ```json ```` fence line and a
/// trailing ```` ``` ````. Text without fences is only trimmed.
pub fn strip_code_fences(response: &str) -> String {
    let mut text = response.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop the language tag on the opening fence line
        text = match rest.find('\n') {
            Some(newline) if is_fence_tag(&rest[..newline]) => &rest[newline + 1..],
            _ => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }

    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    text.trim().to_string()
}

fn is_fence_tag(line: &str) -> bool {
    line.trim().chars().all(|c| c.is_ascii_alphanumeric())
}

/// Slice out the outermost JSON object, if any
pub fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (start < end).then(|| &response[start..=end])
}

/// Shorten text for log lines and error messages
pub fn truncate_for_log(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
