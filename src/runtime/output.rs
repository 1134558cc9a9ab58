//! Structured output extraction.
//!
//! Model replies rarely arrive as clean JSON. The extraction chain tries,
//! in order: the whole reply, fenced code blocks, then the outermost brace
//! span. A reply that yields no JSON is still a successful task; callers
//! keep the raw text and leave the structured payload empty.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Matches ``` or ```json fences and captures the body between them.
static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("fenced block pattern is valid")
});

/// Extract a JSON value from a model reply, if one is present.
///
/// Strategies are attempted in order and the first parse wins:
/// 1. the whole reply, trimmed
/// 2. each fenced code block, trimmed
/// 3. the span from the first `{` to the last `}`
pub fn parse_structured_output(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        return Some(value);
    }

    for captures in FENCED_BLOCK.captures_iter(text) {
        if let Some(block) = captures.get(1) {
            if let Ok(value) = serde_json::from_str::<Value>(block.as_str().trim()) {
                return Some(value);
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
            return Some(value);
        }
    }

    None
}
