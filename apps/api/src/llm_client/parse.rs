//! Resilient JSON extraction from model output.
//!
//! Models are told to answer with bare JSON and regularly don't: they wrap it
//! in code fences or surround it with prose. `extract_json` tries, in order,
//! the whole body, the body with fences stripped, and the first-`{`-to-last-`}`
//! span. The first candidate that deserializes AND passes `accept` wins.

use serde::de::DeserializeOwned;

pub fn extract_json<T, F>(raw: &str, accept: F) -> Option<T>
where
    T: DeserializeOwned,
    F: Fn(&T) -> bool,
{
    let candidates = [
        Some(raw.trim()),
        Some(strip_json_fences(raw)),
        outermost_braces(raw),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(|candidate| serde_json::from_str::<T>(candidate).ok().filter(&accept))
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Greedy span from the first `{` through the last `}`.
fn outermost_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}
