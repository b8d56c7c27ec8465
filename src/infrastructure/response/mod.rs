use once_cell::sync::Lazy;
use regex::Regex;

static THINK_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>").unwrap());

static REASONING_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<reasoning>[\s\S]*?</reasoning>").unwrap());

static INTERNAL_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<internal>[\s\S]*?</internal>").unwrap());

/// Unterminated `<think>` at the very start: the model ran out of tokens while reasoning.
static OPEN_THINK_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*<think>[\s\S]*$").unwrap());

/// Removes reasoning blocks some models emit around their answer.
/// Only whole tagged blocks are removed; the JSON payload is left byte-for-byte intact.
pub fn clean_llm_response(response: &str) -> String {
    let mut cleaned = THINK_TAG_PATTERN.replace_all(response, "").to_string();
    cleaned = REASONING_TAG_PATTERN.replace_all(&cleaned, "").to_string();
    cleaned = INTERNAL_TAG_PATTERN.replace_all(&cleaned, "").to_string();
    cleaned = OPEN_THINK_PATTERN.replace(&cleaned, "").to_string();
    cleaned.trim().to_string()
}
