//! Turns raw model text into candidate test cases.
//!
//! Strategies run strictest first and the first one that yields at least one
//! case object wins. Nothing here fails: an empty `Recovery` means every
//! strategy was exhausted.

mod scan;

use crate::domain::candidate::CandidateCase;
use crate::domain::model_response::{RawModelResponse, RecoveryStrategy};
use crate::infrastructure::response::clean_llm_response;
use serde_json::{Map, Value};

type Entry = Map<String, Value>;

/// Keys under which models wrap the case array, checked in this order.
const WRAPPER_KEYS: [&str; 6] = ["test_cases", "testCases", "cases", "items", "data", "results"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recovery {
    pub candidates: Vec<CandidateCase>,
    pub strategy: Option<RecoveryStrategy>,
}

impl Recovery {
    pub fn is_exhausted(&self) -> bool {
        self.strategy.is_none()
    }
}

/// Recovers candidates from a model response and records the winning strategy on it.
pub fn recover_response(response: &mut RawModelResponse) -> Recovery {
    let recovery = recover(&response.text);
    response.strategy = recovery.strategy;
    tracing::debug!(
        operation = %response.operation,
        mode = %response.mode,
        truncated = response.truncated,
        strategy = ?recovery.strategy,
        candidates = recovery.candidates.len(),
        "response recovery finished"
    );
    recovery
}

pub fn recover(raw_text: &str) -> Recovery {
    let cleaned = clean_llm_response(raw_text);
    for strategy in RecoveryStrategy::ORDER {
        let entries = apply_strategy(strategy, &cleaned);
        if !entries.is_empty() {
            return Recovery {
                candidates: entries.iter().map(CandidateCase::from_object).collect(),
                strategy: Some(strategy),
            };
        }
    }
    Recovery::default()
}

fn apply_strategy(strategy: RecoveryStrategy, text: &str) -> Vec<Entry> {
    match strategy {
        RecoveryStrategy::DirectParse => parse_entries(text.trim()),
        RecoveryStrategy::CodeBlock => scan::code_blocks(text)
            .into_iter()
            .flat_map(|block| parse_entries(block.trim()))
            .collect(),
        RecoveryStrategy::ArrayBoundary => array_boundary(text),
        RecoveryStrategy::TruncationRepair => scan::repair_truncated(text)
            .map(|repaired| parse_entries(&repaired))
            .unwrap_or_default(),
        RecoveryStrategy::ObjectScan => scan_objects(text),
    }
}

fn parse_entries(text: &str) -> Vec<Entry> {
    serde_json::from_str::<Value>(text)
        .map(entries_from_value)
        .unwrap_or_default()
}

/// Normalizes a parsed value to its case objects: an array yields its objects, an
/// object yields its wrapped array or itself when it already looks like a case.
fn entries_from_value(value: Value) -> Vec<Entry> {
    match value {
        Value::Array(items) => objects_of(items),
        Value::Object(mut map) => {
            for key in WRAPPER_KEYS {
                if let Some(Value::Array(items)) = map.get(key) {
                    if !items.is_empty() {
                        if let Some(Value::Array(items)) = map.remove(key) {
                            return objects_of(items);
                        }
                    }
                }
            }
            if CandidateCase::looks_like_case(&map) {
                return vec![map];
            }

            let mut arrays = map.into_iter().filter_map(|(_, value)| match value {
                Value::Array(items) if items.iter().any(Value::is_object) => Some(items),
                _ => None,
            });
            match (arrays.next(), arrays.next()) {
                (Some(items), None) => objects_of(items),
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

fn objects_of(items: Vec<Value>) -> Vec<Entry> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

/// Tries each balanced `[...]` span in turn, skipping prose like `[note]` that
/// happens to precede the real array. A span only counts when it holds something
/// case-shaped, so a nested `test_steps` array is never mistaken for the cases.
fn array_boundary(text: &str) -> Vec<Entry> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('[') {
        let open = search_from + offset;
        let Some(close) = scan::matching_close(text, open) else {
            break;
        };
        let entries = parse_entries(&text[open..=close]);
        if entries.iter().any(CandidateCase::looks_like_case) {
            return entries;
        }
        search_from = close + 1;
    }
    Vec::new()
}

/// Collects every balanced `{...}` block that parses, outermost first. A block
/// that fails to parse, or never closes, is searched again from the inside.
fn scan_objects(text: &str) -> Vec<Entry> {
    let mut entries = Vec::new();
    let mut consumed_to = 0;
    for (open, close) in scan::balanced_objects(text) {
        if open < consumed_to {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<Value>(&text[open..=close]) {
            entries.extend(entries_from_value(value));
            consumed_to = close + 1;
        }
    }
    entries
}
