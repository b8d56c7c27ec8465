use crate::domain::candidate::CandidateCase;
use crate::domain::operation::OperationRef;
use crate::domain::test_case::{
    DesignTechnique, Priority, TestCase, TestStep, TestType, ValidationError,
};
use chrono::Utc;
use serde_json::{Map, Value};

const ACTION_KEYS: [&str; 3] = ["action", "step", "step_action"];
const EXPECTED_KEYS: [&str; 4] = ["expected_result", "expected", "expectedResult", "expected_outcome"];

/// A promoted test case plus the repairs made while promoting it.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCase {
    pub case: TestCase,
    pub warnings: Vec<String>,
}

/// Promotes a candidate to a [`TestCase`].
///
/// Required fields are checked in order (title, steps, test type, design
/// technique) and the first missing one rejects the candidate. Everything else is
/// salvaged: bad steps are dropped, an unusable priority is cleared, and the
/// operation reference always comes from `operation`.
pub fn validate(
    candidate: &CandidateCase,
    operation: &OperationRef,
) -> Result<ValidatedCase, ValidationError> {
    let mut warnings = Vec::new();

    let title = candidate
        .title
        .as_ref()
        .and_then(coerce_text)
        .filter(|title| !title.is_empty())
        .ok_or(ValidationError::MissingTitle)?;

    let test_steps = collect_steps(candidate.steps.as_ref(), &mut warnings);
    if test_steps.is_empty() {
        return Err(ValidationError::NoSteps);
    }

    let raw_type = candidate
        .test_type
        .as_ref()
        .and_then(coerce_text)
        .filter(|value| !value.is_empty())
        .ok_or(ValidationError::MissingTestType)?;
    let test_type =
        TestType::parse(&raw_type).ok_or(ValidationError::InvalidTestType(raw_type))?;

    let raw_technique = candidate
        .design_technique
        .as_ref()
        .and_then(coerce_text)
        .filter(|value| !value.is_empty())
        .ok_or(ValidationError::MissingDesignTechnique)?;
    let design_technique = DesignTechnique::parse(&raw_technique)
        .ok_or(ValidationError::UnknownDesignTechnique(raw_technique))?;

    let priority = candidate
        .priority
        .as_ref()
        .and_then(|value| coerce_priority(value, &mut warnings));

    check_operation(candidate, operation, &mut warnings);

    Ok(ValidatedCase {
        case: TestCase {
            title,
            description: text_or_empty(candidate.description.as_ref()),
            preconditions: text_or_empty(candidate.preconditions.as_ref()),
            test_steps,
            test_type,
            design_technique,
            operation: operation.clone(),
            priority,
            created_date: Utc::now(),
        },
        warnings,
    })
}

/// Strings are trimmed, scalars stringified and arrays joined line by line.
fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(coerce_text)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Value::Null | Value::Object(_) => None,
    }
}

fn text_or_empty(value: Option<&Value>) -> String {
    value.and_then(coerce_text).unwrap_or_default()
}

fn first_text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .filter_map(coerce_text)
        .find(|text| !text.is_empty())
}

fn collect_steps(steps: Option<&Value>, warnings: &mut Vec<String>) -> Vec<TestStep> {
    let items = match steps {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => return Vec::new(),
        Some(_) => {
            warnings.push("steps field is not a list".to_string());
            return Vec::new();
        }
    };

    let mut accepted = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let number = idx + 1;
        let Some(object) = item.as_object() else {
            warnings.push(format!("step {} dropped: not an object", number));
            continue;
        };
        match (
            first_text(object, &ACTION_KEYS),
            first_text(object, &EXPECTED_KEYS),
        ) {
            (Some(action), Some(expected_result)) => accepted.push(TestStep {
                action,
                expected_result,
            }),
            (None, _) => warnings.push(format!("step {} dropped: missing action", number)),
            (_, None) => {
                warnings.push(format!("step {} dropped: missing expected result", number))
            }
        }
    }
    accepted
}

fn coerce_priority(value: &Value, warnings: &mut Vec<String>) -> Option<Priority> {
    let parsed = match value {
        Value::Null => return None,
        Value::Number(number) => number.as_f64().and_then(Priority::from_number),
        Value::String(text) if text.trim().is_empty() => return None,
        Value::String(text) => Priority::parse(text),
        _ => None,
    };
    if parsed.is_none() {
        warnings.push(format!("priority {} cleared", value));
    }
    parsed
}

fn check_operation(candidate: &CandidateCase, operation: &OperationRef, warnings: &mut Vec<String>) {
    if let Some(path) = candidate.api_path.as_ref().and_then(coerce_text) {
        if !path.is_empty() && path != operation.path {
            warnings.push(format!(
                "api_path '{}' ignored, case belongs to {}",
                path, operation
            ));
        }
    }
    if let Some(method) = candidate.http_method.as_ref().and_then(coerce_text) {
        if !method.is_empty() && !method.eq_ignore_ascii_case(&operation.method) {
            warnings.push(format!(
                "http_method '{}' ignored, case belongs to {}",
                method, operation
            ));
        }
    }
}
