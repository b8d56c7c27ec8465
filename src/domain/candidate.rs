use serde_json::{Map, Value};

/// Unvalidated test case pulled out of model output. Every field is optional and
/// keeps its raw JSON value so the validator can coerce or reject it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateCase {
    pub title: Option<Value>,
    pub description: Option<Value>,
    pub preconditions: Option<Value>,
    pub steps: Option<Value>,
    pub test_type: Option<Value>,
    pub design_technique: Option<Value>,
    pub priority: Option<Value>,
    pub api_path: Option<Value>,
    pub http_method: Option<Value>,
}

impl CandidateCase {
    pub fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            title: pick(object, &["title", "name", "test_case", "testCase"]),
            description: pick(object, &["description", "summary"]),
            preconditions: pick(object, &["preconditions", "precondition", "pre_conditions"]),
            steps: pick(object, &["test_steps", "testSteps", "steps"]),
            test_type: pick(object, &["test_type", "testType", "type"]),
            design_technique: pick(
                object,
                &["design_technique", "designTechnique", "technique", "test_design_technique"],
            ),
            priority: pick(object, &["priority"]),
            api_path: pick(object, &["api_path", "apiPath", "path"]),
            http_method: pick(object, &["http_method", "httpMethod", "method"]),
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().map(Self::from_object)
    }

    /// Heuristic used by recovery to tell a bare case object from a wrapper.
    pub fn looks_like_case(object: &Map<String, Value>) -> bool {
        ["title", "test_steps", "testSteps", "steps", "test_type", "testType"]
            .iter()
            .any(|key| object.contains_key(*key))
    }
}

fn pick(object: &Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_aliases_are_recognized() {
        let value = json!({
            "name": "Create user",
            "steps": [{"action": "POST /users", "expected": "201"}],
            "type": "Positive",
            "technique": "EP"
        });
        let candidate = CandidateCase::from_value(&value).unwrap();
        assert_eq!(candidate.title, Some(json!("Create user")));
        assert!(candidate.steps.is_some());
        assert_eq!(candidate.test_type, Some(json!("Positive")));
        assert_eq!(candidate.design_technique, Some(json!("EP")));
    }

    #[test]
    fn test_first_non_null_alias_wins() {
        let value = json!({"title": null, "name": "Fallback"});
        let candidate = CandidateCase::from_value(&value).unwrap();
        assert_eq!(candidate.title, Some(json!("Fallback")));
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(CandidateCase::from_value(&json!([1, 2])).is_none());
    }
}
