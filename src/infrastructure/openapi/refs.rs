use serde_json::{json, Map, Value};

/// Returns `node` with every local `$ref` replaced by its target, resolved
/// recursively against `root`.
///
/// Cycle detection is per branch: a reference already being expanded higher up
/// the current branch becomes `{"$ref": ..., "x-circular-ref": true}`, while
/// the same reference reached from a sibling branch is expanded again.
pub(crate) fn resolve_refs(node: &Value, root: &Value) -> Value {
    let mut stack = Vec::new();
    resolve(node, root, &mut stack)
}

fn resolve(node: &Value, root: &Value, stack: &mut Vec<String>) -> Value {
    match node {
        Value::Object(map) => match map.get("$ref") {
            Some(Value::String(reference)) => resolve_reference(reference, map, root, stack),
            _ => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), resolve(value, root, stack)))
                    .collect(),
            ),
        },
        Value::Array(items) => Value::Array(items.iter().map(|item| resolve(item, root, stack)).collect()),
        other => other.clone(),
    }
}

fn resolve_reference(
    reference: &str,
    node: &Map<String, Value>,
    root: &Value,
    stack: &mut Vec<String>,
) -> Value {
    let Some(pointer) = reference.strip_prefix('#') else {
        tracing::warn!(reference, "external reference left unresolved");
        return Value::Object(node.clone());
    };
    if stack.iter().any(|seen| seen == reference) {
        tracing::debug!(reference, "circular reference");
        return json!({"$ref": reference, "x-circular-ref": true});
    }
    let Some(target) = root.pointer(pointer) else {
        tracing::warn!(reference, "reference target not found");
        return Value::Object(node.clone());
    };

    stack.push(reference.to_string());
    let mut resolved = resolve(target, root, stack);
    // Keywords written next to the `$ref` (description, nullable) win over the target's.
    if let Value::Object(resolved_map) = &mut resolved {
        for (key, value) in node.iter().filter(|(key, _)| key.as_str() != "$ref") {
            resolved_map.insert(key.clone(), resolve(value, root, stack));
        }
    }
    stack.pop();
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_refs_are_inlined() {
        let root = json!({
            "components": {"schemas": {
                "User": {"type": "object", "properties": {"address": {"$ref": "#/components/schemas/Address"}}},
                "Address": {"type": "object", "properties": {"city": {"type": "string"}}}
            }}
        });
        let resolved = resolve_refs(&json!({"$ref": "#/components/schemas/User"}), &root);
        assert_eq!(
            resolved["properties"]["address"]["properties"]["city"]["type"],
            "string"
        );
    }

    #[test]
    fn test_cycles_are_marked_not_followed() {
        let root = json!({
            "definitions": {
                "Node": {"type": "object", "properties": {"next": {"$ref": "#/definitions/Node"}}}
            }
        });
        let resolved = resolve_refs(&json!({"$ref": "#/definitions/Node"}), &root);
        assert_eq!(
            resolved["properties"]["next"],
            json!({"$ref": "#/definitions/Node", "x-circular-ref": true})
        );
    }

    #[test]
    fn test_sibling_branches_resolve_independently() {
        let root = json!({"definitions": {"Id": {"type": "integer"}}});
        let node = json!({"a": {"$ref": "#/definitions/Id"}, "b": {"$ref": "#/definitions/Id"}});
        let resolved = resolve_refs(&node, &root);
        assert_eq!(resolved["a"]["type"], "integer");
        assert_eq!(resolved["b"]["type"], "integer");
    }

    #[test]
    fn test_external_and_missing_refs_are_kept() {
        let root = json!({});
        let external = json!({"$ref": "common.yaml#/Error"});
        assert_eq!(resolve_refs(&external, &root), external);
        let missing = json!({"$ref": "#/components/schemas/Nope"});
        assert_eq!(resolve_refs(&missing, &root), missing);
    }

    #[test]
    fn test_sibling_keywords_override_target() {
        let root = json!({"definitions": {"Id": {"type": "integer", "description": "generic"}}});
        let node = json!({"$ref": "#/definitions/Id", "description": "user id"});
        let resolved = resolve_refs(&node, &root);
        assert_eq!(resolved["description"], "user id");
        assert_eq!(resolved["type"], "integer");
    }
}
