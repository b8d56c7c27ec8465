use super::refs::resolve_refs;
use super::SpecVersion;
use crate::domain::app_config::FilterConfig;
use crate::domain::operation::{
    ApiContext, Operation, Parameter, ParameterConstraints, ParameterLocation,
};
use serde_json::Value;

pub(crate) const HTTP_METHODS: [&str; 7] = ["get", "post", "put", "patch", "delete", "head", "options"];

/// Operations in document order, filtered and fully resolved.
pub(crate) fn extract_operations(root: &Value, filters: &FilterConfig) -> Vec<Operation> {
    let Some(paths) = root.get("paths").and_then(Value::as_object) else {
        tracing::warn!("specification has no paths");
        return Vec::new();
    };

    let mut operations = Vec::new();
    for (path, item) in paths {
        if !filters.should_process_path(path) {
            tracing::debug!(path = %path, "path filtered out");
            continue;
        }
        let item = resolve_refs(item, root);
        let shared_parameters = array(&item, "parameters");

        for method in HTTP_METHODS {
            let Some(raw) = item.get(method).filter(|raw| raw.is_object()) else {
                continue;
            };
            if !filters.should_process_method(method) {
                continue;
            }
            let tags = strings(raw.get("tags"));
            if !filters.should_process_tags(&tags) {
                tracing::debug!(path = %path, method, "operation filtered out by tags");
                continue;
            }
            operations.push(build_operation(path, method, raw, shared_parameters, tags));
        }
    }
    operations
}

fn build_operation(
    path: &str,
    method: &str,
    raw: &Value,
    shared_parameters: &[Value],
    tags: Vec<String>,
) -> Operation {
    let mut operation = Operation::new(method, path);
    operation.operation_id = text(raw.get("operationId"));
    operation.summary = text(raw.get("summary"));
    operation.description = text(raw.get("description"));
    operation.tags = tags;
    operation.security = raw.get("security").cloned();

    for value in shared_parameters.iter().chain(array(raw, "parameters")) {
        if value.get("in").and_then(Value::as_str) == Some("body") {
            // Swagger 2 request body.
            operation.request_body = value.get("schema").cloned();
            continue;
        }
        let Some(parameter) = parameter_from(value) else {
            continue;
        };
        // Operation-level definitions come second and replace path-level ones.
        match operation
            .parameters
            .iter_mut()
            .find(|existing| existing.name == parameter.name && existing.location == parameter.location)
        {
            Some(existing) => *existing = parameter,
            None => operation.parameters.push(parameter),
        }
    }

    if let Some(schema) = raw.get("requestBody").and_then(request_body_schema) {
        operation.request_body = Some(schema.clone());
    }
    if let Some(schema) = operation.request_body.clone() {
        flatten_body(&schema, &mut operation.parameters);
    }

    if let Some(responses) = raw.get("responses").and_then(Value::as_object) {
        operation.responses = responses
            .iter()
            .map(|(status, response)| (status.clone(), response.clone()))
            .collect();
    }
    operation
}

fn parameter_from(value: &Value) -> Option<Parameter> {
    let name = value.get("name").and_then(Value::as_str)?;
    let raw_location = value.get("in").and_then(Value::as_str).unwrap_or_default();
    let Some(location) = ParameterLocation::parse(raw_location) else {
        tracing::debug!(name, location = raw_location, "parameter with unknown location skipped");
        return None;
    };
    // OpenAPI 3 nests the schema; Swagger 2 puts the keywords on the parameter itself.
    let schema = value.get("schema").unwrap_or(value);
    Some(Parameter {
        name: name.to_string(),
        location,
        schema_type: schema_type(schema),
        format: text(schema.get("format")),
        description: text(value.get("description")),
        required: location == ParameterLocation::Path
            || value.get("required").and_then(Value::as_bool).unwrap_or(false),
        constraints: ParameterConstraints::from_schema(schema),
    })
}

/// Picks the JSON (or form) schema out of an OpenAPI 3 `requestBody`.
fn request_body_schema(body: &Value) -> Option<&Value> {
    let content = body.get("content").and_then(Value::as_object)?;
    let preferred = content
        .get("application/json")
        .or_else(|| {
            content
                .iter()
                .find(|(media, _)| media.contains("json"))
                .map(|(_, value)| value)
        })
        .or_else(|| content.values().next())?;
    preferred.get("schema")
}

/// Adds one body parameter per top-level property of an object schema.
fn flatten_body(schema: &Value, parameters: &mut Vec<Parameter>) {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return;
    };
    let required = strings(schema.get("required"));
    for (name, property) in properties {
        let exists = parameters
            .iter()
            .any(|param| param.location == ParameterLocation::Body && &param.name == name);
        if exists {
            continue;
        }
        parameters.push(Parameter {
            name: name.clone(),
            location: ParameterLocation::Body,
            schema_type: schema_type(property),
            format: text(property.get("format")),
            description: text(property.get("description")),
            required: required.contains(name),
            constraints: ParameterConstraints::from_schema(property),
        });
    }
}

pub(crate) fn build_api_context(root: &Value, version: SpecVersion) -> ApiContext {
    let info = root.get("info");
    let (servers, security_schemes) = match version {
        SpecVersion::OpenApi3 => (
            root.get("servers")
                .and_then(Value::as_array)
                .map(|servers| {
                    servers
                        .iter()
                        .filter_map(|server| text(server.get("url")))
                        .collect()
                })
                .unwrap_or_default(),
            root.pointer("/components/securitySchemes").cloned(),
        ),
        SpecVersion::Swagger2 => (
            swagger_servers(root),
            root.get("securityDefinitions").cloned(),
        ),
    };
    ApiContext {
        title: text(info.and_then(|info| info.get("title"))),
        version: text(info.and_then(|info| info.get("version"))),
        servers,
        security_schemes,
        security: root.get("security").cloned(),
    }
}

fn swagger_servers(root: &Value) -> Vec<String> {
    let Some(host) = text(root.get("host")) else {
        return Vec::new();
    };
    let base_path = text(root.get("basePath")).unwrap_or_default();
    let mut schemes = strings(root.get("schemes"));
    if schemes.is_empty() {
        schemes.push("https".to_string());
    }
    schemes
        .into_iter()
        .map(|scheme| format!("{}://{}{}", scheme, host, base_path))
        .collect()
}

fn schema_type(schema: &Value) -> Option<String> {
    match schema.get("type")? {
        Value::String(kind) => Some(kind.clone()),
        // OpenAPI 3.1 allows ["string", "null"].
        Value::Array(kinds) => kinds
            .iter()
            .filter_map(Value::as_str)
            .find(|kind| *kind != "null")
            .map(str::to_string),
        _ => None,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
