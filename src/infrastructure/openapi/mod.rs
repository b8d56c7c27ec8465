mod operations;
mod refs;

use crate::domain::app_config::FilterConfig;
use crate::domain::error::{AppError, Result};
use crate::domain::operation::{ApiContext, Operation};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecVersion {
    Swagger2,
    OpenApi3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Json,
    Yaml,
}

impl SpecFormat {
    fn from_extension(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        match Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => Some(SpecFormat::Json),
            Some("yaml") | Some("yml") => Some(SpecFormat::Yaml),
            _ => None,
        }
    }

    fn from_content_type(content_type: &str) -> Option<Self> {
        let content_type = content_type.to_ascii_lowercase();
        if content_type.contains("json") {
            Some(SpecFormat::Json)
        } else if content_type.contains("yaml") || content_type.contains("yml") {
            Some(SpecFormat::Yaml)
        } else {
            None
        }
    }
}

/// A parsed Swagger 2.0 or OpenAPI 3.x document.
#[derive(Debug, Clone)]
pub struct ApiSpec {
    pub version: SpecVersion,
    document: Value,
}

impl ApiSpec {
    /// Parses `text` as the given format, or sniffs JSON first and then YAML.
    pub fn parse(text: &str, format: Option<SpecFormat>) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(AppError::ParseError("specification is empty".to_string()));
        }
        let document = match format {
            Some(SpecFormat::Json) => parse_json(text)?,
            Some(SpecFormat::Yaml) => parse_yaml(text)?,
            None => match parse_json(text) {
                Ok(value) => value,
                Err(_) => parse_yaml(text)?,
            },
        };
        Self::from_value(document)
    }

    pub fn from_value(document: Value) -> Result<Self> {
        if !document.is_object() {
            return Err(AppError::ParseError(
                "specification root must be an object".to_string(),
            ));
        }
        let version = if document.get("openapi").is_some() {
            SpecVersion::OpenApi3
        } else if document.get("swagger").is_some() {
            SpecVersion::Swagger2
        } else {
            tracing::warn!("no 'openapi' or 'swagger' field, treating document as OpenAPI 3");
            SpecVersion::OpenApi3
        };
        Ok(Self { version, document })
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn operations(&self, filters: &FilterConfig) -> Vec<Operation> {
        operations::extract_operations(&self.document, filters)
    }

    pub fn api_context(&self) -> ApiContext {
        operations::build_api_context(&self.document, self.version)
    }
}

/// Loads a specification from an http(s) URL or a local `.json`/`.yaml`/`.yml` file.
pub async fn load_spec(source: &str) -> Result<ApiSpec> {
    if let Some(url) = remote_url(source) {
        return fetch_spec(url).await;
    }

    let format = SpecFormat::from_extension(source).ok_or_else(|| {
        AppError::ParseError(format!(
            "unsupported specification file '{}': expected .json, .yaml or .yml",
            source
        ))
    })?;
    let text = tokio::fs::read_to_string(source)
        .await
        .map_err(|err| AppError::IoError(format!("cannot read '{}': {}", source, err)))?;
    tracing::info!(source, bytes = text.len(), "specification read from file");
    ApiSpec::parse(&text, Some(format))
}

fn remote_url(source: &str) -> Option<url::Url> {
    url::Url::parse(source)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

async fn fetch_spec(url: url::Url) -> Result<ApiSpec> {
    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|err| AppError::Internal(format!("failed to build http client: {}", err)))?;
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|err| fetch_error(&url, err))?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::IoError(format!(
            "cannot fetch specification {}: status {}",
            url, status
        )));
    }
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let text = response.text().await.map_err(|err| fetch_error(&url, err))?;
    tracing::info!(url = %url, bytes = text.len(), "specification fetched");

    let format = content_type
        .as_deref()
        .and_then(SpecFormat::from_content_type)
        .or_else(|| SpecFormat::from_extension(url.path()));
    ApiSpec::parse(&text, format)
}

/// Specification downloads are input I/O, not model-endpoint transport.
fn fetch_error(url: &url::Url, err: reqwest::Error) -> AppError {
    AppError::IoError(format!("cannot fetch specification {}: {}", url, err))
}

fn parse_json(text: &str) -> Result<Value> {
    serde_json::from_str(text)
        .map_err(|err| AppError::ParseError(format!("invalid JSON specification: {}", err)))
}

fn parse_yaml(text: &str) -> Result<Value> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(text)
        .map_err(|err| AppError::ParseError(format!("invalid YAML specification: {}", err)))?;
    Ok(yaml_to_json(yaml))
}

/// YAML allows non-string keys (`200:` in responses); JSON does not.
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(flag) => Value::Bool(flag),
        serde_yaml::Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Value::from(int)
            } else if let Some(uint) = number.as_u64() {
                Value::from(uint)
            } else {
                number
                    .as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(text) => Value::String(text),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                map.insert(yaml_key(key), yaml_to_json(value));
            }
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(text) => text,
        serde_yaml::Value::Bool(flag) => flag.to_string(),
        serde_yaml::Value::Number(number) => number.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|text| text.trim().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PETSTORE_YAML: &str = r#"
openapi: 3.0.0
info:
  title: Petstore
  version: "1.0"
servers:
  - url: https://petstore.example.com/v1
paths:
  /pets:
    get:
      tags: [pets]
      parameters:
        - name: limit
          in: query
          schema:
            type: integer
            maximum: 100
      responses:
        200:
          description: A page of pets
    post:
      tags: [pets]
      responses:
        201:
          description: Created
  /pets/{petId}:
    get:
      tags: [pets]
      parameters:
        - name: petId
          in: path
          schema:
            type: string
      responses:
        default:
          description: unexpected error
"#;

    #[test]
    fn test_yaml_is_sniffed_and_integer_keys_become_strings() {
        let spec = ApiSpec::parse(PETSTORE_YAML, None).unwrap();
        assert_eq!(spec.version, SpecVersion::OpenApi3);
        let operations = spec.operations(&FilterConfig::default());
        let refs: Vec<_> = operations.iter().map(|op| op.reference().to_string()).collect();
        assert_eq!(refs, vec!["GET /pets", "POST /pets", "GET /pets/{petId}"]);
        assert_eq!(operations[0].responses["200"]["description"], "A page of pets");
        assert!(operations[2].parameters[0].required);
    }

    #[test]
    fn test_swagger_version_detected() {
        let spec = ApiSpec::parse(r#"{"swagger": "2.0", "paths": {}}"#, None).unwrap();
        assert_eq!(spec.version, SpecVersion::Swagger2);
        assert!(spec.operations(&FilterConfig::default()).is_empty());
    }

    #[test]
    fn test_empty_and_scalar_documents_are_rejected() {
        assert!(matches!(ApiSpec::parse("   ", None), Err(AppError::ParseError(_))));
        assert!(matches!(ApiSpec::parse("null", None), Err(AppError::ParseError(_))));
        assert!(matches!(
            ApiSpec::parse("just a sentence", None),
            Err(AppError::ParseError(_))
        ));
    }

    #[test]
    fn test_explicit_format_is_respected() {
        assert!(ApiSpec::parse("openapi: 3.0.0\npaths: {}\n", Some(SpecFormat::Json)).is_err());
        assert!(ApiSpec::parse("openapi: 3.0.0\npaths: {}\n", Some(SpecFormat::Yaml)).is_ok());
    }

    #[test]
    fn test_format_detection_helpers() {
        assert_eq!(SpecFormat::from_extension("api.YML"), Some(SpecFormat::Yaml));
        assert_eq!(SpecFormat::from_extension("/v1/openapi.json?raw=1"), Some(SpecFormat::Json));
        assert_eq!(SpecFormat::from_extension("api.txt"), None);
        assert_eq!(
            SpecFormat::from_content_type("application/json; charset=utf-8"),
            Some(SpecFormat::Json)
        );
        assert_eq!(SpecFormat::from_content_type("application/x-yaml"), Some(SpecFormat::Yaml));
        assert_eq!(SpecFormat::from_content_type("text/plain"), None);
        assert!(remote_url("https://example.com/openapi.json").is_some());
        assert!(remote_url("specs/openapi.json").is_none());
        assert!(remote_url("file:///tmp/openapi.json").is_none());
    }

    #[tokio::test]
    async fn test_load_spec_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(PETSTORE_YAML.as_bytes()).unwrap();
        let spec = load_spec(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(spec.api_context().title.as_deref(), Some("Petstore"));
        assert_eq!(spec.api_context().servers, vec!["https://petstore.example.com/v1"]);
    }

    async fn start_spec_server() -> String {
        use actix_web::{web, App, HttpResponse, HttpServer};

        let server = HttpServer::new(|| {
            App::new()
                .route(
                    "/spec",
                    web::get().to(|| async {
                        HttpResponse::Ok()
                            .content_type("application/x-yaml")
                            .body(PETSTORE_YAML)
                    }),
                )
                .route(
                    "/gone.json",
                    web::get().to(|| async { HttpResponse::NotFound().finish() }),
                )
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        tokio::spawn(server.run());
        format!("http://{}", addr)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_load_spec_from_url_uses_content_type() {
        let base = start_spec_server().await;
        let spec = load_spec(&format!("{}/spec", base)).await.unwrap();
        assert_eq!(spec.operations(&FilterConfig::default()).len(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_download_is_io_error_not_transport() {
        let base = start_spec_server().await;
        let err = load_spec(&format!("{}/gone.json", base)).await.unwrap_err();
        assert!(matches!(err, AppError::IoError(ref msg) if msg.contains("404")), "{}", err);

        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = load_spec(&format!("http://127.0.0.1:{}/openapi.json", port))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::IoError(_)), "{}", err);
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn test_load_spec_rejects_unknown_extension_and_missing_file() {
        let err = load_spec("openapi.txt").await.unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
        let err = load_spec("/definitely/not/here.json").await.unwrap_err();
        assert!(matches!(err, AppError::IoError(_)));
    }
}
