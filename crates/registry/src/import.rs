//! JSON import of API definitions.
//!
//! Format:
//!
//! ```json
//! {
//!   "name": "Billing",
//!   "description": "optional",
//!   "base_url": "https://billing.example.com",
//!   "auth_type": "bearer",
//!   "endpoints": [
//!     { "name": "List invoices", "path": "/invoices", "method": "GET",
//!       "headers": { "Accept": "application/json" } }
//!   ]
//! }
//! ```
//!
//! Validation is all-or-nothing: the first violation aborts the import.

use crate::error::ImportError;
use crate::model::{ApiDefinition, AuthType, EndpointDefinition, HttpMethod, KeyValue};
use serde::Serialize;
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedApi {
    pub name: String,
    pub description: Option<String>,
    pub base_url: String,
    pub auth_type: AuthType,
    pub endpoints: Vec<ImportedEndpoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedEndpoint {
    pub name: String,
    pub description: Option<String>,
    pub path: String,
    pub method: HttpMethod,
    pub headers: Vec<KeyValue>,
    pub query_params: Vec<KeyValue>,
    pub body_template: Value,
}

/// Parse and validate an import document.
///
/// # Errors
///
/// Returns an error if the text is not JSON, is not an object, lacks `name`/`base_url`, or has a
/// malformed `endpoints` list.
pub fn parse(text: &str) -> Result<ImportedApi, ImportError> {
    let doc: Value = serde_json::from_str(text).map_err(|e| ImportError::InvalidJson {
        message: e.to_string(),
    })?;
    from_value(&doc)
}

/// Validate an already-decoded import document.
///
/// # Errors
///
/// See [`parse`].
pub fn from_value(doc: &Value) -> Result<ImportedApi, ImportError> {
    let obj = doc.as_object().ok_or(ImportError::NotAnObject)?;

    let name = required_string(obj, "name", "name")?;
    let base_url = required_string(obj, "base_url", "base_url")?;
    let description = optional_string(obj, "description", "description")?;
    let auth_type = match optional_string(obj, "auth_type", "auth_type")? {
        Some(s) => s.parse().map_err(|_| {
            ImportError::shape("auth_type", "one of none, api_key, bearer, basic, oauth2")
        })?,
        None => AuthType::None,
    };

    let endpoints = match obj.get("endpoints") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_endpoint(i, item))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(ImportError::shape("endpoints", "array")),
    };

    Ok(ImportedApi {
        name,
        description,
        base_url,
        auth_type,
        endpoints,
    })
}

fn parse_endpoint(index: usize, item: &Value) -> Result<ImportedEndpoint, ImportError> {
    let prefix = format!("endpoints[{index}]");
    let obj = item
        .as_object()
        .ok_or_else(|| ImportError::shape(prefix.clone(), "object"))?;

    let name = required_string(obj, "name", &format!("{prefix}.name"))?;
    let path = required_string(obj, "path", &format!("{prefix}.path"))?;
    let description = optional_string(obj, "description", &format!("{prefix}.description"))?;

    let method = match optional_string(obj, "method", &format!("{prefix}.method"))? {
        Some(m) => m.parse().map_err(|_| {
            ImportError::shape(
                format!("{prefix}.method"),
                "one of GET, POST, PUT, PATCH, DELETE",
            )
        })?,
        None => HttpMethod::Get,
    };

    let headers = string_map(obj, "headers", &format!("{prefix}.headers"))?;
    let query_params = string_map(obj, "query_params", &format!("{prefix}.query_params"))?;
    let body_template = match obj.get("body_template") {
        None | Some(Value::Null) => json!({}),
        Some(v) => v.clone(),
    };

    Ok(ImportedEndpoint {
        name,
        description,
        path,
        method,
        headers,
        query_params,
        body_template,
    })
}

fn required_string(obj: &Map<String, Value>, key: &str, field: &str) -> Result<String, ImportError> {
    match obj.get(key) {
        None | Some(Value::Null) => Err(ImportError::missing(field)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(ImportError::missing(field)),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(_) => Err(ImportError::shape(field, "non-empty string")),
    }
}

fn optional_string(
    obj: &Map<String, Value>,
    key: &str,
    field: &str,
) -> Result<Option<String>, ImportError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(ImportError::shape(field, "string")),
    }
}

fn string_map(
    obj: &Map<String, Value>,
    key: &str,
    field: &str,
) -> Result<Vec<KeyValue>, ImportError> {
    let map = match obj.get(key) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(ImportError::shape(field, "object of strings")),
    };

    map.iter()
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => {
                    return Err(ImportError::shape(
                        format!("{field}.{k}"),
                        "string",
                    ));
                }
            };
            Ok(KeyValue::new(k.clone(), value))
        })
        .collect()
}

impl ImportedApi {
    /// Materialize stored definitions with freshly assigned ids.
    #[must_use]
    pub fn into_definitions(self) -> (ApiDefinition, Vec<EndpointDefinition>) {
        let api_id = uuid::Uuid::new_v4().to_string();
        let mut api = ApiDefinition::new(&api_id, self.name, self.base_url);
        api.description = self.description;
        api.auth_type = self.auth_type;

        let endpoints = self
            .endpoints
            .into_iter()
            .map(|e| {
                let mut ep = EndpointDefinition::new(
                    uuid::Uuid::new_v4().to_string(),
                    &api_id,
                    e.name,
                    e.method,
                    e.path,
                );
                ep.description = e.description;
                ep.headers = e.headers;
                ep.query_params = e.query_params;
                ep.body_template = e.body_template;
                ep
            })
            .collect();

        (api, endpoints)
    }
}
