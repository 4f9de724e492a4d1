//! MCP tool catalog for APIs flagged as MCP servers.
//!
//! Declared tools (`McpConfig.tools`) come first, verbatim. Every endpoint then yields one derived
//! tool named `<method>_<path>` unless a declared tool already uses that name. Derived names that
//! repeat get `_1`, `_2` suffixes, and every name is capped at 64 characters.

use crate::error::RegistryError;
use crate::model::{ApiDefinition, EndpointDefinition, HttpMethod};
use regex::Regex;
use reqwest::Method;
use rmcp::model::{JsonObject, Tool, ToolAnnotations};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

const MAX_TOOL_NAME_LEN: usize = 64;

/// MCP tool annotations from HTTP method semantics.
///
/// `openWorldHint` is always set: every tool reaches an external system.
#[must_use]
pub fn annotations_for_method(method: &Method) -> ToolAnnotations {
    let (read_only, destructive, idempotent) = match *method {
        Method::GET | Method::HEAD | Method::OPTIONS => (Some(true), Some(false), Some(true)),
        Method::POST => (Some(false), Some(false), Some(false)),
        Method::PUT | Method::DELETE => (Some(false), Some(true), Some(true)),
        // PATCH may or may not be idempotent.
        Method::PATCH => (Some(false), Some(true), None),
        _ => (None, None, None),
    };
    ToolAnnotations {
        title: None,
        read_only_hint: read_only,
        destructive_hint: destructive,
        idempotent_hint: idempotent,
        open_world_hint: Some(true),
    }
}

struct ToolNaming {
    placeholder: Regex,
    non_alnum: Regex,
}

impl ToolNaming {
    fn new() -> Result<Self, RegistryError> {
        let compile =
            |pattern: &str| Regex::new(pattern).map_err(|e| RegistryError::Config(e.to_string()));
        Ok(Self {
            placeholder: compile(r"\{([^}/]+)\}")?,
            non_alnum: compile(r"[^a-zA-Z0-9]+")?,
        })
    }

    /// `get_users_id` for `GET /users/{id}`.
    fn canonical_name(&self, method: HttpMethod, path: &str) -> String {
        let raw = format!("{}_{}", method.as_str().to_lowercase(), path);
        let raw = self.placeholder.replace_all(&raw, "_$1");
        self.non_alnum
            .replace_all(&raw, "_")
            .trim_matches('_')
            .to_string()
    }

    fn path_params(&self, path: &str) -> Vec<String> {
        self.placeholder
            .captures_iter(path)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()
    }
}

/// Tool descriptors for an API. APIs not flagged as MCP servers yield none.
///
/// # Errors
///
/// Returns [`RegistryError::Validation`] when declared tools repeat a name or declare a
/// non-object input schema.
pub fn tool_catalog(
    api: &ApiDefinition,
    endpoints: &[EndpointDefinition],
) -> Result<Vec<Tool>, RegistryError> {
    if !api.is_mcp_server {
        return Ok(Vec::new());
    }

    let naming = ToolNaming::new()?;
    let mut declared_names: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for declared in api.mcp_config.iter().flat_map(|c| c.tools.iter()) {
        if !declared_names.insert(declared.name.clone()) {
            return Err(RegistryError::Validation(format!(
                "duplicate MCP tool '{}' on API '{}'",
                declared.name, api.name
            )));
        }
        let schema = match &declared.input_schema {
            None | Some(Value::Null) => empty_object_schema(),
            Some(Value::Object(obj)) => obj.clone(),
            Some(_) => {
                return Err(RegistryError::Validation(format!(
                    "inputSchema of MCP tool '{}' must be a JSON object",
                    declared.name
                )));
            }
        };
        out.push(Tool::new(
            declared.name.clone(),
            declared.description.clone().unwrap_or_default(),
            Arc::new(schema),
        ));
    }

    let mut names = declared_names.clone();
    for endpoint in endpoints {
        if endpoint.api_id != api.id {
            debug!(api = %api.id, endpoint = %endpoint.id, "skipping endpoint of another API");
            continue;
        }
        let base = naming.canonical_name(endpoint.method, &endpoint.path);
        if declared_names.contains(truncate_name(&base, MAX_TOOL_NAME_LEN)) {
            debug!(api = %api.id, tool = %base, "derived tool shadowed by a declared tool");
            continue;
        }
        let name = reserve_unique_tool_name(&mut names, &base);

        let mut tool = Tool::new(
            name,
            endpoint_description(endpoint),
            Arc::new(endpoint_input_schema(&naming, endpoint)),
        );
        tool.annotations = Some(annotations_for_method(&endpoint.method.to_method()));
        out.push(tool);
    }

    Ok(out)
}

/// Reserve `base` (or `base_<n>` on collision), cut so the suffixed name fits the length cap.
fn reserve_unique_tool_name(names: &mut HashSet<String>, base: &str) -> String {
    let plain = truncate_name(base, MAX_TOOL_NAME_LEN).to_string();
    if names.insert(plain.clone()) {
        return plain;
    }
    let mut counter: usize = 1;
    loop {
        let suffix = format!("_{counter}");
        let stem = truncate_name(base, MAX_TOOL_NAME_LEN - suffix.len());
        let candidate = format!("{stem}{suffix}");
        if names.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

/// Canonical names are ASCII, so byte truncation stays on a char boundary.
fn truncate_name(name: &str, max: usize) -> &str {
    &name[..name.len().min(max)]
}

fn endpoint_description(endpoint: &EndpointDefinition) -> String {
    let summary = endpoint
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(&endpoint.name);
    format!("{summary} ({} {})", endpoint.method, endpoint.path)
}

fn empty_object_schema() -> JsonObject {
    let mut schema = JsonObject::new();
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), json!({}));
    schema
}

/// Path placeholders are required strings, stored query params become defaulted strings, and a
/// non-empty body template becomes an optional `body` argument.
fn endpoint_input_schema(naming: &ToolNaming, endpoint: &EndpointDefinition) -> JsonObject {
    let mut properties = JsonObject::new();
    let mut required: Vec<String> = Vec::new();

    for param in naming.path_params(&endpoint.path) {
        if !required.contains(&param) {
            required.push(param.clone());
        }
        properties.insert(param, json!({"type": "string"}));
    }

    for q in &endpoint.query_params {
        properties
            .entry(q.name.clone())
            .or_insert_with(|| json!({"type": "string", "default": q.value}));
    }

    let has_body_template = match &endpoint.body_template {
        Value::Null => false,
        Value::Object(m) => !m.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    };
    if has_body_template {
        properties.insert(
            "body".to_string(),
            json!({"description": "Request body", "default": endpoint.body_template}),
        );
    }

    let mut schema = empty_object_schema();
    schema.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".to_string(), json!(required));
    }
    schema
}
