//! Value types describing registered APIs, their endpoints, per-call overrides, resolved requests
//! and test results.
//!
//! Nothing here performs I/O. Definitions are treated as immutable snapshots while a request is
//! resolved and executed.

use crate::error::RegistryError;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

/// One `{name, value}` pair of a header or query parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub name: String,
    pub value: String,
}

impl KeyValue {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Accepted wire shapes for pair lists: `[{name, value}]` or `{name: value}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PairsRepr {
    List(Vec<KeyValue>),
    Map(OrderedPairs),
    Null(()),
}

impl PairsRepr {
    fn into_pairs(self) -> Vec<KeyValue> {
        match self {
            PairsRepr::List(list) => list,
            PairsRepr::Map(OrderedPairs(pairs)) => pairs,
            PairsRepr::Null(()) => Vec::new(),
        }
    }
}

/// A string map read in document order.
struct OrderedPairs(Vec<KeyValue>);

impl<'de> Deserialize<'de> for OrderedPairs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PairsVisitor;

        impl<'de> serde::de::Visitor<'de> for PairsVisitor {
            type Value = OrderedPairs;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of string values")
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut access: A,
            ) -> Result<OrderedPairs, A::Error> {
                let mut out = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    out.push(KeyValue::new(name, value));
                }
                Ok(OrderedPairs(out))
            }
        }

        deserializer.deserialize_map(PairsVisitor)
    }
}

/// Deserialize an ordered pair list, accepting either wire shape and `null` (as empty).
///
/// # Errors
///
/// Returns an error if the value is neither a list of pairs nor a string map.
pub fn deserialize_pairs<'de, D>(deserializer: D) -> Result<Vec<KeyValue>, D::Error>
where
    D: Deserializer<'de>,
{
    PairsRepr::deserialize(deserializer).map(PairsRepr::into_pairs)
}

/// Insertion-ordered header map with unique, case-sensitive names.
///
/// Setting an existing name replaces its value but keeps its original position, so the list
/// reflects first-seen order while values follow last-write-wins. Names and values are stored
/// trimmed, as HTTP drops surrounding whitespace from field values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    entries: Vec<KeyValue>,
}

impl HeaderList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = trimmed(name.into());
        let value = trimmed(value.into());
        if let Some(existing) = self.entries.iter_mut().find(|e| e.name == name) {
            existing.value = value;
        } else {
            self.entries.push(KeyValue { name, value });
        }
    }

    /// Apply every pair in order (later pairs win on name collision).
    pub fn apply<'a>(&mut self, pairs: impl IntoIterator<Item = &'a KeyValue>) {
        for kv in pairs {
            self.set(kv.name.clone(), kv.value.clone());
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value.as_str())
    }

    #[must_use]
    pub fn contains_ignore_case(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.name.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), e.value.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn as_pairs(&self) -> &[KeyValue] {
        &self.entries
    }
}

fn trimmed(s: String) -> String {
    if s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace) {
        s.trim().to_string()
    } else {
        s
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut out = HeaderList::new();
        for (k, v) in iter {
            out.set(k, v);
        }
        out
    }
}

impl Serialize for HeaderList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap as _;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for e in &self.entries {
            map.serialize_entry(&e.name, &e.value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HeaderList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pairs = deserialize_pairs(deserializer)?;
        let mut out = HeaderList::new();
        out.apply(&pairs);
        Ok(out)
    }
}

/// HTTP methods an endpoint definition may declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    #[must_use]
    pub fn to_method(self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == upper)
            .ok_or_else(|| format!("unsupported HTTP method '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    #[default]
    None,
    ApiKey,
    Bearer,
    Basic,
    /// Recognized but never injected: there is no token flow.
    Oauth2,
}

impl AuthType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AuthType::None => "none",
            AuthType::ApiKey => "api_key",
            AuthType::Bearer => "bearer",
            AuthType::Basic => "basic",
            AuthType::Oauth2 => "oauth2",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "" | "none" => Ok(AuthType::None),
            "api_key" | "apikey" => Ok(AuthType::ApiKey),
            "bearer" => Ok(AuthType::Bearer),
            "basic" => Ok(AuthType::Basic),
            "oauth2" => Ok(AuthType::Oauth2),
            other => Err(format!("unsupported auth type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    #[default]
    Header,
    Query,
}

/// Where an `api_key` credential is placed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyPlacement {
    /// Header or query parameter name. Defaults to `Authorization` (header) / `api_key` (query).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub location: ApiKeyLocation,
}

impl ApiKeyPlacement {
    #[must_use]
    pub fn effective_name(&self) -> &str {
        match (&self.name, self.location) {
            (Some(n), _) if !n.trim().is_empty() => n.trim(),
            (_, ApiKeyLocation::Header) => "Authorization",
            (_, ApiKeyLocation::Query) => "api_key",
        }
    }
}

/// MCP server metadata carried on an API definition. Opaque to resolution and execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default)]
    pub server_name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub tools: Vec<McpToolMetadata>,
    #[serde(default)]
    pub resources: Vec<McpResourceMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpResourceMetadata {
    pub uri: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

fn default_true() -> bool {
    true
}

fn empty_object() -> Value {
    json!({})
}

/// Stored description of one external HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiDefinition {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub base_url: String,
    #[serde(default)]
    pub auth_type: AuthType,
    /// Secret whose meaning depends on `auth_type` (`user:pass` for basic).
    #[serde(default)]
    pub credential: String,
    #[serde(default)]
    pub api_key: ApiKeyPlacement,
    /// Names need not be unique; later entries win at resolution time.
    #[serde(default, deserialize_with = "deserialize_pairs")]
    pub default_headers: Vec<KeyValue>,
    #[serde(default, deserialize_with = "deserialize_pairs")]
    pub default_query_params: Vec<KeyValue>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_mcp_server: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_config: Option<McpConfig>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl ApiDefinition {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            base_url: base_url.into(),
            auth_type: AuthType::None,
            credential: String::new(),
            api_key: ApiKeyPlacement::default(),
            default_headers: Vec::new(),
            default_query_params: Vec::new(),
            is_active: true,
            is_mcp_server: false,
            mcp_config: None,
            created_at: Utc::now(),
            observations: None,
            documentation: None,
        }
    }

    #[must_use]
    pub fn with_auth(mut self, auth_type: AuthType, credential: impl Into<String>) -> Self {
        self.auth_type = auth_type;
        self.credential = credential.into();
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push(KeyValue::new(name, value));
        self
    }

    #[must_use]
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_query_params.push(KeyValue::new(name, value));
        self
    }

    /// Whether authentication will actually be injected.
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.auth_type != AuthType::None && !self.credential.trim().is_empty()
    }
}

impl PartialEq for ApiDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ApiDefinition {}

/// Stored, named HTTP operation scoped to one API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointDefinition {
    pub id: String,
    pub api_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub path: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default, deserialize_with = "deserialize_pairs")]
    pub headers: Vec<KeyValue>,
    #[serde(default, deserialize_with = "deserialize_pairs")]
    pub query_params: Vec<KeyValue>,
    #[serde(default = "empty_object")]
    pub body_template: Value,
}

impl EndpointDefinition {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        api_id: impl Into<String>,
        name: impl Into<String>,
        method: HttpMethod,
        path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            api_id: api_id.into(),
            name: name.into(),
            description: None,
            path: path.into(),
            method,
            headers: Vec::new(),
            query_params: Vec::new(),
            body_template: empty_object(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(KeyValue::new(name, value));
        self
    }

    #[must_use]
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push(KeyValue::new(name, value));
        self
    }

    #[must_use]
    pub fn with_body_template(mut self, body: Value) -> Self {
        self.body_template = body;
        self
    }

    /// Check the structural invariants (non-empty name and path).
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the empty field.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::Validation(format!(
                "endpoint '{}' has an empty name",
                self.id
            )));
        }
        if self.path.trim().is_empty() {
            return Err(RegistryError::Validation(format!(
                "endpoint '{}' has an empty path",
                self.name
            )));
        }
        Ok(())
    }
}

impl PartialEq for EndpointDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EndpointDefinition {}

/// Caller-supplied per-invocation values that take precedence over stored definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_url: Option<String>,
    #[serde(default, with = "method_serde::option", skip_serializing_if = "Option::is_none")]
    pub custom_method: Option<Method>,
    #[serde(default)]
    pub custom_headers: HeaderList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_body: Option<String>,
}

impl RequestOverride {
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.custom_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.custom_method = Some(method);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.set(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.custom_body = Some(body.into());
        self
    }
}

/// One concrete HTTP request, produced by the resolver or the cURL parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRequest {
    pub url: String,
    #[serde(with = "method_serde")]
    pub method: Method,
    #[serde(default)]
    pub headers: HeaderList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl ResolvedRequest {
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: HeaderList::new(),
            body: None,
        }
    }
}

/// Outcome of one test execution.
///
/// `success` means "an HTTP response was received", regardless of its status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub success: bool,
    pub url: String,
    pub method: String,
    /// Response headers.
    #[serde(default)]
    pub headers: HeaderList,
    pub status: u16,
    #[serde(default)]
    pub body_text: String,
    pub response_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curl_equivalent: Option<String>,
}

impl TestResult {
    /// Result for a request that never produced an HTTP response.
    #[must_use]
    pub fn failure(request: &ResolvedRequest, response_time_ms: u64, error: impl Into<String>) -> Self {
        Self {
            success: false,
            url: request.url.clone(),
            method: request.method.as_str().to_string(),
            headers: HeaderList::new(),
            status: 0,
            body_text: String::new(),
            response_time_ms,
            error: Some(error.into()),
            curl_equivalent: None,
        }
    }
}

/// Serde helpers for `reqwest::Method` (stored as its upper-case token).
pub mod method_serde {
    use reqwest::Method;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(method: &Method, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(method.as_str())
    }

    /// # Errors
    ///
    /// Returns an error if the token is not a valid HTTP method.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Method, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.trim()
            .to_ascii_uppercase()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid HTTP method '{s}'")))
    }

    pub mod option {
        use reqwest::Method;
        use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

        /// # Errors
        ///
        /// Propagates serializer errors.
        pub fn serialize<S: Serializer>(
            method: &Option<Method>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match method {
                Some(m) => serializer.serialize_some(m.as_str()),
                None => serializer.serialize_none(),
            }
        }

        /// # Errors
        ///
        /// Returns an error if the token is not a valid HTTP method.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Method>, D::Error> {
            let Some(s) = Option::<String>::deserialize(deserializer)? else {
                return Ok(None);
            };
            if s.trim().is_empty() {
                return Ok(None);
            }
            s.trim()
                .to_ascii_uppercase()
                .parse()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("invalid HTTP method '{s}'")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_list_overwrites_in_place() {
        let mut h = HeaderList::new();
        h.set("A", "1");
        h.set("B", "2");
        h.set("A", "3");
        let pairs: Vec<(&str, &str)> = h.iter().collect();
        assert_eq!(pairs, vec![("A", "3"), ("B", "2")]);
    }

    #[test]
    fn header_list_stores_trimmed_names_and_values() {
        let mut h = HeaderList::new();
        h.set(" X-Pad ", "\t v 1  ");
        h.set("X-Pad", "v 2 ");
        let pairs: Vec<(&str, &str)> = h.iter().collect();
        assert_eq!(pairs, vec![("X-Pad", "v 2")]);
    }

    #[test]
    fn header_names_are_case_sensitive() {
        let mut h = HeaderList::new();
        h.set("X-Key", "1");
        h.set("x-key", "2");
        assert_eq!(h.len(), 2);
        assert_eq!(h.get("X-Key"), Some("1"));
        assert!(h.contains_ignore_case("X-KEY"));
    }

    #[test]
    fn pair_lists_accept_map_list_and_null() {
        let ep: EndpointDefinition = serde_json::from_value(json!({
            "id": "e1",
            "api_id": "a1",
            "name": "list",
            "path": "/users",
            "headers": {"Accept": "application/json"},
            "query_params": [{"name": "page", "value": "1"}, {"name": "page", "value": "2"}],
        }))
        .expect("endpoint");
        assert_eq!(ep.headers, vec![KeyValue::new("Accept", "application/json")]);
        assert_eq!(ep.query_params.len(), 2);
        assert_eq!(ep.body_template, json!({}));
        assert_eq!(ep.method, HttpMethod::Get);

        let api: ApiDefinition = serde_json::from_value(json!({
            "id": "a1",
            "name": "A",
            "base_url": "http://x",
            "default_headers": null,
        }))
        .expect("api");
        assert!(api.default_headers.is_empty());
        assert!(api.is_active);
        assert_eq!(api.auth_type, AuthType::None);
    }

    #[test]
    fn header_maps_keep_document_order() {
        let req: ResolvedRequest = serde_json::from_str(
            r#"{"url":"http://x","method":"GET","headers":{"Zeta":"1","Alpha":"2","Mid":"3"}}"#,
        )
        .expect("request");
        let names: Vec<&str> = req.headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn definitions_compare_by_id() {
        let a = ApiDefinition::new("1", "A", "http://a");
        let b = ApiDefinition::new("1", "B", "http://b");
        assert_eq!(a, b);
        assert_ne!(a, ApiDefinition::new("2", "A", "http://a"));
    }

    #[test]
    fn endpoint_validation_rejects_empty_path() {
        let ep = EndpointDefinition::new("e", "a", "n", HttpMethod::Get, " ");
        assert!(ep.validate().is_err());
        let ep = EndpointDefinition::new("e", "a", "", HttpMethod::Get, "/x");
        assert!(ep.validate().is_err());
        let ep = EndpointDefinition::new("e", "a", "n", HttpMethod::Get, "x");
        assert!(ep.validate().is_ok());
    }

    #[test]
    fn auth_type_parses_loosely() {
        assert_eq!("API-KEY".parse::<AuthType>(), Ok(AuthType::ApiKey));
        assert_eq!("oauth2".parse::<AuthType>(), Ok(AuthType::Oauth2));
        assert!("digest".parse::<AuthType>().is_err());
        assert_eq!(serde_json::to_value(AuthType::ApiKey).expect("ser"), json!("api_key"));
    }

    #[test]
    fn override_method_round_trips_through_serde() {
        let o = RequestOverride::default().with_method(Method::PATCH);
        let v = serde_json::to_value(&o).expect("ser");
        assert_eq!(v["custom_method"], "PATCH");
        let back: RequestOverride = serde_json::from_value(v).expect("de");
        assert_eq!(back.custom_method, Some(Method::PATCH));
    }

    #[test]
    fn api_key_placement_defaults_by_location() {
        let mut p = ApiKeyPlacement::default();
        assert_eq!(p.effective_name(), "Authorization");
        p.location = ApiKeyLocation::Query;
        assert_eq!(p.effective_name(), "api_key");
        p.name = Some("X-Api-Key".to_string());
        assert_eq!(p.effective_name(), "X-Api-Key");
    }
}
