//! Request resolution: stored API + optional endpoint + caller override → one concrete request.
//!
//! Precedence, lowest to highest:
//! 1. API defaults (headers, query params)
//! 2. endpoint (path, method, headers, query params, body template)
//! 3. API authentication
//! 4. caller override (URL, method, headers, body)
//!
//! Resolution is pure: no I/O, no shared state.

use crate::error::ResolveError;
use crate::model::{
    ApiDefinition, ApiKeyLocation, AuthType, EndpointDefinition, HeaderList, KeyValue,
    RequestOverride, ResolvedRequest,
};
use base64::Engine as _;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

/// Resolve one concrete request.
///
/// # Errors
///
/// Returns [`ResolveError::NoUrlResolvable`] when there is no custom URL, no endpoint and the
/// API base URL is empty.
pub fn resolve(
    api: &ApiDefinition,
    endpoint: Option<&EndpointDefinition>,
    overrides: &RequestOverride,
) -> Result<ResolvedRequest, ResolveError> {
    let custom_url = overrides
        .custom_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());

    // The endpoint only contributes URL pieces and headers when the caller kept its path.
    let routed_endpoint = if custom_url.is_some() { None } else { endpoint };

    let url = match custom_url {
        Some(u) => u.to_string(),
        None => {
            let base = match routed_endpoint {
                Some(ep) => join_url(&api.base_url, &ep.path),
                None if api.base_url.trim().is_empty() => {
                    return Err(ResolveError::NoUrlResolvable {
                        api_id: api.id.clone(),
                    });
                }
                None => api.base_url.clone(),
            };
            append_query(base, &query_params(api, routed_endpoint))
        }
    };

    let method = overrides
        .custom_method
        .clone()
        .or_else(|| endpoint.map(|ep| ep.method.to_method()))
        .unwrap_or(Method::GET);

    let mut headers = HeaderList::new();
    headers.apply(&api.default_headers);
    if let Some(ep) = routed_endpoint {
        headers.apply(&ep.headers);
    }
    if let Some((name, value)) = auth_header(api) {
        headers.set(name, value);
    }

    let body = match &overrides.custom_body {
        Some(b) => Some(b.clone()),
        None => endpoint.and_then(|ep| template_body(&ep.body_template)),
    };
    let body_from_template = overrides.custom_body.is_none() && body.is_some();
    if body_from_template && !headers.contains_ignore_case("content-type") {
        headers.set("Content-Type", "application/json");
    }

    headers.apply(overrides.custom_headers.as_pairs());

    Ok(ResolvedRequest {
        url,
        method,
        headers,
        body,
    })
}

/// `base` without trailing slashes + `path` with exactly one leading slash.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    let path = path.trim();
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

/// Query values are kept verbatim; later pairs replace earlier ones in place.
fn query_params(api: &ApiDefinition, endpoint: Option<&EndpointDefinition>) -> Vec<KeyValue> {
    let mut params: Vec<KeyValue> = Vec::new();
    let mut set = |name: &str, value: &str| match params.iter_mut().find(|p| p.name == name) {
        Some(existing) => existing.value = value.to_string(),
        None => params.push(KeyValue::new(name, value)),
    };
    for kv in &api.default_query_params {
        set(kv.name.as_str(), kv.value.as_str());
    }
    for kv in endpoint.iter().flat_map(|ep| ep.query_params.iter()) {
        set(kv.name.as_str(), kv.value.as_str());
    }
    if api.auth_type == AuthType::ApiKey
        && api.api_key.location == ApiKeyLocation::Query
        && api.has_credential()
    {
        set(api.api_key.effective_name(), api.credential.as_str());
    }
    params
}

fn append_query(mut url: String, params: &[KeyValue]) -> String {
    for (i, KeyValue { name, value }) in params.iter().enumerate() {
        if i > 0 {
            url.push('&');
        } else if !url.contains('?') {
            url.push('?');
        } else if !url.ends_with(['?', '&']) {
            url.push('&');
        }
        url.push_str(&encode_query_component(name));
        url.push('=');
        url.push_str(&encode_query_component(value));
    }
    url
}

/// The single authentication header derived from the API's auth settings, if any.
fn auth_header(api: &ApiDefinition) -> Option<(String, String)> {
    if api.auth_type == AuthType::None {
        return None;
    }
    if !api.has_credential() {
        debug!(api = %api.id, auth_type = %api.auth_type, "empty credential; no auth injected");
        return None;
    }

    let credential = api.credential.trim();
    match api.auth_type {
        AuthType::ApiKey => match api.api_key.location {
            ApiKeyLocation::Header => Some((
                api.api_key.effective_name().to_string(),
                credential.to_string(),
            )),
            ApiKeyLocation::Query => None,
        },
        AuthType::Bearer => Some(("Authorization".to_string(), format!("Bearer {credential}"))),
        AuthType::Basic => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(credential);
            Some(("Authorization".to_string(), format!("Basic {encoded}")))
        }
        AuthType::Oauth2 => {
            debug!(api = %api.id, "oauth2 credentials are not injected");
            None
        }
        AuthType::None => None,
    }
}

fn template_body(template: &Value) -> Option<String> {
    let empty = match template {
        Value::Null => true,
        Value::Object(m) => m.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    };
    if empty {
        None
    } else {
        Some(template.to_string())
    }
}

fn encode_query_component(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

fn is_unreserved(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApiKeyPlacement, HttpMethod};
    use serde_json::json;

    fn api() -> ApiDefinition {
        ApiDefinition::new("api-1", "Test", "https://api.test/")
    }

    fn endpoint(path: &str) -> EndpointDefinition {
        EndpointDefinition::new("ep-1", "api-1", "users", HttpMethod::Post, path)
    }

    #[test]
    fn joins_base_and_path_with_one_slash() {
        let req = resolve(&api(), Some(&endpoint("users")), &RequestOverride::default())
            .expect("resolve");
        assert_eq!(req.url, "https://api.test/users");

        assert_eq!(join_url("https://api.test", "/users"), "https://api.test/users");
        assert_eq!(join_url("https://api.test//", "//users"), "https://api.test//users");
        assert_eq!(join_url("https://api.test", "users"), "https://api.test/users");
    }

    #[test]
    fn base_url_is_used_unmodified_without_endpoint() {
        let req = resolve(&api(), None, &RequestOverride::default()).expect("resolve");
        assert_eq!(req.url, "https://api.test/");
        assert_eq!(req.method, Method::GET);
        assert!(req.body.is_none());
    }

    #[test]
    fn bearer_credential_becomes_authorization_header() {
        let a = api().with_auth(AuthType::Bearer, "tok-123");
        let req = resolve(&a, None, &RequestOverride::default()).expect("resolve");
        assert_eq!(req.headers.get("Authorization"), Some("Bearer tok-123"));
    }

    #[test]
    fn basic_credential_is_base64_encoded() {
        let a = api().with_auth(AuthType::Basic, "user:pw");
        let req = resolve(&a, None, &RequestOverride::default()).expect("resolve");
        assert_eq!(req.headers.get("Authorization"), Some("Basic dXNlcjpwdw=="));
    }

    #[test]
    fn api_key_uses_configured_header_name() {
        let a = api().with_auth(AuthType::ApiKey, "k1");
        let req = resolve(&a, None, &RequestOverride::default()).expect("resolve");
        assert_eq!(req.headers.get("Authorization"), Some("k1"));

        let mut a = api().with_auth(AuthType::ApiKey, "k1");
        a.api_key = ApiKeyPlacement {
            name: Some("X-Api-Key".to_string()),
            location: ApiKeyLocation::Header,
        };
        let req = resolve(&a, None, &RequestOverride::default()).expect("resolve");
        assert_eq!(req.headers.get("X-Api-Key"), Some("k1"));
        assert_eq!(req.headers.get("Authorization"), None);
    }

    #[test]
    fn api_key_in_query_is_appended_to_derived_urls() {
        let mut a = api().with_auth(AuthType::ApiKey, "k 1");
        a.api_key.location = ApiKeyLocation::Query;
        let req = resolve(&a, Some(&endpoint("/x")), &RequestOverride::default())
            .expect("resolve");
        assert_eq!(req.url, "https://api.test/x?api_key=k%201");
        assert!(req.headers.is_empty());
    }

    #[test]
    fn empty_credential_and_oauth2_inject_nothing() {
        for a in [
            api().with_auth(AuthType::Bearer, ""),
            api().with_auth(AuthType::Basic, "   "),
            api().with_auth(AuthType::Oauth2, "token"),
        ] {
            let req = resolve(&a, None, &RequestOverride::default()).expect("resolve");
            assert!(req.headers.is_empty(), "{:?}", a.auth_type);
        }
    }

    #[test]
    fn caller_headers_win_over_endpoint_and_auth() {
        let a = api()
            .with_auth(AuthType::Bearer, "stored")
            .with_header("X", "0")
            .with_header("Accept", "text/plain");
        let ep = endpoint("/u").with_header("X", "1");

        let req = resolve(&a, Some(&ep), &RequestOverride::default()).expect("resolve");
        assert_eq!(req.headers.get("X"), Some("1"));

        let o = RequestOverride::default()
            .with_header("X", "2")
            .with_header("Authorization", "Bearer override");
        let req = resolve(&a, Some(&ep), &o).expect("resolve");
        assert_eq!(req.headers.get("X"), Some("2"));
        assert_eq!(req.headers.get("Authorization"), Some("Bearer override"));
        assert_eq!(req.headers.get("Accept"), Some("text/plain"));
    }

    #[test]
    fn later_default_headers_override_earlier_duplicates() {
        let a = api().with_header("X", "first").with_header("X", "second");
        let req = resolve(&a, None, &RequestOverride::default()).expect("resolve");
        assert_eq!(req.headers.get("X"), Some("second"));
        assert_eq!(req.headers.len(), 1);
    }

    #[test]
    fn custom_url_wins_and_drops_endpoint_headers() {
        let a = api().with_query_param("v", "1");
        let ep = endpoint("/users")
            .with_header("X-Endpoint", "1")
            .with_query_param("page", "2");
        let o = RequestOverride::default().with_url("https://x/y");

        let req = resolve(&a, Some(&ep), &o).expect("resolve");
        assert_eq!(req.url, "https://x/y");
        assert_eq!(req.headers.get("X-Endpoint"), None);
        // Method still comes from the endpoint.
        assert_eq!(req.method, Method::POST);
    }

    #[test]
    fn blank_custom_url_falls_back_to_endpoint() {
        let o = RequestOverride::default().with_url("   ");
        let req = resolve(&api(), Some(&endpoint("/users")), &o).expect("resolve");
        assert_eq!(req.url, "https://api.test/users");
    }

    #[test]
    fn query_params_merge_with_endpoint_precedence() {
        let a = ApiDefinition::new("a", "A", "https://api.test/v1")
            .with_query_param("lang", "en")
            .with_query_param("page", "1");
        let ep = endpoint("/search?fixed=yes")
            .with_query_param("page", "3")
            .with_query_param("q", "a&b");
        let req = resolve(&a, Some(&ep), &RequestOverride::default()).expect("resolve");
        assert_eq!(
            req.url,
            "https://api.test/v1/search?fixed=yes&lang=en&page=3&q=a%26b"
        );

        let a = ApiDefinition::new("a", "A", "https://api.test").with_query_param("lang", "en");
        let req = resolve(&a, None, &RequestOverride::default()).expect("resolve");
        assert_eq!(req.url, "https://api.test?lang=en");
    }

    #[test]
    fn method_precedence() {
        let o = RequestOverride::default().with_method(Method::PUT);
        let req = resolve(&api(), Some(&endpoint("/u")), &o).expect("resolve");
        assert_eq!(req.method, Method::PUT);

        let req = resolve(&api(), Some(&endpoint("/u")), &RequestOverride::default())
            .expect("resolve");
        assert_eq!(req.method, Method::POST);
    }

    #[test]
    fn body_precedence_and_content_type() {
        let ep = endpoint("/u").with_body_template(json!({"name": "x"}));

        let req = resolve(&api(), Some(&ep), &RequestOverride::default()).expect("resolve");
        assert_eq!(req.body.as_deref(), Some(r#"{"name":"x"}"#));
        assert_eq!(req.headers.get("Content-Type"), Some("application/json"));

        let o = RequestOverride::default().with_body("raw");
        let req = resolve(&api(), Some(&ep), &o).expect("resolve");
        assert_eq!(req.body.as_deref(), Some("raw"));
        assert_eq!(req.headers.get("Content-Type"), None);

        let ep = endpoint("/u")
            .with_header("content-type", "application/vnd.api+json")
            .with_body_template(json!([1]));
        let req = resolve(&api(), Some(&ep), &RequestOverride::default()).expect("resolve");
        assert_eq!(req.headers.get("Content-Type"), None);
        assert_eq!(req.body.as_deref(), Some("[1]"));

        for empty in [json!({}), json!([]), json!(""), Value::Null] {
            let ep = endpoint("/u").with_body_template(empty);
            let req = resolve(&api(), Some(&ep), &RequestOverride::default()).expect("resolve");
            assert!(req.body.is_none());
        }
    }

    #[test]
    fn body_passes_through_for_get() {
        let mut ep = endpoint("/u").with_body_template(json!({"q": 1}));
        ep.method = HttpMethod::Get;
        let req = resolve(&api(), Some(&ep), &RequestOverride::default()).expect("resolve");
        assert_eq!(req.method, Method::GET);
        assert!(req.body.is_some());
    }

    #[test]
    fn empty_base_without_endpoint_or_custom_url_fails() {
        let a = ApiDefinition::new("empty", "E", "");
        let err = resolve(&a, None, &RequestOverride::default()).unwrap_err();
        assert_eq!(
            err,
            ResolveError::NoUrlResolvable {
                api_id: "empty".to_string()
            }
        );

        let o = RequestOverride::default().with_url("http://elsewhere.test");
        let req = resolve(&a, None, &o).expect("custom url rescues");
        assert_eq!(req.url, "http://elsewhere.test");
    }

    #[test]
    fn resolution_does_not_touch_definitions() {
        let a = api().with_auth(AuthType::Bearer, "t").with_header("X", "1");
        let ep = endpoint("/u").with_header("Y", "2");
        let before = (serde_json::to_value(&a).expect("a"), serde_json::to_value(&ep).expect("e"));
        let _ = resolve(&a, Some(&ep), &RequestOverride::default().with_header("X", "9"));
        let after = (serde_json::to_value(&a).expect("a"), serde_json::to_value(&ep).expect("e"));
        assert_eq!(before, after);
    }
}
