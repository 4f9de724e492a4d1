//! Downloadable documents: the registry export and per-test reports.
//!
//! Credentials are never written to either document. Report requests carry the resolved headers
//! and URL with authentication values replaced by `[redacted]`.

use crate::model::{ApiDefinition, ApiKeyLocation, AuthType, HeaderList, ResolvedRequest, TestResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

const REDACTED: &str = "[redacted]";

const AUTH_HEADERS: &[&str] = &["authorization", "proxy-authorization"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryExport {
    pub export_date: DateTime<Utc>,
    pub apis: Vec<ExportedApi>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedApi {
    pub name: String,
    pub base_url: String,
    pub auth_type: AuthType,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl From<&ApiDefinition> for ExportedApi {
    fn from(api: &ApiDefinition) -> Self {
        Self {
            name: api.name.clone(),
            base_url: api.base_url.clone(),
            auth_type: api.auth_type,
            is_active: api.is_active,
            created_at: api.created_at,
            observations: api.observations.clone(),
            documentation: api.documentation.clone(),
        }
    }
}

/// Snapshot the registry for download.
#[must_use]
pub fn export_registry(apis: &[ApiDefinition], export_date: DateTime<Utc>) -> RegistryExport {
    RegistryExport {
        export_date,
        apis: apis.iter().map(ExportedApi::from).collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub api: String,
    pub test_date: DateTime<Utc>,
    pub request: ReportRequest,
    pub response: ReportResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub url: String,
    pub method: String,
    pub headers: HeaderList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResponse {
    pub status: u16,
    pub body: String,
    pub response_time: u64,
    pub success: bool,
}

/// Build the downloadable report for one executed test against `api`.
#[must_use]
pub fn test_report(
    api: &ApiDefinition,
    request: &ResolvedRequest,
    result: &TestResult,
    test_date: DateTime<Utc>,
) -> TestReport {
    TestReport {
        api: api.name.clone(),
        test_date,
        request: ReportRequest {
            url: redact_query(api, &request.url),
            method: request.method.as_str().to_string(),
            headers: redact_headers(api, &request.headers),
        },
        response: ReportResponse {
            status: result.status,
            body: result.body_text.clone(),
            response_time: result.response_time_ms,
            success: result.success,
        },
    }
}

fn credential(api: &ApiDefinition) -> Option<&str> {
    api.has_credential().then(|| api.credential.trim())
}

fn api_key_name(api: &ApiDefinition, location: ApiKeyLocation) -> Option<&str> {
    (api.auth_type == AuthType::ApiKey && api.api_key.location == location)
        .then(|| api.api_key.effective_name())
}

fn redact_headers(api: &ApiDefinition, headers: &HeaderList) -> HeaderList {
    let key_header = api_key_name(api, ApiKeyLocation::Header);
    let secret = credential(api);
    headers
        .iter()
        .map(|(name, value)| {
            let hide = AUTH_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h))
                || key_header.is_some_and(|h| name.eq_ignore_ascii_case(h))
                || secret.is_some_and(|c| value.contains(c));
            (name, if hide { REDACTED } else { value })
        })
        .collect()
}

/// URLs without sensitive query values are returned untouched.
fn redact_query(api: &ApiDefinition, raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return match credential(api) {
            Some(c) => raw.replace(c, REDACTED),
            None => raw.to_string(),
        };
    };
    let key_param = api_key_name(api, ApiKeyLocation::Query);
    let secret = credential(api);

    let mut hidden = false;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let hide = key_param.is_some_and(|p| k == p) || secret.is_some_and(|c| v == c);
            hidden |= hide;
            let value = if hide { REDACTED.to_string() } else { v.into_owned() };
            (k.into_owned(), value)
        })
        .collect();
    if !hidden {
        return raw.to_string();
    }
    url.query_pairs_mut().clear().extend_pairs(&pairs);
    url.to_string()
}
