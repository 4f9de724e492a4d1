//! Outbound HTTP limits for test execution (response size, redirects, error redaction).
//!
//! Test targets are operator-registered APIs, so there is no host allowlisting here; the limits
//! only keep a single test from buffering unbounded bodies or leaking credentials into errors.

use crate::error::TransportError;
use reqwest::Client;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectPolicy {
    /// Follow redirects (reqwest default policy).
    #[default]
    Follow,
    /// Do not follow redirects; the 3xx response is the result.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Maximum response body size (bytes). `None` = unlimited.
    pub max_response_bytes: Option<usize>,
    /// Redirect behavior.
    pub redirects: RedirectPolicy,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_response_bytes: Some(10 * 1024 * 1024), // 10 MiB
            redirects: RedirectPolicy::Follow,
        }
    }
}

impl ExecutionLimits {
    /// No size limit, redirects followed.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            max_response_bytes: None,
            redirects: RedirectPolicy::Follow,
        }
    }

    /// Build the HTTP client matching this policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn build_client(&self) -> Result<Client, TransportError> {
        let builder = match self.redirects {
            RedirectPolicy::Follow => Client::builder(),
            RedirectPolicy::None => Client::builder().redirect(reqwest::redirect::Policy::none()),
        };
        builder
            .build()
            .map_err(|e| TransportError::InvalidRequest(sanitize_reqwest_error(&e)))
    }
}

#[must_use]
pub fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    // Best-effort: drop credentials + query + fragment.
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

#[must_use]
pub fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(u) = e.url() {
        msg = msg.replace(u.as_str(), &redact_url(u));
    }
    msg
}

/// Map a reqwest failure onto the transport taxonomy.
#[must_use]
pub fn classify_reqwest_error(e: &reqwest::Error) -> TransportError {
    if e.is_timeout() {
        return TransportError::Timeout;
    }
    let msg = sanitize_reqwest_error(e);
    if e.is_builder() {
        TransportError::InvalidRequest(msg)
    } else if e.is_connect() {
        TransportError::Connect(msg)
    } else if e.is_body() || e.is_decode() {
        TransportError::Body(msg)
    } else {
        TransportError::Request(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_url_drops_credentials_and_query() {
        let url = Url::parse("https://user:pw@api.test/v1/x?token=abc#frag").expect("url");
        assert_eq!(redact_url(&url), "https://api.test/v1/x");
    }

    #[test]
    fn default_limits_cap_response_size() {
        let limits = ExecutionLimits::default();
        assert_eq!(limits.max_response_bytes, Some(10 * 1024 * 1024));
        assert_eq!(ExecutionLimits::permissive().max_response_bytes, None);
    }

    #[test]
    fn clients_build_for_both_redirect_policies() {
        for redirects in [RedirectPolicy::Follow, RedirectPolicy::None] {
            let limits = ExecutionLimits {
                max_response_bytes: None,
                redirects,
            };
            limits.build_client().expect("client");
        }
    }
}
