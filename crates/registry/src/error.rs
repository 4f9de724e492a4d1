//! Error types for `apidesk-registry`.

use thiserror::Error;

/// cURL command text could not be translated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurlParseError {
    #[error("invalid command: expected it to start with 'curl', got '{fragment}'")]
    InvalidCommand { fragment: String },

    #[error("URL not found: the command has no double-quoted URL ('{fragment}')")]
    UrlNotFound { fragment: String },

    #[error("invalid HTTP method '{token}'")]
    InvalidMethod { token: String },

    #[error("unterminated {quote} quote starting at '{fragment}'")]
    UnterminatedQuote { quote: char, fragment: String },
}

/// A JSON import document violated the import format.
///
/// Any violation aborts the whole import; nothing is partially applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("invalid JSON: {message}")]
    InvalidJson { message: String },

    #[error("import document must be a JSON object")]
    NotAnObject,

    #[error("missing {field}")]
    MissingRequiredField { field: String },

    #[error("invalid shape for '{field}': expected {expected}")]
    InvalidShape { field: String, expected: String },
}

impl ImportError {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
        }
    }

    pub(crate) fn shape(field: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidShape {
            field: field.into(),
            expected: expected.into(),
        }
    }
}

/// The resolver could not produce a request URL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no URL resolvable for API '{api_id}': no custom URL, no endpoint and an empty base URL")]
    NoUrlResolvable { api_id: String },
}

/// Network-level failure while executing a test.
///
/// These never cross the executor boundary as errors: their `Display` form becomes
/// `TestResult::error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("timeout")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("response too large: {0}")]
    ResponseTooLarge(String),

    #[error("no response from execution")]
    NoResponse,
}

/// History storage failures.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("history storage error: {0}")]
    Storage(String),

    #[error("history IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("history JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Main error type for the registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("cURL parse error: {0}")]
    Curl(#[from] CurlParseError),

    #[error("import error: {0}")]
    Import(#[from] ImportError),

    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    History(#[from] HistoryError),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
