//! cURL command translation.
//!
//! Supported surface: `-X/--request`, `-H/--header`, `-d/--data/--data-raw/--data-binary`,
//! `--url`, and a double-quoted URL argument. Everything else is ignored. There is no shell
//! grammar here: no variable expansion, no command substitution, and bare (unquoted) URLs are not
//! recognized.

use crate::error::{CurlParseError, RegistryError};
use crate::model::{
    ApiDefinition, AuthType, EndpointDefinition, HeaderList, HttpMethod, KeyValue, RequestOverride,
    ResolvedRequest,
};
use base64::Engine as _;
use reqwest::Method;
use serde_json::Value;
use std::fmt::Write as _;
use tracing::debug;
use url::Url;

const FRAGMENT_MAX_CHARS: usize = 40;

/// Flags that take a value we do not interpret; the value must not be mistaken for the URL.
const IGNORED_VALUE_FLAGS: &[&str] = &[
    "-u",
    "--user",
    "-o",
    "--output",
    "-A",
    "--user-agent",
    "-b",
    "--cookie",
    "-c",
    "--cookie-jar",
    "-e",
    "--referer",
    "-F",
    "--form",
    "--form-string",
    "-m",
    "--max-time",
    "--connect-timeout",
    "-x",
    "--proxy",
    "-U",
    "--proxy-user",
    "-T",
    "--upload-file",
    "-w",
    "--write-out",
    "-r",
    "--range",
    "-E",
    "--cert",
    "--cacert",
    "-K",
    "--config",
    "--data-urlencode",
    "--retry",
    "--resolve",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagKind {
    Method,
    Header,
    Data,
    Url,
    IgnoredWithValue,
    Ignored,
}

fn flag_kind(flag: &str) -> FlagKind {
    match flag {
        "-X" | "--request" => FlagKind::Method,
        "-H" | "--header" => FlagKind::Header,
        "-d" | "--data" | "--data-raw" | "--data-binary" | "--data-ascii" => FlagKind::Data,
        "--url" => FlagKind::Url,
        f if IGNORED_VALUE_FLAGS.contains(&f) => FlagKind::IgnoredWithValue,
        _ => FlagKind::Ignored,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quoting {
    Unset,
    Quoted(char),
    Mixed,
}

impl Quoting {
    fn add(self, piece: Option<char>) -> Self {
        match (self, piece) {
            (Quoting::Unset, Some(q)) => Quoting::Quoted(q),
            (Quoting::Quoted(a), Some(b)) if a == b => Quoting::Quoted(a),
            _ => Quoting::Mixed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    text: String,
    /// Set when the whole token came from quoted segments of one quote style.
    quote: Option<char>,
}

impl Token {
    fn is_flag(&self) -> bool {
        self.quote.is_none() && self.text.len() > 1 && self.text.starts_with('-')
    }
}

fn fragment(s: &str) -> String {
    let mut out: String = s.chars().take(FRAGMENT_MAX_CHARS).collect();
    if s.chars().count() > FRAGMENT_MAX_CHARS {
        out.push_str("...");
    }
    out
}

/// Split a command line into arguments.
///
/// Whitespace runs outside quotes separate arguments (and are thereby collapsed); whitespace
/// inside quotes is kept verbatim. A backslash-newline outside quotes is a separator.
fn tokenize(input: &str) -> Result<Vec<Token>, CurlParseError> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut quoting = Quoting::Unset;
    let mut in_token = false;
    let mut open_quote: Option<(char, usize)> = None;

    let trimmed = input.trim();
    let mut chars = trimmed.char_indices().peekable();

    let flush = |tokens: &mut Vec<Token>, text: &mut String, quoting: &mut Quoting| {
        tokens.push(Token {
            text: std::mem::take(text),
            quote: match *quoting {
                Quoting::Quoted(q) => Some(q),
                Quoting::Unset | Quoting::Mixed => None,
            },
        });
        *quoting = Quoting::Unset;
    };

    while let Some((idx, c)) = chars.next() {
        if let Some((q, _)) = open_quote {
            if c == q {
                open_quote = None;
            } else if c == '\\' && q == '"' {
                match chars.peek() {
                    Some(&(_, next)) if matches!(next, '"' | '\\' | '$' | '`') => {
                        text.push(next);
                        chars.next();
                    }
                    _ => text.push('\\'),
                }
            } else {
                text.push(c);
            }
            continue;
        }

        match c {
            c if c.is_whitespace() => {
                if in_token {
                    flush(&mut tokens, &mut text, &mut quoting);
                    in_token = false;
                }
            }
            '\\' => match chars.peek() {
                Some(&(_, '\n' | '\r')) => {
                    while matches!(chars.peek(), Some(&(_, '\n' | '\r'))) {
                        chars.next();
                    }
                    if in_token {
                        flush(&mut tokens, &mut text, &mut quoting);
                        in_token = false;
                    }
                }
                Some(&(_, next)) => {
                    text.push(next);
                    chars.next();
                    quoting = quoting.add(None);
                    in_token = true;
                }
                None => {
                    text.push('\\');
                    quoting = quoting.add(None);
                    in_token = true;
                }
            },
            '\'' | '"' | '`' => {
                open_quote = Some((c, idx));
                quoting = quoting.add(Some(c));
                in_token = true;
            }
            _ => {
                text.push(c);
                quoting = quoting.add(None);
                in_token = true;
            }
        }
    }

    if let Some((quote, start)) = open_quote {
        return Err(CurlParseError::UnterminatedQuote {
            quote,
            fragment: fragment(&trimmed[start..]),
        });
    }
    if in_token {
        flush(&mut tokens, &mut text, &mut quoting);
    }
    Ok(tokens)
}

/// Split `-XPOST` / `--request=POST` into flag + attached value.
fn split_flag(text: &str) -> (&str, Option<&str>) {
    if let Some(rest) = text.strip_prefix("--") {
        return match rest.split_once('=') {
            Some((name, value)) => (&text[..name.len() + 2], Some(value)),
            None => (text, None),
        };
    }
    for short in ["-X", "-H", "-d"] {
        if let Some(value) = text.strip_prefix(short)
            && !value.is_empty()
        {
            return (short, Some(value));
        }
    }
    (text, None)
}

/// Any HTTP token is accepted (`M-SEARCH`, `PROPFIND`), uppercased.
fn parse_method(token: &str) -> Result<Method, CurlParseError> {
    let upper = token.trim().to_ascii_uppercase();
    Method::from_bytes(upper.as_bytes()).map_err(|_| CurlParseError::InvalidMethod {
        token: token.to_string(),
    })
}

/// Parse a cURL command line into a concrete request.
///
/// # Errors
///
/// Returns an error if the text does not start with `curl`, has no double-quoted URL, names an
/// invalid method, or leaves a quote open.
pub fn parse(text: &str) -> Result<ResolvedRequest, CurlParseError> {
    let tokens = tokenize(text)?;

    match tokens.first() {
        Some(t) if t.quote.is_none() && t.text == "curl" => {}
        Some(t) => {
            return Err(CurlParseError::InvalidCommand {
                fragment: fragment(&t.text),
            });
        }
        None => {
            return Err(CurlParseError::InvalidCommand {
                fragment: String::new(),
            });
        }
    }

    let mut url: Option<String> = None;
    let mut method: Option<Method> = None;
    let mut headers = HeaderList::new();
    let mut body: Option<String> = None;

    let mut i = 1;
    while i < tokens.len() {
        let tok = &tokens[i];
        i += 1;

        if !tok.is_flag() {
            if tok.quote == Some('"') && url.is_none() {
                url = Some(tok.text.clone());
            } else {
                debug!(argument = %fragment(&tok.text), "ignoring unsupported curl argument");
            }
            continue;
        }

        let (flag, attached) = split_flag(&tok.text);
        let kind = flag_kind(flag);

        let value = match kind {
            FlagKind::Ignored => {
                debug!(flag = %flag, "ignoring unsupported curl flag");
                continue;
            }
            _ => match attached {
                Some(v) => v.to_string(),
                None => {
                    let Some(next) = tokens.get(i) else {
                        debug!(flag = %flag, "curl flag is missing its value");
                        break;
                    };
                    i += 1;
                    next.text.clone()
                }
            },
        };

        match kind {
            FlagKind::Method => method = Some(parse_method(&value)?),
            FlagKind::Header => match value.split_once(':') {
                Some((name, v)) if !name.trim().is_empty() => headers.set(name, v),
                _ => debug!(header = %fragment(&value), "ignoring malformed curl header"),
            },
            FlagKind::Data => {
                if body.is_none() {
                    body = Some(value);
                }
            }
            FlagKind::Url => {
                if url.is_none() {
                    url = Some(value);
                }
            }
            FlagKind::IgnoredWithValue | FlagKind::Ignored => {
                debug!(flag = %flag, "ignoring unsupported curl flag and its value");
            }
        }
    }

    let url = url.ok_or_else(|| CurlParseError::UrlNotFound {
        fragment: fragment(text.trim()),
    })?;

    Ok(ResolvedRequest {
        url,
        method: method.unwrap_or(Method::GET),
        headers,
        body,
    })
}

fn escape_double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_single_quoted(s: &str) -> String {
    s.replace('\'', r"'\''")
}

/// Render a request as an equivalent cURL command.
#[must_use]
pub fn to_curl(req: &ResolvedRequest) -> String {
    let mut out = String::from("curl");
    if req.method != Method::GET {
        let _ = write!(out, " -X {}", req.method.as_str());
    }
    let _ = write!(out, " \"{}\"", escape_double_quoted(&req.url));
    for (name, value) in req.headers.iter() {
        let _ = write!(
            out,
            " -H \"{}: {}\"",
            escape_double_quoted(name),
            escape_double_quoted(value)
        );
    }
    if let Some(body) = &req.body {
        let _ = write!(out, " -d '{}'", escape_single_quoted(body));
    }
    out
}

/// Use a parsed command as the caller override for a resolver run.
#[must_use]
pub fn to_override(req: &ResolvedRequest) -> RequestOverride {
    RequestOverride {
        custom_url: Some(req.url.clone()),
        custom_method: Some(req.method.clone()),
        custom_headers: req.headers.clone(),
        custom_body: req.body.clone(),
    }
}

/// A throwaway API for running a parsed command as written. The URL origin becomes the base URL
/// and the command itself is the caller override, so the request is sent without re-encoding.
///
/// # Errors
///
/// Returns a validation error if the URL is not absolute.
pub fn to_ad_hoc(
    req: &ResolvedRequest,
    api_name: &str,
) -> Result<(ApiDefinition, RequestOverride), RegistryError> {
    let url = absolute_url(&req.url)?;
    let api = ApiDefinition::new(
        uuid::Uuid::new_v4().to_string(),
        api_name,
        url.origin().ascii_serialization(),
    );
    Ok((api, to_override(req)))
}

fn absolute_url(raw: &str) -> Result<Url, RegistryError> {
    let url =
        Url::parse(raw).map_err(|e| RegistryError::Validation(format!("invalid URL '{raw}': {e}")))?;
    if !url.has_host() {
        return Err(RegistryError::Validation(format!("URL '{raw}' has no host")));
    }
    Ok(url)
}

/// Split a parsed command into a stored API (URL origin) and one endpoint (path, query, headers,
/// body). `Authorization: Bearer`/`Basic` headers become the API's auth settings.
///
/// # Errors
///
/// Returns a validation error if the URL is not absolute or the method is not one an endpoint
/// may declare.
pub fn to_definitions(
    req: &ResolvedRequest,
    api_name: &str,
) -> Result<(ApiDefinition, EndpointDefinition), RegistryError> {
    let url = absolute_url(&req.url)?;
    let method: HttpMethod = req
        .method
        .as_str()
        .parse()
        .map_err(RegistryError::Validation)?;

    let api_id = uuid::Uuid::new_v4().to_string();
    let mut api = ApiDefinition::new(&api_id, api_name, url.origin().ascii_serialization());

    let path = url.path().to_string();
    let mut endpoint = EndpointDefinition::new(
        uuid::Uuid::new_v4().to_string(),
        &api_id,
        format!("{method} {path}"),
        method,
        path,
    );

    endpoint.query_params = url
        .query_pairs()
        .map(|(k, v)| KeyValue::new(k.into_owned(), v.into_owned()))
        .collect();

    for (name, value) in req.headers.iter() {
        if name.eq_ignore_ascii_case("authorization")
            && api.auth_type == AuthType::None
            && let Some((auth_type, credential)) = auth_from_header(value)
        {
            api.auth_type = auth_type;
            api.credential = credential;
            continue;
        }
        endpoint.headers.push(KeyValue::new(name, value));
    }

    if let Some(body) = &req.body {
        endpoint.body_template =
            serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.clone()));
    }

    Ok((api, endpoint))
}

fn auth_from_header(value: &str) -> Option<(AuthType, String)> {
    let (scheme, rest) = value.trim().split_once(' ')?;
    let rest = rest.trim();
    if scheme.eq_ignore_ascii_case("bearer") {
        return Some((AuthType::Bearer, rest.to_string()));
    }
    if scheme.eq_ignore_ascii_case("basic") {
        let decoded = base64::engine::general_purpose::STANDARD.decode(rest).ok()?;
        return String::from_utf8(decoded)
            .ok()
            .map(|credential| (AuthType::Basic, credential));
    }
    None
}
