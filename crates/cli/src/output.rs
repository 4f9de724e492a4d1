use apidesk_registry::history::HistoryEntry;
use apidesk_registry::model::TestResult;
use owo_colors::OwoColorize as _;
use serde_json::Value;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy)]
pub struct Style {
    pub color: bool,
}

impl Style {
    fn paint(self, text: &str, f: impl Fn(&str) -> String) -> String {
        if self.color { f(text) } else { text.to_string() }
    }

    fn status(self, result: &TestResult) -> String {
        if !result.success {
            let label = format!("ERR {}", result.error.as_deref().unwrap_or("unknown error"));
            return self.paint(&label, |s| s.red().bold().to_string());
        }
        let code = result.status.to_string();
        match result.status {
            200..=299 => self.paint(&code, |s| s.green().bold().to_string()),
            300..=399 => self.paint(&code, |s| s.cyan().bold().to_string()),
            400..=499 => self.paint(&code, |s| s.yellow().bold().to_string()),
            _ => self.paint(&code, |s| s.red().bold().to_string()),
        }
    }

    fn dim(self, text: &str) -> String {
        self.paint(text, |s| s.dimmed().to_string())
    }
}

/// JSON bodies are pretty-printed; anything else is shown as received.
fn pretty_body(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(v) if v.is_object() || v.is_array() => {
            serde_json::to_string_pretty(&v).unwrap_or_else(|_| body.to_string())
        }
        _ => body.to_string(),
    }
}

#[must_use]
pub fn render_result(result: &TestResult, style: Style) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} {} {}",
        style.status(result),
        result.method,
        result.url,
        style.dim(&format!("({} ms)", result.response_time_ms))
    );
    for (name, value) in result.headers.iter() {
        let _ = writeln!(out, "{}: {value}", style.dim(name));
    }
    if !result.body_text.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", pretty_body(&result.body_text));
    }
    if let Some(curl) = &result.curl_equivalent {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", style.dim(curl));
    }
    out
}

#[must_use]
pub fn render_history(entries: &[HistoryEntry], style: Style) -> String {
    if entries.is_empty() {
        return "no recorded tests\n".to_string();
    }
    let mut out = String::new();
    for e in entries {
        let _ = writeln!(
            out,
            "{}  {} {} {} {}",
            style.dim(&e.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            style.status(&e.result),
            e.result.method,
            e.result.url,
            style.dim(&format!("({} ms)", e.result.response_time_ms))
        );
    }
    out
}
