use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Zero disables the limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_response_bytes: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_redirects: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)
    }

    /// Set one key from its string form (`timeoutMs`, `maxResponseBytes`, `followRedirects`,
    /// `historyPath`).
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let value = value.trim();
        match key {
            "timeoutMs" => {
                self.timeout_ms = Some(value.parse().with_context(|| format!("timeoutMs: '{value}'"))?);
            }
            "maxResponseBytes" => {
                self.max_response_bytes =
                    Some(value.parse().with_context(|| format!("maxResponseBytes: '{value}'"))?);
            }
            "followRedirects" => {
                self.follow_redirects =
                    Some(value.parse().with_context(|| format!("followRedirects: '{value}'"))?);
            }
            "historyPath" => {
                self.history_path = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            other => anyhow::bail!(
                "unknown config key '{other}' (expected timeoutMs, maxResponseBytes, followRedirects, historyPath)"
            ),
        }
        Ok(())
    }
}

fn config_base_dir() -> anyhow::Result<PathBuf> {
    if let Ok(v) = std::env::var("XDG_CONFIG_HOME")
        && !v.is_empty()
    {
        return Ok(PathBuf::from(v));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".config"))
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(config_base_dir()?.join("apidesk").join("config.json"))
}

/// History file used when the config does not name one.
pub fn default_history_path() -> anyhow::Result<PathBuf> {
    Ok(config_base_dir()?.join("apidesk").join("history.jsonl"))
}

pub fn load_config(path: &Path) -> anyhow::Result<CliConfig> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CliConfig::default()),
        Err(e) => return Err(e).with_context(|| format!("read config {}", path.display())),
    };
    let cfg: CliConfig =
        serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

pub fn save_config(path: &Path, cfg: &CliConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
    }
    let bytes = serde_json::to_vec_pretty(cfg).context("serialize config as json")?;
    std::fs::write(path, bytes).with_context(|| format!("write config {}", path.display()))?;
    Ok(())
}
