//! On-disk definition bundle: one API plus its endpoints, as written by `apidesk import`.

use anyhow::Context as _;
use apidesk_registry::model::{ApiDefinition, EndpointDefinition};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiBundle {
    pub api: ApiDefinition,
    #[serde(default)]
    pub endpoints: Vec<EndpointDefinition>,
}

impl ApiBundle {
    /// Parse and validate a bundle. Endpoints must belong to the bundled API.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let bundle: ApiBundle = serde_json::from_str(text).context("parse definition bundle")?;
        for ep in &bundle.endpoints {
            ep.validate()
                .with_context(|| format!("endpoint '{}'", ep.id))?;
            if ep.api_id != bundle.api.id {
                anyhow::bail!(
                    "endpoint '{}' belongs to API '{}', not '{}'",
                    ep.id,
                    ep.api_id,
                    bundle.api.id
                );
            }
        }
        Ok(bundle)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read bundle {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("load {}", path.display()))
    }

    /// Find an endpoint by id, or by name ignoring case.
    pub fn endpoint(&self, key: &str) -> anyhow::Result<&EndpointDefinition> {
        self.endpoints
            .iter()
            .find(|e| e.id == key)
            .or_else(|| {
                self.endpoints
                    .iter()
                    .find(|e| e.name.eq_ignore_ascii_case(key))
            })
            .with_context(|| format!("no endpoint '{key}' in API '{}'", self.api.name))
    }
}
