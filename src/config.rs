use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::metrics::{CompareOptions, DEFAULT_THRESHOLD};

pub const THRESHOLD_ENV: &str = "CHUNKEVAL_THRESHOLD";
pub const DEFAULT_ENTRIES_KEY: &str = "entries";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub entries_key: String,
    pub fields_to_evaluate: Option<Vec<String>>,
    pub key_fields: Option<Vec<String>>,
    pub threshold: f64,
    pub case_sensitive: bool,
    pub normalize_whitespace: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            entries_key: DEFAULT_ENTRIES_KEY.to_string(),
            fields_to_evaluate: None,
            key_fields: None,
            threshold: DEFAULT_THRESHOLD,
            case_sensitive: false,
            normalize_whitespace: true,
        }
    }
}

impl EvaluationConfig {
    pub fn compare_options(&self) -> CompareOptions {
        CompareOptions {
            threshold: self.threshold,
            case_sensitive: self.case_sensitive,
            normalize_whitespace: self.normalize_whitespace,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            bail!("threshold must be within [0, 1], got {}", self.threshold);
        }
        if self.entries_key.trim().is_empty() {
            bail!("entries key must not be empty");
        }
        Ok(())
    }
}

pub fn load_base_config(path: Option<&Path>) -> Result<EvaluationConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = fs::read(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_slice::<EvaluationConfig>(&raw)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => EvaluationConfig::default(),
    };

    if path.is_none()
        && let Some(threshold) = resolve_env_threshold()?
    {
        config.threshold = threshold;
    }

    Ok(config)
}

fn resolve_env_threshold() -> Result<Option<f64>> {
    parse_threshold(std::env::var(THRESHOLD_ENV).ok().as_deref())
        .with_context(|| format!("invalid {THRESHOLD_ENV}"))
}

pub fn parse_threshold(value: Option<&str>) -> Result<Option<f64>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => {
            let threshold = raw
                .parse::<f64>()
                .with_context(|| format!("threshold is not a number: {raw}"))?;
            if !(0.0..=1.0).contains(&threshold) {
                bail!("threshold must be within [0, 1], got {threshold}");
            }
            Ok(Some(threshold))
        }
    }
}
