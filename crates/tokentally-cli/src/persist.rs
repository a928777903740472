//! Persisted calibration state.
//!
//! Two JSON documents keyed by model identifier: the model-config document
//! (the same shape the embedded registry ships), and the accuracy report
//! written by `measure`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokentally::models::ModelConfig;

/// Accuracy measurements for one model, tied to a coefficient hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    /// Hash of the coefficient subrecord the measurements were taken with.
    #[serde(rename = "configHash")]
    pub config_hash: String,

    /// Accuracy (percent) on the small prompt fixture.
    pub small: f64,

    /// Accuracy (percent) on the medium prompt fixture.
    pub medium: f64,

    /// Accuracy (percent) on the large prompt fixture.
    pub large: f64,
}

/// The model-config document.
pub type ModelsDoc = BTreeMap<String, ModelConfig>;

/// The accuracy-report document.
pub type AccuracyDoc = BTreeMap<String, AccuracyReport>;

/// Load a JSON document, defaulting to empty when the file is absent.
pub fn load_doc<D>(path: &Path) -> anyhow::Result<D>
where
    D: Default + for<'de> Deserialize<'de>,
{
    if !path.exists() {
        return Ok(D::default());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

/// Write a JSON document, pretty-printed, creating parent directories.
pub fn save_doc<D: Serialize>(
    path: &Path,
    doc: &D,
) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(doc)?;
    fs::write(path, text + "\n").with_context(|| format!("failed to write {}", path.display()))
}
