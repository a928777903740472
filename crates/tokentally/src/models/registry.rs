//! # Embedded Model Registry

use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};

use crate::models::config::{ModelConfig, TokenOverheads};
use crate::types::TallyHashMap;

/// The calibrated registry document shipped with the crate.
const MODELS_JSON: &str = include_str!("../../data/models.json");

static REGISTRY: Lazy<TallyHashMap<String, ModelConfig>> = Lazy::new(|| {
    serde_json::from_str(MODELS_JSON).expect("embedded models.json is well-formed")
});

/// Look up the config for a model identifier (e.g. `"openai/gpt-5"`).
pub fn lookup_model(id: &str) -> Option<&'static ModelConfig> {
    REGISTRY.get(id)
}

/// Iterate the identifiers of all registered models.
pub fn model_ids() -> impl Iterator<Item = &'static str> {
    REGISTRY.keys().map(String::as_str)
}

/// Hash the coefficient subrecord of a config.
///
/// Stored alongside accuracy measurements; a mismatch with the hash of the
/// current config marks the measurements as stale.
pub fn config_hash(overheads: &TokenOverheads) -> String {
    // Struct field order fixes the JSON key order, so the hash is stable.
    let canonical =
        serde_json::to_string(overheads).expect("overhead coefficients serialize to JSON");
    hex::encode(Sha256::digest(canonical.as_bytes()))
}
