//! # Model Configs
//!
//! Per-model accounting records: which encoding approximates the model's
//! tokenizer, the calibrated framing-overhead coefficients, and metadata
//! (context window, pricing). Configs are loaded once from the embedded
//! registry document and shared read-only.

mod config;
mod registry;

pub use config::{ModelConfig, ModelPricing, TokenOverheads};
pub use registry::{config_hash, lookup_model, model_ids};
