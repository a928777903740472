//! # Model Config Records

use serde::{Deserialize, Serialize};

use crate::encoding::openai::Encoding;
use crate::errors::{TallyError, TallyResult};

/// Framing-overhead coefficients for one model, measured by calibration.
///
/// Each coefficient is the server-side token cost of one structural
/// element of the request; the accountant sums them alongside tokenized
/// content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenOverheads {
    /// Constant added once per request.
    pub base_overhead: u32,

    /// Constant added per message (framing around each message).
    pub per_message: u32,

    /// Added once if at least one tool is present.
    pub tools_exist: u32,

    /// Added per additional tool beyond the first.
    pub per_tool: u32,

    /// Added per tool that carries a description.
    pub per_desc: u32,

    /// Added for the first property of an object schema.
    pub per_first_prop: u32,

    /// Added for each subsequent property of an object schema.
    pub per_additional_prop: u32,

    /// Added per property that has a description.
    pub per_prop_desc: u32,

    /// Added per enum-typed property.
    pub per_enum: u32,

    /// Added per object-typed property.
    pub per_nested_object: u32,

    /// Added per array property whose element type is an object.
    pub per_array_of_objects: u32,
}

/// Per-token pricing, USD per million tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Input (prompt) price.
    pub input: f64,

    /// Output (completion) price.
    pub output: f64,
}

impl ModelPricing {
    /// Estimate the USD cost of a request.
    pub fn cost(
        &self,
        input_tokens: usize,
        output_tokens: usize,
    ) -> f64 {
        (input_tokens as f64 / 1e6) * self.input + (output_tokens as f64 / 1e6) * self.output
    }
}

fn default_multiplier() -> f64 {
    1.0
}

/// The accounting record for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Display name.
    pub name: String,

    /// Name of the encoding that best approximates the model's tokenizer.
    pub encoding: String,

    /// Context window, in tokens.
    pub context_window: u32,

    /// Maximum completion tokens.
    pub max_tokens: u32,

    /// Correction applied to raw tokenized content length per content
    /// part, compensating for vendors whose tokenizer systematically
    /// differs from the nearest reference encoding. Defaults to 1.0.
    #[serde(default = "default_multiplier")]
    pub content_multiplier: f64,

    /// Pricing, USD per million tokens.
    pub pricing: ModelPricing,

    /// Calibrated overhead coefficients.
    pub tokens: TokenOverheads,
}

impl ModelConfig {
    /// Resolve the named encoding.
    ///
    /// ## Returns
    /// The [`Encoding`], or [`TallyError::UnknownEncoding`] when the name
    /// matches no loaded table.
    pub fn resolve_encoding(&self) -> TallyResult<Encoding> {
        self.encoding
            .parse::<Encoding>()
            .map_err(|_| TallyError::UnknownEncoding {
                name: self.encoding.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplier_defaults() {
        let json = r#"{
            "name": "Test",
            "encoding": "o200k_base",
            "context_window": 1000,
            "max_tokens": 100,
            "pricing": {"input": 1.0, "output": 2.0},
            "tokens": {
                "base_overhead": 1, "per_message": 2, "tools_exist": 3,
                "per_tool": 4, "per_desc": 5, "per_first_prop": 6,
                "per_additional_prop": 7, "per_prop_desc": 8, "per_enum": 9,
                "per_nested_object": 10, "per_array_of_objects": 11
            }
        }"#;
        let config: ModelConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.content_multiplier, 1.0);
        assert_eq!(config.resolve_encoding().unwrap(), Encoding::O200kBase);
    }

    #[test]
    fn test_unknown_encoding() {
        let config = ModelConfig {
            name: "Test".into(),
            encoding: "z9000_base".into(),
            context_window: 0,
            max_tokens: 0,
            content_multiplier: 1.0,
            pricing: ModelPricing::default(),
            tokens: TokenOverheads::default(),
        };
        let err = config.resolve_encoding().unwrap_err();
        match err {
            TallyError::UnknownEncoding { name } => assert_eq!(name, "z9000_base"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_pricing_cost() {
        let pricing = ModelPricing {
            input: 2.0,
            output: 10.0,
        };
        let cost = pricing.cost(1_000_000, 500_000);
        assert!((cost - 7.0).abs() < 1e-9);
    }
}
