use std::path::PathBuf;

use anyhow::{bail, Context};
use strum::IntoEnumIterator;
use tokentally::bpe::BpeTokenizer;
use tokentally::encoding::openai::Encoding;
use tokentally::models::{lookup_model, ModelConfig, ModelPricing, TokenOverheads};
use tokentally::prompt::Message;

use crate::commands::load_engine;
use crate::logging::{LogArgs, Verbosity};
use crate::persist::{load_doc, save_doc, ModelsDoc};
use crate::probe::{UsageOracle, UsageProbe};

/// Samples below this local token count are too overhead-dominated to
/// separate encodings.
const LONG_SAMPLE_TOKENS: usize = 400;

/// Args for the select-encoding command.
#[derive(clap::Args, Debug)]
pub struct SelectEncodingArgs {
    /// Model identifier (e.g. "acme/new-model").
    model: String,

    /// Persisted model-config document to update.
    #[clap(long, default_value = "models.json")]
    models_file: PathBuf,

    /// Override the provider endpoint (for proxies).
    #[clap(long)]
    base_url: Option<String>,

    #[command(flatten)]
    logging: LogArgs,
}

impl SelectEncodingArgs {
    /// Run the select-encoding command.
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.logging.init(Verbosity::Progress)?;

        let mut probe = UsageProbe::from_env(&self.model, self.base_url.clone())?;

        let mut candidates = Vec::new();
        for encoding in Encoding::iter() {
            candidates.push((encoding, load_engine(encoding)?));
        }

        let choice = select_encoding(&mut probe, &mut candidates)?;
        log::info!(
            "{}: picked {} (multiplier {:.4}, abs error {})",
            self.model,
            choice.encoding,
            choice.content_multiplier,
            choice.abs_error
        );

        let mut doc: ModelsDoc = load_doc(&self.models_file)?;
        let existing = doc
            .get(&self.model)
            .cloned()
            .or_else(|| lookup_model(&self.model).cloned());
        doc.insert(
            self.model.clone(),
            match existing {
                Some(config) => ModelConfig {
                    encoding: choice.encoding.to_string(),
                    content_multiplier: choice.content_multiplier,
                    ..config
                },
                None => ModelConfig {
                    name: self.model.clone(),
                    encoding: choice.encoding.to_string(),
                    context_window: 0,
                    max_tokens: 0,
                    content_multiplier: choice.content_multiplier,
                    pricing: ModelPricing::default(),
                    tokens: TokenOverheads::default(),
                },
            },
        );
        save_doc(&self.models_file, &doc)?;

        Ok(())
    }
}

/// The outcome of encoding selection.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingChoice {
    /// The closest encoding.
    pub encoding: Encoding,

    /// Multiplier inferred from the long-sample ratio, floored at 0.5.
    pub content_multiplier: f64,

    /// Summed absolute error of the winner over long samples.
    pub abs_error: u64,
}

/// The fixed corpus used for encoding selection.
///
/// Long samples are built by repetition so every candidate sees well over
/// [`LONG_SAMPLE_TOKENS`] tokens of prose, code, and unicode text.
pub fn selection_corpus() -> Vec<String> {
    let prose = "The quick brown fox jumps over the lazy dog. \
        It was the best of times, it was the worst of times. ";
    let code = "fn main() { let mut total = 0; for i in 0..10 { total += i * i; } } ";
    let unicode = "\u{4f60}\u{597d}\u{4e16}\u{754c} caf\u{e9} \u{1f600} ";

    vec![
        prose.repeat(40),
        code.repeat(60),
        unicode.repeat(120),
        format!("{}{}{}", prose, code, unicode).repeat(20),
    ]
}

/// Tokenize the corpus with every candidate and pick the encoding with
/// the smallest absolute error against the reported usage on long
/// samples; infer the content multiplier from the long-sample ratio.
pub fn select_encoding(
    oracle: &mut dyn UsageOracle,
    candidates: &mut [(Encoding, BpeTokenizer<u32>)],
) -> anyhow::Result<EncodingChoice> {
    if candidates.is_empty() {
        bail!("no candidate encodings");
    }

    let corpus = selection_corpus();
    let reported: Vec<u64> = corpus
        .iter()
        .map(|text| oracle.input_tokens(&[Message::user(text.clone())], &[]))
        .collect::<anyhow::Result<_>>()?;

    let mut best: Option<EncodingChoice> = None;
    for (encoding, engine) in candidates.iter_mut() {
        let mut abs_error = 0u64;
        let mut ratio_sum = 0.0;
        let mut long_samples = 0usize;

        for (text, &api) in corpus.iter().zip(&reported) {
            let local = engine.count(text);
            if local <= LONG_SAMPLE_TOKENS {
                continue;
            }
            abs_error += api.abs_diff(local as u64);
            ratio_sum += api as f64 / local as f64;
            long_samples += 1;
        }

        if long_samples == 0 {
            log::warn!("{encoding}: no long samples; skipping candidate");
            continue;
        }

        let content_multiplier = (ratio_sum / long_samples as f64).max(0.5);
        if !content_multiplier.is_finite() {
            log::warn!("{encoding}: non-finite multiplier; skipping candidate");
            continue;
        }

        let choice = EncodingChoice {
            encoding: *encoding,
            content_multiplier,
            abs_error,
        };
        best = match best {
            Some(prev) if prev.abs_error <= choice.abs_error => Some(prev),
            _ => Some(choice),
        };
    }

    best.context("every candidate encoding was rejected")
}
