use std::path::PathBuf;

use anyhow::Context;
use tokentally::bpe::BpeTokenizer;
use tokentally::models::{config_hash, lookup_model, ModelConfig};
use tokentally::prompt::{
    count_prompt,
    Message,
    SchemaNode,
    SchemaProperty,
    ToolDefinition,
};

use crate::commands::load_engine;
use crate::logging::{LogArgs, Verbosity};
use crate::persist::{load_doc, save_doc, AccuracyDoc, AccuracyReport, ModelsDoc};
use crate::probe::{UsageOracle, UsageProbe};

/// Args for the measure command.
#[derive(clap::Args, Debug)]
pub struct MeasureArgs {
    /// Model identifier (e.g. "openai/gpt-5").
    model: String,

    /// Persisted model-config document to read.
    #[clap(long, default_value = "models.json")]
    models_file: PathBuf,

    /// Accuracy-report document to update.
    #[clap(long, default_value = "accuracy.json")]
    report_file: PathBuf,

    /// Remeasure even when the stored hash matches.
    #[clap(long)]
    force: bool,

    /// Override the provider endpoint (for proxies).
    #[clap(long)]
    base_url: Option<String>,

    #[command(flatten)]
    logging: LogArgs,
}

impl MeasureArgs {
    /// Run the measure command.
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.logging.init(Verbosity::Progress)?;

        let models: ModelsDoc = load_doc(&self.models_file)?;
        let config = models
            .get(&self.model)
            .cloned()
            .or_else(|| lookup_model(&self.model).cloned())
            .with_context(|| format!("model {:?} has no config", self.model))?;

        let hash = config_hash(&config.tokens);
        let mut report: AccuracyDoc = load_doc(&self.report_file)?;
        if !self.force {
            if let Some(existing) = report.get(&self.model) {
                if existing.config_hash == hash {
                    log::info!("{}: measurements are current ({hash})", self.model);
                    return Ok(());
                }
            }
        }

        let mut engine = load_engine(config.resolve_encoding()?)?;
        let mut probe = UsageProbe::from_env(&self.model, self.base_url.clone())?;

        let measured = measure_model(&mut probe, &mut engine, &config)?;
        log::info!(
            "{}: small {:.2}% medium {:.2}% large {:.2}%",
            self.model,
            measured.small,
            measured.medium,
            measured.large
        );

        report.insert(self.model.clone(), measured);
        save_doc(&self.report_file, &report)?;

        Ok(())
    }
}

/// Percent accuracy of `local` against the authoritative `api` count.
fn accuracy(
    local: usize,
    api: u64,
) -> f64 {
    if api == 0 {
        return 0.0;
    }
    100.0 - (api.abs_diff(local as u64) as f64 / api as f64) * 100.0
}

/// Measure small/medium/large prompt accuracy for one model.
pub fn measure_model(
    oracle: &mut dyn UsageOracle,
    engine: &mut BpeTokenizer<u32>,
    config: &ModelConfig,
) -> anyhow::Result<AccuracyReport> {
    let (small_messages, small_tools) = small_fixture();
    let (medium_messages, medium_tools) = medium_fixture();
    let (large_messages, large_tools) = large_fixture();

    let mut bucket = |messages: &[Message], tools: &[ToolDefinition]| -> anyhow::Result<f64> {
        let local = count_prompt(engine, config, messages, tools)?.total;
        let api = oracle.input_tokens(messages, tools)?;
        Ok(accuracy(local, api))
    };

    Ok(AccuracyReport {
        config_hash: config_hash(&config.tokens),
        small: bucket(&small_messages, &small_tools)?,
        medium: bucket(&medium_messages, &medium_tools)?,
        large: bucket(&large_messages, &large_tools)?,
    })
}

fn small_fixture() -> (Vec<Message>, Vec<ToolDefinition>) {
    (vec![Message::user("Hello!")], vec![])
}

fn medium_fixture() -> (Vec<Message>, Vec<ToolDefinition>) {
    let messages = vec![
        Message::system("You are a helpful assistant."),
        Message::user("What is the weather like in Paris today?"),
        Message::assistant("Let me check that for you."),
        Message::user("Also, will it rain tomorrow?"),
    ];
    let tools = vec![ToolDefinition::new(
        "getWeather",
        SchemaNode::object([
            SchemaProperty::new("location", SchemaNode::String)
                .with_description("The city and state"),
            SchemaProperty::new("unit", SchemaNode::enumeration(["metric", "imperial"])),
        ]),
    )
    .with_description("Get the current weather for a location")];
    (messages, tools)
}

fn large_fixture() -> (Vec<Message>, Vec<ToolDefinition>) {
    let paragraph = "The quick brown fox jumps over the lazy dog. \
        A journey of a thousand miles begins with a single step. ";
    let messages = vec![
        Message::system("You are a meticulous research assistant."),
        Message::user(paragraph.repeat(30)),
        Message::assistant(paragraph.repeat(20)),
        Message::user(paragraph.repeat(10)),
    ];
    let tools = vec![
        ToolDefinition::new(
            "search",
            SchemaNode::object([
                SchemaProperty::new("query", SchemaNode::String)
                    .with_description("The search query"),
                SchemaProperty::new("limit", SchemaNode::Number),
            ]),
        )
        .with_description("Search the web for a query"),
        ToolDefinition::new(
            "createEvent",
            SchemaNode::object([
                SchemaProperty::new("title", SchemaNode::String),
                SchemaProperty::new("date", SchemaNode::String),
                SchemaProperty::new(
                    "people",
                    SchemaNode::array(SchemaNode::object([
                        SchemaProperty::new("name", SchemaNode::String),
                        SchemaProperty::new("email", SchemaNode::String),
                    ])),
                ),
            ]),
        )
        .with_description("Create a new calendar event"),
    ];
    (messages, tools)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokentally::encoding::{EncodingTable, SpanRankMap};
    use tokentally::models::{ModelPricing, TokenOverheads};

    use super::*;

    fn byte_table() -> Arc<EncodingTable<u32>> {
        let mut ranks: SpanRankMap<u32> = Default::default();
        for b in 0..=255u8 {
            ranks.insert(vec![b], b as u32);
        }
        Arc::new(
            EncodingTable::new("bytes", r"[\s\S]", Vec::<(&str, u32)>::new(), ranks).unwrap(),
        )
    }

    fn test_config() -> ModelConfig {
        ModelConfig {
            name: "Test".into(),
            encoding: "o200k_base".into(),
            context_window: 8192,
            max_tokens: 1024,
            content_multiplier: 1.0,
            pricing: ModelPricing::default(),
            tokens: TokenOverheads::default(),
        }
    }

    /// Mirrors the accountant exactly; accuracy should be 100%.
    struct MirrorOracle {
        engine: BpeTokenizer<u32>,
        config: ModelConfig,
    }

    impl UsageOracle for MirrorOracle {
        fn input_tokens(
            &mut self,
            messages: &[Message],
            tools: &[ToolDefinition],
        ) -> anyhow::Result<u64> {
            Ok(count_prompt(&mut self.engine, &self.config, messages, tools)?.total as u64)
        }
    }

    #[test]
    fn test_mirror_oracle_scores_100() {
        let config = test_config();
        let mut oracle = MirrorOracle {
            engine: BpeTokenizer::new(byte_table()),
            config: config.clone(),
        };
        let mut engine = BpeTokenizer::new(byte_table());

        let report = measure_model(&mut oracle, &mut engine, &config).unwrap();
        assert_eq!(report.config_hash, config_hash(&config.tokens));
        assert!((report.small - 100.0).abs() < 1e-9);
        assert!((report.medium - 100.0).abs() < 1e-9);
        assert!((report.large - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_accuracy_penalizes_divergence() {
        assert_eq!(accuracy(90, 100), 90.0);
        assert_eq!(accuracy(110, 100), 90.0);
        assert_eq!(accuracy(0, 0), 0.0);
    }
}
