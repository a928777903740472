use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;
use tokentally::models::lookup_model;
use tokentally::prompt::{count_prompt, Message, PromptCount, ToolDefinition};

use crate::commands::load_engine;
use crate::logging::{LogArgs, Verbosity};

/// A prompt document: model, messages, and optional tools.
#[derive(Debug, Deserialize)]
struct PromptFile {
    model: Option<String>,
    messages: Vec<Message>,
    #[serde(default)]
    tools: Vec<ToolDefinition>,
}

/// Args for the count command.
#[derive(clap::Args, Debug)]
pub struct CountArgs {
    /// Prompt JSON file; stdin when omitted.
    input: Option<PathBuf>,

    /// Model identifier; overrides the file's "model" key.
    #[clap(short, long)]
    model: Option<String>,

    /// Emit the breakdown as JSON.
    #[clap(long)]
    json: bool,

    /// Also print the estimated input cost.
    #[clap(long)]
    cost: bool,

    #[command(flatten)]
    logging: LogArgs,
}

impl CountArgs {
    /// Run the count command.
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.logging.init(Verbosity::Warnings)?;

        let text = match &self.input {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
            None => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            }
        };
        let prompt: PromptFile = serde_json::from_str(&text).context("bad prompt JSON")?;

        let model_id = self
            .model
            .as_deref()
            .or(prompt.model.as_deref())
            .context("no model: pass --model or a \"model\" key")?;
        let config = lookup_model(model_id)
            .with_context(|| format!("model {model_id:?} is not in the registry"))?;

        let mut engine = load_engine(config.resolve_encoding()?)?;
        let count = count_prompt(&mut engine, config, &prompt.messages, &prompt.tools)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&count)?);
        } else {
            print_breakdown(model_id, &count);
        }
        if self.cost {
            println!(
                "input cost: ${:.6}",
                config.pricing.cost(count.total, 0)
            );
        }

        Ok(())
    }
}

fn print_breakdown(
    model_id: &str,
    count: &PromptCount,
) {
    println!("{model_id}: {} input tokens", count.total);
    for (idx, message) in count.messages.iter().enumerate() {
        println!("  message[{idx}]: {}", message.total);
        for part in &message.content {
            let mut extras = String::new();
            if let Some(input) = part.input {
                extras = format!(" (input {input})");
            }
            if let Some(output) = part.output {
                extras = format!(" (output {output})");
            }
            println!("    {:?}: {}{extras}", part.kind, part.total);
        }
    }
    if count.tools.total > 0 {
        println!("  tools: {}", count.tools.total);
        for (name, def) in &count.tools.definitions {
            println!(
                "    {name}: description {}, schema {}",
                def.description, def.input_schema
            );
        }
    }
}
