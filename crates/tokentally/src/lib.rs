//! # `tokentally` — BPE tokenization and prompt accounting
//!
//! `tokentally` reproduces server-side BPE tokenization for the public
//! `o200k_base` and `cl100k_base` vocabularies, and layers a per-model
//! accounting scheme on top that approximates the hidden message/tool
//! framing overhead vendors add around chat prompts.
//!
//! See:
//! * [`encoding`] to load and inspect encoding tables.
//! * [`bpe`] to encode text into tokens and decode tokens into text.
//! * [`models`] for per-model overhead coefficients and pricing.
//! * [`prompt`] to count whole chat prompts (messages + tools).
//!
//! ## Counting a prompt
//!
//! ```rust,ignore
//! use tokentally::bpe::BpeTokenizer;
//! use tokentally::encoding::openai::load_o200k_base_table;
//! use tokentally::models::lookup_model;
//! use tokentally::prompt::{count_prompt, Message};
//!
//! let table = load_o200k_base_table(data_path)?;
//! let mut engine: BpeTokenizer<u32> = BpeTokenizer::new(table.into());
//!
//! let config = lookup_model("openai/gpt-5").unwrap();
//! let messages = [Message::user("Hello!")];
//!
//! let count = count_prompt(&mut engine, config, &messages, &[])?;
//! println!("{} input tokens", count.total);
//! ```
//!
//! A [`bpe::BpeTokenizer`] owns a mutable piece cache and is therefore not
//! shareable across threads; construct one engine per worker. Encoding
//! tables are immutable and safely shared through `Arc`.

#![warn(missing_docs, unused)]

pub mod bpe;
pub mod encoding;
pub mod errors;
pub mod models;
pub mod prompt;
pub mod regex;
pub mod types;

pub use crate::bpe::BpeTokenizer;
pub use crate::encoding::EncodingTable;
pub use crate::errors::{TallyError, TallyResult};
pub use crate::models::ModelConfig;
pub use crate::prompt::{count_prompt, PromptCount};
pub use crate::types::TokenType;
