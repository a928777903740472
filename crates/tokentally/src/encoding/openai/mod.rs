//! # Public `OpenAI` Encodings
//!
//! Pattern and special-token definitions for the `o200k_base` and
//! `cl100k_base` vocabularies, plus loaders that bind them to rank data
//! from tiktoken-format files.

mod loaders;
pub mod patterns;
pub mod specials;

pub use loaders::{
    load_cl100k_base_table,
    load_o200k_base_table,
    Encoding,
    TOKENTALLY_DATA_DIR,
};
