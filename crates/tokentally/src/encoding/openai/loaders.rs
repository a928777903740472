//! # `OpenAI` Encoding Loaders
//!
//! Rank data is not bundled; it is read from tiktoken-format files named
//! `<encoding>.tiktoken` under an explicit path or the directory named by
//! [`TOKENTALLY_DATA_DIR`]. The files are the public ones served by the
//! vendor CDN (the same data every tiktoken port downloads).

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::encoding::io::load_rank_map_from_path;
use crate::encoding::openai::patterns::{CL100K_BASE_PATTERN, O200K_BASE_PATTERN};
use crate::encoding::openai::specials::{
    to_token_list,
    CL100K_BASE_SPECIAL_TOKENS,
    O200K_BASE_SPECIAL_TOKENS,
};
use crate::encoding::EncodingTable;
use crate::regex::ConstRegexPattern;
use crate::types::TokenType;

/// Environment variable naming the rank-file directory.
pub const TOKENTALLY_DATA_DIR: &str = "TOKENTALLY_DATA_DIR";

/// Identifiers of the shipped encodings.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum_macros::EnumString,
    strum_macros::EnumIter,
    strum_macros::Display,
)]
#[non_exhaustive]
pub enum Encoding {
    /// The "`o200k_base`" encoding (GPT-4o / GPT-5 family).
    #[strum(serialize = "o200k_base")]
    #[serde(rename = "o200k_base")]
    O200kBase,

    /// The "`cl100k_base`" encoding (GPT-3.5 / GPT-4 family).
    #[strum(serialize = "cl100k_base")]
    #[serde(rename = "cl100k_base")]
    Cl100kBase,
}

impl Encoding {
    /// The piece-splitting pattern for this encoding.
    pub fn pattern(&self) -> ConstRegexPattern {
        match self {
            Self::O200kBase => O200K_BASE_PATTERN,
            Self::Cl100kBase => CL100K_BASE_PATTERN,
        }
    }

    /// The special-token list for this encoding.
    pub fn special_tokens(&self) -> &'static [(&'static str, usize)] {
        match self {
            Self::O200kBase => O200K_BASE_SPECIAL_TOKENS,
            Self::Cl100kBase => CL100K_BASE_SPECIAL_TOKENS,
        }
    }

    /// The conventional rank-file name for this encoding.
    pub fn rank_file_name(&self) -> String {
        format!("{self}.tiktoken")
    }

    /// Load this encoding's table from an explicit rank-file path.
    pub fn load_table<T: TokenType>(
        &self,
        path: impl AsRef<Path>,
    ) -> anyhow::Result<EncodingTable<T>> {
        let ranks = load_rank_map_from_path(path)?;
        let table = EncodingTable::new(
            self.to_string(),
            self.pattern(),
            to_token_list::<T>(self.special_tokens()),
            ranks,
        )?;
        Ok(table)
    }

    /// Load this encoding's table from the `TOKENTALLY_DATA_DIR` directory.
    pub fn load_table_from_env<T: TokenType>(&self) -> anyhow::Result<EncodingTable<T>> {
        self.load_table(self.env_rank_path()?)
    }

    /// Resolve the rank-file path under `TOKENTALLY_DATA_DIR`.
    pub fn env_rank_path(&self) -> anyhow::Result<PathBuf> {
        let dir = std::env::var(TOKENTALLY_DATA_DIR)
            .with_context(|| format!("{TOKENTALLY_DATA_DIR} is not set"))?;
        Ok(PathBuf::from(dir).join(self.rank_file_name()))
    }
}

/// Load the "`o200k_base`" table from a rank-file path.
pub fn load_o200k_base_table<T: TokenType>(
    path: impl AsRef<Path>,
) -> anyhow::Result<EncodingTable<T>> {
    Encoding::O200kBase.load_table(path)
}

/// Load the "`cl100k_base`" table from a rank-file path.
pub fn load_cl100k_base_table<T: TokenType>(
    path: impl AsRef<Path>,
) -> anyhow::Result<EncodingTable<T>> {
    Encoding::Cl100kBase.load_table(path)
}
