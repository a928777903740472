//! # Regex Support
//!
//! The piece-splitting patterns shipped with public BPE vocabularies are
//! authored for a unicode-aware dialect with lookahead; this module mixes
//! `regex` and `fancy_regex` so each pattern lands on the cheapest engine
//! able to run it.

mod pattern;
mod union;
mod wrapper;

pub use pattern::{ConstRegexPattern, RegexPattern};
pub use union::exact_match_union_pattern;
pub use wrapper::{RangesWrapper, RegexError, RegexWrapper};
