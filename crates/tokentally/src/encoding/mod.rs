//! # Encoding Tables
//!
//! An encoding table binds a piece-splitting pattern, a special-token map,
//! and the rank tables of one BPE vocabulary. Tables are immutable after
//! construction and safely shared between engines through `Arc`.
//!
//! Rank data loads from tiktoken-format files via [`io`]; the shipped
//! public encodings live in [`openai`].

pub mod io;
pub mod openai;
mod table;

pub use table::{DecodedPiece, EncodingTable, SpanRankMap};
