//! # Encoding Table

use core::ops::Range;

use crate::errors::{TallyError, TallyResult};
use crate::regex::{exact_match_union_pattern, RegexPattern, RegexWrapper};
use crate::types::{TallyHashMap, TokenType};

/// Rank data as loaded from a vocabulary file: `{ Vec<u8> -> T }`.
pub type SpanRankMap<T> = TallyHashMap<Vec<u8>, T>;

/// The decoded form of one rank.
///
/// Vocabulary entries whose bytes survive a UTF-8 round-trip bit-exactly
/// are stored decoded, so [`crate::bpe::BpeTokenizer::decode`] can append
/// them to the output without a byte detour; the minority of entries that
/// are not valid UTF-8 stay as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedPiece {
    /// A UTF-8-valid token string.
    Text(String),

    /// An opaque byte sequence.
    Bytes(Vec<u8>),
}

/// An immutable BPE encoding table.
///
/// Holds the piece-splitting pattern, the special-token map, and both rank
/// views of the vocabulary:
///
/// * `string_ranks` — `{ String -> T }` for UTF-8-valid token bytes.
/// * `binary_ranks` — `(Vec<u8>, T)` pairs, strictly sorted by bytes, for
///   the remainder, bucketed by first byte for binary search.
///
/// Every rank appears in exactly one of the two; the decoder map covers
/// their union. Construction validates these invariants.
#[derive(Debug, Clone)]
pub struct EncodingTable<T: TokenType> {
    name: String,
    pattern: RegexPattern,
    piece_re: RegexWrapper,
    special_tokens: TallyHashMap<String, T>,
    special_re: Option<RegexWrapper>,
    special_decoder: TallyHashMap<T, String>,
    string_ranks: TallyHashMap<String, T>,
    binary_ranks: Vec<(Vec<u8>, T)>,
    decoder: TallyHashMap<T, DecodedPiece>,
    // Bucket boundaries into `binary_ranks`: bucket for first byte `b`
    // is `first_byte_starts[b]..first_byte_starts[b + 1]`.
    first_byte_starts: Vec<u32>,
}

impl<T: TokenType> EncodingTable<T> {
    /// Build an [`EncodingTable`] from raw rank data.
    ///
    /// Splits `ranks` into string and binary views by round-tripping each
    /// entry through UTF-8, builds the decoder and the first-byte index,
    /// and compiles the piece and special patterns.
    ///
    /// ## Arguments
    /// * `name` - The encoding identifier.
    /// * `pattern` - The piece-splitting pattern.
    /// * `special_tokens` - Literal string to rank, disjoint from `ranks`.
    /// * `ranks` - The `{ bytes -> rank }` vocabulary.
    ///
    /// ## Returns
    /// A `Result<EncodingTable>`, with errors on inconsistent data.
    pub fn new<W, S>(
        name: impl Into<String>,
        pattern: impl Into<RegexPattern>,
        special_tokens: W,
        ranks: SpanRankMap<T>,
    ) -> TallyResult<Self>
    where
        W: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
    {
        let name = name.into();
        let pattern = pattern.into();

        let piece_re = pattern
            .compile()
            .map_err(|e| TallyError::EncodingConflict(format!("bad piece pattern: {e}")))?;

        let mut string_ranks: TallyHashMap<String, T> = Default::default();
        let mut binary_ranks: Vec<(Vec<u8>, T)> = Vec::new();
        let mut decoder: TallyHashMap<T, DecodedPiece> =
            TallyHashMap::with_capacity(ranks.len());

        for (bytes, rank) in ranks {
            let piece = match String::from_utf8(bytes) {
                Ok(text) => {
                    string_ranks.insert(text.clone(), rank);
                    DecodedPiece::Text(text)
                }
                Err(err) => {
                    let bytes = err.into_bytes();
                    binary_ranks.push((bytes.clone(), rank));
                    DecodedPiece::Bytes(bytes)
                }
            };
            if decoder.insert(rank, piece).is_some() {
                return Err(TallyError::EncodingConflict(format!(
                    "rank {rank} appears more than once in \"{name}\""
                )));
            }
        }

        binary_ranks.sort_by(|(a, _), (b, _)| a.cmp(b));
        let first_byte_starts = build_first_byte_starts(&binary_ranks);

        let mut table = Self {
            name,
            pattern,
            piece_re,
            special_tokens: Default::default(),
            special_re: None,
            special_decoder: Default::default(),
            string_ranks,
            binary_ranks,
            decoder,
            first_byte_starts,
        };
        table.extend_specials(special_tokens)?;
        Ok(table)
    }

    /// Return a copy of this table with additional special tokens.
    ///
    /// ## Arguments
    /// * `special_tokens` - Extra literal string to rank entries.
    pub fn with_special_tokens<W, S>(
        &self,
        special_tokens: W,
    ) -> TallyResult<Self>
    where
        W: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
    {
        let mut table = self.clone();
        table.extend_specials(special_tokens)?;
        Ok(table)
    }

    /// Add special tokens, rebuilding the union regex and inverse map.
    fn extend_specials<W, S>(
        &mut self,
        special_tokens: W,
    ) -> TallyResult<()>
    where
        W: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
    {
        for (literal, rank) in special_tokens {
            let literal = literal.as_ref();
            if self.decoder.contains_key(&rank) {
                return Err(TallyError::EncodingConflict(format!(
                    "special token {literal:?} -> ({rank}) found in vocab of \"{}\"",
                    self.name
                )));
            }
            self.special_tokens.insert(literal.to_string(), rank);
            self.special_decoder.insert(rank, literal.to_string());
        }

        self.special_re = if self.special_tokens.is_empty() {
            None
        } else {
            let mut literals: Vec<&str> =
                self.special_tokens.keys().map(String::as_str).collect();
            // Longest-first so overlapping literals match maximally.
            literals.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
            let re = exact_match_union_pattern(&literals)
                .compile()
                .map_err(|e| TallyError::EncodingConflict(format!("bad special union: {e}")))?;
            Some(re)
        };
        Ok(())
    }

    /// Get the encoding name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the piece-splitting pattern source.
    pub fn pattern(&self) -> &RegexPattern {
        &self.pattern
    }

    /// Get the compiled piece-splitting regex.
    pub fn piece_regex(&self) -> &RegexWrapper {
        &self.piece_re
    }

    /// Get the compiled union regex over special-token literals, if any.
    pub fn special_regex(&self) -> Option<&RegexWrapper> {
        self.special_re.as_ref()
    }

    /// Get the special-token map.
    pub fn special_tokens(&self) -> &TallyHashMap<String, T> {
        &self.special_tokens
    }

    /// Look up the rank of a special-token literal.
    pub fn lookup_special(
        &self,
        literal: &str,
    ) -> Option<T> {
        self.special_tokens.get(literal).copied()
    }

    /// Number of ranks in the vocabulary (specials excluded).
    pub fn vocab_len(&self) -> usize {
        self.decoder.len()
    }

    /// Look up a rank by token bytes.
    ///
    /// Tries UTF-8 decode into `string_ranks` first; falls back to a binary
    /// search of the first-byte bucket of `binary_ranks`. This is the merge
    /// loop's hot lookup.
    pub fn lookup_rank(
        &self,
        span: &[u8],
    ) -> Option<T> {
        match core::str::from_utf8(span) {
            Ok(text) => self.string_ranks.get(text).copied(),
            Err(_) => self.lookup_binary_rank(span),
        }
    }

    /// Look up a rank for a UTF-8-valid token string.
    pub fn lookup_string_rank(
        &self,
        piece: &str,
    ) -> Option<T> {
        self.string_ranks.get(piece).copied()
    }

    /// Look up a rank in the sorted binary table.
    pub fn lookup_binary_rank(
        &self,
        span: &[u8],
    ) -> Option<T> {
        let bucket = self.first_byte_bucket(*span.first()?);
        let entries = &self.binary_ranks[bucket];
        entries
            .binary_search_by(|(bytes, _)| bytes.as_slice().cmp(span))
            .ok()
            .map(|idx| entries[idx].1)
    }

    /// Resolve a rank to its decoded piece.
    pub fn decode_rank(
        &self,
        rank: T,
    ) -> Option<&DecodedPiece> {
        self.decoder.get(&rank)
    }

    /// Resolve a special-token rank to its literal.
    pub fn decode_special(
        &self,
        rank: T,
    ) -> Option<&str> {
        self.special_decoder.get(&rank).map(String::as_str)
    }

    fn first_byte_bucket(
        &self,
        byte: u8,
    ) -> Range<usize> {
        let lo = self.first_byte_starts[byte as usize] as usize;
        let hi = self.first_byte_starts[byte as usize + 1] as usize;
        lo..hi
    }
}

/// Build the 257-entry boundary array over sorted binary ranks.
fn build_first_byte_starts<T: TokenType>(binary_ranks: &[(Vec<u8>, T)]) -> Vec<u32> {
    let mut starts = vec![0u32; 257];
    let mut idx = 0usize;
    for byte in 0..=255u8 {
        starts[byte as usize] = idx as u32;
        while idx < binary_ranks.len() && binary_ranks[idx].0[0] == byte {
            idx += 1;
        }
    }
    starts[256] = binary_ranks.len() as u32;
    starts
}
