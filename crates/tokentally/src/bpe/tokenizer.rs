//! # BPE Tokenizer

use std::sync::Arc;

use crate::bpe::merge::MergeBuffer;
use crate::bpe::piece_cache::{PieceCache, DEFAULT_PIECE_CACHE_CAPACITY};
use crate::encoding::{DecodedPiece, EncodingTable};
use crate::errors::{TallyError, TallyResult};
use crate::types::TokenType;

/// Selects which special tokens a [`BpeTokenizer::encode`] call accepts
/// or rejects.
#[derive(Debug, Clone, Copy)]
pub enum SpecialFilter<'a> {
    /// Every special token known to the encoding.
    All,

    /// An explicit set of special-token literals.
    Set(&'a [&'a str]),
}

impl SpecialFilter<'_> {
    /// The empty filter.
    pub const NONE: SpecialFilter<'static> = SpecialFilter::Set(&[]);

    fn contains(
        &self,
        literal: &str,
    ) -> bool {
        match self {
            Self::All => true,
            Self::Set(literals) => literals.contains(&literal),
        }
    }
}

/// A BPE encode/decode engine over a shared [`EncodingTable`].
///
/// The engine owns a mutable [`PieceCache`] and reusable merge scratch, so
/// encode paths take `&mut self`; it is deliberately not thread-safe.
/// Output depends only on the input text and the encoding, never on cache
/// state.
#[derive(Debug, Clone)]
pub struct BpeTokenizer<T: TokenType> {
    table: Arc<EncodingTable<T>>,
    cache: PieceCache<T>,
    merge: MergeBuffer<T>,
}

impl<T: TokenType> BpeTokenizer<T> {
    /// Create an engine with the default cache bound.
    pub fn new(table: Arc<EncodingTable<T>>) -> Self {
        Self {
            table,
            cache: PieceCache::new(DEFAULT_PIECE_CACHE_CAPACITY),
            merge: MergeBuffer::default(),
        }
    }

    /// Create an engine with extended special tokens and/or a cache bound.
    ///
    /// ## Arguments
    /// * `table` - The shared encoding table.
    /// * `extra_specials` - Additional special-token literals and ranks,
    ///   merged into a private copy of the table.
    /// * `cache_capacity` - Piece cache bound; `None` for the default.
    pub fn with_options<W, S>(
        table: Arc<EncodingTable<T>>,
        extra_specials: W,
        cache_capacity: Option<usize>,
    ) -> TallyResult<Self>
    where
        W: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
    {
        let mut extras = extra_specials.into_iter().peekable();
        let table = if extras.peek().is_some() {
            Arc::new(table.with_special_tokens(extras)?)
        } else {
            table
        };

        Ok(Self {
            table,
            cache: PieceCache::new(cache_capacity.unwrap_or(DEFAULT_PIECE_CACHE_CAPACITY)),
            merge: MergeBuffer::default(),
        })
    }

    /// Get the underlying encoding table.
    pub fn table(&self) -> &Arc<EncodingTable<T>> {
        &self.table
    }

    /// Get the piece cache.
    pub fn cache(&self) -> &PieceCache<T> {
        &self.cache
    }

    /// Encode text into token ranks, with special-token filtering.
    ///
    /// The text is scanned left-to-right; occurrences of allowed special
    /// tokens emit their rank and split the surrounding spans, which are
    /// ordinary-encoded. A special token that is neither allowed nor
    /// disallowed encodes as ordinary text.
    ///
    /// ## Arguments
    /// * `text` - The text to encode.
    /// * `allowed_special` - Specials to emit as single ranks.
    /// * `disallowed_special` - Specials whose presence is an error;
    ///   [`SpecialFilter::All`] means "all not allowed".
    ///
    /// ## Returns
    /// The token ranks, or [`TallyError::DisallowedSpecial`] naming the
    /// first disallowed occurrence.
    pub fn encode(
        &mut self,
        text: &str,
        allowed_special: SpecialFilter<'_>,
        disallowed_special: SpecialFilter<'_>,
    ) -> TallyResult<Vec<T>> {
        let table = self.table.clone();
        let mut tokens = Vec::with_capacity(text.len() / 3 + 1);

        let Some(special_re) = table.special_regex() else {
            self.encode_ordinary_append(&table, text, &mut tokens);
            return Ok(tokens);
        };

        let mut cursor = 0;
        for range in special_re.find_ranges(text) {
            let literal = &text[range.clone()];
            if allowed_special.contains(literal) {
                self.encode_ordinary_append(&table, &text[cursor..range.start], &mut tokens);
                // The union regex only matches known literals.
                tokens.extend(table.lookup_special(literal));
                cursor = range.end;
            } else if disallowed_special.contains(literal) {
                return Err(TallyError::DisallowedSpecial {
                    token: literal.to_string(),
                });
            }
        }
        self.encode_ordinary_append(&table, &text[cursor..], &mut tokens);

        Ok(tokens)
    }

    /// Encode text with no special-token awareness.
    pub fn encode_ordinary(
        &mut self,
        text: &str,
    ) -> Vec<T> {
        let table = self.table.clone();
        let mut tokens = Vec::with_capacity(text.len() / 3 + 1);
        self.encode_ordinary_append(&table, text, &mut tokens);
        tokens
    }

    /// Encode text with every special token enabled.
    pub fn encode_with_special_tokens(
        &mut self,
        text: &str,
    ) -> Vec<T> {
        match self.encode(text, SpecialFilter::All, SpecialFilter::NONE) {
            Ok(tokens) => tokens,
            // Unreachable: the disallowed set is empty.
            Err(_) => Vec::new(),
        }
    }

    /// Count the ordinary-encoded length of `text`.
    pub fn count(
        &mut self,
        text: &str,
    ) -> usize {
        self.encode_ordinary(text).len()
    }

    /// Decode token ranks back into text.
    ///
    /// Decode is best-effort: unknown ranks are skipped, and byte runs that
    /// do not form valid UTF-8 decode lossily. On the output of an encode
    /// of text, decode is an exact inverse.
    pub fn decode(
        &self,
        tokens: &[T],
    ) -> String {
        let mut out = String::with_capacity(tokens.len() * 4);
        let mut byte_buf: Vec<u8> = Vec::new();

        for &rank in tokens {
            match self.table.decode_rank(rank) {
                Some(DecodedPiece::Text(text)) => {
                    flush_bytes(&mut byte_buf, &mut out);
                    out.push_str(text);
                }
                Some(DecodedPiece::Bytes(bytes)) => {
                    byte_buf.extend_from_slice(bytes);
                }
                None => {
                    if let Some(literal) = self.table.decode_special(rank) {
                        flush_bytes(&mut byte_buf, &mut out);
                        out.push_str(literal);
                    }
                    // Unknown ranks are skipped.
                }
            }
        }
        flush_bytes(&mut byte_buf, &mut out);

        out
    }

    /// Ordinary-encode `text` and append to `tokens`.
    ///
    /// Splits into pieces with the table's pattern, then resolves each
    /// piece: whole-piece rank hit, cached merge result, or a fresh merge
    /// (which is then cached).
    fn encode_ordinary_append(
        &mut self,
        table: &EncodingTable<T>,
        text: &str,
        tokens: &mut Vec<T>,
    ) {
        for range in table.piece_regex().find_ranges(text) {
            let piece = &text[range];

            if let Some(rank) = table.lookup_string_rank(piece) {
                tokens.push(rank);
                continue;
            }

            if let Some(cached) = self.cache.get(piece) {
                tokens.extend_from_slice(cached);
                continue;
            }

            let start = tokens.len();
            self.merge.encode_append(table, piece.as_bytes(), tokens);
            self.cache.insert(piece.to_string(), tokens[start..].to_vec());
        }
    }
}

/// Flush accumulated byte-piece output into the string.
fn flush_bytes(
    byte_buf: &mut Vec<u8>,
    out: &mut String,
) {
    if !byte_buf.is_empty() {
        out.push_str(&String::from_utf8_lossy(byte_buf));
        byte_buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bpe::testing::byte_complete_tokenizer;

    #[test]
    fn test_encode_ordinary() {
        let mut engine = byte_complete_tokenizer();

        assert_eq!(engine.encode_ordinary(""), Vec::<u32>::new());
        assert_eq!(engine.encode_ordinary("hello"), vec![259]);
        assert_eq!(engine.encode_ordinary("hello world"), vec![259, 266]);
    }

    #[test]
    fn test_count_matches_encode() {
        let mut engine = byte_complete_tokenizer();
        for text in ["", "x", "hello world", "aaaa aaa", "caf\u{e9} \u{1f600}"] {
            let expected = engine.encode_ordinary(text).len();
            assert_eq!(engine.count(text), expected, "count mismatch for {text:?}");
        }
    }

    #[test]
    fn test_roundtrip() {
        let mut engine = byte_complete_tokenizer();
        for text in [
            "",
            "hello world",
            "  multiple   spaces  ",
            "caf\u{e9} na\u{ef}ve \u{4f60}\u{597d}",
            "emoji: \u{1f600}\u{1f680}",
            "line1\nline2\r\nline3",
            "null\0byte",
        ] {
            let tokens = engine.encode_ordinary(text);
            assert_eq!(engine.decode(&tokens), text, "roundtrip mismatch for {text:?}");
        }
    }

    #[test]
    fn test_cache_irrelevance() {
        let mut engine = byte_complete_tokenizer();
        let cold = engine.encode_ordinary("flip flap flip flap");
        assert!(!engine.cache().is_empty());
        let warm = engine.encode_ordinary("flip flap flip flap");
        assert_eq!(cold, warm);
    }

    #[test]
    fn test_allowed_special() {
        let mut engine = byte_complete_tokenizer();

        let tokens = engine
            .encode("hello<|eot|> world", SpecialFilter::All, SpecialFilter::NONE)
            .unwrap();
        assert_eq!(tokens, vec![259, 1000, 266]);

        let tokens = engine
            .encode(
                "hello<|eot|> world",
                SpecialFilter::Set(&["<|eot|>"]),
                SpecialFilter::All,
            )
            .unwrap();
        assert_eq!(tokens, vec![259, 1000, 266]);
    }

    #[test]
    fn test_disallowed_special() {
        let mut engine = byte_complete_tokenizer();

        let err = engine
            .encode("hello<|eot|>", SpecialFilter::NONE, SpecialFilter::All)
            .unwrap_err();
        match err {
            TallyError::DisallowedSpecial { token } => assert_eq!(token, "<|eot|>"),
            other => panic!("unexpected error: {other:?}"),
        }

        let err = engine
            .encode(
                "hello<|pad|>",
                SpecialFilter::Set(&["<|eot|>"]),
                SpecialFilter::Set(&["<|pad|>"]),
            )
            .unwrap_err();
        assert!(matches!(err, TallyError::DisallowedSpecial { .. }));
    }

    #[test]
    fn test_unlisted_special_encodes_ordinary() {
        let mut engine = byte_complete_tokenizer();

        // Neither allowed nor disallowed: the literal is plain text.
        let tokens = engine
            .encode("<|eot|>", SpecialFilter::NONE, SpecialFilter::NONE)
            .unwrap();
        assert!(!tokens.contains(&1000));
        assert_eq!(engine.decode(&tokens), "<|eot|>");
    }

    #[test]
    fn test_decode_special_and_unknown() {
        let engine = byte_complete_tokenizer();

        // Specials decode through the inverse map; unknown ranks skip.
        assert_eq!(engine.decode(&[259, 1000, 9999, 266]), "hello<|eot|> world");
    }

    #[test]
    fn test_decode_assembles_byte_runs() {
        let engine = byte_complete_tokenizer();

        // Four continuation-byte ranks flush into one scalar at the end.
        assert_eq!(engine.decode(&[240, 159, 152, 128]), "\u{1f600}");

        // A byte run flushes when a string rank follows.
        assert_eq!(engine.decode(&[240, 159, 152, 128, 259]), "\u{1f600}hello");
    }

    #[test]
    fn test_extended_specials_and_cache_bound() {
        let table = byte_complete_tokenizer().table().clone();
        let mut engine =
            BpeTokenizer::with_options(table, [("<|extra|>", 1002u32)], Some(2)).unwrap();

        let tokens = engine.encode_with_special_tokens("hello<|extra|>");
        assert_eq!(tokens, vec![259, 1002]);
        assert_eq!(engine.cache().capacity(), 2);
    }
}
