//! # BPE Test Utilities

use std::sync::Arc;

use crate::bpe::BpeTokenizer;
use crate::encoding::{EncodingTable, SpanRankMap};

/// Build a small table whose byte coverage is total: every byte value maps
/// to its own rank, plus a handful of merged tokens and two specials.
pub(crate) fn byte_complete_table() -> EncodingTable<u32> {
    let mut ranks: SpanRankMap<u32> = Default::default();
    for b in 0..=255u8 {
        ranks.insert(vec![b], b as u32);
    }
    // Merge chains are complete: every multi-byte token is reachable from
    // its parts, as in a real trained vocabulary.
    for (i, span) in [
        &b"he"[..],
        b"ll",
        b"llo",
        b"hello",
        b"aa",
        b"aaa",
        b"wo",
        b"wor",
        b"ld",
        b"world",
        b" world",
    ]
    .iter()
    .enumerate()
    {
        ranks.insert(span.to_vec(), 256 + i as u32);
    }

    EncodingTable::new(
        "test_bytes",
        r"\s?\S+|\s+",
        [("<|eot|>", 1000u32), ("<|pad|>", 1001u32)],
        ranks,
    )
    .unwrap()
}

/// A tokenizer over [`byte_complete_table`].
pub(crate) fn byte_complete_tokenizer() -> BpeTokenizer<u32> {
    BpeTokenizer::new(Arc::new(byte_complete_table()))
}
