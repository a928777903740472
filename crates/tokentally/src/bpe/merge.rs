//! # Byte-Pair Merge Loop
//!
//! The inner loop of ordinary encoding: given one piece, repeatedly merge
//! the lowest-ranked adjacent sub-token pair until no merge remains.

use crate::encoding::EncodingTable;
use crate::types::TokenType;

/// Reusable working memory for the merge loop.
///
/// Maintains two parallel sequences over a piece of byte length `L`:
/// `starts` holds the K+1 byte offsets of the K current sub-tokens (with a
/// trailing sentinel at `L`), and `pair_ranks` holds K entries where entry
/// `i` is the rank the merge of sub-tokens `i` and `i+1` would produce
/// (`T::max_value()` when that pair is not in the vocabulary; the final
/// entry is always the sentinel).
#[derive(Debug, Clone, Default)]
pub(crate) struct MergeBuffer<T: TokenType> {
    starts: Vec<u32>,
    pair_ranks: Vec<T>,
}

impl<T: TokenType> MergeBuffer<T> {
    /// BPE-merge `piece` and append the resulting ranks to `tokens`.
    pub fn encode_append(
        &mut self,
        table: &EncodingTable<T>,
        piece: &[u8],
        tokens: &mut Vec<T>,
    ) {
        let len = piece.len();
        if len == 0 {
            return;
        }
        if len == 1 {
            tokens.extend(table.lookup_rank(piece));
            return;
        }

        let no_rank = T::max_value();

        self.starts.clear();
        self.starts.extend((0..=len).map(|i| i as u32));

        self.pair_ranks.clear();
        self.pair_ranks.extend(
            (0..len - 1).map(|i| table.lookup_rank(&piece[i..i + 2]).unwrap_or(no_rank)),
        );
        self.pair_ranks.push(no_rank);

        loop {
            // Leftmost minimum: the strict `<` keeps the first occurrence,
            // which is required to match the reference tokenizer.
            let mut best = no_rank;
            let mut pos = 0;
            for (i, &rank) in self.pair_ranks[..self.pair_ranks.len() - 1].iter().enumerate() {
                if rank < best {
                    best = rank;
                    pos = i;
                }
            }
            if best == no_rank {
                break;
            }

            // Sub-tokens `pos` and `pos + 1` merge into one.
            self.starts.remove(pos + 1);
            self.pair_ranks.remove(pos);

            self.pair_ranks[pos] = self.pair_rank(table, piece, pos).unwrap_or(no_rank);
            if pos > 0 {
                self.pair_ranks[pos - 1] =
                    self.pair_rank(table, piece, pos - 1).unwrap_or(no_rank);
            }
        }

        for window in self.starts.windows(2) {
            let span = &piece[window[0] as usize..window[1] as usize];
            tokens.extend(table.lookup_rank(span));
        }
    }

    /// Rank produced by merging sub-tokens `i` and `i + 1`, if that pair
    /// exists (both as adjacent sub-tokens, and in the vocabulary).
    fn pair_rank(
        &self,
        table: &EncodingTable<T>,
        piece: &[u8],
        i: usize,
    ) -> Option<T> {
        let end = *self.starts.get(i + 2)? as usize;
        let start = self.starts[i] as usize;
        table.lookup_rank(&piece[start..end])
    }
}
