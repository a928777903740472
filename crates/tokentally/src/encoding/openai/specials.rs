//! # `OpenAI` Special Tokens

use crate::types::TokenType;

/// The "`cl100k_base`" special tokens.
pub const CL100K_BASE_SPECIAL_TOKENS: &[(&str, usize)] = &[
    ("<|endoftext|>", 100257),
    ("<|fim_prefix|>", 100258),
    ("<|fim_middle|>", 100259),
    ("<|fim_suffix|>", 100260),
    ("<|endofprompt|>", 100276),
];

/// The "`o200k_base`" special tokens.
pub const O200K_BASE_SPECIAL_TOKENS: &[(&str, usize)] =
    &[("<|endoftext|>", 199999), ("<|endofprompt|>", 200018)];

/// Convert a const special-token list to the target token type.
pub fn to_token_list<T: TokenType>(specials: &[(&str, usize)]) -> Vec<(String, T)> {
    specials
        .iter()
        .map(|&(literal, rank)| {
            let rank = T::from_usize(rank)
                .unwrap_or_else(|| panic!("special rank {rank} out of range for token type"));
            (literal.to_string(), rank)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_token_list() {
        assert_eq!(
            to_token_list::<u32>(O200K_BASE_SPECIAL_TOKENS),
            vec![
                ("<|endoftext|>".to_string(), 199999),
                ("<|endofprompt|>".to_string(), 200018),
            ]
        );
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_rank_overflow_panics() {
        let _ = to_token_list::<u16>(CL100K_BASE_SPECIAL_TOKENS);
    }
}
