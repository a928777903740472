//! # `OpenAI` Piece-Splitting Patterns

use crate::join_patterns;
use crate::regex::ConstRegexPattern;

/// The "`cl100k_base`" piece-splitting pattern.
pub const CL100K_BASE_PATTERN: ConstRegexPattern = ConstRegexPattern::Fancy(join_patterns!(
    r"'(?i:[sdmt]|ll|ve|re)",
    r"[^\r\n\p{L}\p{N}]?+\p{L}++",
    r"\p{N}{1,3}+",
    r" ?[^\s\p{L}\p{N}]++[\r\n]*+",
    r"\s++$",
    r"\s*[\r\n]",
    r"\s+(?!\S)",
    r"\s",
));

/// The "`o200k_base`" piece-splitting pattern.
pub const O200K_BASE_PATTERN: ConstRegexPattern = ConstRegexPattern::Fancy(join_patterns!(
    r"[^\r\n\p{L}\p{N}]?[\p{Lu}\p{Lt}\p{Lm}\p{Lo}\p{M}]*[\p{Ll}\p{Lm}\p{Lo}\p{M}]+(?i:'s|'t|'re|'ve|'m|'ll|'d)?",
    r"[^\r\n\p{L}\p{N}]?[\p{Lu}\p{Lt}\p{Lm}\p{Lo}\p{M}]+[\p{Ll}\p{Lm}\p{Lo}\p{M}]*(?i:'s|'t|'re|'ve|'m|'ll|'d)?",
    r"\p{N}{1,3}",
    r" ?[^\s\p{L}\p{N}]+[\r\n/]*",
    r"\s*[\r\n]+",
    r"\s+(?!\S)",
    r"\s+",
));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_compile() {
        assert!(CL100K_BASE_PATTERN.compile().is_ok());
        assert!(O200K_BASE_PATTERN.compile().is_ok());
    }

    #[test]
    fn test_patterns_need_fancy() {
        // Both carry lookahead; the adaptive path must land on fancy.
        assert!(CL100K_BASE_PATTERN.compile().unwrap().is_fancy());
        assert!(O200K_BASE_PATTERN.compile().unwrap().is_fancy());
    }
}
