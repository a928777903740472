//! # Exact Match Union Patterns

use crate::regex::RegexPattern;

/// Create a union pattern of exact (escaped) matches.
///
/// This will always be a [`RegexPattern::Basic`] variant; alternation order
/// follows `alts` order, so earlier literals win ties at the same offset.
pub fn exact_match_union_pattern<S: AsRef<str>>(alts: &[S]) -> RegexPattern {
    let parts = alts
        .iter()
        .map(|s| fancy_regex::escape(s.as_ref()))
        .collect::<Vec<_>>();
    RegexPattern::Basic(format!("({})", parts.join("|")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_alternative_list() {
        let alternatives = ["<|endoftext|>", "[x]", "boat"];

        let pattern = exact_match_union_pattern(&alternatives);
        assert_eq!(pattern.as_str(), r"(<\|endoftext\|>|\[x\]|boat)");

        let re = pattern.compile().unwrap();
        let text = "abc<|endoftext|> [x] boat";
        assert_eq!(
            re.find_ranges(text).collect::<Vec<_>>(),
            vec![3..16, 17..20, 21..25]
        );
    }
}
