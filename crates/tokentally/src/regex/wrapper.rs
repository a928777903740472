//! # Compiled Regex Wrapper

use core::ops::Range;

/// Error wrapper for regex compilation.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub enum RegexError {
    /// Error from `regex`.
    Basic(Box<regex::Error>),

    /// Error from `fancy_regex`.
    Fancy(Box<fancy_regex::Error>),
}

impl From<regex::Error> for RegexError {
    fn from(err: regex::Error) -> Self {
        Self::Basic(err.into())
    }
}

impl From<fancy_regex::Error> for RegexError {
    fn from(err: fancy_regex::Error) -> Self {
        Self::Fancy(err.into())
    }
}

impl core::fmt::Display for RegexError {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        match self {
            Self::Basic(err) => core::fmt::Display::fmt(err, f),
            Self::Fancy(err) => core::fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for RegexError {}

/// A compiled regex from either engine.
#[derive(Debug, Clone)]
pub enum RegexWrapper {
    /// Wrapper for `regex::Regex`.
    Basic(regex::Regex),

    /// Wrapper for `fancy_regex::Regex`.
    Fancy(fancy_regex::Regex),
}

impl PartialEq for RegexWrapper {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        match (self, other) {
            (Self::Basic(a), Self::Basic(b)) => a.as_str() == b.as_str(),
            (Self::Fancy(a), Self::Fancy(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl From<regex::Regex> for RegexWrapper {
    fn from(regex: regex::Regex) -> Self {
        Self::Basic(regex)
    }
}

impl From<fancy_regex::Regex> for RegexWrapper {
    fn from(regex: fancy_regex::Regex) -> Self {
        Self::Fancy(regex)
    }
}

impl RegexWrapper {
    /// Is this backed by `regex::Regex`?
    pub fn is_basic(&self) -> bool {
        matches!(self, Self::Basic(_))
    }

    /// Is this backed by `fancy_regex::Regex`?
    pub fn is_fancy(&self) -> bool {
        matches!(self, Self::Fancy(_))
    }

    /// Get the underlying regex pattern.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Basic(regex) => regex.as_str(),
            Self::Fancy(regex) => regex.as_str(),
        }
    }

    /// Iterate over non-overlapping match ranges in `haystack`.
    ///
    /// Matches are yielded left-to-right with the engine's leftmost /
    /// alternation-order semantics; byte ranges index into `haystack`.
    pub fn find_ranges<'r, 'h>(
        &'r self,
        haystack: &'h str,
    ) -> RangesWrapper<'r, 'h> {
        match self {
            Self::Basic(regex) => RangesWrapper::Basic(regex.find_iter(haystack)),
            Self::Fancy(regex) => RangesWrapper::Fancy(regex.find_iter(haystack)),
        }
    }

    /// Find the first match range in `haystack`, if any.
    pub fn find_first(
        &self,
        haystack: &str,
    ) -> Option<Range<usize>> {
        self.find_ranges(haystack).next()
    }
}

/// Iterator over match ranges from either engine.
pub enum RangesWrapper<'r, 'h> {
    /// Matches from `regex::Regex`.
    Basic(regex::Matches<'r, 'h>),

    /// Matches from `fancy_regex::Regex`.
    Fancy(fancy_regex::Matches<'r, 'h>),
}

impl<'r, 'h> Iterator for RangesWrapper<'r, 'h> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Basic(matches) => matches.next().map(|m| m.range()),
            Self::Fancy(matches) => matches.next().map(|m| {
                // fancy_regex reports backtrack-limit blowups per match;
                // the shipped vocabulary patterns cannot hit the limit.
                let m = m.expect("fancy_regex backtrack limit exceeded");
                m.range()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::RegexPattern;

    #[test]
    fn test_partial_eq() {
        let b0 = RegexPattern::Basic("hello".to_string()).compile().unwrap();
        let b1 = RegexPattern::Basic("world".to_string()).compile().unwrap();
        let f0 = RegexPattern::Fancy("hello".to_string()).compile().unwrap();

        assert_eq!(&b0, &b0);
        assert_ne!(&b0, &b1);
        assert_ne!(&b0, &f0);
    }

    #[test]
    fn test_find_ranges() {
        let re = RegexPattern::Basic(r"\w+".to_string()).compile().unwrap();
        let ranges: Vec<_> = re.find_ranges("ab  cd e").collect();
        assert_eq!(ranges, vec![0..2, 4..6, 7..8]);

        let re = RegexPattern::Fancy(r"\w+(?!;)".to_string()).compile().unwrap();
        assert_eq!(re.find_first("x; yz"), Some(3..5));
    }
}
