//! # Ingredient Tokenizer
//!
//! Splits a cleaned ingredient list into ordered, trimmed ingredient names and
//! composes the full text pipeline:
//!
//! ```text
//! raw text ─▶ TextSanitizer ─▶ literal corrections ─▶ protect prefixes
//!          ─▶ split on ',' ─▶ trim / drop empty ─▶ restore prefixes
//! ```
//!
//! The stage order is fixed. Every literal table assumes it runs after the
//! previous stage, so reordering changes output.

use crate::disambiguation::DelimiterDisambiguator;
use crate::sanitizer::TextSanitizer;
use tracing::trace;

/// Ingredient list delimiter
pub const DELIMITER: char = ',';

/// Trimmed, non-empty segments of a delimited string.
///
/// Cloning the iterator restarts it from the same position.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    segments: std::str::Split<'a, char>,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        for segment in self.segments.by_ref() {
            let trimmed = segment.trim();
            if !trimmed.is_empty() {
                return Some(trimmed);
            }
        }
        None
    }
}

/// Split `text` on the list delimiter, trimming each segment and skipping empty ones
pub fn split_tokens(text: &str) -> Tokens<'_> {
    Tokens {
        segments: text.split(DELIMITER),
    }
}

/// Output of parsing one product's ingredient field
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedIngredients {
    /// Sanitized and corrected text; `None` when the field was missing
    pub cleaned: Option<String>,
    /// Ingredient names in declared order
    pub tokens: Vec<String>,
}

/// Turns raw ingredient text into ordered ingredient names
#[derive(Debug, Clone, Default)]
pub struct IngredientParser {
    sanitizer: TextSanitizer,
    disambiguator: DelimiterDisambiguator,
}

impl IngredientParser {
    pub fn new(sanitizer: TextSanitizer, disambiguator: DelimiterDisambiguator) -> Self {
        Self {
            sanitizer,
            disambiguator,
        }
    }

    /// Sanitize and apply literal corrections, keeping a missing field missing
    pub fn clean(&self, raw: Option<&str>) -> Option<String> {
        self.sanitizer
            .sanitize(raw)
            .map(|text| self.disambiguator.correct(&text))
    }

    /// Split already-cleaned text into ingredient names
    pub fn tokenize(&self, cleaned: &str) -> Vec<String> {
        let protected = self.disambiguator.protect(cleaned);
        let tokens: Vec<String> = split_tokens(&protected)
            .map(|token| self.disambiguator.restore(token))
            .collect();
        trace!(token_count = tokens.len(), "Tokenized ingredient list");
        tokens
    }

    /// Clean then tokenize a raw ingredient field
    pub fn parse(&self, raw: Option<&str>) -> ParsedIngredients {
        let cleaned = self.clean(raw);
        let tokens = cleaned
            .as_deref()
            .map(|text| self.tokenize(text))
            .unwrap_or_default();
        ParsedIngredients { cleaned, tokens }
    }

    /// Whether cleaned text contains a real list delimiter once positional
    /// prefixes are protected
    pub fn has_delimiter(&self, cleaned: &str) -> bool {
        self.disambiguator.protect(cleaned).contains(DELIMITER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser_with(phrases: &[&str]) -> IngredientParser {
        let phrases: Vec<String> = phrases.iter().map(|p| p.to_string()).collect();
        IngredientParser::new(
            TextSanitizer::new(&phrases).unwrap(),
            DelimiterDisambiguator::default(),
        )
    }

    #[test]
    fn test_split_tokens_trims_and_drops_empty() {
        let tokens: Vec<&str> = split_tokens(" Water ,, Glycerin ,  ,Mica").collect();
        assert_eq!(tokens, vec!["Water", "Glycerin", "Mica"]);
    }

    #[test]
    fn test_split_tokens_is_restartable() {
        let tokens = split_tokens("a, b, c");
        let first: Vec<&str> = tokens.clone().collect();
        let second: Vec<&str> = tokens.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_token_count_matches_delimiters() {
        for text in ["a,b,c", "a, ,c", ",a,", "", "   ", "a"] {
            let segments = text.split(DELIMITER).count();
            let empty = text.split(DELIMITER).filter(|s| s.trim().is_empty()).count();
            let delimiters = text.matches(DELIMITER).count();
            assert_eq!(segments, delimiters + 1);
            assert_eq!(split_tokens(text).count(), delimiters + 1 - empty);
        }
    }

    #[test]
    fn test_parse_reference_example() {
        let parser = parser_with(&["organic"]);
        let parsed = parser.parse(Some("Water, 1,2-Hexanediol, Niacinamide*"));
        assert_eq!(parsed.tokens, vec!["Water", "1,2-Hexanediol", "Niacinamide"]);
        assert_eq!(
            parsed.cleaned.as_deref(),
            Some("Water, 1,2-Hexanediol, Niacinamide")
        );
    }

    #[test]
    fn test_parse_missing_field() {
        let parser = parser_with(&[]);
        let parsed = parser.parse(None);
        assert_eq!(parsed.cleaned, None);
        assert!(parsed.tokens.is_empty());
    }

    #[test]
    fn test_parse_noise_only_field_yields_no_tokens() {
        let parser = parser_with(&["no ingredients listed"]);
        let parsed = parser.parse(Some("No ingredients listed."));
        assert_eq!(parsed.cleaned.as_deref(), Some(""));
        assert!(parsed.tokens.is_empty());
    }

    #[test]
    fn test_dash_separated_list() {
        let parser = parser_with(&[]);
        let parsed = parser.parse(Some("Water - Glycerin - 2,3-Butanediol"));
        assert_eq!(parsed.tokens, vec!["Water", "Glycerin", "2,3-Butanediol"]);
    }

    #[test]
    fn test_has_delimiter_ignores_prefix_commas() {
        let parser = parser_with(&[]);
        assert!(!parser.has_delimiter("1,2-Hexanediol"));
        assert!(parser.has_delimiter("Water, Glycerin"));
    }
}
