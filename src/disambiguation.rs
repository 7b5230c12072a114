//! # Delimiter Disambiguation
//!
//! Ingredient lists are comma-delimited, but positional chemical prefixes such as
//! `1,2-Hexanediol` or `2,3-Butanediol` carry their own comma. Before splitting, each
//! known prefix is swapped for a comma-free placeholder; after splitting, every
//! token is restored.
//!
//! The same stage applies exact literal corrections for formatting slips seen in
//! scraped markup (a dropped comma left as a double space, dash-separated lists,
//! "1, 2" written with a space). Corrections run before placeholder substitution.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::{debug, trace};

/// Positional prefixes protected by default
pub const DEFAULT_POSITIONAL_PREFIXES: [&str; 2] = ["1,2", "2,3"];

/// Default literal corrections, applied in order
pub const DEFAULT_LITERAL_CORRECTIONS: [(&str, &str); 5] = [
    (
        "Citrus Aurantium Dulcis (Orange) Flower Oil  Farnesol",
        "Citrus Aurantium Dulcis (Orange) Flower Oil, Farnesol",
    ),
    ("Water, Eau", "Water/Eau"),
    ("1, 2", "1,2"),
    (",000ppm", "000ppm"),
    (" - ", ", "),
];

// Private-use code points never occur in scraped text
const PLACEHOLDER_OPEN: char = '\u{E000}';
const PLACEHOLDER_CLOSE: char = '\u{E001}';

lazy_static! {
    static ref PLACEHOLDER_PATTERN: Regex =
        Regex::new("\u{E000}(\\d+)\u{E001}").expect("Invalid placeholder regex pattern");
}

/// A single exact-text correction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralCorrection {
    pub from: String,
    pub to: String,
}

impl LiteralCorrection {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct ProtectedPrefix {
    prefix: String,
    placeholder: String,
}

/// Rewrites ambiguous commas so the list delimiter can be split on safely
#[derive(Debug, Clone)]
pub struct DelimiterDisambiguator {
    corrections: Vec<LiteralCorrection>,
    prefixes: Vec<ProtectedPrefix>,
}

impl Default for DelimiterDisambiguator {
    fn default() -> Self {
        Self::new(
            DEFAULT_LITERAL_CORRECTIONS
                .iter()
                .map(|(from, to)| LiteralCorrection::new(from, to))
                .collect(),
            DEFAULT_POSITIONAL_PREFIXES,
        )
    }
}

impl DelimiterDisambiguator {
    /// Create a disambiguator from a correction table and a list of positional prefixes.
    ///
    /// Prefixes are substituted in the order given; duplicates are dropped.
    pub fn new<I, S>(corrections: Vec<LiteralCorrection>, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut protected: Vec<ProtectedPrefix> = Vec::new();
        for prefix in prefixes {
            let prefix = prefix.as_ref();
            if prefix.is_empty() || protected.iter().any(|p| p.prefix == prefix) {
                continue;
            }
            let placeholder = format!("{}{}{}", PLACEHOLDER_OPEN, protected.len(), PLACEHOLDER_CLOSE);
            protected.push(ProtectedPrefix {
                prefix: prefix.to_string(),
                placeholder,
            });
        }
        debug!(
            correction_count = corrections.len(),
            prefix_count = protected.len(),
            "Created DelimiterDisambiguator"
        );
        Self {
            corrections,
            prefixes: protected,
        }
    }

    /// Default tables extended with additional positional prefixes
    pub fn with_extra_prefixes<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut prefixes: Vec<String> = DEFAULT_POSITIONAL_PREFIXES
            .iter()
            .map(|p| p.to_string())
            .collect();
        prefixes.extend(extra.into_iter().map(|p| p.as_ref().trim().to_string()));
        Self::new(
            DEFAULT_LITERAL_CORRECTIONS
                .iter()
                .map(|(from, to)| LiteralCorrection::new(from, to))
                .collect(),
            &prefixes,
        )
    }

    /// Protected prefixes, in substitution order
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.prefixes.iter().map(|p| p.prefix.as_str())
    }

    /// Apply the literal correction table
    pub fn correct(&self, text: &str) -> String {
        let mut corrected = text.to_string();
        for correction in &self.corrections {
            if corrected.contains(&correction.from) {
                trace!(from = %correction.from, to = %correction.to, "Applying literal correction");
                corrected = corrected.replace(&correction.from, &correction.to);
            }
        }
        corrected
    }

    /// Replace every protected prefix with its placeholder
    pub fn protect(&self, text: &str) -> String {
        let mut protected = text.to_string();
        for prefix in &self.prefixes {
            if protected.contains(&prefix.prefix) {
                protected = protected.replace(&prefix.prefix, &prefix.placeholder);
            }
        }
        protected
    }

    /// Reverse [`protect`](Self::protect) on a single token
    pub fn restore(&self, token: &str) -> String {
        if !token.contains(PLACEHOLDER_OPEN) {
            return token.to_string();
        }
        PLACEHOLDER_PATTERN
            .replace_all(token, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| self.prefixes.get(index))
                    .map(|p| p.prefix.clone())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_text_has_no_prefix_commas() {
        let d = DelimiterDisambiguator::default();
        let protected = d.protect("Water, 1,2-Hexanediol, 2,3-Butanediol");
        assert_eq!(protected.matches(',').count(), 2);
    }

    #[test]
    fn test_protect_then_restore_round_trips() {
        let d = DelimiterDisambiguator::default();
        for name in ["1,2-Hexanediol", "2,3-Butanediol", "Pentylene Glycol 1,2,3"] {
            assert_eq!(d.restore(&d.protect(name)), name);
        }
    }

    #[test]
    fn test_placeholders_are_distinct() {
        let d = DelimiterDisambiguator::with_extra_prefixes(["1,3", "1,2"]);
        let prefixes: Vec<&str> = d.prefixes().collect();
        assert_eq!(prefixes, vec!["1,2", "2,3", "1,3"]);
        let protected = d.protect("1,2-A 2,3-B 1,3-C");
        assert_eq!(d.restore(&protected), "1,2-A 2,3-B 1,3-C");
    }

    #[test]
    fn test_literal_corrections() {
        let d = DelimiterDisambiguator::default();
        assert_eq!(
            d.correct("Citrus Aurantium Dulcis (Orange) Flower Oil  Farnesol"),
            "Citrus Aurantium Dulcis (Orange) Flower Oil, Farnesol"
        );
        assert_eq!(d.correct("Water, Eau, Glycerin"), "Water/Eau, Glycerin");
        assert_eq!(d.correct("1, 2-Hexanediol"), "1,2-Hexanediol");
        assert_eq!(d.correct("Extract (10,000ppm)"), "Extract (10000ppm)");
        assert_eq!(d.correct("Water - Glycerin - Mica"), "Water, Glycerin, Mica");
    }

    #[test]
    fn test_restore_leaves_plain_tokens_alone() {
        let d = DelimiterDisambiguator::default();
        assert_eq!(d.restore("Niacinamide"), "Niacinamide");
    }
}
