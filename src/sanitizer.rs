//! # Text Sanitizer
//!
//! Removes scraped noise from ingredient lists before they are split:
//!
//! - Marketing phrases that were captured with the list (e.g. "organic ingredients"),
//!   loaded from a newline-delimited file and matched literally, ignoring case
//! - Characters that never belong in an ingredient name (`*`, `"`, `.`, `[`, `]`)
//! - Escaped line breaks (`\n`, `\r` as literal text) left behind by the page markup
//!
//! Phrase removal always runs before character stripping.

use crate::errors::{AppError, AppResult};
use regex::{Regex, RegexBuilder};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Character sequences stripped from every ingredient list
pub const SPECIAL_SEQUENCES: [&str; 7] = ["*", "\"", ".", "[", "]", "\\n", "\\r"];

/// Load noise phrases from a newline-delimited file.
///
/// Lines are trimmed and blank lines skipped.
pub fn load_noise_phrases(path: &Path) -> AppResult<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| {
        AppError::FileSystem(format!(
            "failed to read noise phrases '{}': {}",
            path.display(),
            e
        ))
    })?;
    let phrases: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    info!(path = %path.display(), phrase_count = phrases.len(), "Loaded noise phrases");
    Ok(phrases)
}

/// Strips noise phrases and structurally irrelevant characters from ingredient text
#[derive(Debug, Clone, Default)]
pub struct TextSanitizer {
    noise_patterns: Vec<Regex>,
}

impl TextSanitizer {
    /// Create a sanitizer that removes the given phrases, in order.
    ///
    /// Each phrase is escaped, so it matches literally.
    pub fn new(noise_phrases: &[String]) -> AppResult<Self> {
        let noise_patterns = noise_phrases
            .iter()
            .map(|phrase| phrase.trim())
            .filter(|phrase| !phrase.is_empty())
            .map(|phrase| {
                RegexBuilder::new(&regex::escape(phrase))
                    .case_insensitive(true)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(pattern_count = noise_patterns.len(), "Created TextSanitizer");
        Ok(Self { noise_patterns })
    }

    /// Number of noise phrases this sanitizer removes
    pub fn phrase_count(&self) -> usize {
        self.noise_patterns.len()
    }

    /// Sanitize an optional ingredient field.
    ///
    /// A missing value stays missing so callers can tell "no data" apart from
    /// "nothing left after cleaning".
    pub fn sanitize(&self, raw: Option<&str>) -> Option<String> {
        raw.map(|text| self.sanitize_text(text))
    }

    /// Sanitize a present ingredient string
    pub fn sanitize_text(&self, text: &str) -> String {
        let mut cleaned = text.to_string();
        for pattern in &self.noise_patterns {
            cleaned = pattern.replace_all(&cleaned, "").into_owned();
        }
        for sequence in SPECIAL_SEQUENCES {
            if cleaned.contains(sequence) {
                cleaned = cleaned.replace(sequence, "");
            }
        }
        cleaned
    }
}
