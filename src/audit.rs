//! # Data Audit
//!
//! Non-fatal data-quality findings. None of these stop the pipeline; they are
//! tallied, logged, and written to side reports for manual review.

use crate::errors::{AppError, AppResult};
use crate::junction::JunctionRelation;
use crate::records::RawProductRecord;
use crate::tokenizer::IngredientParser;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// A recoverable data-quality finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataIssue {
    /// The product has no ingredient text at all
    MissingData { key: String },
    /// Cleaned ingredient text has no list delimiter, which usually means the
    /// scrape captured only part of the list
    StructuralAmbiguity { key: String, ingredients: String },
    /// A repeated key disagrees with its first observation on a per-product field
    InconsistentDuplicate {
        key: String,
        first_category: String,
        category: String,
        fields: Vec<&'static str>,
    },
    /// The portion feature was requested for a product with no ingredients
    ZeroDenominator { key: String },
}

impl DataIssue {
    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            DataIssue::MissingData { .. } => "missing_data",
            DataIssue::StructuralAmbiguity { .. } => "structural_ambiguity",
            DataIssue::InconsistentDuplicate { .. } => "inconsistent_duplicate",
            DataIssue::ZeroDenominator { .. } => "zero_denominator",
        }
    }

    pub fn key(&self) -> &str {
        match self {
            DataIssue::MissingData { key }
            | DataIssue::StructuralAmbiguity { key, .. }
            | DataIssue::InconsistentDuplicate { key, .. }
            | DataIssue::ZeroDenominator { key } => key,
        }
    }
}

impl fmt::Display for DataIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataIssue::MissingData { key } => write!(f, "{}: no ingredient list", key),
            DataIssue::StructuralAmbiguity { key, .. } => {
                write!(f, "{}: ingredient list has no delimiter", key)
            }
            DataIssue::InconsistentDuplicate {
                key,
                first_category,
                category,
                fields,
            } => write!(
                f,
                "{}: observation in '{}' disagrees with '{}' on {}",
                key,
                category,
                first_category,
                fields.join(", ")
            ),
            DataIssue::ZeroDenominator { key } => {
                write!(f, "{}: star ingredient portion undefined", key)
            }
        }
    }
}

/// All findings from one pipeline run
#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    pub issues: Vec<DataIssue>,
}

impl AuditReport {
    pub fn extend(&mut self, issues: impl IntoIterator<Item = DataIssue>) {
        self.issues.extend(issues);
    }

    /// Number of findings of a given kind
    pub fn count(&self, kind: &str) -> usize {
        self.issues.iter().filter(|issue| issue.kind() == kind).count()
    }

    /// Findings of structural ambiguity, in product order
    pub fn incomplete_lists(&self) -> impl Iterator<Item = (&str, &str)> {
        self.issues.iter().filter_map(|issue| match issue {
            DataIssue::StructuralAmbiguity { key, ingredients } => {
                Some((key.as_str(), ingredients.as_str()))
            }
            _ => None,
        })
    }

    pub fn has_inconsistent_duplicates(&self) -> bool {
        self.count("inconsistent_duplicate") > 0
    }

    /// Log a one-line tally and record per-kind metrics
    pub fn log_summary(&self) {
        let kinds = [
            "missing_data",
            "structural_ambiguity",
            "inconsistent_duplicate",
            "zero_denominator",
        ];
        for kind in kinds {
            crate::observability::record_data_issue_metrics(kind, self.count(kind));
        }
        info!(
            missing_data = self.count("missing_data"),
            structural_ambiguity = self.count("structural_ambiguity"),
            inconsistent_duplicate = self.count("inconsistent_duplicate"),
            zero_denominator = self.count("zero_denominator"),
            "Data audit summary"
        );
    }
}

/// Products with missing ingredient text or text that never splits.
///
/// Empty-after-cleaning text is neither: it legitimately yields zero ingredients.
pub fn find_ingredient_issues(
    relation: &JunctionRelation,
    parser: &IngredientParser,
) -> Vec<DataIssue> {
    let mut issues = Vec::new();
    for key in relation.keys() {
        match relation.cleaned_text(key) {
            None => issues.push(DataIssue::MissingData {
                key: key.to_string(),
            }),
            Some(text) if !text.trim().is_empty() && !parser.has_delimiter(text) => {
                warn!(key = %key, "Ingredient list has no delimiter; it may be incomplete");
                issues.push(DataIssue::StructuralAmbiguity {
                    key: key.to_string(),
                    ingredients: text.to_string(),
                });
            }
            Some(_) => {}
        }
    }
    issues
}

/// Load a newline-delimited list of product keys
pub fn load_key_list(path: &Path) -> AppResult<HashSet<String>> {
    let content = fs::read_to_string(path).map_err(|e| {
        AppError::FileSystem(format!("failed to read key list '{}': {}", path.display(), e))
    })?;
    let keys: HashSet<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    info!(path = %path.display(), key_count = keys.len(), "Loaded excluded product keys");
    Ok(keys)
}

/// Drop every observation whose key is excluded
pub fn exclude_keys(
    records: Vec<RawProductRecord>,
    excluded: &HashSet<String>,
) -> Vec<RawProductRecord> {
    if excluded.is_empty() {
        return records;
    }
    let before = records.len();
    let kept: Vec<RawProductRecord> = records
        .into_iter()
        .filter(|record| !excluded.contains(&record.key))
        .collect();
    info!(
        excluded_observations = before - kept.len(),
        remaining = kept.len(),
        "Excluded products with incomplete ingredient lists"
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deduplication::deduplicate;
    use crate::junction::JunctionBuilder;
    use crate::records::test_support::record;
    use std::io::Write;

    #[test]
    fn test_find_ingredient_issues() {
        let records = vec![
            record("FULL", "Toners", Some("Water, Glycerin")),
            record("MISSING", "Toners", None),
            record("SHORT", "Toners", Some("Water Glycerin Mica")),
            record("PREFIX", "Toners", Some("1,2-Hexanediol")),
            record("EMPTY", "Toners", Some("***")),
        ];
        let parser = IngredientParser::default();
        let products = deduplicate(&records);
        let relation = JunctionBuilder::new(&parser).build(&products.products);

        let issues = find_ingredient_issues(&relation, &parser);
        let summary: Vec<(&str, &str)> = issues.iter().map(|i| (i.kind(), i.key())).collect();
        assert_eq!(
            summary,
            vec![
                ("missing_data", "MISSING"),
                ("structural_ambiguity", "SHORT"),
                ("structural_ambiguity", "PREFIX"),
            ]
        );
    }

    #[test]
    fn test_exclude_keys() {
        let records = vec![
            record("A", "Toners", None),
            record("B", "Toners", None),
            record("A", "Serums", None),
        ];
        let excluded: HashSet<String> = ["A".to_string()].into_iter().collect();
        let kept = exclude_keys(records, &excluded);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].key, "B");
    }

    #[test]
    fn test_load_key_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ABC-1\n\n  XYZ-2 ").unwrap();
        let keys = load_key_list(file.path()).unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("XYZ-2"));
    }

    #[test]
    fn test_report_counts() {
        let mut report = AuditReport::default();
        report.extend(vec![
            DataIssue::MissingData { key: "A".into() },
            DataIssue::ZeroDenominator { key: "A".into() },
            DataIssue::StructuralAmbiguity {
                key: "B".into(),
                ingredients: "Water".into(),
            },
        ]);
        assert_eq!(report.count("missing_data"), 1);
        assert_eq!(report.incomplete_lists().collect::<Vec<_>>(), vec![("B", "Water")]);
        assert!(!report.has_inconsistent_duplicates());
    }
}
