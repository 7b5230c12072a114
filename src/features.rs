//! # Feature Derivation
//!
//! Turns canonical products plus the junction relation into one feature row
//! per product: ingredient count, a `contains_*` flag per configured target,
//! the star-ingredient portion and, optionally, the star count among the most
//! concentrated ingredients.

use crate::alias_matching::IngredientMatcher;
use crate::audit::DataIssue;
use crate::errors::{AppError, AppResult};
use crate::junction::JunctionRelation;
use crate::records::CanonicalProduct;
use std::fmt;
use tracing::{debug, info};

/// Coarse rating class used by downstream classifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingBin {
    VeryLow,
    Low,
    Average,
    High,
}

impl RatingBin {
    /// Upper bounds of each bin; lower bounds are exclusive
    const EDGES: [(f64, RatingBin); 4] = [
        (3.85, RatingBin::VeryLow),
        (4.25, RatingBin::Low),
        (4.65, RatingBin::Average),
        (5.05, RatingBin::High),
    ];

    /// Bin for a product's rating; `None` when unrated or out of range
    pub fn from_rating(rating: f64, rating_count: u32) -> Option<Self> {
        if rating_count == 0 || rating <= 0.0 {
            return None;
        }
        Self::EDGES
            .iter()
            .find(|(upper, _)| rating <= *upper)
            .map(|(_, bin)| *bin)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RatingBin::VeryLow => "Very Low",
            RatingBin::Low => "Low",
            RatingBin::Average => "Average",
            RatingBin::High => "High",
        }
    }
}

impl fmt::Display for RatingBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A canonical product and its derived attributes
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFeatureRow {
    pub product: CanonicalProduct,
    /// Sanitized, corrected ingredient text the features were computed from
    pub cleaned_ingredients: Option<String>,
    pub ingredient_count: usize,
    /// One flag per configured target, in [`FeatureTable::contains_columns`] order
    pub contains: Vec<bool>,
    /// Star occurrences per ingredient; `None` for a product with no ingredients
    pub star_ingredient_portion: Option<f64>,
    /// Star occurrences among the first ingredients; `None` when not requested
    /// or the product has no ingredients
    pub top_star_ingredient_count: Option<usize>,
    pub rating_bin: Option<RatingBin>,
}

/// Feature rows plus the column layout they share
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    /// `contains_*` column names, one per configured target
    pub contains_columns: Vec<String>,
    pub rows: Vec<ProductFeatureRow>,
    /// Whether rows carry `top_star_ingredient_count`
    pub has_top_portion: bool,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Flag for one `contains_*` column of a row
    pub fn contains(&self, row: &ProductFeatureRow, column: &str) -> Option<bool> {
        self.contains_columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| row.contains.get(i).copied())
    }
}

/// Number of leading ingredients covered by `percentile`, rounding half away from zero
pub fn top_portion_len(ingredient_count: usize, percentile: f64) -> usize {
    (ingredient_count as f64 * percentile).round() as usize
}

/// Computes feature rows; only reads the junction relation
pub struct FeatureDeriver<'a> {
    matcher: &'a IngredientMatcher,
    top_percentile: Option<f64>,
}

impl<'a> FeatureDeriver<'a> {
    pub fn new(matcher: &'a IngredientMatcher) -> Self {
        Self {
            matcher,
            top_percentile: None,
        }
    }

    /// Also compute the star count over the first `percentile` of each list
    pub fn with_top_percentile(mut self, percentile: f64) -> AppResult<Self> {
        if !(percentile > 0.0 && percentile <= 1.0) {
            return Err(AppError::Config(format!(
                "top percentile must be in (0, 1], got {}",
                percentile
            )));
        }
        self.top_percentile = Some(percentile);
        Ok(self)
    }

    /// Derive one row per product, in product order.
    ///
    /// Products with no ingredient rows get a missing portion and a
    /// [`DataIssue::ZeroDenominator`] finding.
    pub fn derive(
        &self,
        products: &[CanonicalProduct],
        relation: &JunctionRelation,
    ) -> (FeatureTable, Vec<DataIssue>) {
        let contains_columns: Vec<String> = self
            .matcher
            .targets()
            .iter()
            .map(|t| t.target().column_name())
            .collect();

        let mut issues = Vec::new();
        let rows: Vec<ProductFeatureRow> = products
            .iter()
            .map(|product| {
                let row = self.derive_row(product, relation);
                if row.star_ingredient_portion.is_none() {
                    debug!(key = %product.key, "No ingredients; star portion left missing");
                    issues.push(DataIssue::ZeroDenominator {
                        key: product.key.clone(),
                    });
                }
                row
            })
            .collect();

        info!(
            products = rows.len(),
            feature_columns = contains_columns.len(),
            zero_denominators = issues.len(),
            "Derived product features"
        );

        (
            FeatureTable {
                contains_columns,
                rows,
                has_top_portion: self.top_percentile.is_some(),
            },
            issues,
        )
    }

    fn derive_row(&self, product: &CanonicalProduct, relation: &JunctionRelation) -> ProductFeatureRow {
        let cleaned = relation.cleaned_text(&product.key);
        let text = cleaned.unwrap_or("");
        let ingredient_count = relation.ingredient_count(&product.key);

        let contains = self
            .matcher
            .targets()
            .iter()
            .map(|t| t.contains(text))
            .collect();

        let star_ingredient_portion = match ingredient_count {
            0 => None,
            n => Some(self.matcher.star_occurrences(text) as f64 / n as f64),
        };

        let top_star_ingredient_count = match (self.top_percentile, ingredient_count) {
            (Some(_), 0) | (None, _) => None,
            (Some(percentile), n) => {
                let top = relation
                    .ingredient_names(&product.key)
                    .take(top_portion_len(n, percentile))
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(self.matcher.star_occurrences(&top))
            }
        };

        ProductFeatureRow {
            product: product.clone(),
            cleaned_ingredients: cleaned.map(str::to_string),
            ingredient_count,
            contains,
            star_ingredient_portion,
            top_star_ingredient_count,
            rating_bin: RatingBin::from_rating(product.rating, product.rating_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias_matching::MatchTarget;
    use crate::junction::JunctionBuilder;
    use crate::records::test_support::record;
    use crate::tokenizer::IngredientParser;

    fn matcher() -> IngredientMatcher {
        IngredientMatcher::new(vec![
            MatchTarget::single("niacinamide"),
            MatchTarget::group("Vitamin C", &["ascorbic acid", "ascorbyl palmitate"]),
        ])
        .unwrap()
    }

    fn setup(items: &[(&str, Option<&str>)]) -> (Vec<CanonicalProduct>, JunctionRelation) {
        let products: Vec<CanonicalProduct> = items
            .iter()
            .map(|(key, text)| CanonicalProduct::from(&record(key, "Serums", *text)))
            .collect();
        let parser = IngredientParser::default();
        let relation = JunctionBuilder::new(&parser).build(&products);
        (products, relation)
    }

    #[test]
    fn test_contains_and_portion() {
        let matcher = matcher();
        let (products, relation) =
            setup(&[("A", Some("Water, Ascorbic Acid, Ascorbyl Palmitate, Glycerin"))]);
        let (table, issues) = FeatureDeriver::new(&matcher).derive(&products, &relation);

        assert!(issues.is_empty());
        assert_eq!(table.contains_columns, vec!["contains_niacinamide", "contains_vitamin_c"]);
        let row = &table.rows[0];
        assert_eq!(row.ingredient_count, 4);
        assert_eq!(table.contains(row, "contains_vitamin_c"), Some(true));
        assert_eq!(table.contains(row, "contains_niacinamide"), Some(false));
        assert_eq!(row.star_ingredient_portion, Some(0.5));
        assert_eq!(row.top_star_ingredient_count, None);
    }

    #[test]
    fn test_missing_ingredients_portion_is_missing() {
        let matcher = matcher();
        let (products, relation) = setup(&[("EMPTY", None)]);
        let (table, issues) = FeatureDeriver::new(&matcher)
            .with_top_percentile(0.5)
            .unwrap()
            .derive(&products, &relation);

        let row = &table.rows[0];
        assert_eq!(row.ingredient_count, 0);
        assert_eq!(row.star_ingredient_portion, None);
        assert_eq!(row.top_star_ingredient_count, None);
        assert!(row.contains.iter().all(|flag| !flag));
        assert_eq!(issues, vec![DataIssue::ZeroDenominator { key: "EMPTY".to_string() }]);
    }

    #[test]
    fn test_top_portion_uses_leading_ingredients() {
        let matcher = matcher();
        let (products, relation) =
            setup(&[("A", Some("Niacinamide, Water, Glycerin, Ascorbic Acid"))]);
        let (table, _) = FeatureDeriver::new(&matcher)
            .with_top_percentile(0.5)
            .unwrap()
            .derive(&products, &relation);

        assert!(table.has_top_portion);
        assert_eq!(table.rows[0].top_star_ingredient_count, Some(1));
        assert_eq!(table.rows[0].star_ingredient_portion, Some(0.5));
    }

    #[test]
    fn test_top_portion_len_rounds_half_away_from_zero() {
        assert_eq!(top_portion_len(5, 0.5), 3);
        assert_eq!(top_portion_len(4, 0.5), 2);
        assert_eq!(top_portion_len(3, 0.1), 0);
        assert_eq!(top_portion_len(7, 1.0), 7);
    }

    #[test]
    fn test_invalid_top_percentile() {
        let matcher = matcher();
        assert!(FeatureDeriver::new(&matcher).with_top_percentile(0.0).is_err());
        assert!(FeatureDeriver::new(&matcher).with_top_percentile(1.5).is_err());
        assert!(FeatureDeriver::new(&matcher).with_top_percentile(f64::NAN).is_err());
    }

    #[test]
    fn test_rating_bins() {
        assert_eq!(RatingBin::from_rating(0.0, 0), None);
        assert_eq!(RatingBin::from_rating(4.5, 0), None);
        assert_eq!(RatingBin::from_rating(3.85, 2), Some(RatingBin::VeryLow));
        assert_eq!(RatingBin::from_rating(3.9, 2), Some(RatingBin::Low));
        assert_eq!(RatingBin::from_rating(4.5, 2), Some(RatingBin::Average));
        assert_eq!(RatingBin::from_rating(5.0, 2), Some(RatingBin::High));
        assert_eq!(RatingBin::High.to_string(), "High");
    }
}
