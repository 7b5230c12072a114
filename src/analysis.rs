//! Prevalence and rating summary per configured ingredient target

use crate::features::FeatureTable;
use serde::Serialize;
use tracing::info;

/// One line of `ingredient_summary.csv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientSummary {
    pub ingredient: String,
    pub products_containing: usize,
    pub percent_containing: f64,
    pub top_rated_containing: usize,
    pub percent_top_rated_containing: f64,
    /// Mean rating of rated products containing the target
    pub mean_rating: Option<f64>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round2(part as f64 / whole as f64 * 100.0)
    }
}

/// Summarize every `contains_*` column of a feature table.
///
/// Products rated at least `min_top_rating` (and with at least one review)
/// form the top-rated subset.
pub fn summarize(table: &FeatureTable, target_names: &[String], min_top_rating: f64) -> Vec<IngredientSummary> {
    let total = table.rows.len();
    let top_rated: Vec<bool> = table
        .rows
        .iter()
        .map(|row| row.product.is_rated() && row.product.rating >= min_top_rating)
        .collect();
    let top_total = top_rated.iter().filter(|top| **top).count();

    let summaries: Vec<IngredientSummary> = target_names
        .iter()
        .enumerate()
        .map(|(column, name)| {
            let mut containing = 0;
            let mut top_containing = 0;
            let mut rating_sum = 0.0;
            let mut rated = 0;

            for (row, is_top) in table.rows.iter().zip(&top_rated) {
                if !row.contains.get(column).copied().unwrap_or(false) {
                    continue;
                }
                containing += 1;
                if *is_top {
                    top_containing += 1;
                }
                if row.product.is_rated() {
                    rating_sum += row.product.rating;
                    rated += 1;
                }
            }

            IngredientSummary {
                ingredient: name.clone(),
                products_containing: containing,
                percent_containing: percent(containing, total),
                top_rated_containing: top_containing,
                percent_top_rated_containing: percent(top_containing, top_total),
                mean_rating: (rated > 0).then(|| round2(rating_sum / rated as f64)),
            }
        })
        .collect();

    info!(
        targets = summaries.len(),
        products = total,
        top_rated_products = top_total,
        min_top_rating,
        "Summarized ingredient prevalence"
    );
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias_matching::{IngredientMatcher, MatchTarget};
    use crate::features::FeatureDeriver;
    use crate::junction::JunctionBuilder;
    use crate::records::test_support::record;
    use crate::records::CanonicalProduct;
    use crate::tokenizer::IngredientParser;

    #[test]
    fn test_summary_counts_and_means() {
        let mut low = record("LOW", "Serums", Some("Water, Niacinamide"));
        low.rating = 3.0;
        let mut unrated = record("NEW", "Serums", Some("Niacinamide, Glycerin"));
        unrated.rating = 0.0;
        unrated.rating_count = 0;
        let records = vec![
            record("TOP", "Serums", Some("Niacinamide, Water")),
            low,
            unrated,
            record("NONE", "Serums", Some("Water, Glycerin")),
        ];
        let products: Vec<CanonicalProduct> = records.iter().map(CanonicalProduct::from).collect();
        let parser = IngredientParser::default();
        let relation = JunctionBuilder::new(&parser).build(&products);
        let matcher = IngredientMatcher::new(vec![MatchTarget::single("niacinamide")]).unwrap();
        let (table, _) = FeatureDeriver::new(&matcher).derive(&products, &relation);

        let summary = summarize(&table, &["niacinamide".to_string()], 4.0);
        assert_eq!(
            summary,
            vec![IngredientSummary {
                ingredient: "niacinamide".to_string(),
                products_containing: 3,
                percent_containing: 75.0,
                top_rated_containing: 1,
                percent_top_rated_containing: 50.0,
                mean_rating: Some(3.75),
            }]
        );
    }

    #[test]
    fn test_empty_table() {
        let summary = summarize(&FeatureTable::default(), &["urea".to_string()], 4.5);
        assert_eq!(summary[0].percent_containing, 0.0);
        assert_eq!(summary[0].mean_rating, None);
    }
}
