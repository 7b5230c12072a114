//! # Junction Builder
//!
//! Builds the many-to-many relation between products and ingredient names:
//! one row per ingredient token of each canonical product, products in
//! first-occurrence order and tokens in declared order. Ingredients are
//! conventionally listed by descending concentration, so row order within a
//! product is meaningful even though position is not stored as a column.

use crate::records::{CanonicalProduct, IngredientOccurrence};
use crate::tokenizer::IngredientParser;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct ProductSpan {
    key: String,
    /// Sanitized, corrected ingredient text; `None` when the field was missing
    cleaned: Option<String>,
    rows: Range<usize>,
}

/// Product/ingredient relation; immutable once built
#[derive(Debug, Clone, Default)]
pub struct JunctionRelation {
    rows: Vec<IngredientOccurrence>,
    products: Vec<ProductSpan>,
    index: HashMap<String, usize>,
}

impl JunctionRelation {
    /// All rows, grouped by product in first-occurrence order
    pub fn rows(&self) -> &[IngredientOccurrence] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Product keys in first-occurrence order, including products with no rows
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.products.iter().map(|span| span.key.as_str())
    }

    /// Number of products covered by the relation
    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    /// Rows for one product in declared order; empty for unknown keys
    pub fn ingredients(&self, key: &str) -> &[IngredientOccurrence] {
        match self.index.get(key) {
            Some(&position) => &self.rows[self.products[position].rows.clone()],
            None => &[],
        }
    }

    /// Ingredient names for one product in declared order
    pub fn ingredient_names<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.ingredients(key)
            .iter()
            .map(|row| row.ingredient_name.as_str())
    }

    /// Number of rows for one product
    pub fn ingredient_count(&self, key: &str) -> usize {
        self.ingredients(key).len()
    }

    /// Cleaned ingredient text the rows were split from
    pub fn cleaned_text(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .and_then(|&position| self.products[position].cleaned.as_deref())
    }

    pub fn contains_product(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }
}

/// Runs the ingredient parser over canonical products to build the relation
pub struct JunctionBuilder<'a> {
    parser: &'a IngredientParser,
}

impl<'a> JunctionBuilder<'a> {
    pub fn new(parser: &'a IngredientParser) -> Self {
        Self { parser }
    }

    /// Build the relation from canonical products.
    ///
    /// A key that appears twice in `products` is only processed the first time.
    /// Repeated ingredient names within one product are kept as separate rows.
    pub fn build(&self, products: &[CanonicalProduct]) -> JunctionRelation {
        let mut relation = JunctionRelation::default();

        for product in products {
            if relation.index.contains_key(&product.key) {
                warn!(key = %product.key, "Product key passed to junction builder twice; ignoring repeat");
                continue;
            }

            let parsed = self.parser.parse(product.raw_ingredients.as_deref());
            let start = relation.rows.len();

            let mut seen: HashSet<&str> = HashSet::with_capacity(parsed.tokens.len());
            for token in &parsed.tokens {
                if !seen.insert(token.as_str()) {
                    debug!(key = %product.key, ingredient = %token, "Ingredient listed more than once");
                }
            }

            relation
                .rows
                .extend(parsed.tokens.iter().map(|token| IngredientOccurrence {
                    key: product.key.clone(),
                    ingredient_name: token.clone(),
                }));

            relation
                .index
                .insert(product.key.clone(), relation.products.len());
            relation.products.push(ProductSpan {
                key: product.key.clone(),
                cleaned: parsed.cleaned,
                rows: start..relation.rows.len(),
            });
        }

        info!(
            products = relation.products.len(),
            rows = relation.rows.len(),
            "Built ingredient junction relation"
        );
        relation
    }
}
