//! # Product Records
//!
//! Row types for the scraped product table and the relational output.
//! Column names follow the scraper's CSV header; the older Soko Glam export
//! names (`sku`, `product_name`, `subcategory`, `ingredients`) are accepted as aliases.

use serde::{Deserialize, Deserializer, Serialize};

/// One scraped observation of a product within one catalog category
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawProductRecord {
    /// Stable product identifier; repeats when a product is listed in several categories
    #[serde(alias = "sku")]
    pub key: String,
    #[serde(alias = "product_name")]
    pub name: String,
    pub brand: String,
    /// Sale price, when the scraper captured one
    #[serde(default, deserialize_with = "deserialize_optional_number")]
    pub price: Option<f64>,
    /// Average star rating, 0 when unrated
    #[serde(deserialize_with = "deserialize_rating")]
    pub rating: f64,
    pub rating_count: u32,
    /// Free-text ingredient list; `None` when the cell is empty. The column itself is required
    #[serde(alias = "ingredients")]
    pub raw_ingredients: Option<String>,
    #[serde(alias = "subcategory")]
    pub category: String,
}

impl RawProductRecord {
    /// Names of the per-product fields that differ between two observations.
    ///
    /// `category` is excluded: it legitimately varies across observations.
    pub fn divergent_fields(&self, other: &RawProductRecord) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name != other.name {
            fields.push("name");
        }
        if self.brand != other.brand {
            fields.push("brand");
        }
        if self.price != other.price {
            fields.push("price");
        }
        if self.rating != other.rating {
            fields.push("rating");
        }
        if self.rating_count != other.rating_count {
            fields.push("rating_count");
        }
        if self.raw_ingredients != other.raw_ingredients {
            fields.push("raw_ingredients");
        }
        fields
    }
}

/// The single representative kept for a product key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalProduct {
    pub key: String,
    pub name: String,
    pub brand: String,
    pub price: Option<f64>,
    pub rating: f64,
    pub rating_count: u32,
    /// Category of the first observation
    pub category: String,
    /// Ingredient text of the first observation, untouched
    pub raw_ingredients: Option<String>,
}

impl From<&RawProductRecord> for CanonicalProduct {
    fn from(record: &RawProductRecord) -> Self {
        Self {
            key: record.key.clone(),
            name: record.name.clone(),
            brand: record.brand.clone(),
            price: record.price,
            rating: record.rating,
            rating_count: record.rating_count,
            category: record.category.clone(),
            raw_ingredients: record.raw_ingredients.clone(),
        }
    }
}

impl CanonicalProduct {
    /// Whether the product has received at least one review
    pub fn is_rated(&self) -> bool {
        self.rating_count > 0
    }
}

/// One (product, ingredient) row of the junction relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientOccurrence {
    pub key: String,
    pub ingredient_name: String,
}

fn deserialize_rating<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_optional_number(deserializer)?.unwrap_or(0.0))
}

fn deserialize_optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => {
            let parsed: f64 = value.parse().map_err(|_| {
                serde::de::Error::custom(format!("'{}' is not a valid number", value))
            })?;
            if !parsed.is_finite() || parsed < 0.0 {
                return Err(serde::de::Error::custom(format!(
                    "'{}' must be a non-negative number",
                    value
                )));
            }
            Ok(Some(parsed))
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::RawProductRecord;

    /// Build a record with sensible defaults for unit tests
    pub fn record(key: &str, category: &str, ingredients: Option<&str>) -> RawProductRecord {
        RawProductRecord {
            key: key.to_string(),
            name: format!("Product {}", key),
            brand: "Brand".to_string(),
            price: Some(20.0),
            rating: 4.5,
            rating_count: 10,
            raw_ingredients: ingredients.map(str::to_string),
            category: category.to_string(),
        }
    }
}
