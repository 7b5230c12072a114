//! # Skincare Ingredients
//!
//! Normalizes free-text ingredient lists scraped from retail product pages into
//! a product/ingredient junction relation, matches ingredient alias groups, and
//! derives per-product features for downstream analysis.

pub mod alias_matching;
pub mod analysis;
pub mod audit;
pub mod config;
pub mod deduplication;
pub mod disambiguation;
pub mod errors;
pub mod features;
pub mod io;
pub mod junction;
pub mod observability;
pub mod observability_config;
pub mod pipeline;
pub mod records;
pub mod sanitizer;
pub mod tokenizer;

// Re-export types for easier access
pub use alias_matching::{AliasGroup, FeatureConfig, IngredientMatcher};
pub use pipeline::{Pipeline, PipelineOutcome};
pub use tokenizer::IngredientParser;
