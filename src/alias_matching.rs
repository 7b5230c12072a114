//! # Alias Group Matching
//!
//! Many ingredient names are chemically equivalent or closely related: "ascorbic
//! acid", "sodium ascorbyl phosphate" and "ascorbyl palmitate" are all Vitamin C
//! for feature purposes. An [`AliasGroup`] gives one semantic name to a set of
//! literal variants, and [`IngredientMatcher`] answers containment and occurrence
//! questions for each configured target against a product's ingredient text.
//!
//! Matching is case-insensitive substring search. A variant that is a substring of
//! an unrelated name (say "acid") will match inside it, and one listed compound can
//! match several variants of the same group, so occurrence counts may exceed the
//! number of distinct ingredients that matched.

use crate::errors::{AppError, AppResult};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

fn default_star() -> bool {
    true
}

/// A single ingredient matched by its own name only
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SingleIngredient {
    pub name: String,
    /// Whether the ingredient counts toward the star-ingredient features
    #[serde(default = "default_star")]
    pub star: bool,
}

/// A semantic ingredient and the literal names that stand for it
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AliasGroup {
    pub name: String,
    pub variants: Vec<String>,
    #[serde(default = "default_star")]
    pub star: bool,
}

/// Ingredients and alias groups used for feature derivation, loaded from JSON
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeatureConfig {
    pub single_ingredients: Vec<SingleIngredient>,
    pub alias_groups: Vec<AliasGroup>,
    /// Positional prefixes to protect in addition to the built-in ones
    #[serde(default)]
    pub extra_prefixes: Vec<String>,
}

fn group(name: &str, variants: &[&str]) -> AliasGroup {
    AliasGroup {
        name: name.to_string(),
        variants: variants.iter().map(|v| v.to_string()).collect(),
        star: true,
    }
}

fn single(name: &str, star: bool) -> SingleIngredient {
    SingleIngredient {
        name: name.to_string(),
        star,
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            single_ingredients: vec![
                single("niacinamide", true),
                single("azelaic acid", true),
                single("urea", false),
                single("retinol", true),
            ],
            alias_groups: vec![
                group("BHA", &["salicylic acid", "capryloyl salicylic acid"]),
                group(
                    "AHA",
                    &[
                        "glycolic acid",
                        "lactic acid",
                        "lactic acid/glycolic acid copolymer",
                        "tartaric acid",
                        "citric acid",
                        "malic acid",
                        "mandelic acid",
                    ],
                ),
                group(
                    "PHA",
                    &["gluconolactone", "delta gluconolactone", "galactose", "lactobionic acid"],
                ),
                group(
                    "Vitamin C",
                    &[
                        "2-O-ethyl ascorbic acid",
                        "ascorbic acid",
                        "ascorbic acid polypeptide",
                        "ascorbic acid/orange/citrus limon/citrus aurantifolia polypeptides",
                        "ascorbyl glucoside",
                        "ascorbyl palmitate",
                        "trisodium ascorbyl palmitate phosphate",
                        "vitamin c-ester",
                        "ascorbyl tetraisopalmitate",
                        "magnesium ascorbyl phosphate",
                        "sodium ascorbyl phosphate",
                        "tetrahexyldecyl ascorbate",
                        "sodium ascorbate",
                        "calcium ascorbate",
                    ],
                ),
                group(
                    "Ceramides",
                    &[
                        "ceramide",
                        "ceramide 1",
                        "ceramide 2",
                        "ceramide 3",
                        "ceramide 4",
                        "ceramide 5",
                        "ceramide 6",
                        "ceramide 6 ii",
                        "Ceramide 9",
                        "ceramide eop",
                        "ceramide eos",
                        "glucosyl ceramide",
                        "cetyl-pg hydroxyethyl palmitamide",
                        "hydroxypropyl bispalmitamide mea",
                        "wheat germ oil/palm oil aminopropanediol esters",
                        "safflower oil/palm oil aminopropanediol esters",
                        "olive oil aminopropanediol esters",
                        "linseed oil/palm oil aminopropanediol esters",
                        "cottonseed oil/palm oil aminopropanediol esters",
                        "camellia sinensis seed oil/palm oil aminopropanediol esters",
                        "hydroxypalmitoyl sphinganine",
                        "myristoyl/palmitoyl oxostearamide/arachamide mea",
                    ],
                ),
                group("Squalane", &["olive squalane", "phytosqualane"]),
                group(
                    "Snail Mucin",
                    &[
                        "snail secretion filtrate",
                        "snail secretion filtrate extract",
                        "saccharomyces/snail Secretion filtrate ferment filtrate",
                    ],
                ),
                group(
                    "Madecassoside",
                    &["centella asiatica", "asiaticoside", "asiatic acid", "madecassic acid"],
                ),
                group(
                    "hyaluronic acid",
                    &["sodium hyaluronate", "sodium acetylated hyaluronate"],
                ),
                group("green tea", &["camellia sinensis"]),
            ],
            extra_prefixes: Vec::new(),
        }
    }
}

impl FeatureConfig {
    /// Validate feature configuration.
    ///
    /// Blank names are rejected because an empty pattern matches every product.
    /// A variant shared by two groups is only a warning: the groups then stop
    /// being mutually exclusive, which matters only to callers that assume they are.
    pub fn validate(&self) -> AppResult<()> {
        let targets = self.targets();
        let mut column_names: HashMap<String, &str> = HashMap::new();
        for target in &targets {
            if target.name.trim().is_empty() {
                return Err(AppError::Config(
                    "ingredient and alias group names cannot be empty".to_string(),
                ));
            }
            for (i, variant) in target.variants.iter().enumerate() {
                if variant.trim().is_empty() {
                    return Err(AppError::Config(format!(
                        "alias group '{}' variant[{}] cannot be empty",
                        target.name, i
                    )));
                }
            }
            let column = target.column_name();
            if let Some(previous) = column_names.insert(column.clone(), &target.name) {
                return Err(AppError::Config(format!(
                    "'{}' and '{}' both map to feature column '{}'",
                    previous, target.name, column
                )));
            }
        }

        let mut owners: HashMap<String, &str> = HashMap::new();
        for alias_group in &self.alias_groups {
            for variant in &alias_group.variants {
                let normalized = variant.trim().to_lowercase();
                match owners.get(&normalized) {
                    Some(owner) if *owner != alias_group.name => warn!(
                        variant = %variant,
                        first_group = %owner,
                        second_group = %alias_group.name,
                        "Alias variant belongs to more than one group"
                    ),
                    Some(_) => warn!(
                        variant = %variant,
                        group = %alias_group.name,
                        "Alias variant listed twice in the same group"
                    ),
                    None => {
                        owners.insert(normalized, &alias_group.name);
                    }
                }
            }
        }

        for (i, prefix) in self.extra_prefixes.iter().enumerate() {
            if !prefix.contains(',') {
                return Err(AppError::Config(format!(
                    "extra_prefixes[{}] '{}' contains no comma to protect",
                    i, prefix
                )));
            }
        }
        Ok(())
    }

    /// Every configured target: single ingredients first, then alias groups
    pub fn targets(&self) -> Vec<MatchTarget> {
        let singles = self.single_ingredients.iter().map(|s| MatchTarget {
            name: s.name.clone(),
            variants: Vec::new(),
            star: s.star,
        });
        let groups = self.alias_groups.iter().map(|g| MatchTarget {
            name: g.name.clone(),
            variants: g.variants.clone(),
            star: g.star,
        });
        singles.chain(groups).collect()
    }
}

/// Load feature configuration.
///
/// An explicit path must load. Without one, `FEATURE_CONFIG_PATH` and then
/// `config/features.json` are tried, and the built-in defaults are used if
/// neither exists.
pub fn load_feature_config(explicit: Option<&Path>) -> AppResult<FeatureConfig> {
    if let Some(path) = explicit {
        return read_feature_config(path);
    }

    if let Ok(config_path) = std::env::var("FEATURE_CONFIG_PATH") {
        info!(
            "Loading feature config from environment variable: {}",
            config_path
        );
        return read_feature_config(Path::new(&config_path));
    }

    let fallback = Path::new("config/features.json");
    if fallback.exists() {
        return read_feature_config(fallback);
    }

    debug!("No feature config file found; using built-in ingredient groups");
    Ok(FeatureConfig::default())
}

fn read_feature_config(path: &Path) -> AppResult<FeatureConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!(
            "failed to read feature config '{}': {}",
            path.display(),
            e
        ))
    })?;
    let config: FeatureConfig = serde_json::from_str(&content)?;
    info!(
        path = %path.display(),
        single_ingredients = config.single_ingredients.len(),
        alias_groups = config.alias_groups.len(),
        "Loaded feature config"
    );
    Ok(config)
}

/// An ingredient or alias group to look for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchTarget {
    pub name: String,
    /// Additional literal names; empty for a single ingredient
    pub variants: Vec<String>,
    pub star: bool,
}

impl MatchTarget {
    pub fn single(name: &str) -> Self {
        Self {
            name: name.to_string(),
            variants: Vec::new(),
            star: true,
        }
    }

    pub fn group(name: &str, variants: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
            star: true,
        }
    }

    /// Feature column name, e.g. `contains_vitamin_c`
    pub fn column_name(&self) -> String {
        format!("contains_{}", self.name.trim().to_lowercase().replace(' ', "_"))
    }
}

/// Compiled patterns for one target
#[derive(Debug, Clone)]
pub struct TargetMatcher {
    target: MatchTarget,
    patterns: Vec<Regex>,
}

impl TargetMatcher {
    pub fn new(target: MatchTarget) -> AppResult<Self> {
        let patterns = std::iter::once(&target.name)
            .chain(target.variants.iter())
            .map(|name| {
                RegexBuilder::new(&regex::escape(name.trim()))
                    .case_insensitive(true)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { target, patterns })
    }

    pub fn target(&self) -> &MatchTarget {
        &self.target
    }

    /// Whether the name or any variant occurs in `text`
    pub fn contains(&self, text: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(text))
    }

    /// Sum over the name and every variant of non-overlapping matches in `text`
    pub fn occurrence_count(&self, text: &str) -> usize {
        self.patterns
            .iter()
            .map(|pattern| pattern.find_iter(text).count())
            .sum()
    }

    /// [`contains`](Self::contains) over a product's junction rows
    pub fn contains_in<'a>(&self, ingredients: impl IntoIterator<Item = &'a str>) -> bool {
        self.contains(&join_ingredients(ingredients))
    }

    /// [`occurrence_count`](Self::occurrence_count) over a product's junction rows
    pub fn occurrence_count_in<'a>(&self, ingredients: impl IntoIterator<Item = &'a str>) -> usize {
        self.occurrence_count(&join_ingredients(ingredients))
    }
}

fn join_ingredients<'a>(ingredients: impl IntoIterator<Item = &'a str>) -> String {
    ingredients.into_iter().collect::<Vec<_>>().join(", ")
}

/// Matches every configured target; built once from an explicit configuration
#[derive(Debug, Clone)]
pub struct IngredientMatcher {
    targets: Vec<TargetMatcher>,
}

impl IngredientMatcher {
    pub fn new(targets: Vec<MatchTarget>) -> AppResult<Self> {
        let targets = targets
            .into_iter()
            .map(TargetMatcher::new)
            .collect::<AppResult<Vec<_>>>()?;
        debug!(target_count = targets.len(), "Created IngredientMatcher");
        Ok(Self { targets })
    }

    pub fn from_config(config: &FeatureConfig) -> AppResult<Self> {
        Self::new(config.targets())
    }

    pub fn targets(&self) -> &[TargetMatcher] {
        &self.targets
    }

    /// Look up a target by its configured name, ignoring case
    pub fn target(&self, name: &str) -> Option<&TargetMatcher> {
        self.targets
            .iter()
            .find(|t| t.target.name.eq_ignore_ascii_case(name))
    }

    /// Containment for a named target; `None` if the name is not configured
    pub fn contains(&self, name: &str, text: &str) -> Option<bool> {
        self.target(name).map(|t| t.contains(text))
    }

    /// Occurrence count for a named target; `None` if the name is not configured
    pub fn occurrence_count(&self, name: &str, text: &str) -> Option<usize> {
        self.target(name).map(|t| t.occurrence_count(text))
    }

    /// Star occurrence total across every star target
    pub fn star_occurrences(&self, text: &str) -> usize {
        self.targets
            .iter()
            .filter(|t| t.target.star)
            .map(|t| t.occurrence_count(text))
            .sum()
    }
}
