//! # Pipeline Orchestration
//!
//! One synchronous pass over the scraped table:
//!
//! ```text
//! ingest ─▶ exclude ─▶ deduplicate ─▶ junction ─▶ audit ─▶ features ─▶ analysis ─▶ write
//! ```
//!
//! Every stage runs inside a `pipeline_stage` span and records its duration.
//! Outputs are staged and committed only after the last stage succeeds; any
//! fatal error leaves the output directory untouched.

use crate::alias_matching::{load_feature_config, IngredientMatcher};
use crate::analysis::{summarize, IngredientSummary};
use crate::audit::{exclude_keys, find_ingredient_issues, load_key_list, AuditReport};
use crate::config::PipelineConfig;
use crate::deduplication::{deduplicate, DeduplicatedProducts};
use crate::disambiguation::DelimiterDisambiguator;
use crate::errors::{error_logging, AppError, AppResult};
use crate::features::{FeatureDeriver, FeatureTable};
use crate::io::{self, StagedOutputs};
use crate::junction::{JunctionBuilder, JunctionRelation};
use crate::observability;
use crate::records::RawProductRecord;
use crate::sanitizer::{load_noise_phrases, TextSanitizer};
use crate::tokenizer::IngredientParser;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub observations: usize,
    pub canonical_products: usize,
    pub junction_rows: usize,
    pub audit: AuditReport,
    pub written: Vec<PathBuf>,
}

/// Intermediate results shared by the full run and the audit-only run
struct Prepared {
    observations: usize,
    products: DeduplicatedProducts,
    relation: JunctionRelation,
    audit: AuditReport,
}

/// Run a stage inside its span, timing it and logging a fatal error
fn run_stage<T>(stage: &str, f: impl FnOnce() -> AppResult<T>) -> AppResult<T> {
    let span = observability::stage_span(stage);
    let _guard = span.enter();
    let start = Instant::now();
    let result = f();
    observability::record_stage_duration(stage, start.elapsed());
    if let Err(e) = &result {
        error_logging::log_pipeline_error(e, stage, None);
    }
    result
}

/// Configured pipeline; text tables and matchers are built once up front
pub struct Pipeline {
    config: PipelineConfig,
    parser: IngredientParser,
    matcher: IngredientMatcher,
}

impl Pipeline {
    /// Validate configuration and load every auxiliary input
    pub fn from_config(config: PipelineConfig) -> AppResult<Self> {
        config.validate()?;

        let phrases = match &config.input.noise_phrases_path {
            Some(path) => load_noise_phrases(path)?,
            None => Vec::new(),
        };
        let sanitizer = TextSanitizer::new(&phrases)?;

        let feature_config = load_feature_config(config.input.feature_config_path.as_deref())?;
        feature_config.validate()?;

        let disambiguator = DelimiterDisambiguator::with_extra_prefixes(&feature_config.extra_prefixes);
        let parser = IngredientParser::new(sanitizer, disambiguator);
        let matcher = IngredientMatcher::from_config(&feature_config)?;

        info!(
            noise_phrases = phrases.len(),
            targets = matcher.targets().len(),
            "Pipeline configured"
        );
        Ok(Self {
            config,
            parser,
            matcher,
        })
    }

    pub fn parser(&self) -> &IngredientParser {
        &self.parser
    }

    fn prepare(&self) -> AppResult<Prepared> {
        let records = run_stage("ingest", || {
            let records = io::read_products(&self.config.input.products_path)?;
            observability::record_ingest_metrics(records.len());
            Ok(records)
        })?;
        let observations = records.len();

        let records = run_stage("exclude", || self.exclude(records))?;

        let products = run_stage("deduplicate", || {
            let products = deduplicate(&records);
            observability::record_deduplication_metrics(&products.stats);
            if self.config.strict_duplicates && !products.inconsistencies.is_empty() {
                let keys: Vec<&str> = products.inconsistencies.iter().map(|i| i.key()).collect();
                return Err(AppError::Data(format!(
                    "{} duplicate observations disagree with their first occurrence: {}",
                    keys.len(),
                    keys.join(", ")
                )));
            }
            Ok(products)
        })?;

        let relation = run_stage("junction", || {
            let relation = JunctionBuilder::new(&self.parser).build(&products.products);
            observability::record_junction_metrics(relation.len());
            Ok(relation)
        })?;

        let audit = run_stage("audit", || {
            let mut audit = AuditReport::default();
            audit.extend(products.inconsistencies.iter().cloned());
            audit.extend(find_ingredient_issues(&relation, &self.parser));
            Ok(audit)
        })?;

        Ok(Prepared {
            observations,
            products,
            relation,
            audit,
        })
    }

    fn exclude(&self, records: Vec<RawProductRecord>) -> AppResult<Vec<RawProductRecord>> {
        match &self.config.input.exclusion_path {
            Some(path) => {
                let excluded = load_key_list(path)?;
                Ok(exclude_keys(records, &excluded))
            }
            None => Ok(records),
        }
    }

    /// Run every stage and write all outputs
    pub fn run(&self) -> AppResult<PipelineOutcome> {
        let started_at = Utc::now();
        info!(started_at = %started_at.to_rfc3339(), "{}", self.config.summary());

        let Prepared {
            observations,
            products,
            relation,
            mut audit,
        } = self.prepare()?;

        let table = run_stage("features", || {
            let mut deriver = FeatureDeriver::new(&self.matcher);
            if let Some(percentile) = self.config.features.top_percentile {
                deriver = deriver.with_top_percentile(percentile)?;
            }
            let (table, issues) = deriver.derive(&products.products, &relation);
            audit.extend(issues);
            Ok(table)
        })?;

        let summary = run_stage("analysis", || {
            let names: Vec<String> = self
                .matcher
                .targets()
                .iter()
                .map(|t| t.target().name.clone())
                .collect();
            Ok(summarize(&table, &names, self.config.features.min_top_rating))
        })?;

        let written = run_stage("write", || {
            self.write_outputs(&products, &relation, &audit, &table, &summary)
        })?;

        audit.log_summary();
        if audit.has_inconsistent_duplicates() {
            warn!(
                count = audit.count("inconsistent_duplicate"),
                "Some duplicate observations disagree with their first occurrence; see logs"
            );
        }

        let finished_at = Utc::now();
        info!(
            products = products.len(),
            junction_rows = relation.len(),
            elapsed_ms = (finished_at - started_at).num_milliseconds(),
            "Pipeline completed"
        );

        Ok(PipelineOutcome {
            started_at,
            finished_at,
            observations,
            canonical_products: products.len(),
            junction_rows: relation.len(),
            audit,
            written,
        })
    }

    /// Run up to the audit stage and write only the two review reports
    pub fn run_audit(&self) -> AppResult<PipelineOutcome> {
        let started_at = Utc::now();
        let prepared = self.prepare()?;

        let written = run_stage("write", || {
            let mut outputs = StagedOutputs::new(&self.config.output.dir)?;
            outputs.stage(io::DUPLICATES_FILE, |w| {
                io::write_duplicates(w, &prepared.products.duplicates)
            })?;
            outputs.stage(io::INCOMPLETE_FILE, |w| {
                io::write_incomplete(w, prepared.audit.incomplete_lists())
            })?;
            outputs.commit()
        })?;

        prepared.audit.log_summary();
        Ok(PipelineOutcome {
            started_at,
            finished_at: Utc::now(),
            observations: prepared.observations,
            canonical_products: prepared.products.len(),
            junction_rows: prepared.relation.len(),
            audit: prepared.audit,
            written,
        })
    }

    fn write_outputs(
        &self,
        products: &DeduplicatedProducts,
        relation: &JunctionRelation,
        audit: &AuditReport,
        table: &FeatureTable,
        summary: &[IngredientSummary],
    ) -> AppResult<Vec<PathBuf>> {
        let mut outputs = StagedOutputs::new(&self.config.output.dir)?;
        outputs.stage(io::FEATURES_FILE, |w| io::write_features(w, table))?;
        if self.config.output.emit_junction {
            outputs.stage(io::JUNCTION_FILE, |w| io::write_junction(w, relation))?;
        }
        outputs.stage(io::DUPLICATES_FILE, |w| {
            io::write_duplicates(w, &products.duplicates)
        })?;
        outputs.stage(io::INCOMPLETE_FILE, |w| {
            io::write_incomplete(w, audit.incomplete_lists())
        })?;
        outputs.stage(io::SUMMARY_FILE, |w| io::write_summary(w, summary))?;
        outputs.commit()
    }
}
