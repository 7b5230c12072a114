use anyhow::Result;
use clap::{Parser, Subcommand};
use skincare_ingredients::config::PipelineConfig;
use skincare_ingredients::errors::error_logging;
use skincare_ingredients::observability;
use skincare_ingredients::pipeline::{Pipeline, PipelineOutcome};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "skincare-ingredients")]
#[command(about = "Normalize scraped skincare ingredient lists into relational features")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write every output
    Run {
        /// Scraped product CSV
        #[arg(long)]
        input: Option<PathBuf>,
        /// Newline-delimited noise phrases to strip
        #[arg(long)]
        noise_phrases: Option<PathBuf>,
        /// Newline-delimited product keys to exclude
        #[arg(long)]
        exclude: Option<PathBuf>,
        /// Feature configuration JSON
        #[arg(long)]
        feature_config: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Fraction of each ingredient list used for the top-portion feature
        #[arg(long)]
        top_percentile: Option<f64>,
        /// Skip writing junction.csv
        #[arg(long)]
        no_junction: bool,
        /// Abort when duplicate observations disagree
        #[arg(long)]
        strict_duplicates: bool,
    },
    /// Write only the duplicate and incomplete-list review reports
    Audit {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        noise_phrases: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Print the ingredient tokens parsed from a single list
    Tokenize {
        text: String,
        #[arg(long)]
        noise_phrases: Option<PathBuf>,
    },
}

fn print_outcome(outcome: &PipelineOutcome) {
    println!("Observations read:   {}", outcome.observations);
    println!("Canonical products:  {}", outcome.canonical_products);
    println!("Junction rows:       {}", outcome.junction_rows);
    for kind in [
        "missing_data",
        "structural_ambiguity",
        "inconsistent_duplicate",
        "zero_denominator",
    ] {
        println!("{:<21}{}", format!("{}:", kind), outcome.audit.count(kind));
    }
    for path in &outcome.written {
        println!("Wrote {}", path.display());
    }
}

fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = PipelineConfig::from_env()?;

    let metrics_handle = observability::init_observability(&config.observability)?;
    let metrics_path = config.observability.metrics_output_path.clone();

    match cli.command {
        Commands::Run {
            input,
            noise_phrases,
            exclude,
            feature_config,
            output_dir,
            top_percentile,
            no_junction,
            strict_duplicates,
        } => {
            if let Some(path) = input {
                config.input.products_path = path;
            }
            if noise_phrases.is_some() {
                config.input.noise_phrases_path = noise_phrases;
            }
            if exclude.is_some() {
                config.input.exclusion_path = exclude;
            }
            if feature_config.is_some() {
                config.input.feature_config_path = feature_config;
            }
            if let Some(dir) = output_dir {
                config.output.dir = dir;
            }
            if top_percentile.is_some() {
                config.features.top_percentile = top_percentile;
            }
            config.output.emit_junction &= !no_junction;
            config.strict_duplicates |= strict_duplicates;

            let pipeline = Pipeline::from_config(config).inspect_err(|e| {
                error_logging::log_config_error(e, "pipeline", "load configuration");
            })?;
            let outcome = pipeline.run()?;
            print_outcome(&outcome);
        }
        Commands::Audit {
            input,
            noise_phrases,
            output_dir,
        } => {
            if let Some(path) = input {
                config.input.products_path = path;
            }
            if noise_phrases.is_some() {
                config.input.noise_phrases_path = noise_phrases;
            }
            if let Some(dir) = output_dir {
                config.output.dir = dir;
            }

            let pipeline = Pipeline::from_config(config).inspect_err(|e| {
                error_logging::log_config_error(e, "pipeline", "load configuration");
            })?;
            let outcome = pipeline.run_audit()?;
            print_outcome(&outcome);
        }
        Commands::Tokenize {
            text,
            noise_phrases,
        } => {
            if noise_phrases.is_some() {
                config.input.noise_phrases_path = noise_phrases;
            }
            let pipeline = Pipeline::from_config(config)?;
            let parsed = pipeline.parser().parse(Some(&text));
            info!(token_count = parsed.tokens.len(), "Tokenized ingredient list");
            for token in &parsed.tokens {
                println!("{}", token);
            }
        }
    }

    if let (Some(handle), Some(path)) = (&metrics_handle, &metrics_path) {
        observability::write_metrics_snapshot(handle, path)?;
    }

    Ok(())
}
