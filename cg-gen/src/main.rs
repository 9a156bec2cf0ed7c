#![deny(
    clippy::nursery,
    clippy::pedantic,
    missing_docs,
    clippy::missing_docs_in_private_items,
)]
//! `CaseGen` command line interface.
//!
//! Generates a synthetic case/event log from a vocabulary file. Settings come from the stock
//! defaults, optionally replaced by a YAML file (`--config`), then overridden flag by flag.
//! See binary --help for more information

use std::path::PathBuf;

use anyhow::Result;
use cg_core::GenerationConfig;
use clap::Parser;
use tracing::info;

/// cg-gen command-line interface to generate synthetic case and event logs from a weighted
/// vocabulary
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Vocabulary file: transition graph, attribute vocabularies and schema.
    #[arg(long, default_value = "vocabulary.json")]
    vocabulary: PathBuf,

    /// YAML file with generation settings; flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the timestamped run directory is created in.
    #[arg(short, long, default_value = "out")]
    output_dir: PathBuf,

    /// Logging verbosity level (`trace`, `debug`, `info`, `warn`, `error`).
    #[arg(short, long, default_value = "info")]
    verbosity: String,

    /// Seed for the random source.
    #[arg(long)]
    seed: Option<u64>,

    /// Number of cases to generate.
    #[arg(short = 'n', long)]
    cases: Option<u64>,

    /// How many years back case start times may reach.
    #[arg(long)]
    timeframe: Option<f64>,

    /// Minimum number of events per case.
    #[arg(long)]
    min_events: Option<usize>,

    /// Maximum number of events per case.
    #[arg(long)]
    max_events: Option<usize>,

    /// Minimum days between consecutive events.
    #[arg(long)]
    min_days: Option<u32>,

    /// Maximum days between consecutive events.
    #[arg(long)]
    max_days: Option<u32>,

    /// Minimum hours between consecutive events.
    #[arg(long)]
    min_hours: Option<u32>,

    /// Maximum hours between consecutive events.
    #[arg(long)]
    max_hours: Option<u32>,

    /// Minimum minutes between consecutive events.
    #[arg(long)]
    min_minutes: Option<u32>,

    /// Maximum minutes between consecutive events.
    #[arg(long)]
    max_minutes: Option<u32>,

    /// Percentage of cases (0-100) that start within the last day.
    #[arg(long)]
    recent_frequency: Option<f64>,

    /// Cap on distinct variants (0 disables the cap).
    #[arg(long)]
    max_variants: Option<usize>,

    /// Cap on distinct event-to-event sequences (0 disables the cap).
    #[arg(long)]
    max_sequences: Option<usize>,

    /// Number of synthetic case attributes to add.
    #[arg(long)]
    dynamic_attrs: Option<usize>,

    /// Distinct values per synthetic case attribute.
    #[arg(long)]
    unique_values: Option<usize>,

    /// Prefix for the generated file names.
    #[arg(long)]
    prefix: Option<String>,

    /// Do not draw progress bars.
    #[arg(long)]
    no_progress: bool,

    /// Do not log the end-of-run summary.
    #[arg(long)]
    no_summary: bool,
}

impl Cli {
    /// Layer the command-line overrides on top of `config`.
    fn apply_overrides(&self, mut config: GenerationConfig) -> GenerationConfig {
        /// Overwrite `$field` when the flag was given.
        macro_rules! set {
            ($flag:expr => $field:ident) => {
                if let Some(value) = $flag.clone() {
                    config.$field = value;
                }
            };
        }

        set!(self.cases => number_of_cases);
        set!(self.timeframe => timeframe_years);
        set!(self.min_events => min_events);
        set!(self.max_events => max_events);
        set!(self.min_days => min_days_between_events);
        set!(self.max_days => max_days_between_events);
        set!(self.min_hours => min_hours_between_events);
        set!(self.max_hours => max_hours_between_events);
        set!(self.min_minutes => min_minutes_between_events);
        set!(self.max_minutes => max_minutes_between_events);
        set!(self.recent_frequency => recent_event_frequency);
        set!(self.dynamic_attrs => dynamic_attrs);
        set!(self.unique_values => unique_values_for_dynamic_attrs);
        set!(self.prefix => file_name_prefix);

        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.max_variants.is_some() {
            config.max_variants = self.max_variants;
        }
        if self.max_sequences.is_some() {
            config.max_sequences = self.max_sequences;
        }
        config.show_progress &= !self.no_progress;
        config.show_summary &= !self.no_summary;
        config
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    cg_core::logging::setup(&args.verbosity);

    let config = match &args.config {
        Some(path) => GenerationConfig::from_yaml_file(path)?,
        None => GenerationConfig::default(),
    };
    let config = args.apply_overrides(config);
    info!("Generating {} cases from {}", config.number_of_cases, args.vocabulary.display());

    cg_gen::simulation::run(&config, &args.vocabulary, &args.output_dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overrides() {
        let args = Cli::parse_from([
            "cg-gen",
            "--cases",
            "12",
            "--max-variants",
            "4",
            "--prefix",
            "Ticket",
            "--no-progress",
        ]);
        let config = args.apply_overrides(GenerationConfig::default().max_events(7));

        assert_eq!(config.number_of_cases, 12);
        assert_eq!(config.max_variants, Some(4));
        assert_eq!(config.file_name_prefix, "Ticket");
        assert_eq!(config.max_events, 7);
        assert!(!config.show_progress);
        assert!(config.show_summary);
    }
}
