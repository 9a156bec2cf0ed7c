//! Run orchestration.
//!
//! A run goes through three phases, coordinated by [`run`]:
//! 1. Vocabulary loading - parse the document, inject dynamic attributes, validate
//! 2. Generation - all case records first, then one variant (and its events) per case, in case
//!    order, against a single [`VariantRegistry`]
//! 3. Output - hand the dataset to the CSV sink in [`crate::output`]

use std::path::{
    Path,
    PathBuf,
};

use anyhow::Result;
use cg_core::GenerationConfig;
use chrono::{
    DateTime,
    Utc,
};
use indicatif::{
    ProgressBar,
    ProgressFinish,
    ProgressStyle,
};
use rand::rngs::StdRng;
use rand::{
    Rng,
    SeedableRng,
};
use tracing::{
    info,
    instrument,
    warn,
};

use crate::model::Record;
use crate::output;
use crate::records::RecordMaterializer;
use crate::registry::VariantRegistry;
use crate::variants::VariantGenerator;
use crate::vocabulary::{
    Vocabulary,
    VocabularyDocument,
};

/// Counts reported at the end of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Case records produced.
    pub cases: usize,
    /// Event records produced.
    pub events: usize,
    /// Distinct variants in the registry.
    pub variants: usize,
    /// Distinct sequences in the registry.
    pub sequences: usize,
}

/// Everything one run produced.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    /// Case records, ordered by id.
    pub cases: Vec<Record>,
    /// Event records, grouped by case and ordered by id.
    pub events: Vec<Record>,
    /// Final counts.
    pub summary: RunSummary,
}

/// End-to-end run: load the vocabulary at `vocabulary_path`, generate, and write the CSV
/// output under `output_dir`. Returns the summary and the directory the run was written to.
#[instrument(skip(config), fields(cases = config.number_of_cases))]
pub fn run(config: &GenerationConfig, vocabulary_path: &Path, output_dir: &Path) -> Result<(RunSummary, PathBuf)> {
    config.validate()?;

    let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
    info!(seed, "Seeding random number generator");
    let mut rng = StdRng::seed_from_u64(seed);

    let document = VocabularyDocument::from_path(vocabulary_path)?.with_dynamic_attributes(
        config.dynamic_attrs,
        config.unique_values_for_dynamic_attrs,
        &mut rng,
    );
    let vocabulary = Vocabulary::build(document)?;

    let now = Utc::now();
    let dataset = generate_dataset(&vocabulary, config, now, &mut rng)?;
    report(config, &dataset.summary);

    let run_dir = output::create_timestamped_output_dir(output_dir, now, seed, config)?;
    output::write_dataset(&run_dir, config, &vocabulary, &dataset)?;
    info!("Output written to: {}", run_dir.display());

    Ok((dataset.summary, run_dir))
}

/// Generate every case and its events.
///
/// Case `k` (1-based) gets id `k`; event ids run from 1 across the whole dataset.
#[instrument(skip_all, fields(cases = config.number_of_cases))]
pub fn generate_dataset<R: Rng + ?Sized>(
    vocabulary: &Vocabulary,
    config: &GenerationConfig,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Dataset> {
    let total = config.number_of_cases;
    let materializer = RecordMaterializer::new(vocabulary, config, now);
    let generator = VariantGenerator::new(vocabulary, config);
    let mut registry = VariantRegistry::new();

    let mut cases = Vec::new();
    let pb = progress_bar(total, config.show_progress, "cases", "Generating cases")?;
    for case_id in 1..=total {
        cases.push(materializer.case_record(case_id, rng)?);
        pb.inc(1);
    }
    drop(pb);

    let mut events = Vec::new();
    let mut next_event_id = 1;
    let pb = progress_bar(total, config.show_progress, "cases", "Generating events")?;
    for case in &cases {
        let start = materializer.start_time(case.id, total, rng)?;
        let variant = generator.next_variant(&mut registry, rng)?;
        events.extend(materializer.event_records(case, &variant, start, &mut next_event_id, rng)?);
        pb.inc(1);
    }
    drop(pb);

    let summary = RunSummary {
        cases: cases.len(),
        events: events.len(),
        variants: registry.variant_count(),
        sequences: registry.sequence_count(),
    };
    Ok(Dataset { cases, events, summary })
}

/// Log the run summary and warn about caps the graph could not fill.
pub fn report(config: &GenerationConfig, summary: &RunSummary) {
    if config.show_summary {
        info!(
            cases = summary.cases,
            events = summary.events,
            variants = summary.variants,
            sequences = summary.sequences,
            "Generation finished"
        );
    }

    if let Some(cap) = config.variant_cap() {
        if summary.variants < cap {
            warn!(cap, generated = summary.variants, "Unique variants fell short of max_variants");
        }
    }
    if let Some(cap) = config.sequence_cap() {
        if summary.sequences < cap {
            warn!(cap, generated = summary.sequences, "Unique sequences fell short of max_sequences");
        }
    }
}

/// Progress bar over `len` items, or a hidden one when progress display is off.
fn progress_bar(len: u64, visible: bool, unit: &str, message: &'static str) -> Result<ProgressBar> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }

    let style = ProgressStyle::default_bar().template(&format!(
        "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {unit} ({{percent}}%) {{msg}}"
    ))?;
    Ok(ProgressBar::new(len)
        .with_style(style)
        .with_message(message)
        .with_finish(ProgressFinish::AndLeave))
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use chrono::TimeZone;
    use rstest::*;
    use serde_json::json;
    use tracing_test::traced_test;

    use super::*;
    use crate::model::FieldValue;

    #[fixture]
    fn vocab() -> Vocabulary {
        let raw = json!({
            "__schema__": {
                "cases": {"columns": [
                    {"name": "id", "display_name": "Id", "primary_key": true},
                    {"name": "region", "display_name": "Region"}
                ]},
                "events": {"columns": [
                    {"name": "id", "display_name": "Id", "primary_key": true},
                    {"name": "case_id", "display_name": "CaseId", "is_case_id": true},
                    {"name": "activity", "display_name": "Activity", "event_action": true},
                    {"name": "timestamp", "display_name": "Timestamp", "event_date": true}
                ]}
            },
            "__final_events__": {"Done": true},
            "__initial_events__": {"Open": 1},
            "Open": {"Work": 1, "Done": 1},
            "Work": {"Work": 1, "Done": 1},
            "region": {"north": 1, "south": 1}
        });
        Vocabulary::build(VocabularyDocument::parse(&raw.to_string()).unwrap()).unwrap()
    }

    fn config() -> GenerationConfig {
        GenerationConfig::default()
            .number_of_cases(40)
            .min_events(2)
            .max_events(6)
            .show_progress(false)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 8, 30, 0).unwrap()
    }

    #[rstest]
    fn test_generate_dataset(vocab: Vocabulary) {
        let mut rng = StdRng::seed_from_u64(99);
        let dataset = generate_dataset(&vocab, &config(), now(), &mut rng).unwrap();

        assert_eq!(dataset.summary.cases, 40);
        assert_eq!(dataset.cases.iter().map(|c| c.id).collect::<Vec<_>>(), (1..=40).collect::<Vec<_>>());
        assert_eq!(dataset.summary.events, dataset.events.len());
        assert_eq!(dataset.events.iter().map(|e| e.id).collect::<Vec<_>>(), (1..=dataset.events.len() as u64).collect::<Vec<_>>());
        assert_ge!(dataset.summary.variants, 1);

        // events of a case are contiguous and every case has at least its initial event
        let mut seen_cases = Vec::new();
        for event in &dataset.events {
            let Some(FieldValue::Integer(case_id)) = event.get("CaseId") else { panic!("missing case id") };
            if seen_cases.last() != Some(case_id) {
                assert!(!seen_cases.contains(case_id));
                seen_cases.push(*case_id);
            }
        }
        assert_eq!(seen_cases.len(), 40);
    }

    #[rstest]
    fn test_generate_dataset_is_reproducible(vocab: Vocabulary) {
        let first = generate_dataset(&vocab, &config(), now(), &mut StdRng::seed_from_u64(4)).unwrap();
        let second = generate_dataset(&vocab, &config(), now(), &mut StdRng::seed_from_u64(4)).unwrap();
        assert_eq!(first.cases, second.cases);
        assert_eq!(first.events, second.events);
    }

    #[rstest]
    #[traced_test]
    fn test_report_warns_on_unfilled_caps() {
        let config = config().max_variants(Some(50)).max_sequences(Some(50));
        let summary = RunSummary { cases: 10, events: 30, variants: 3, sequences: 4 };
        report(&config, &summary);

        assert!(logs_contain("Generation finished"));
        assert!(logs_contain("Unique variants fell short of max_variants"));
        assert!(logs_contain("Unique sequences fell short of max_sequences"));
    }

    #[rstest]
    #[traced_test]
    fn test_report_quiet() {
        let config = config().max_variants(Some(3)).show_summary(false);
        let summary = RunSummary { cases: 10, events: 30, variants: 3, sequences: 4 };
        report(&config, &summary);

        assert!(!logs_contain("Generation finished"));
        assert!(!logs_contain("fell short"));
    }
}
