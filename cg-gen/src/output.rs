//! CSV output sink.
//!
//! Every run gets its own timestamped directory holding `metadata.json`, the case and event
//! files, one file per lookup table and the transition graph in DOT format.

use std::fs::File;
use std::io::Write;
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
use petgraph::dot::Dot;
use petgraph::graph::DiGraph;
use serde_json::json;
use tracing::{
    debug,
    info,
    instrument,
};

use crate::lookup::LookupTable;
use crate::model::{
    LookupTableSchema,
    Record,
};
use crate::simulation::Dataset;
use crate::vocabulary::Vocabulary;

/// File the transition graph is written to.
pub const TRANSITION_GRAPH_FILE: &str = "transition_graph.dot";

/// Create `<base_dir>/<now>` (filesystem-friendly RFC 3339) and write run metadata, including
/// the effective configuration, into it.
#[instrument(skip(config))]
pub fn create_timestamped_output_dir(
    base_dir: &Path,
    now: DateTime<Utc>,
    seed: u64,
    config: &GenerationConfig,
) -> Result<PathBuf> {
    let timestamp = now.to_rfc3339().replace([':', '.', '+'], "-");
    let output_dir = base_dir.join(timestamp);
    std::fs::create_dir_all(&output_dir)?;

    let metadata = json!({
        "timestamp": now.to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "seed": seed,
        "config": config,
        "command_args": std::env::args().collect::<Vec<_>>()
    });

    let mut file = File::create(output_dir.join("metadata.json"))?;
    file.write_all(serde_json::to_string_pretty(&metadata)?.as_bytes())?;

    Ok(output_dir)
}

/// Write every part of `dataset` into `output_dir`; returns the paths written.
#[instrument(skip_all, fields(output_dir = %output_dir.display()))]
pub fn write_dataset(
    output_dir: &Path,
    config: &GenerationConfig,
    vocabulary: &Vocabulary,
    dataset: &Dataset,
) -> Result<Vec<PathBuf>> {
    let schema = vocabulary.schema();
    let prefix = &config.file_name_prefix;
    let mut written = Vec::new();

    let cases_path = output_dir.join(format!("{prefix}s-{}.csv", dataset.cases.len()));
    write_records_csv(&cases_path, schema.cases.headers(), &dataset.cases)?;
    written.push(cases_path);

    let events_path = output_dir.join(format!("{prefix}Events-{}.csv", dataset.events.len()));
    write_records_csv(&events_path, schema.events.headers(), &dataset.events)?;
    written.push(events_path);

    for table in vocabulary.lookups().iter() {
        let Some(definition) = schema.data.iter().find(|d| d.name == table.name()) else { continue };
        let path = output_dir.join(format!("{}.csv", table.name()));
        write_lookup_csv(&path, definition, table)?;
        written.push(path);
    }

    written.push(write_transition_graph(output_dir, &vocabulary.transition_graph())?);

    info!(files = written.len(), "Dataset written");
    Ok(written)
}

/// Write `records` to `path` under a header row of display names.
pub fn write_records_csv<'a>(
    path: &Path,
    headers: impl IntoIterator<Item = &'a str>,
    records: &[Record],
) -> cg_core::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(headers)?;
    for record in records {
        writer.write_record(record.values().map(ToString::to_string))?;
    }
    writer.flush()?;

    debug!(records = records.len(), "Wrote {}", path.display());
    Ok(())
}

/// Write one lookup table: primary-key columns get the id, `is_lookup` columns the value.
pub fn write_lookup_csv(path: &Path, definition: &LookupTableSchema, table: &LookupTable) -> cg_core::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(definition.columns.iter().map(|c| c.display_name.as_str()))?;
    for (id, value) in table.rows() {
        writer.write_record(definition.columns.iter().map(|c| {
            if c.primary_key {
                id.to_string()
            } else if c.is_lookup {
                value.to_owned()
            } else {
                String::new()
            }
        }))?;
    }
    writer.flush()?;

    debug!(rows = table.len(), "Wrote {}", path.display());
    Ok(())
}

/// Render the transition graph as Graphviz DOT into [`TRANSITION_GRAPH_FILE`].
fn write_transition_graph(output_dir: &Path, graph: &DiGraph<String, f64>) -> Result<PathBuf> {
    let path = output_dir.join(TRANSITION_GRAPH_FILE);
    std::fs::write(&path, Dot::new(graph).to_string())?;

    debug!(nodes = graph.node_count(), edges = graph.edge_count(), "Wrote {}", path.display());
    Ok(path)
}
