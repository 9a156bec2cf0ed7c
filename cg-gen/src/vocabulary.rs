//! Vocabulary loading.
//!
//! A vocabulary document is a JSON object whose keys are node names mapped to
//! `{ next value: weight }` objects, plus two reserved sections: [`SCHEMA_KEY`] and
//! [`FINAL_EVENTS_KEY`]. Event nodes form the transition graph; every other node (e.g.
//! `"priority": {"High": 1, "Low": 3}`) is simply a weighted attribute vocabulary that schema
//! columns sample from.
//!
//! Loading happens in two pure steps, both before any generation starts:
//! 1. [`VocabularyDocument::parse`] – decode the raw document, optionally followed by
//!    [`VocabularyDocument::with_dynamic_attributes`] to inject synthetic case attributes.
//! 2. [`Vocabulary::build`] – turn the document into immutable weighted distributions, the
//!    final-event set and the lookup tables, validating every reference the schema makes.

use std::collections::{
    HashMap,
    HashSet,
};
use std::path::Path;

use cg_core::{
    CaseGenError,
    Result,
};
use petgraph::graph::{
    DiGraph,
    NodeIndex,
};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::de::Error as _;
use serde_json::{
    Map,
    Value,
};
use tracing::{
    debug,
    info,
    instrument,
};

use crate::lookup::LookupTables;
use crate::model::{
    Column,
    Schema,
};
use crate::sampler::WeightedDistribution;

/// Reserved key holding the schema description.
pub const SCHEMA_KEY: &str = "__schema__";
/// Reserved key holding the set of terminal events.
pub const FINAL_EVENTS_KEY: &str = "__final_events__";
/// Node whose edges are the valid start events of every variant.
pub const INITIAL_EVENTS_KEY: &str = "__initial_events__";

/// Shortest generated dynamic-attribute value.
const DYNAMIC_VALUE_MIN_LEN: usize = 8;
/// Longest generated dynamic-attribute value.
const DYNAMIC_VALUE_MAX_LEN: usize = 15;

/// One weighted node as written in the document.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeDefinition {
    /// Node name, as spelled in the document.
    pub name: String,
    /// `(next value, weight)` pairs in document order.
    pub edges: Vec<(String, f64)>,
}

impl NodeDefinition {
    /// Decode a `{ value: weight }` object; weights must be positive numbers.
    fn from_value(name: String, value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(malformed(format!("node \"{name}\" must map next values to weights")));
        };

        let mut edges = Vec::with_capacity(map.len());
        for (target, weight) in map {
            match weight.as_f64() {
                Some(w) if w.is_finite() && w > 0.0 => edges.push((target, w)),
                _ => {
                    return Err(malformed(format!(
                        "weight of \"{name}\" -> \"{target}\" must be a positive number, got: {weight}"
                    )))
                },
            }
        }
        Ok(Self { name, edges })
    }
}

/// The parsed, not yet validated, vocabulary definition.
#[derive(Clone, Debug, PartialEq)]
pub struct VocabularyDocument {
    /// Column layout of every record type.
    pub schema: Schema,
    /// Events a variant may end on.
    pub final_events: Vec<String>,
    /// Every non-reserved node, in document order.
    pub nodes: Vec<NodeDefinition>,
}

impl VocabularyDocument {
    /// Read and parse a vocabulary file.
    pub fn from_path(path: &Path) -> Result<Self> {
        info!("Loading vocabulary from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse a vocabulary document.
    pub fn parse(contents: &str) -> Result<Self> {
        let items: Map<String, Value> = serde_json::from_str(contents)?;

        let mut schema = None;
        let mut final_events = Vec::new();
        let mut nodes = Vec::new();
        for (key, value) in items {
            match key.as_str() {
                SCHEMA_KEY => schema = Some(serde_json::from_value(value)?),
                FINAL_EVENTS_KEY => {
                    let markers: Map<String, Value> = serde_json::from_value(value)?;
                    final_events = markers.into_iter().map(|(event, _)| event).collect();
                },
                _ => nodes.push(NodeDefinition::from_value(key, value)?),
            }
        }

        let schema = schema.ok_or_else(|| CaseGenError::missing_key(SCHEMA_KEY))?;
        Ok(Self { schema, final_events, nodes })
    }

    /// Inject `count` synthetic case attributes, each drawing uniformly from
    /// `unique_values` distinct random strings.
    ///
    /// Attribute `i` adds case column `dynamic_<i>` (displayed as `Dynamic<i>`) backed by a new
    /// node `Dynamic_<i>`.
    #[must_use]
    pub fn with_dynamic_attributes<R: Rng + ?Sized>(mut self, count: usize, unique_values: usize, rng: &mut R) -> Self {
        for i in 1..=count {
            let values = unique_words(unique_values, rng);
            #[allow(clippy::cast_precision_loss)]
            let weight = if values.is_empty() { 1.0 } else { 1.0 / values.len() as f64 };

            let node = format!("Dynamic_{i}");
            self.schema.cases.columns.push(Column {
                name: node.to_lowercase(),
                display_name: node.replace('_', ""),
                column_type: "varchar(50)".into(),
                nullable: true,
                ..Column::default()
            });
            self.nodes.push(NodeDefinition {
                name: node,
                edges: values.into_iter().map(|v| (v, weight)).collect(),
            });
        }
        if count > 0 {
            debug!(count, unique_values, "Injected dynamic case attributes");
        }
        self
    }
}

/// Draw `count` distinct alphanumeric strings, in draw order.
fn unique_words<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<String> {
    let mut seen = HashSet::with_capacity(count);
    let mut words = Vec::with_capacity(count);
    while words.len() < count {
        let len = rng.gen_range(DYNAMIC_VALUE_MIN_LEN..=DYNAMIC_VALUE_MAX_LEN);
        let word: String = (0..len).map(|_| char::from(rng.sample(Alphanumeric))).collect();
        if seen.insert(word.clone()) {
            words.push(word);
        }
    }
    words
}

/// Wrap a message as a [`CaseGenError::MalformedVocabularyDocument`].
fn malformed(msg: String) -> CaseGenError {
    CaseGenError::MalformedVocabularyDocument(serde_json::Error::custom(msg))
}

/// Immutable, validated vocabulary: one weighted distribution per node, the final-event set,
/// the schema and its lookup tables.
#[derive(Clone, Debug)]
pub struct Vocabulary {
    /// Column layout of every record type.
    schema: Schema,
    /// Lower-cased node name → outgoing distribution.
    nodes: HashMap<String, WeightedDistribution>,
    /// Final events in document order.
    final_events: Vec<String>,
    /// Membership index for `final_events`.
    final_event_set: HashSet<String>,
    /// Foreign-key lookup tables.
    lookups: LookupTables,
}

impl Vocabulary {
    /// Build the vocabulary from a parsed document.
    ///
    /// Node names are matched case-insensitively (a later definition replaces an earlier one);
    /// event names and final events are matched exactly.
    #[instrument(skip(document), fields(nodes = document.nodes.len()))]
    pub fn build(document: VocabularyDocument) -> Result<Self> {
        let VocabularyDocument { schema, final_events, nodes: definitions } = document;

        let mut nodes = HashMap::with_capacity(definitions.len());
        for NodeDefinition { name, edges } in definitions {
            nodes.insert(name.to_lowercase(), WeightedDistribution::new(name, edges));
        }

        let lookups = LookupTables::build(&schema, |category| nodes.get(&category.to_lowercase()))?;
        let final_event_set = final_events.iter().cloned().collect();
        let vocabulary = Self { schema, nodes, final_events, final_event_set, lookups };
        vocabulary.validate()?;

        info!(
            nodes = vocabulary.nodes.len(),
            final_events = vocabulary.final_events.len(),
            lookup_tables = vocabulary.lookups.len(),
            "Vocabulary loaded"
        );
        Ok(vocabulary)
    }

    /// Check that every node the generator and materializer will ask for exists.
    fn validate(&self) -> Result<()> {
        self.distribution(INITIAL_EVENTS_KEY)?;

        for column in self.schema.cases.columns.iter().filter(|c| !c.primary_key) {
            self.distribution(&column.name)?;
        }
        for column in &self.schema.events.columns {
            if column.primary_key || column.is_case_id || column.event_date {
                continue;
            }
            if !column.event_action {
                self.distribution(&column.name)?;
            }
            if column.is_foreign_key() && self.lookups.get(&column.name).is_none() {
                return Err(CaseGenError::missing_key(&column.name));
            }
        }
        Ok(())
    }

    /// The schema, including any injected dynamic attributes.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Foreign-key lookup tables.
    #[must_use]
    pub fn lookups(&self) -> &LookupTables {
        &self.lookups
    }

    /// Outgoing distribution of `key`.
    pub fn distribution(&self, key: &str) -> Result<&WeightedDistribution> {
        self.nodes.get(&key.to_lowercase()).ok_or_else(|| CaseGenError::missing_key(key))
    }

    /// Draw a weighted value from node `key`.
    pub fn sample<R: Rng + ?Sized>(&self, key: &str, rng: &mut R) -> Result<&str> {
        self.distribution(key)?.sample(rng)
    }

    /// Draw a weighted value from node `key`, considering only targets in `allowed`.
    pub fn sample_restricted<R, S>(&self, key: &str, allowed: &[S], rng: &mut R) -> Result<String>
    where
        R: Rng + ?Sized,
        S: AsRef<str>,
    {
        self.distribution(key)?.sample_restricted(allowed, rng)
    }

    /// Whether `event` ends a variant.
    #[must_use]
    pub fn is_final(&self, event: &str) -> bool {
        self.final_event_set.contains(event)
    }

    /// Final events in document order.
    #[must_use]
    pub fn final_events(&self) -> &[String] {
        &self.final_events
    }

    /// Translate `value` through the lookup table of `category`.
    pub fn resolve_foreign_key(&self, category: &str, value: &str) -> Result<u64> {
        self.lookups.resolve(category, value)
    }

    /// The event transition graph reachable from [`INITIAL_EVENTS_KEY`], with edge weights.
    ///
    /// Attribute nodes that no event leads to are left out.
    #[must_use]
    pub fn transition_graph(&self) -> DiGraph<String, f64> {
        let mut graph = DiGraph::new();
        let mut indices: HashMap<String, NodeIndex> = HashMap::new();
        let mut queue = vec![INITIAL_EVENTS_KEY.to_owned()];

        while let Some(name) = queue.pop() {
            let Some(dist) = self.nodes.get(&name.to_lowercase()) else { continue };
            let source = *indices.entry(name.to_lowercase()).or_insert_with(|| graph.add_node(name.clone()));
            for (target, weight) in dist.iter() {
                let key = target.to_lowercase();
                let target_idx = match indices.get(&key) {
                    Some(&idx) => idx,
                    None => {
                        let idx = graph.add_node(target.to_owned());
                        indices.insert(key, idx);
                        queue.push(target.to_owned());
                        idx
                    },
                };
                graph.update_edge(source, target_idx, weight);
            }
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rstest::*;
    use serde_json::json;

    use super::*;

    fn document() -> Value {
        json!({
            "__schema__": {
                "cases": {"columns": [
                    {"name": "id", "display_name": "Id", "primary_key": true},
                    {"name": "priority", "display_name": "Priority"}
                ]},
                "events": {"columns": [
                    {"name": "id", "display_name": "Id", "primary_key": true},
                    {"name": "case_id", "display_name": "CaseId", "is_case_id": true},
                    {"name": "activity", "display_name": "Activity", "event_action": true, "foreign_key": true},
                    {"name": "timestamp", "display_name": "Timestamp", "event_date": true}
                ]},
                "data": [{"name": "activities", "lookup_for": "activity", "columns": [
                    {"name": "id", "display_name": "Id", "primary_key": true},
                    {"name": "name", "display_name": "Name", "is_lookup": true}
                ]}]
            },
            "__final_events__": {"End": true},
            "__initial_events__": {"Start": 1},
            "Start": {"Work": 2, "End": 1},
            "Work": {"End": 1},
            "Priority": {"Low": 1, "High": 3},
            "activity": {"Start": 1, "Work": 1, "End": 1}
        })
    }

    #[rstest]
    fn test_parse_and_build() {
        let doc = VocabularyDocument::parse(&document().to_string()).unwrap();
        assert_eq!(doc.final_events, vec!["End"]);
        assert_eq!(doc.nodes.len(), 5);

        let vocab = Vocabulary::build(doc).unwrap();
        assert!(vocab.is_final("End"));
        assert!(!vocab.is_final("end"));
        assert_eq!(vocab.distribution("priority").unwrap().node(), "Priority");
        assert_eq!(vocab.resolve_foreign_key("activity", "Work").unwrap(), 2);
        assert_eq!(vocab.distribution("PRIORITY").unwrap().len(), 2);
    }

    #[rstest]
    #[case::not_json("{ nope")]
    #[case::bad_weight(r#"{"__schema__": {"cases": {"columns": []}, "events": {"columns": []}}, "A": {"B": -1}}"#)]
    #[case::bad_node(r#"{"__schema__": {"cases": {"columns": []}, "events": {"columns": []}}, "A": [1, 2]}"#)]
    #[case::bad_schema(r#"{"__schema__": {"cases": 3}}"#)]
    fn test_malformed(#[case] contents: &str) {
        let err = VocabularyDocument::parse(contents).unwrap_err();
        assert!(matches!(err, CaseGenError::MalformedVocabularyDocument(_)), "{err}");
    }

    #[rstest]
    fn test_missing_schema() {
        let err = VocabularyDocument::parse(r#"{"A": {"B": 1}}"#).unwrap_err();
        assert!(matches!(err, CaseGenError::MissingVocabularyKey { key } if key == SCHEMA_KEY));
    }

    #[rstest]
    #[case::initial_events(INITIAL_EVENTS_KEY)]
    #[case::case_column("Priority")]
    #[case::lookup_category("activity")]
    fn test_missing_node(#[case] removed: &str) {
        let mut raw = document();
        raw.as_object_mut().unwrap().remove(removed);

        let err = Vocabulary::build(VocabularyDocument::parse(&raw.to_string()).unwrap()).unwrap_err();
        assert!(matches!(err, CaseGenError::MissingVocabularyKey { key } if key.eq_ignore_ascii_case(removed)));
    }

    #[rstest]
    fn test_dynamic_attributes() {
        let mut rng = StdRng::seed_from_u64(11);
        let doc = VocabularyDocument::parse(&document().to_string())
            .unwrap()
            .with_dynamic_attributes(2, 4, &mut rng);

        let columns = &doc.schema.cases.columns;
        assert_eq!(columns.len(), 4);
        assert_eq!(columns[2].name, "dynamic_1");
        assert_eq!(columns[3].display_name, "Dynamic2");
        assert!(columns[3].nullable);

        let vocab = Vocabulary::build(doc).unwrap();
        let dist = vocab.distribution("dynamic_2").unwrap();
        assert_eq!(dist.len(), 4);
        assert_eq!(dist.values().collect::<HashSet<_>>().len(), 4);
        assert_lt!((dist.total_weight() - 1.0).abs(), 1e-9);
        for value in dist.values() {
            assert_ge!(value.len(), DYNAMIC_VALUE_MIN_LEN);
            assert_le!(value.len(), DYNAMIC_VALUE_MAX_LEN);
        }
    }

    #[rstest]
    fn test_transition_graph() {
        let vocab = Vocabulary::build(VocabularyDocument::parse(&document().to_string()).unwrap()).unwrap();
        let graph = vocab.transition_graph();

        // __initial_events__, Start, Work, End
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        assert!(graph.node_weights().all(|n| n != "Priority"));
    }
}
