#![deny(
    clippy::nursery,
    clippy::pedantic,
    missing_docs,
    clippy::missing_docs_in_private_items,
)]

//! # cg-gen – synthetic case and event log generator
//!
//! cg-gen reads a vocabulary (a weighted transition graph of event names, weighted attribute
//! vocabularies and a schema), walks the graph once per case to produce an event sequence (a
//! "variant"), and materialises cases and events as records ready for the CSV sink.
//!
//! ## Pipeline overview
//! 1. Vocabulary loading ([`VocabularyDocument::parse`], [`Vocabulary::build`]) – decode the
//!    document, inject dynamic case attributes, build one [`WeightedDistribution`] per node and
//!    the foreign-key [`LookupTables`](crate::lookup::LookupTables).
//! 2. Variant generation ([`VariantGenerator`]) – a length-bounded random walk per case that
//!    honours the `max_variants` and `max_sequences` caps recorded in a [`VariantRegistry`].
//! 3. Record materialisation ([`RecordMaterializer`]) – case attributes, start times, event ids,
//!    foreign-key resolution and event timestamps.
//! 4. Output ([`output::write_dataset`]) – CSV files, lookup tables and the transition graph.
//!
//! The entry point [`simulation::run`] strings these together; every random draw goes through a
//! caller-supplied [`rand::Rng`], so a fixed seed reproduces a run exactly.

pub mod lookup;
pub mod model;
pub mod output;
pub mod records;
pub mod registry;
pub mod sampler;
pub mod simulation;
pub mod variants;
pub mod vocabulary;

pub use model::{
    FieldValue,
    Record,
    Schema,
};
pub use records::RecordMaterializer;
pub use registry::{
    Variant,
    VariantRegistry,
};
pub use sampler::WeightedDistribution;
pub use simulation::{
    Dataset,
    RunSummary,
};
pub use variants::VariantGenerator;
pub use vocabulary::{
    Vocabulary,
    VocabularyDocument,
};
