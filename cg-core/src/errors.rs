//! Error types shared by every stage of a generation run.
//!
//! All of these are structural: they come from bad input data or a bad configuration, never
//! from a transient condition, so nothing in the crate retries on them.

use thiserror::Error;

/// Convenience alias used throughout the workspace.
pub type Result<T, E = CaseGenError> = std::result::Result<T, E>;

/// Fatal errors raised while loading a vocabulary or generating records.
#[derive(Error, Debug)]
pub enum CaseGenError {
    /// A node or lookup category was requested but never defined in the vocabulary.
    #[error(
        "missing key: \"{key}\"; make sure the vocabulary of attributes and events contains an entry for \"{key}\""
    )]
    MissingVocabularyKey {
        /// The node or category that could not be resolved.
        key: String,
    },

    /// No outgoing edge of `node` survived the requested restriction, and there was nothing to
    /// fall back to.
    #[error("no usable transition out of \"{node}\"; the transition graph is malformed")]
    EmptyCandidateSet {
        /// The node that has no usable outgoing edges.
        node: String,
    },

    /// The vocabulary document could not be parsed.
    #[error("malformed vocabulary document: {0}")]
    MalformedVocabularyDocument(#[from] serde_json::Error),

    /// A foreign-key value has no entry in its lookup table.
    #[error("value \"{value}\" is not present in lookup table \"{category}\"")]
    MissingLookupValue {
        /// Lookup category (the foreign-key column's internal name).
        category: String,
        /// The value that could not be translated.
        value: String,
    },

    /// A case start time or event timestamp fell outside the representable date range.
    #[error("timestamps of case {case_id} fall outside the supported date range; reduce timeframe_years or the gaps between events")]
    TimestampOutOfRange {
        /// The case whose timeline could not be built.
        case_id: u64,
    },

    /// The generation settings are inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed.
    #[error("malformed configuration file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialisation failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl CaseGenError {
    /// Shorthand for [`CaseGenError::MissingVocabularyKey`].
    #[must_use]
    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::MissingVocabularyKey { key: key.into() }
    }

    /// Shorthand for [`CaseGenError::EmptyCandidateSet`].
    #[must_use]
    pub fn empty_candidates(node: impl Into<String>) -> Self {
        Self::EmptyCandidateSet { node: node.into() }
    }
}
