//! Run-wide record of every distinct variant and every distinct sequence produced so far.
//!
//! The registry only ever grows. It is owned by whoever drives the run and handed to the
//! variant generator by `&mut`, so all cap decisions see one serialised view of it.

use std::collections::{
    HashMap,
    HashSet,
};
use std::fmt;
use std::ops::Deref;

use rand::seq::SliceRandom;
use rand::Rng;

/// Separator used when printing variants.
const ARROW: &str = "->";

/// The ordered event names of one case. Identity is the full sequence.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Variant(Vec<String>);

impl Variant {
    /// Wrap a completed path.
    #[must_use]
    pub fn new(events: Vec<String>) -> Self {
        Self(events)
    }
}

impl Deref for Variant {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(ARROW))
    }
}

/// One transition actually used by some variant.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct Sequence {
    /// Event the transition leaves from.
    source: String,
    /// Event the transition leads to.
    target: String,
}

/// Append-only registry of unique variants and sequences.
#[derive(Clone, Debug, Default)]
pub struct VariantRegistry {
    /// Distinct variants.
    variants: HashSet<Variant>,
    /// Distinct variants in the order they were first seen; replay draws from here.
    history: Vec<Variant>,
    /// Distinct sequences.
    sequences: HashSet<Sequence>,
    /// Source event → targets of recorded sequences, in the order they were first seen.
    successors: HashMap<String, Vec<String>>,
}

impl VariantRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct variants recorded.
    #[must_use]
    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }

    /// Number of distinct sequences recorded.
    #[must_use]
    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    /// Whether `variant` has been recorded.
    #[must_use]
    pub fn contains_variant(&self, variant: &Variant) -> bool {
        self.variants.contains(variant)
    }

    /// Whether the `source -> target` sequence has been recorded.
    #[must_use]
    pub fn contains_sequence(&self, source: &str, target: &str) -> bool {
        self.successors.get(source).is_some_and(|targets| targets.iter().any(|t| t == target))
    }

    /// Record a variant; returns `true` if it was new.
    pub fn record_variant(&mut self, variant: &Variant) -> bool {
        if self.contains_variant(variant) {
            return false;
        }
        self.variants.insert(variant.clone());
        self.history.push(variant.clone());
        true
    }

    /// Record a sequence; returns `true` if it was new.
    pub fn record_sequence(&mut self, source: &str, target: &str) -> bool {
        if self.contains_sequence(source, target) {
            return false;
        }
        self.sequences.insert(Sequence { source: source.to_owned(), target: target.to_owned() });
        self.successors.entry(source.to_owned()).or_default().push(target.to_owned());
        true
    }

    /// Targets of every recorded sequence leaving `source`.
    #[must_use]
    pub fn successors(&self, source: &str) -> &[String] {
        self.successors.get(source).map(Vec::as_slice).unwrap_or_default()
    }

    /// Distinct variants in first-seen order.
    #[must_use]
    pub fn variants(&self) -> &[Variant] {
        &self.history
    }

    /// Uniformly pick one previously recorded variant.
    pub fn replay<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Variant> {
        self.history.choose(rng)
    }
}
