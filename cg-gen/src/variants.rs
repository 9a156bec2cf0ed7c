//! Variant generation: a length-bounded, cap-constrained random walk over the transition graph.
//!
//! Each walk starts at an event drawn from [`INITIAL_EVENTS_KEY`], picks a target length in
//! `[min_events, max_events]`, and keeps sampling weighted transitions until it either reaches
//! that length or lands on a final event. On the last step only transitions into final events
//! are considered (when the current event has any).
//!
//! Two optional caps shape the walk:
//! - Once `max_variants` distinct variants exist, no new walk happens; a recorded variant is
//!   replayed instead.
//! - Once `max_sequences` distinct transitions exist, the walk prefers transitions that were
//!   already used. It only takes (and records) a new one when none of the recorded transitions
//!   out of the current event fit, so the transition count may overshoot the cap.

use cg_core::{
    CaseGenError,
    GenerationConfig,
    Result,
};
use rand::Rng;
use tracing::{
    instrument,
    trace,
};

use crate::registry::{
    Variant,
    VariantRegistry,
};
use crate::sampler::WeightedDistribution;
use crate::vocabulary::{
    Vocabulary,
    INITIAL_EVENTS_KEY,
};

/// Produces one variant per call, consulting and updating a [`VariantRegistry`].
#[derive(Clone, Debug)]
pub struct VariantGenerator<'a> {
    /// Source of the transition weights and the final-event set.
    vocabulary: &'a Vocabulary,
    /// Shortest walk, in events.
    min_events: usize,
    /// Longest walk, in events.
    max_events: usize,
    /// Distinct-variant cap, if configured.
    variant_cap: Option<usize>,
    /// Distinct-sequence cap, if configured.
    sequence_cap: Option<usize>,
}

impl<'a> VariantGenerator<'a> {
    /// Generator over `vocabulary` using the walk bounds and caps from `config`.
    #[must_use]
    pub fn new(vocabulary: &'a Vocabulary, config: &GenerationConfig) -> Self {
        Self {
            vocabulary,
            min_events: config.min_events.max(1),
            max_events: config.max_events.max(config.min_events.max(1)),
            variant_cap: config.variant_cap(),
            sequence_cap: config.sequence_cap(),
        }
    }

    /// Produce the variant for the next case.
    ///
    /// Every freshly walked variant is recorded in `registry`; once the variant cap is met a
    /// recorded one is replayed instead.
    pub fn next_variant<R: Rng + ?Sized>(&self, registry: &mut VariantRegistry, rng: &mut R) -> Result<Variant> {
        if self.variant_cap.is_some_and(|cap| registry.variant_count() >= cap) {
            if let Some(variant) = registry.replay(rng) {
                return Ok(variant.clone());
            }
        }

        let variant = self.walk(registry, rng)?;
        if registry.record_variant(&variant) {
            trace!(%variant, "New variant");
        }
        Ok(variant)
    }

    /// Perform one random walk.
    #[instrument(level = "trace", skip_all)]
    fn walk<R: Rng + ?Sized>(&self, registry: &mut VariantRegistry, rng: &mut R) -> Result<Variant> {
        let mut current = self.vocabulary.sample(INITIAL_EVENTS_KEY, rng)?.to_owned();
        let target_len = rng.gen_range(self.min_events..=self.max_events);

        let mut path = Vec::with_capacity(target_len);
        let mut done = self.vocabulary.is_final(&current);
        path.push(current.clone());

        while !done && path.len() < target_len {
            let last_step = path.len() == target_len - 1;
            let next = self.next_event(&current, last_step, registry, rng)?;
            done = self.vocabulary.is_final(&next);
            path.push(next.clone());
            current = next;
        }

        Ok(Variant::new(path))
    }

    /// Choose the event that follows `current`.
    fn next_event<R: Rng + ?Sized>(
        &self,
        current: &str,
        last_step: bool,
        registry: &mut VariantRegistry,
        rng: &mut R,
    ) -> Result<String> {
        if self.sequence_cap.is_some_and(|cap| registry.sequence_count() >= cap) {
            let reusable: Vec<&str> = registry
                .successors(current)
                .iter()
                .map(String::as_str)
                .filter(|event| !last_step || self.vocabulary.is_final(event))
                .collect();
            if !reusable.is_empty() {
                return self.vocabulary.sample_restricted(current, &reusable, rng);
            }
        }

        let next = self.sample_fresh(self.vocabulary.distribution(current)?, last_step, rng)?;
        if registry.record_sequence(current, &next) {
            trace!(source = current, target = %next, "New sequence");
        }
        Ok(next)
    }

    /// Sample a transition without regard to what has been used before.
    ///
    /// On the last step the draw is narrowed to final events; if `edges` has none, any edge
    /// will do and the variant ends at the length bound.
    fn sample_fresh<R: Rng + ?Sized>(&self, edges: &WeightedDistribution, last_step: bool, rng: &mut R) -> Result<String> {
        if last_step {
            match edges.sample_restricted(self.vocabulary.final_events(), rng) {
                Err(CaseGenError::EmptyCandidateSet { .. }) => {},
                result => return result,
            }
        }
        edges.sample(rng).map(str::to_owned)
    }
}
