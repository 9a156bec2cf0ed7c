//! Weighted random selection over a node's outgoing transitions.
//!
//! A [`WeightedDistribution`] is built once per vocabulary node and keeps the running
//! (cumulative) weight of each value. Sampling draws uniformly from `[0, total)` and picks the
//! first value whose cumulative weight reaches the draw.

use cg_core::{
    CaseGenError,
    Result,
};
use rand::Rng;

/// Cumulative weight table for the outgoing edges of one node.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedDistribution {
    /// Name of the node the edges leave from.
    node: String,
    /// Edge targets, in definition order.
    values: Vec<String>,
    /// Raw edge weights, aligned with `values`.
    weights: Vec<f64>,
    /// Running sum of `weights`; non-decreasing.
    cumulative: Vec<f64>,
}

impl WeightedDistribution {
    /// Build a distribution from `(value, weight)` pairs, preserving their order.
    pub fn new<I, S>(node: impl Into<String>, edges: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut values = Vec::new();
        let mut weights = Vec::new();
        let mut cumulative = Vec::new();
        let mut total = 0.0;

        for (value, weight) in edges {
            total += weight;
            values.push(value.into());
            weights.push(weight);
            cumulative.push(total);
        }

        Self { node: node.into(), values, weights, cumulative }
    }

    /// Name of the node this distribution belongs to.
    #[must_use]
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Number of edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the node has no outgoing edges at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether `value` is one of the edge targets.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }

    /// Edge targets, in definition order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(String::as_str)
    }

    /// `(value, weight)` pairs, in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(String::as_str).zip(self.weights.iter().copied())
    }

    /// Resolve a draw from `[0, total)` to a value.
    ///
    /// Draws that match nothing (rounding at the top of the range) resolve to the last value;
    /// only an empty distribution yields `None`.
    #[must_use]
    pub fn value_at(&self, draw: f64) -> Option<&str> {
        let idx = self.cumulative.partition_point(|&c| c < draw);
        self.values.get(idx).or_else(|| self.values.last()).map(String::as_str)
    }

    /// Draw one value, weighted by the edge weights.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&str> {
        let draw = rng.gen::<f64>() * self.total_weight();
        self.value_at(draw).ok_or_else(|| CaseGenError::empty_candidates(&self.node))
    }

    /// Narrow the distribution to the edges whose target is in `allowed`, with the surviving
    /// weights re-normalised to sum to 1.
    pub fn restrict<S: AsRef<str>>(&self, allowed: &[S]) -> Result<Self> {
        let kept: Vec<(&str, f64)> = self
            .iter()
            .filter(|(value, _)| allowed.iter().any(|a| a.as_ref() == *value))
            .collect();
        let total: f64 = kept.iter().map(|(_, w)| w).sum();
        if kept.is_empty() || total <= 0.0 {
            return Err(CaseGenError::empty_candidates(&self.node));
        }

        Ok(Self::new(self.node.clone(), kept.into_iter().map(|(value, w)| (value, w / total))))
    }

    /// Draw one value from the edges whose target is in `allowed`, keeping their relative
    /// weights. Fails with [`CaseGenError::EmptyCandidateSet`] when nothing survives.
    pub fn sample_restricted<R, S>(&self, allowed: &[S], rng: &mut R) -> Result<String>
    where
        R: Rng + ?Sized,
        S: AsRef<str>,
    {
        self.restrict(allowed)?.sample(rng).map(str::to_owned)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assertables::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rstest::*;

    use super::*;

    #[fixture]
    fn dist() -> WeightedDistribution {
        WeightedDistribution::new("Review", [("Approve", 1.0), ("Rework", 2.0), ("Reject", 7.0)])
    }

    #[rstest]
    fn test_build(dist: WeightedDistribution) {
        assert_eq!(dist.cumulative, vec![1.0, 3.0, 10.0]);
        assert_eq!(dist.total_weight(), 10.0);
        assert_eq!(dist.values().collect::<Vec<_>>(), vec!["Approve", "Rework", "Reject"]);
    }

    #[rstest]
    #[case(0.0, "Approve")]
    #[case(1.0, "Approve")]
    #[case(1.000_001, "Rework")]
    #[case(3.0, "Rework")]
    #[case(9.999, "Reject")]
    #[case(10.5, "Reject")]
    fn test_value_at(dist: WeightedDistribution, #[case] draw: f64, #[case] expected: &str) {
        assert_eq!(dist.value_at(draw), Some(expected));
    }

    #[rstest]
    fn test_sample_frequencies(dist: WeightedDistribution) {
        let mut rng = StdRng::seed_from_u64(7);
        let draws = 20_000;
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for _ in 0..draws {
            *counts.entry(dist.sample(&mut rng).unwrap()).or_default() += 1;
        }

        for (value, weight) in dist.iter() {
            #[allow(clippy::cast_precision_loss)]
            let observed = counts.get(value).copied().unwrap_or_default() as f64 / f64::from(draws);
            let expected = weight / dist.total_weight();
            assert_lt!((observed - expected).abs(), 0.02);
        }
    }

    #[rstest]
    fn test_sample_empty() {
        let empty = WeightedDistribution::new("Closed", Vec::<(String, f64)>::new());
        let mut rng = StdRng::seed_from_u64(1);
        let err = empty.sample(&mut rng).unwrap_err();
        assert!(matches!(err, CaseGenError::EmptyCandidateSet { node } if node == "Closed"));
    }

    #[rstest]
    fn test_restrict_normalises(dist: WeightedDistribution) {
        let restricted = dist.restrict(&["Rework", "Reject", "Escalate"]).unwrap();
        assert_eq!(restricted.values().collect::<Vec<_>>(), vec!["Rework", "Reject"]);
        assert_lt!((restricted.total_weight() - 1.0).abs(), 1e-12);
        assert_lt!((restricted.cumulative[0] - 2.0 / 9.0).abs(), 1e-12);
    }

    #[rstest]
    fn test_sample_restricted_stays_in_intersection(dist: WeightedDistribution) {
        let mut rng = StdRng::seed_from_u64(3);
        let allowed = vec!["Approve".to_string(), "Reject".to_string()];
        for _ in 0..500 {
            let value = dist.sample_restricted(&allowed, &mut rng).unwrap();
            assert_ne!(value, "Rework");
        }
    }

    #[rstest]
    fn test_sample_restricted_empty_intersection(dist: WeightedDistribution) {
        let mut rng = StdRng::seed_from_u64(3);
        let err = dist.sample_restricted(&["Escalate"], &mut rng).unwrap_err();
        assert!(matches!(err, CaseGenError::EmptyCandidateSet { node } if node == "Review"));
    }
}
