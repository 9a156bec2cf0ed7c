//! Generation settings.
//!
//! Every knob is a plain scalar; the engine only ever reads them. Settings start from
//! [`GenerationConfig::default`], may be replaced wholesale by a YAML file, and are then
//! overridden field by field from the command line.

use std::path::Path;

use derive_setters::Setters;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::debug;

use crate::errors::{
    CaseGenError,
    Result,
};

/// Upper bound on `timeframe_years`.
pub const MAX_TIMEFRAME_YEARS: f64 = 1000.0;
/// Upper bound on `max_days_between_events` (100 years).
pub const MAX_DAYS_BETWEEN_EVENTS: u32 = 36_500;
/// Upper bound on `max_hours_between_events`.
pub const MAX_HOURS_BETWEEN_EVENTS: u32 = MAX_DAYS_BETWEEN_EVENTS * 24;
/// Upper bound on `max_minutes_between_events`.
pub const MAX_MINUTES_BETWEEN_EVENTS: u32 = MAX_HOURS_BETWEEN_EVENTS * 60;

/// Read-only inputs to a generation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Setters)]
#[serde(default, rename_all = "snake_case")]
pub struct GenerationConfig {
    /// Number of cases to generate.
    pub number_of_cases: u64,
    /// How many years back case start times may reach.
    pub timeframe_years: f64,
    /// Minimum walk length (events per case).
    pub min_events: usize,
    /// Maximum walk length (events per case).
    pub max_events: usize,
    /// Lower bound of the day component of the gap between two events.
    pub min_days_between_events: u32,
    /// Upper bound of the day component of the gap between two events.
    pub max_days_between_events: u32,
    /// Lower bound of the hour component of the gap between two events.
    pub min_hours_between_events: u32,
    /// Upper bound of the hour component of the gap between two events.
    pub max_hours_between_events: u32,
    /// Lower bound of the minute component of the gap between two events.
    pub min_minutes_between_events: u32,
    /// Upper bound of the minute component of the gap between two events.
    pub max_minutes_between_events: u32,
    /// Percentage `[0, 100]` of cases (the first ones, by position) that start within the last
    /// day rather than anywhere in the timeframe.
    pub recent_event_frequency: f64,
    /// Cap on the number of distinct variants; `None` or `0` means uncapped.
    pub max_variants: Option<usize>,
    /// Cap on the number of distinct event-to-event sequences; `None` or `0` means uncapped.
    pub max_sequences: Option<usize>,
    /// Number of synthetic case attributes to inject into the vocabulary.
    pub dynamic_attrs: usize,
    /// Number of distinct values each synthetic case attribute draws from.
    pub unique_values_for_dynamic_attrs: usize,
    /// Seed for the random source; a fresh one is drawn from entropy when absent.
    pub seed: Option<u64>,
    /// Prefix for the generated file names.
    pub file_name_prefix: String,
    /// Whether to draw a progress bar while generating.
    pub show_progress: bool,
    /// Whether to log a summary of the generated data at the end of the run.
    pub show_summary: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            number_of_cases: 100,
            timeframe_years: 2.0,
            min_events: 3,
            max_events: 10,
            min_days_between_events: 1,
            max_days_between_events: 3,
            min_hours_between_events: 1,
            max_hours_between_events: 3,
            min_minutes_between_events: 1,
            max_minutes_between_events: 3,
            recent_event_frequency: 0.0,
            max_variants: None,
            max_sequences: None,
            dynamic_attrs: 0,
            unique_values_for_dynamic_attrs: 10,
            seed: None,
            file_name_prefix: "Case".into(),
            show_progress: true,
            show_summary: true,
        }
    }
}

impl GenerationConfig {
    /// Load settings from a YAML file; fields missing from the file keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        debug!("Reading configuration from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse settings from a YAML string.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// The unique-variant cap, if one is configured.
    #[must_use]
    pub fn variant_cap(&self) -> Option<usize> {
        self.max_variants.filter(|&cap| cap > 0)
    }

    /// The unique-sequence cap, if one is configured.
    #[must_use]
    pub fn sequence_cap(&self) -> Option<usize> {
        self.max_sequences.filter(|&cap| cap > 0)
    }

    /// Reject settings that cannot produce a valid run.
    pub fn validate(&self) -> Result<()> {
        if self.min_events == 0 {
            return Err(CaseGenError::InvalidConfig("min_events must be at least 1".into()));
        }
        check_range("events", self.min_events, self.max_events)?;
        check_range("days between events", self.min_days_between_events, self.max_days_between_events)?;
        check_range("hours between events", self.min_hours_between_events, self.max_hours_between_events)?;
        check_range("minutes between events", self.min_minutes_between_events, self.max_minutes_between_events)?;

        if self.dynamic_attrs > 0 && self.unique_values_for_dynamic_attrs == 0 {
            return Err(CaseGenError::InvalidConfig(
                "dynamic attributes need at least one unique value each".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.recent_event_frequency) {
            return Err(CaseGenError::InvalidConfig(format!(
                "recent_event_frequency must be between 0 and 100, got: {}",
                self.recent_event_frequency
            )));
        }
        if !(self.timeframe_years > 0.0 && self.timeframe_years <= MAX_TIMEFRAME_YEARS) {
            return Err(CaseGenError::InvalidConfig(format!(
                "timeframe_years must be in (0, {MAX_TIMEFRAME_YEARS}], got: {}",
                self.timeframe_years
            )));
        }
        check_limit("days between events", self.max_days_between_events, MAX_DAYS_BETWEEN_EVENTS)?;
        check_limit("hours between events", self.max_hours_between_events, MAX_HOURS_BETWEEN_EVENTS)?;
        check_limit("minutes between events", self.max_minutes_between_events, MAX_MINUTES_BETWEEN_EVENTS)?;
        Ok(())
    }
}

/// Fail when `value` is greater than `limit`.
fn check_limit(what: &str, value: u32, limit: u32) -> Result<()> {
    if value > limit {
        return Err(CaseGenError::InvalidConfig(format!("maximum {what} ({value}) exceeds the limit of {limit}")));
    }
    Ok(())
}

/// Fail when `min` is greater than `max`.
fn check_range<T: PartialOrd + std::fmt::Display>(what: &str, min: T, max: T) -> Result<()> {
    if min > max {
        return Err(CaseGenError::InvalidConfig(format!("minimum {what} ({min}) exceeds maximum ({max})")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    fn test_defaults_are_valid() {
        let config = GenerationConfig::default();
        config.validate().unwrap();
        assert_eq!(config.variant_cap(), None);
        assert_eq!(config.sequence_cap(), None);
    }

    #[rstest]
    #[case::unset(None, None)]
    #[case::zero(Some(0), None)]
    #[case::set(Some(4), Some(4))]
    fn test_caps(#[case] configured: Option<usize>, #[case] expected: Option<usize>) {
        let config = GenerationConfig::default().max_variants(configured).max_sequences(configured);
        assert_eq!(config.variant_cap(), expected);
        assert_eq!(config.sequence_cap(), expected);
    }

    #[rstest]
    #[case::events(GenerationConfig::default().min_events(5).max_events(4))]
    #[case::no_events(GenerationConfig::default().min_events(0))]
    #[case::days(GenerationConfig::default().min_days_between_events(4))]
    #[case::minutes(GenerationConfig::default().max_minutes_between_events(0))]
    #[case::recent(GenerationConfig::default().recent_event_frequency(150.0))]
    #[case::timeframe(GenerationConfig::default().timeframe_years(0.0))]
    #[case::timeframe_nan(GenerationConfig::default().timeframe_years(f64::NAN))]
    #[case::timeframe_huge(GenerationConfig::default().timeframe_years(1.0e6))]
    #[case::days_huge(GenerationConfig::default().max_days_between_events(u32::MAX))]
    #[case::hours_huge(GenerationConfig::default().max_hours_between_events(MAX_HOURS_BETWEEN_EVENTS + 1))]
    #[case::minutes_huge(GenerationConfig::default().max_minutes_between_events(u32::MAX))]
    #[case::dynamic(GenerationConfig::default().dynamic_attrs(2).unique_values_for_dynamic_attrs(0))]
    fn test_validate_rejects(#[case] config: GenerationConfig) {
        let err = config.validate().unwrap_err();
        assert!(matches!(err, CaseGenError::InvalidConfig(_)));
    }

    #[rstest]
    fn test_partial_yaml_keeps_defaults() {
        let config = GenerationConfig::from_yaml("number_of_cases: 7\nmax_variants: 3\n").unwrap();
        assert_eq!(config.number_of_cases, 7);
        assert_eq!(config.variant_cap(), Some(3));
        assert_eq!(config.max_events, GenerationConfig::default().max_events);
    }

    #[rstest]
    fn test_bad_yaml() {
        let err = GenerationConfig::from_yaml("number_of_cases: [1, 2]").unwrap_err();
        assert!(err.to_string().starts_with("malformed configuration file"));
    }
}
