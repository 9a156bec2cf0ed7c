//! Record materialisation: turns a case index plus a variant into concrete case and event
//! records.

use cg_core::{
    CaseGenError,
    GenerationConfig,
    Result,
};
use chrono::{
    DateTime,
    TimeDelta,
    Utc,
};
use rand::Rng;

use crate::model::{
    Column,
    FieldValue,
    Record,
};
use crate::registry::Variant;
use crate::vocabulary::Vocabulary;

/// Width of the "recent" start-time window.
const RECENT_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;
/// Milliseconds in a (365-day) year.
const YEAR_MS: f64 = 365.0 * 24.0 * 60.0 * 60.0 * 1000.0;

/// Inclusive `[min, max]` bounds for the components of the gap between consecutive events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventSpacing {
    /// Day component bounds.
    pub days: (u32, u32),
    /// Hour component bounds.
    pub hours: (u32, u32),
    /// Minute component bounds.
    pub minutes: (u32, u32),
}

impl EventSpacing {
    /// Spacing bounds taken from the run configuration.
    #[must_use]
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            days: (config.min_days_between_events, config.max_days_between_events),
            hours: (config.min_hours_between_events, config.max_hours_between_events),
            minutes: (config.min_minutes_between_events, config.max_minutes_between_events),
        }
    }

    /// Draw one gap; each component is drawn independently.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> TimeDelta {
        let draw = |rng: &mut R, (min, max): (u32, u32)| i64::from(rng.gen_range(min..=max.max(min)));
        TimeDelta::days(draw(rng, self.days))
            + TimeDelta::hours(draw(rng, self.hours))
            + TimeDelta::minutes(draw(rng, self.minutes))
    }
}

/// Builds case and event records against the vocabulary's schema.
#[derive(Clone, Debug)]
pub struct RecordMaterializer<'a> {
    /// Schema, value distributions and lookup tables.
    vocabulary: &'a Vocabulary,
    /// Gap bounds between consecutive events.
    spacing: EventSpacing,
    /// Percentage of cases (by position) that start within the recent window.
    recent_event_frequency: f64,
    /// How far back non-recent cases may start.
    timeframe_years: f64,
    /// Reference "now" every start time is measured back from.
    now: DateTime<Utc>,
}

impl<'a> RecordMaterializer<'a> {
    /// Materializer anchored at `now`.
    #[must_use]
    pub fn new(vocabulary: &'a Vocabulary, config: &GenerationConfig, now: DateTime<Utc>) -> Self {
        Self {
            vocabulary,
            spacing: EventSpacing::from_config(config),
            recent_event_frequency: config.recent_event_frequency,
            timeframe_years: config.timeframe_years,
            now,
        }
    }

    /// Build case `case_id`: the primary key gets the id, every other column an independently
    /// sampled vocabulary value.
    pub fn case_record<R: Rng + ?Sized>(&self, case_id: u64, rng: &mut R) -> Result<Record> {
        let mut record = Record::new(case_id);
        for column in &self.vocabulary.schema().cases.columns {
            let value = if column.primary_key {
                FieldValue::Integer(case_id)
            } else {
                FieldValue::Text(self.vocabulary.sample(&column.name, rng)?.to_owned())
            };
            record.push(&column.display_name, value);
        }
        Ok(record)
    }

    /// Start time of the `case_number`-th (1-based) of `total_cases` cases.
    ///
    /// The first `recent_event_frequency` percent of cases start within the last day; the rest
    /// anywhere in the configured timeframe. Either way the result lies strictly in the past.
    /// Fails when the timeframe reaches back beyond the supported date range.
    pub fn start_time<R: Rng + ?Sized>(&self, case_number: u64, total_cases: u64, rng: &mut R) -> Result<DateTime<Utc>> {
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let window_ms = if (case_number as f64) <= self.recent_event_frequency / 100.0 * total_cases as f64 {
            RECENT_WINDOW_MS
        } else {
            (self.timeframe_years * YEAR_MS) as i64
        };
        let offset = rng.gen_range(1..window_ms.max(2));
        TimeDelta::try_milliseconds(offset)
            .and_then(|offset| self.now.checked_sub_signed(offset))
            .ok_or(CaseGenError::TimestampOutOfRange { case_id: case_number })
    }

    /// Build the events of `case`, one per entry of `variant`, starting at `start`.
    ///
    /// Event ids are taken from `next_event_id`, which is advanced past the last one used.
    pub fn event_records<R: Rng + ?Sized>(
        &self,
        case: &Record,
        variant: &Variant,
        start: DateTime<Utc>,
        next_event_id: &mut u64,
        rng: &mut R,
    ) -> Result<Vec<Record>> {
        let columns = &self.vocabulary.schema().events.columns;
        let mut current = start;
        let mut events = Vec::with_capacity(variant.len());

        for (index, event_name) in variant.iter().enumerate() {
            if index > 0 {
                current = current
                    .checked_add_signed(self.spacing.sample(rng))
                    .ok_or(CaseGenError::TimestampOutOfRange { case_id: case.id })?;
            }
            let mut record = Record::new(*next_event_id);
            *next_event_id += 1;

            for column in columns {
                let value = self.event_field(column, &record, case, event_name, current, rng)?;
                record.push(&column.display_name, value);
            }
            events.push(record);
        }
        Ok(events)
    }

    /// Value of one event column.
    fn event_field<R: Rng + ?Sized>(
        &self,
        column: &Column,
        event: &Record,
        case: &Record,
        event_name: &str,
        timestamp: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<FieldValue> {
        let value = if column.primary_key {
            FieldValue::Integer(event.id)
        } else if column.is_case_id {
            FieldValue::Integer(case.id)
        } else if column.event_action {
            self.text_or_key(column, event_name)?
        } else if column.event_date {
            FieldValue::Timestamp(timestamp)
        } else {
            let sampled = self.vocabulary.sample(&column.name, rng)?;
            self.text_or_key(column, sampled)?
        };
        Ok(value)
    }

    /// `value` as-is, or translated through the column's lookup table for foreign keys.
    fn text_or_key(&self, column: &Column, value: &str) -> Result<FieldValue> {
        if column.is_foreign_key() {
            Ok(FieldValue::Integer(self.vocabulary.resolve_foreign_key(&column.name, value)?))
        } else {
            Ok(FieldValue::Text(value.to_owned()))
        }
    }
}
