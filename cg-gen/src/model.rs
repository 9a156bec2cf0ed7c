//! Data models for the schema description and the generated records.

use std::fmt;

use chrono::{
    DateTime,
    Utc,
};
use serde::Deserialize;

/// Format used for event timestamps in every output.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Column layout of every record type, as declared in the vocabulary's `__schema__` section.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Schema {
    /// Columns of the case records.
    pub cases: TableSchema,
    /// Columns of the event records.
    pub events: TableSchema,
    /// Lookup (reference) tables backing foreign-key columns.
    #[serde(default)]
    pub data: Vec<LookupTableSchema>,
}

/// Ordered column descriptors for one record type.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct TableSchema {
    /// Table name used by downstream sinks, if any.
    #[serde(default)]
    pub name: Option<String>,
    /// Columns, in output order.
    pub columns: Vec<Column>,
}

impl TableSchema {
    /// Display names of all columns, in output order.
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.display_name.as_str())
    }
}

/// A lookup table definition: values of the `lookup_for` vocabulary category, keyed by dense ids.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LookupTableSchema {
    /// Name of the lookup table.
    pub name: String,
    /// Vocabulary category whose values populate the table.
    pub lookup_for: String,
    /// Columns of the table; the one flagged `is_lookup` holds the values.
    pub columns: Vec<Column>,
}

impl LookupTableSchema {
    /// Whether any column of this table holds the looked-up values.
    #[must_use]
    pub fn has_lookup_column(&self) -> bool {
        self.columns.iter().any(|c| c.is_lookup)
    }
}

/// A foreign-key marker: either a plain flag or the referenced table (e.g. `"activities(id)"`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ForeignKey {
    /// `true`/`false`.
    Flag(bool),
    /// Name of the referenced table.
    Table(String),
}

impl Default for ForeignKey {
    fn default() -> Self {
        Self::Flag(false)
    }
}

impl ForeignKey {
    /// Whether the column is actually a foreign key.
    #[must_use]
    pub fn is_set(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Table(table) => !table.is_empty(),
        }
    }
}

/// One column descriptor.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Column {
    /// Internal name; doubles as the vocabulary category values are sampled from.
    pub name: String,
    /// Name used in produced records.
    pub display_name: String,
    /// Declared storage type (e.g. `varchar(50)`); carried through for sinks.
    #[serde(rename = "type", default)]
    pub column_type: String,
    /// Primary key column.
    #[serde(default)]
    pub primary_key: bool,
    /// Foreign key into the lookup table for this column's category.
    #[serde(default)]
    pub foreign_key: ForeignKey,
    /// References the owning case (event tables only).
    #[serde(default)]
    pub is_case_id: bool,
    /// Holds the event name (event tables only).
    #[serde(default)]
    pub event_action: bool,
    /// Holds the event timestamp (event tables only).
    #[serde(default)]
    pub event_date: bool,
    /// Holds the looked-up values (lookup tables only).
    #[serde(default)]
    pub is_lookup: bool,
    /// Column may be null.
    #[serde(default)]
    pub nullable: bool,
}

impl Column {
    /// Whether values of this column go through a lookup table.
    #[must_use]
    pub fn is_foreign_key(&self) -> bool {
        self.foreign_key.is_set()
    }
}

/// A single scalar in a produced record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    /// Ids and foreign keys.
    Integer(u64),
    /// Sampled vocabulary values and event names.
    Text(String),
    /// Event timestamps.
    Timestamp(DateTime<Utc>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

/// A generated case or event.
///
/// `id` is internal: it cross-references events to their case and never shows up in written
/// output unless the schema also declares a primary key column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Internal sequential id.
    pub id: u64,
    /// `(display name, value)` pairs in schema order.
    pub fields: Vec<(String, FieldValue)>,
}

impl Record {
    /// Empty record with the given internal id.
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self { id, fields: Vec::new() }
    }

    /// Append a column value.
    pub fn push(&mut self, display_name: impl Into<String>, value: FieldValue) {
        self.fields.push((display_name.into(), value));
    }

    /// Look up a value by display name.
    #[must_use]
    pub fn get(&self, display_name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(name, _)| name == display_name).map(|(_, value)| value)
    }

    /// Values in schema order.
    pub fn values(&self) -> impl Iterator<Item = &FieldValue> {
        self.fields.iter().map(|(_, value)| value)
    }
}
