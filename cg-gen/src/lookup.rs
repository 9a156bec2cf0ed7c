//! Lookup tables: dense integer surrogate keys for the values of a vocabulary category.

use std::collections::HashMap;

use cg_core::{
    CaseGenError,
    Result,
};
use tracing::debug;

use crate::model::Schema;
use crate::sampler::WeightedDistribution;

/// Value → id mapping for one category; ids run `1..=N` in vocabulary order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupTable {
    /// Name of the table, as declared in the schema.
    name: String,
    /// Values, positioned by `id - 1`.
    values: Vec<String>,
    /// Reverse index of `values`.
    ids: HashMap<String, u64>,
}

impl LookupTable {
    /// Assign ids to `values` in the order given; repeated values keep their first id.
    pub fn new<'a>(name: impl Into<String>, values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut table = Self { name: name.into(), values: Vec::new(), ids: HashMap::new() };
        for value in values {
            if table.ids.contains_key(value) {
                continue;
            }
            table.values.push(value.to_owned());
            table.ids.insert(value.to_owned(), table.values.len() as u64);
        }
        table
    }

    /// Table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of `value`, if the table has it.
    #[must_use]
    pub fn id_of(&self, value: &str) -> Option<u64> {
        self.ids.get(value).copied()
    }

    /// `(id, value)` rows in ascending id order.
    pub fn rows(&self) -> impl Iterator<Item = (u64, &str)> {
        (1_u64..).zip(self.values.iter().map(String::as_str))
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Every lookup table of a vocabulary, addressable by category (case-insensitive).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LookupTables {
    /// Tables in schema order.
    tables: Vec<LookupTable>,
    /// Lower-cased category → position in `tables`.
    by_category: HashMap<String, usize>,
}

impl LookupTables {
    /// Build a table for every schema lookup definition that has an `is_lookup` column.
    ///
    /// `distribution` resolves a category to its vocabulary node; a category that was never
    /// defined is a [`CaseGenError::MissingVocabularyKey`].
    pub fn build<'a, F>(schema: &Schema, distribution: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<&'a WeightedDistribution>,
    {
        let mut tables = Self::default();
        for definition in schema.data.iter().filter(|d| d.has_lookup_column()) {
            let category = &definition.lookup_for;
            let values = distribution(category).ok_or_else(|| CaseGenError::missing_key(category))?;
            let table = LookupTable::new(&definition.name, values.values());
            debug!(table = table.name(), %category, rows = table.len(), "Built lookup table");

            tables.by_category.insert(category.to_lowercase(), tables.tables.len());
            tables.tables.push(table);
        }
        Ok(tables)
    }

    /// Table for `category`, if one was declared.
    #[must_use]
    pub fn get(&self, category: &str) -> Option<&LookupTable> {
        self.by_category.get(&category.to_lowercase()).map(|&i| &self.tables[i])
    }

    /// Translate `value` into its id in the `category` table.
    pub fn resolve(&self, category: &str, value: &str) -> Result<u64> {
        let table = self.get(category).ok_or_else(|| CaseGenError::missing_key(category))?;
        table.id_of(value).ok_or_else(|| CaseGenError::MissingLookupValue {
            category: category.to_owned(),
            value: value.to_owned(),
        })
    }

    /// All tables, in schema order.
    pub fn iter(&self) -> impl Iterator<Item = &LookupTable> {
        self.tables.iter()
    }

    /// Number of tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no lookup tables are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rstest::*;
    use serde_json::json;

    use super::*;

    #[fixture]
    fn schema() -> Schema {
        serde_json::from_value(json!({
            "cases": {"columns": []},
            "events": {"columns": []},
            "data": [
                {
                    "name": "activities",
                    "lookup_for": "activity",
                    "columns": [
                        {"name": "id", "display_name": "Id", "primary_key": true},
                        {"name": "name", "display_name": "Name", "is_lookup": true}
                    ]
                },
                {
                    "name": "unused",
                    "lookup_for": "nothing",
                    "columns": [{"name": "id", "display_name": "Id", "primary_key": true}]
                }
            ]
        }))
        .unwrap()
    }

    #[rstest]
    fn test_build_assigns_ids_in_order(schema: Schema) {
        let activity = WeightedDistribution::new("activity", [("Created", 1.0), ("Triaged", 3.0), ("Closed", 1.0)]);
        let tables = LookupTables::build(&schema, |c| (c == "activity").then_some(&activity)).unwrap();

        assert_eq!(tables.len(), 1);
        let table = tables.get("Activity").unwrap();
        assert_eq!(table.name(), "activities");
        assert_eq!(table.rows().collect::<Vec<_>>(), vec![(1, "Created"), (2, "Triaged"), (3, "Closed")]);
        assert_eq!(tables.resolve("activity", "Closed").unwrap(), 3);
    }

    #[rstest]
    fn test_build_missing_category(schema: Schema) {
        let err = LookupTables::build(&schema, |_| None).unwrap_err();
        assert!(matches!(err, CaseGenError::MissingVocabularyKey { key } if key == "activity"));
    }

    #[rstest]
    fn test_resolve_errors(schema: Schema) {
        let activity = WeightedDistribution::new("activity", [("Created", 1.0)]);
        let tables = LookupTables::build(&schema, |_| Some(&activity)).unwrap();

        assert!(matches!(
            tables.resolve("activity", "Reopened").unwrap_err(),
            CaseGenError::MissingLookupValue { .. }
        ));
        assert!(matches!(tables.resolve("priority", "High").unwrap_err(), CaseGenError::MissingVocabularyKey { .. }));
    }
}
