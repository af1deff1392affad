//! Header validation for the two survey exports.
//!
//! Every table is checked here before an extractor reads it. A required
//! column must appear exactly once: absent columns and repeated required
//! columns are both rejected, while repeats of columns nobody reads are left
//! alone.
//!
//! # Example
//!
//! ```rust,ignore
//! use survey_merge::{validate_columns, RawTable, TableKind};
//!
//! let table = RawTable::new(vec!["Q1".into(), "Q2".into()], vec![]);
//! let checked = validate_columns(&table, &["Q1"], TableKind::Survey).unwrap();
//! assert_eq!(checked.cell(0, 0), None);
//! assert!(validate_columns(&table, &["Q1", "Q3"], TableKind::Survey).is_err());
//! ```

use crate::error::SchemaError;
use crate::models::{evaluation_required_columns, survey_required_columns, RawTable, TableKind};

/// A table whose required columns are known to be present exactly once.
///
/// Only [`validate_columns`] builds one, so an extractor taking a
/// `ValidatedTable` cannot see an unchecked table.
#[derive(Debug, Clone)]
pub struct ValidatedTable<'a> {
    table: &'a RawTable,
    kind: TableKind,
    /// Header position of each required column, in required order.
    positions: Vec<usize>,
}

impl<'a> ValidatedTable<'a> {
    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn table(&self) -> &'a RawTable {
        self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Cell of `row` under the `required`-th required column.
    pub fn cell(&self, row: usize, required: usize) -> Option<&'a str> {
        let position = *self.positions.get(required)?;
        self.table.rows.get(row)?.get(position).map(String::as_str)
    }
}

/// Check that each of `required` is present exactly once in the header.
///
/// Missing columns are reported first, in `required` order.
pub fn validate_columns<'a>(
    table: &'a RawTable,
    required: &[&str],
    kind: TableKind,
) -> Result<ValidatedTable<'a>, SchemaError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|column| table.column_count(column) == 0)
        .map(|column| column.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(SchemaError::MissingColumns {
            table: kind,
            columns: missing,
        });
    }

    let repeated: Vec<String> = required
        .iter()
        .filter(|column| table.column_count(column) > 1)
        .map(|column| column.to_string())
        .collect();

    if !repeated.is_empty() {
        return Err(SchemaError::DuplicateColumns {
            table: kind,
            columns: repeated,
        });
    }

    let positions = required
        .iter()
        .filter_map(|column| table.column_index(column))
        .collect();

    Ok(ValidatedTable {
        table,
        kind,
        positions,
    })
}

/// Same check, as a plain yes/no.
pub fn is_valid(table: &RawTable, required: &[&str]) -> bool {
    required.iter().all(|column| table.column_count(column) == 1)
}

/// Validate the evaluation export header.
pub fn validate_evaluations(table: &RawTable) -> Result<ValidatedTable<'_>, SchemaError> {
    validate_columns(table, &evaluation_required_columns(), TableKind::Evaluations)
}

/// Validate the survey export header.
pub fn validate_survey(table: &RawTable) -> Result<ValidatedTable<'_>, SchemaError> {
    validate_columns(table, &survey_required_columns(), TableKind::Survey)
}
