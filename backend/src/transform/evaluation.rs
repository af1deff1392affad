//! Evaluation export extraction.
//!
//! Skips the export's leading metadata rows, keeps the respondent name and
//! the twelve trait ratings, recodes each rating through [`RATING_SCALE`]
//! and totals them.

use crate::error::ValidationError;
use crate::models::{EvaluationRecord, TraitScore, RATING_SCALE, TRAIT_COLUMNS};
use crate::validation::ValidatedTable;

/// Score of an ordinal rating. Exact match only; anything else is 0.
pub fn rating_score(value: &str) -> u32 {
    RATING_SCALE
        .iter()
        .find(|(label, _)| *label == value)
        .map(|(_, score)| *score)
        .unwrap_or(0)
}

/// Extract scored records from a validated evaluation table.
///
/// The first `skip_rows` rows are dropped unconditionally. A table with
/// fewer rows than that is rejected rather than read as empty; a table with
/// exactly `skip_rows` rows yields no records.
pub fn extract_evaluations(
    table: &ValidatedTable<'_>,
    skip_rows: usize,
) -> Result<Vec<EvaluationRecord>, ValidationError> {
    if table.len() < skip_rows {
        return Err(ValidationError::InsufficientRows {
            table: table.kind(),
            required: skip_rows,
            found: table.len(),
        });
    }

    let records = (skip_rows..table.len())
        .map(|row| extract_row(table, row))
        .collect();

    Ok(records)
}

/// Required column 0 is the name; 1..=12 follow [`TRAIT_COLUMNS`].
fn extract_row(table: &ValidatedTable<'_>, row: usize) -> EvaluationRecord {
    let full_name = table.cell(row, 0).unwrap_or_default();

    let ratings = TRAIT_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, (_, label))| TraitScore {
            label: *label,
            score: rating_score(table.cell(row, i + 1).unwrap_or_default()),
        })
        .collect();

    EvaluationRecord::new(full_name, ratings)
}
