//! Inner join of evaluation scores with survey answers, and CSV rendering of
//! the result.
//!
//! Names are compared byte for byte. Output follows the evaluation order;
//! when a name repeats, every left match pairs with every right match in
//! right order.

use std::collections::{HashMap, HashSet};
use std::io::Write;

use crate::error::{CsvError, DuplicateKeyError};
use crate::models::{
    EvaluationRecord, MergeReport, MergedRecord, SurveyRecord, TableKind, MERGED_HEADER,
};

/// Fail on the first respondent name that occurs twice.
pub fn ensure_unique_names<'a, I>(names: I, table: TableKind) -> Result<(), DuplicateKeyError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(DuplicateKeyError {
                table,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

/// Inner join on the full name.
pub fn join_records(
    evaluations: &[EvaluationRecord],
    survey: &[SurveyRecord],
) -> (Vec<MergedRecord>, MergeReport) {
    let mut by_name: HashMap<&str, Vec<&SurveyRecord>> = HashMap::new();
    for record in survey {
        by_name.entry(record.full_name.as_str()).or_default().push(record);
    }

    let mut merged = Vec::new();
    let mut unmatched_evaluations = Vec::new();
    for evaluation in evaluations {
        match by_name.get(evaluation.full_name.as_str()) {
            Some(matches) => merged.extend(
                matches
                    .iter()
                    .map(|s| MergedRecord::from_parts(evaluation, s)),
            ),
            None => unmatched_evaluations.push(evaluation.full_name.clone()),
        }
    }

    let evaluated: HashSet<&str> = evaluations.iter().map(|e| e.full_name.as_str()).collect();
    let unmatched_survey = survey
        .iter()
        .filter(|s| !evaluated.contains(s.full_name.as_str()))
        .map(|s| s.full_name.clone())
        .collect();

    let report = MergeReport {
        evaluation_rows: evaluations.len(),
        survey_rows: survey.len(),
        merged_rows: merged.len(),
        unmatched_evaluations,
        unmatched_survey,
    };

    (merged, report)
}

/// Write merged rows as comma-separated text with the fixed header.
pub fn write_merged<W: Write>(writer: W, records: &[MergedRecord]) -> Result<(), CsvError> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(MERGED_HEADER)?;
    for record in records {
        wtr.write_record(record.to_row())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Render merged rows to an in-memory CSV document.
pub fn render_merged(records: &[MergedRecord]) -> Result<Vec<u8>, CsvError> {
    let mut buf = Vec::new();
    write_merged(&mut buf, records)?;
    Ok(buf)
}
