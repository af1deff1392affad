//! Survey export extraction.
//!
//! Keeps `Q1..Q7`, takes `Q1` as the respondent name and passes the other
//! answers through untouched. Every row is kept.

use crate::models::SurveyRecord;
use crate::validation::ValidatedTable;

/// Extract survey records from a validated survey table.
///
/// Required column 0 is `Q1`, 1..=6 are `Q2..Q7`.
pub fn extract_survey(table: &ValidatedTable<'_>) -> Vec<SurveyRecord> {
    (0..table.len())
        .map(|row| {
            let cell = |i: usize| table.cell(row, i).unwrap_or_default().to_string();
            SurveyRecord {
                full_name: cell(0),
                answers: [cell(1), cell(2), cell(3), cell(4), cell(5), cell(6)],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawTable;
    use crate::validation::validate_survey;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_projection_and_rename() {
        let table = RawTable::new(
            strings(&["ResponseId", "Q1", "Q2", "Q3", "Q4", "Q5", "Q6", "Q7", "Q8"]),
            vec![
                strings(&["R_1", "Jane Doe", "X", "", "3", " spaced ", "yes", "Z", "dropped"]),
                strings(&["R_2", "", "a", "b", "c", "d", "e", "f", "g"]),
            ],
        );
        let checked = validate_survey(&table).unwrap();

        let records = extract_survey(&checked);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].full_name, "Jane Doe");
        assert_eq!(
            records[0].answers,
            ["X", "", "3", " spaced ", "yes", "Z"].map(String::from)
        );
        // no row filtering, even without a name
        assert_eq!(records[1].full_name, "");
        assert_eq!(records[1].answers[5], "f");
    }

    #[test]
    fn test_empty_table() {
        let table = RawTable::new(strings(&["Q1", "Q2", "Q3", "Q4", "Q5", "Q6", "Q7"]), vec![]);
        let checked = validate_survey(&table).unwrap();
        assert!(extract_survey(&checked).is_empty());
    }
}
