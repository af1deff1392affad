//! Domain models for the survey merge pipeline.
//!
//! - [`RawTable`] - parsed delimited text, header and rows as written
//! - [`EvaluationRecord`] - one scored respondent from the evaluation export
//! - [`SurveyRecord`] - one respondent's pass-through survey answers
//! - [`MergedRecord`] - a joined row of the final output
//!
//! The fixed column layouts of both upstream exports live here as static
//! lookup tables so the extractors stay table-driven.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Upstream export layout
// =============================================================================

/// Label given to the identity column in every derived table.
pub const FULL_NAME: &str = "Full Name";

/// Label of the aggregate score column in the merged output.
pub const TOTAL_SCORE: &str = "Total Score";

/// Identity column of the evaluation export.
pub const EVALUATION_NAME_COLUMN: &str = "Q4";

/// Rating columns of the evaluation export and the trait each one rates.
pub const TRAIT_COLUMNS: [(&str, &str); 12] = [
    ("Q9#1_1", "Technical contribution to field"),
    ("Q9#1_2", "Ability to explain complex ideas"),
    ("Q9#1_3", "Dependability, Reliability"),
    ("Q9#1_4", "Initiative"),
    ("Q9#1_5", "Interpersonal skills/Collaboration with others"),
    ("Q9#1_6", "Time Management"),
    ("Q9#1_7", "Work Ethics"),
    ("Q9#1_8", "Response to feedback"),
    ("Q9#1_9", "Listening to others"),
    ("Q9#1_10", "Professionalism"),
    ("Q9#1_11", "Willingness to have responsibility"),
    ("Q9#1_12", "Ability to follow instructions"),
];

/// Ordinal rating scale. Anything not listed scores 0.
pub const RATING_SCALE: [(&str, u32); 5] = [
    ("Poor", 1),
    ("Average", 2),
    ("Good", 3),
    ("Very Good", 4),
    ("Excellent", 5),
];

/// Identity column of the survey export.
pub const SURVEY_NAME_COLUMN: &str = "Q1";

/// Survey columns copied verbatim into the merged output.
pub const SURVEY_ANSWER_COLUMNS: [&str; 6] = ["Q2", "Q3", "Q4", "Q5", "Q6", "Q7"];

/// Header of the merged output, in output order.
pub const MERGED_HEADER: [&str; 8] = [
    FULL_NAME,
    TOTAL_SCORE,
    "Q2",
    "Q3",
    "Q4",
    "Q5",
    "Q6",
    "Q7",
];

/// Leading rows of the evaluation export that carry question text and
/// import metadata rather than responses.
pub const DEFAULT_SKIP_ROWS: usize = 2;

/// Columns the evaluation export must provide.
pub fn evaluation_required_columns() -> Vec<&'static str> {
    std::iter::once(EVALUATION_NAME_COLUMN)
        .chain(TRAIT_COLUMNS.iter().map(|(column, _)| *column))
        .collect()
}

/// Columns the survey export must provide.
pub fn survey_required_columns() -> Vec<&'static str> {
    std::iter::once(SURVEY_NAME_COLUMN)
        .chain(SURVEY_ANSWER_COLUMNS.iter().copied())
        .collect()
}

/// Which of the two inputs a value or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Evaluations,
    Survey,
}

impl TableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Evaluations => "evaluations",
            TableKind::Survey => "survey",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Raw table
// =============================================================================

/// Delimited text as parsed, before any interpretation.
///
/// Rows are stored in header order and are exactly as wide as the header;
/// the loader rejects anything else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Position of the first header equal to `column`.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    /// Number of headers equal to `column`.
    pub fn column_count(&self, column: &str) -> usize {
        self.headers.iter().filter(|h| *h == column).count()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell of `row` under `column`, if both exist.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }
}

// =============================================================================
// Derived records
// =============================================================================

/// A trait label paired with its recoded score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraitScore {
    pub label: &'static str,
    pub score: u32,
}

/// One respondent of the evaluation export after recoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    pub full_name: String,
    /// Always twelve entries, in [`TRAIT_COLUMNS`] order.
    pub ratings: Vec<TraitScore>,
    pub total_score: u32,
}

impl EvaluationRecord {
    /// Builds a record whose total is derived from `ratings`.
    pub fn new(full_name: impl Into<String>, ratings: Vec<TraitScore>) -> Self {
        let total_score = ratings.iter().map(|r| r.score).sum();
        Self {
            full_name: full_name.into(),
            ratings,
            total_score,
        }
    }

    /// Score recorded for a trait label.
    pub fn score(&self, label: &str) -> Option<u32> {
        self.ratings
            .iter()
            .find(|r| r.label == label)
            .map(|r| r.score)
    }
}

/// One respondent of the survey export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyRecord {
    pub full_name: String,
    /// Answers to `Q2..Q7`, untouched.
    pub answers: [String; 6],
}

/// One row of the merged output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRecord {
    #[serde(rename = "Full Name")]
    pub full_name: String,
    #[serde(rename = "Total Score")]
    pub total_score: u32,
    #[serde(rename = "Q2")]
    pub q2: String,
    #[serde(rename = "Q3")]
    pub q3: String,
    #[serde(rename = "Q4")]
    pub q4: String,
    #[serde(rename = "Q5")]
    pub q5: String,
    #[serde(rename = "Q6")]
    pub q6: String,
    #[serde(rename = "Q7")]
    pub q7: String,
}

impl MergedRecord {
    pub fn from_parts(evaluation: &EvaluationRecord, survey: &SurveyRecord) -> Self {
        let [q2, q3, q4, q5, q6, q7] = survey.answers.clone();
        Self {
            full_name: evaluation.full_name.clone(),
            total_score: evaluation.total_score,
            q2,
            q3,
            q4,
            q5,
            q6,
            q7,
        }
    }

    /// Cells in [`MERGED_HEADER`] order.
    pub fn to_row(&self) -> [String; 8] {
        [
            self.full_name.clone(),
            self.total_score.to_string(),
            self.q2.clone(),
            self.q3.clone(),
            self.q4.clone(),
            self.q5.clone(),
            self.q6.clone(),
            self.q7.clone(),
        ]
    }
}

/// What happened during one merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub evaluation_rows: usize,
    pub survey_rows: usize,
    pub merged_rows: usize,
    /// Evaluated names with no survey row.
    pub unmatched_evaluations: Vec<String>,
    /// Survey names with no evaluation row.
    pub unmatched_survey: Vec<String>,
}
