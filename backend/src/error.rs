//! Error types for the survey merge pipeline.
//!
//! One enum per stage, composed into [`PipelineError`]:
//!
//! - [`CsvError`] - the input is not readable delimited text (ParseError)
//! - [`SchemaError`] - a required column is missing or ambiguous
//! - [`ValidationError`] - parseable but semantically insufficient input
//! - [`DuplicateKeyError`] - repeated respondent name when uniqueness is enforced
//! - [`PipelineError`] - top-level outcome, also carrying IO failures
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;
use thiserror::Error;

use crate::models::TableKind;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors while turning bytes into a [`crate::RawTable`].
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read the source.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Could not decode the bytes as text.
    #[error("Failed to decode content: {0}")]
    EncodingError(String),

    /// Invalid delimited text (bad quoting, ragged rows).
    #[error("Invalid CSV format at line {line}: {message}")]
    ParseError { line: u64, message: String },

    /// Nothing but whitespace.
    #[error("CSV file is empty")]
    EmptyFile,
}

impl CsvError {
    pub fn parse(line: u64, message: impl Into<String>) -> Self {
        CsvError::ParseError {
            line,
            message: message.into(),
        }
    }
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        match err.into_kind() {
            csv::ErrorKind::Io(e) => CsvError::IoError(e),
            csv::ErrorKind::UnequalLengths { expected_len, len, .. } => CsvError::parse(
                line,
                format!("expected {} fields, found {}", expected_len, len),
            ),
            csv::ErrorKind::Utf8 { err, .. } => CsvError::EncodingError(err.to_string()),
            other => CsvError::parse(line, format!("{:?}", other)),
        }
    }
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Header-level problems found before extraction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// One or more required columns are absent.
    #[error("{table}: missing required columns: {}", columns.join(", "))]
    MissingColumns {
        table: TableKind,
        columns: Vec<String>,
    },

    /// A required column appears more than once in the header.
    #[error("{table}: ambiguous required columns (repeated in header): {}", columns.join(", "))]
    DuplicateColumns {
        table: TableKind,
        columns: Vec<String>,
    },
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Structurally fine, semantically insufficient.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Fewer rows than the leading metadata rows that must be skipped.
    #[error("{table}: insufficient rows: {required} leading metadata rows expected, found {found}")]
    InsufficientRows {
        table: TableKind,
        required: usize,
        found: usize,
    },
}

// =============================================================================
// Join Errors
// =============================================================================

/// A respondent name repeats while unique names are required.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{table}: duplicate respondent name '{name}'")]
pub struct DuplicateKeyError {
    pub table: TableKind,
    pub name: String,
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline outcome.
///
/// This is the error returned by [`crate::merge_tables`], [`crate::merge_bytes`]
/// and [`crate::merge_files`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input could not be parsed.
    #[error("{table}: {source}")]
    Csv {
        table: TableKind,
        #[source]
        source: CsvError,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    DuplicateKey(#[from] DuplicateKeyError),

    /// An input file could not be read.
    #[error("{table}: failed to read {}: {source}", path.display())]
    Read {
        table: TableKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the destination failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn csv(table: TableKind, source: CsvError) -> Self {
        PipelineError::Csv { table, source }
    }

    /// Name of the stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Csv { .. } | PipelineError::Read { .. } => "load",
            PipelineError::Schema(_) => "schema",
            PipelineError::Validation(_) => "extract",
            PipelineError::DuplicateKey(_) => "join",
            PipelineError::Io(_) => "write",
        }
    }

    /// True when the caller supplied bad input (as opposed to an environment failure).
    pub fn is_input_error(&self) -> bool {
        match self {
            PipelineError::Csv { source, .. } => !matches!(source, CsvError::IoError(_)),
            PipelineError::Read { .. } | PipelineError::Io(_) => false,
            _ => true,
        }
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("{0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let schema_err = SchemaError::MissingColumns {
            table: TableKind::Survey,
            columns: vec!["Q5".into()],
        };
        let pipeline_err: PipelineError = schema_err.into();
        assert_eq!(pipeline_err.stage(), "schema");
        assert!(pipeline_err.to_string().contains("Q5"));

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let pipeline_err: PipelineError = io_err.into();
        assert_eq!(pipeline_err.stage(), "write");
        assert!(!pipeline_err.is_input_error());
    }

    #[test]
    fn test_read_error_names_table_and_path() {
        let err = PipelineError::Read {
            table: TableKind::Survey,
            path: PathBuf::from("answers.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.stage(), "load");
        assert!(!err.is_input_error());
        assert_eq!(err.to_string(), "survey: failed to read answers.csv: not found");
    }

    #[test]
    fn test_missing_columns_message() {
        let err = SchemaError::MissingColumns {
            table: TableKind::Evaluations,
            columns: vec!["Q4".into(), "Q9#1_7".into()],
        };
        assert_eq!(
            err.to_string(),
            "evaluations: missing required columns: Q4, Q9#1_7"
        );
    }

    #[test]
    fn test_insufficient_rows_message() {
        let err = ValidationError::InsufficientRows {
            table: TableKind::Evaluations,
            required: 2,
            found: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("insufficient rows"));
        assert!(msg.contains("found 1"));
    }

    #[test]
    fn test_parse_error_is_input_error() {
        let err = PipelineError::csv(TableKind::Survey, CsvError::parse(3, "bad quote"));
        assert!(err.is_input_error());
        assert_eq!(err.stage(), "load");
        assert!(err.to_string().starts_with("survey: "));
    }
}
