//! High-level pipeline API: load, validate, extract, join, write.
//!
//! [`merge_tables`] is the pure core. [`merge_bytes`] and [`merge_files`]
//! wrap it with loading, rendering and logging for the CLI and HTTP server.
//!
//! # Example
//!
//! ```rust,ignore
//! use survey_merge::{merge_files, MergeOptions};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let report = merge_files(
//!         Path::new("evaluations.csv"),
//!         Path::new("survey.csv"),
//!         Path::new("final_processed_file.csv"),
//!         &MergeOptions::default(),
//!     )?;
//!     println!("Merged {} respondents", report.merged_rows);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use super::evaluation::extract_evaluations;
use super::join::{ensure_unique_names, join_records, render_merged};
use super::survey::extract_survey;
use crate::api::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{MergeReport, MergedRecord, RawTable, TableKind, DEFAULT_SKIP_ROWS};
use crate::parser::{format_delimiter, parse_bytes_auto, ParseResult};
use crate::validation::{validate_evaluations, validate_survey};

/// Options for one merge run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeOptions {
    /// Leading rows of the evaluation export to discard (question text and
    /// import metadata in the upstream export format)
    pub skip_rows: usize,

    /// Reject inputs where a respondent name repeats on either side
    pub unique_names: bool,

    /// Force a delimiter instead of detecting it
    pub delimiter: Option<u8>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            skip_rows: DEFAULT_SKIP_ROWS,
            unique_names: false,
            delimiter: None,
        }
    }
}

/// Merged rows plus what happened along the way
#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    pub records: Vec<MergedRecord>,
    pub report: MergeReport,
}

/// Merge two already-parsed exports.
///
/// Both headers are validated before either table is extracted, so a
/// schema problem in the survey export is reported even when the
/// evaluation export is also short on rows.
pub fn merge_tables(
    evaluations: &RawTable,
    survey: &RawTable,
    options: &MergeOptions,
) -> PipelineResult<MergeOutcome> {
    let evaluations = validate_evaluations(evaluations)?;
    let survey = validate_survey(survey)?;

    let scored = extract_evaluations(&evaluations, options.skip_rows)?;
    let answers = extract_survey(&survey);

    if options.unique_names {
        ensure_unique_names(
            scored.iter().map(|r| r.full_name.as_str()),
            TableKind::Evaluations,
        )?;
        ensure_unique_names(
            answers.iter().map(|r| r.full_name.as_str()),
            TableKind::Survey,
        )?;
    }

    let (records, report) = join_records(&scored, &answers);
    Ok(MergeOutcome { records, report })
}

/// Load both exports from bytes, merge, and render the output CSV.
pub fn merge_bytes(
    evaluations: &[u8],
    survey: &[u8],
    options: &MergeOptions,
) -> PipelineResult<(Vec<u8>, MergeOutcome)> {
    let outcome = run(evaluations, survey, options)?;
    let bytes = render_merged(&outcome.records).map_err(std::io::Error::other)?;
    Ok((bytes, outcome))
}

/// Load both exports from disk, merge, and write `output`.
///
/// The output is written to a temporary file beside `output` and renamed
/// into place, so a failed run leaves any existing file untouched.
pub fn merge_files(
    evaluations: &Path,
    survey: &Path,
    output: &Path,
    options: &MergeOptions,
) -> PipelineResult<MergeReport> {
    log_info(format!("📄 Evaluations: {}", evaluations.display()));
    log_info(format!("📄 Survey:      {}", survey.display()));

    let evaluation_bytes = read_input(evaluations, TableKind::Evaluations)?;
    let survey_bytes = read_input(survey, TableKind::Survey)?;

    let (bytes, outcome) = merge_bytes(&evaluation_bytes, &survey_bytes, options)?;
    write_atomic(output, &bytes)?;

    log_success(format!("💾 Output written to: {}", output.display()));
    Ok(outcome.report)
}

fn read_input(path: &Path, table: TableKind) -> PipelineResult<Vec<u8>> {
    std::fs::read(path).map_err(|source| PipelineError::Read {
        table,
        path: path.to_path_buf(),
        source,
    })
}

/// Replace `path` with `contents` in one rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn run(evaluations: &[u8], survey: &[u8], options: &MergeOptions) -> PipelineResult<MergeOutcome> {
    log_info("📖 Reading evaluation export...");
    let evaluations = load(evaluations, TableKind::Evaluations, options)?;
    log_info("📖 Reading survey export...");
    let survey = load(survey, TableKind::Survey, options)?;

    log_info("⚙️  Scoring and joining...");
    let outcome = merge_tables(&evaluations.table, &survey.table, options).map_err(|e| {
        log_error(format!("{} stage failed: {}", e.stage(), e));
        e
    })?;

    print_report(&outcome.report);
    Ok(outcome)
}

fn load(bytes: &[u8], kind: TableKind, options: &MergeOptions) -> PipelineResult<ParseResult> {
    let parsed = parse_bytes_auto(bytes, options.delimiter).map_err(|e| {
        log_error(format!("{}: {}", kind, e));
        PipelineError::csv(kind, e)
    })?;

    log_success(format!(
        "{}: {} rows, {} columns (encoding {}, separator '{}')",
        kind,
        parsed.table.len(),
        parsed.table.headers.len(),
        parsed.encoding,
        format_delimiter(parsed.delimiter),
    ));
    Ok(parsed)
}

fn print_report(report: &MergeReport) {
    log_success(format!(
        "{} scored respondents, {} survey responses, {} merged rows",
        report.evaluation_rows, report.survey_rows, report.merged_rows
    ));

    if !report.unmatched_evaluations.is_empty() {
        log_warning(format!(
            "{} evaluated names have no survey response",
            report.unmatched_evaluations.len()
        ));
        for name in report.unmatched_evaluations.iter().take(5) {
            log_info_indent(format!("• {}", name), 1);
        }
    }
    if !report.unmatched_survey.is_empty() {
        log_warning(format!(
            "{} survey names have no evaluation",
            report.unmatched_survey.len()
        ));
        for name in report.unmatched_survey.iter().take(5) {
            log_info_indent(format!("• {}", name), 1);
        }
    }
}
