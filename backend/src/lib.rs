//! # Survey Merge - score peer evaluations and join them with survey answers
//!
//! Survey Merge takes two CSV exports from the same survey platform: an
//! evaluation export where each respondent is rated on twelve traits, and a
//! survey export with free answers. It totals the ratings per respondent and
//! joins the total with the survey answers on the respondent's full name.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  2 × CSV    │────▶│   Parser    │────▶│  Validate   │────▶│  Extract    │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │  (columns)  │     │  (score)    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │
//!                     ┌─────────────┐     ┌─────────────┐            │
//!                     │ merged CSV  │◀────│ Inner join  │◀───────────┘
//!                     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use survey_merge::{merge_bytes, MergeOptions};
//!
//! let (csv, outcome) = merge_bytes(evaluations, survey, &MergeOptions::default())?;
//! println!("Merged {} respondents", outcome.report.merged_rows);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per stage
//! - [`models`] - Records and the fixed export layouts
//! - [`parser`] - CSV loading with auto-detection
//! - [`validation`] - Required-column checks
//! - [`transform`] - Extraction, join and pipeline
//! - [`config`] - Server configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Transformation
pub mod transform;

// Configuration
pub mod config;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CsvError,
    DuplicateKeyError,
    PipelineError,
    SchemaError,
    ServerError,
    ValidationError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    EvaluationRecord,
    MergeReport,
    MergedRecord,
    RawTable,
    SurveyRecord,
    TableKind,
    TraitScore,
    MERGED_HEADER,
    RATING_SCALE,
    TRAIT_COLUMNS,
};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    detect_encoding,
    parse_bytes_auto,
    parse_csv,
    parse_csv_file_auto,
    parse_str,
    ParseResult,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    is_valid,
    validate_columns,
    validate_evaluations,
    validate_survey,
    ValidatedTable,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{
    extract_evaluations,
    extract_survey,
    join_records,
    merge_bytes,
    merge_files,
    merge_tables,
    rating_score,
    render_merged,
    write_merged,
    MergeOptions,
    MergeOutcome,
};

// =============================================================================
// Re-exports - Config
// =============================================================================

pub use config::ServerConfig;

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
