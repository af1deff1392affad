//! Transformation module.
//!
//! - Evaluation: skip metadata rows, recode ratings, total per respondent
//! - Survey: project and rename the survey answers
//! - Join: inner join on the respondent name and CSV rendering
//! - Pipeline: load → validate → extract → join → write

pub mod evaluation;
pub mod join;
pub mod pipeline;
pub mod survey;

pub use evaluation::{extract_evaluations, rating_score};
pub use join::{ensure_unique_names, join_records, render_merged, write_merged};
pub use pipeline::*;
pub use survey::extract_survey;
