//! REST API types for the upload page.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ServerError;
use crate::models::{MergeReport, MergedRecord};
use crate::transform::pipeline::MergeOutcome;

/// Response of `/api/preview`: the merged rows as JSON instead of a file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Status: "ready" when every name matched, "warning" otherwise
    pub status: String,

    /// Merged rows, keyed by output column name
    pub rows: Vec<MergedRecord>,

    /// What the merge did
    pub metadata: MergeReport,
}

impl PreviewResponse {
    pub fn new(job_id: String, outcome: MergeOutcome) -> Self {
        let report = outcome.report;
        let all_matched =
            report.unmatched_evaluations.is_empty() && report.unmatched_survey.is_empty();

        PreviewResponse {
            job_id,
            status: if all_matched { "ready" } else { "warning" }.to_string(),
            rows: outcome.records,
            metadata: report,
        }
    }
}

/// Query flags accepted by the merge endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeQuery {
    pub skip_rows: Option<usize>,
    pub unique_names: Option<bool>,
}

/// Create an error response
pub fn error_response(job_id: &str, error: &str, stage: Option<&str>) -> Value {
    json!({
        "jobId": job_id,
        "status": "error",
        "error": error,
        "stage": stage,
    })
}

/// HTTP status for a failed request.
///
/// Bad uploads are the client's fault (400); well-formed uploads whose
/// content cannot be merged are 422; anything else is ours (500).
pub fn status_for(err: &ServerError) -> StatusCode {
    match err {
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Pipeline(e) if e.is_input_error() => StatusCode::UNPROCESSABLE_ENTITY,
        ServerError::Pipeline(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Stage label reported alongside an error.
pub fn stage_for(err: &ServerError) -> &'static str {
    match err {
        ServerError::BadRequest(_) => "upload",
        ServerError::Pipeline(e) => e.stage(),
        ServerError::Internal(_) => "internal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CsvError, PipelineError, SchemaError};
    use crate::models::TableKind;

    #[test]
    fn test_status_mapping() {
        let bad = ServerError::BadRequest("Both files are required!".into());
        assert_eq!(status_for(&bad), StatusCode::BAD_REQUEST);
        assert_eq!(stage_for(&bad), "upload");

        let schema = ServerError::Pipeline(PipelineError::Schema(SchemaError::MissingColumns {
            table: TableKind::Survey,
            columns: vec!["Q7".into()],
        }));
        assert_eq!(status_for(&schema), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(stage_for(&schema), "schema");

        let parse = ServerError::Pipeline(PipelineError::csv(
            TableKind::Evaluations,
            CsvError::parse(2, "unterminated quote"),
        ));
        assert_eq!(status_for(&parse), StatusCode::UNPROCESSABLE_ENTITY);

        let io = ServerError::Pipeline(PipelineError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )));
        assert_eq!(status_for(&io), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_preview_status() {
        let outcome = MergeOutcome {
            records: vec![],
            report: MergeReport {
                unmatched_survey: vec!["D".into()],
                ..MergeReport::default()
            },
        };
        let response = PreviewResponse::new("job".into(), outcome);
        assert_eq!(response.status, "warning");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["jobId"], "job");
        assert_eq!(json["metadata"]["unmatchedSurvey"][0], "D");
    }

    #[test]
    fn test_error_response_shape() {
        let body = error_response("abc", "survey: missing required columns: Q7", Some("schema"));
        assert_eq!(body["status"], "error");
        assert_eq!(body["stage"], "schema");
        assert!(body["error"].as_str().unwrap().contains("Q7"));
    }
}
