//! HTTP Server for the survey merge API.
//!
//! Accepts the two exports as a multipart upload and returns the merged CSV.
//! Each request works in its own temporary directory, removed when the
//! request ends, so concurrent uploads never share files.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/`               | Upload form                          |
//! | GET    | `/health`         | Health check                         |
//! | POST   | `/api/process`    | Upload both exports, download merge  |
//! | POST   | `/process`        | Same as `/api/process`               |
//! | POST   | `/api/preview`    | Upload both exports, merged rows JSON|
//! | GET    | `/api/logs`       | SSE stream for real-time logs        |

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Html, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, path::Path, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use super::logs::{log_error, log_info, log_success, LOG_BROADCASTER};
use super::types::{error_response, stage_for, status_for, MergeQuery, PreviewResponse};
use crate::config::{ServerConfig, OUTPUT_FILE_NAME};
use crate::error::{ServerError, ServerResult};
use crate::models::MergeReport;
use crate::transform::pipeline::{merge_bytes, merge_files, MergeOptions, MergeOutcome};

const INDEX_HTML: &str = include_str!("../../static/index.html");

type ApiError = (StatusCode, Json<Value>);

/// Build the application router.
pub fn router(config: ServerConfig) -> Router {
    // CORS permissif pour le développement
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    let body_limit = config.max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/process", post(process_files))
        .route("/process", post(process_files))
        .route("/api/preview", post(preview_files))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(Arc::new(config))
}

/// Start the HTTP server
pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    println!("🚀 Survey merge server running on http://localhost:{}", config.port);
    println!("   GET  /             - Upload form");
    println!("   POST /api/process  - Merge two exports (CSV download)");
    println!("   POST /process      - Alias of /api/process");
    println!("   POST /api/preview  - Merge two exports (JSON rows)");
    println!("   GET  /api/logs     - SSE log stream");
    println!("   GET  /health       - Health check");
    println!();

    let app = router(config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "survey-merge",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "process": "POST /api/process",
            "preview": "POST /api/preview",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Merge endpoint: returns the merged CSV as an attachment.
async fn process_files(
    State(config): State<Arc<ServerConfig>>,
    Query(query): Query<MergeQuery>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let job_id = Uuid::new_v4().to_string();
    let options = merge_options(&config, &query);

    let result = run_process(&job_id, multipart, options).await;

    let (bytes, report) = result.map_err(|e| reject(&job_id, e))?;
    log_success(format!("Job {}: {} merged rows", job_id, report.merged_rows));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", OUTPUT_FILE_NAME),
        )
        .header("x-job-id", job_id.as_str())
        .header("x-merged-rows", report.merged_rows.to_string())
        .body(Body::from(bytes))
        .map_err(|e| reject(&job_id, ServerError::Internal(e.to_string())))
}

/// Preview endpoint: same merge, rows returned as JSON.
async fn preview_files(
    State(config): State<Arc<ServerConfig>>,
    Query(query): Query<MergeQuery>,
    multipart: Multipart,
) -> Result<Json<PreviewResponse>, ApiError> {
    let job_id = Uuid::new_v4().to_string();
    let options = merge_options(&config, &query);

    let result = run_preview(&job_id, multipart, options).await;

    let (_, outcome) = result.map_err(|e| reject(&job_id, e))?;
    Ok(Json(PreviewResponse::new(job_id, outcome)))
}

async fn run_process(
    job_id: &str,
    multipart: Multipart,
    options: MergeOptions,
) -> ServerResult<(Vec<u8>, MergeReport)> {
    let uploads = read_uploads(multipart).await?;
    announce(job_id, &uploads);

    let id = job_id.to_string();
    tokio::task::spawn_blocking(move || merge_in_workspace(&id, &uploads, &options))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
}

async fn run_preview(
    job_id: &str,
    multipart: Multipart,
    options: MergeOptions,
) -> ServerResult<(Vec<u8>, MergeOutcome)> {
    let uploads = read_uploads(multipart).await?;
    announce(job_id, &uploads);

    let outcome = tokio::task::spawn_blocking(move || {
        merge_bytes(&uploads.evaluations, &uploads.survey, &options)
    })
    .await
    .map_err(|e| ServerError::Internal(e.to_string()))??;

    Ok(outcome)
}

/// The two uploaded exports.
struct Uploads {
    evaluations: Vec<u8>,
    evaluations_name: Option<String>,
    survey: Vec<u8>,
    survey_name: Option<String>,
}

/// Collect `file1` (evaluations) and `file2` (survey) from the form.
///
/// An empty part counts as missing.
async fn read_uploads(mut multipart: Multipart) -> ServerResult<Uploads> {
    let mut file1: Option<(Option<String>, Vec<u8>)> = None;
    let mut file2: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != "file1" && name != "file2" {
            continue;
        }

        let file_name = field.file_name().map(|s| s.to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?
            .to_vec();

        if bytes.is_empty() {
            continue;
        }
        if name == "file1" {
            file1 = Some((file_name, bytes));
        } else {
            file2 = Some((file_name, bytes));
        }
    }

    match (file1, file2) {
        (Some((evaluations_name, evaluations)), Some((survey_name, survey))) => Ok(Uploads {
            evaluations,
            evaluations_name,
            survey,
            survey_name,
        }),
        _ => Err(ServerError::BadRequest("Both files are required!".to_string())),
    }
}

/// Run the file-level merge inside a private temporary directory.
fn merge_in_workspace(
    job_id: &str,
    uploads: &Uploads,
    options: &MergeOptions,
) -> ServerResult<(Vec<u8>, MergeReport)> {
    let workspace = tempfile::Builder::new()
        .prefix(&format!("survey-merge-{}-", job_id))
        .tempdir()
        .map_err(|e| ServerError::Internal(format!("Cannot create workspace: {}", e)))?;

    let dir = workspace.path();
    let evaluations = dir.join("evaluations.csv");
    let survey = dir.join("survey.csv");
    let output = dir.join(OUTPUT_FILE_NAME);

    save(&evaluations, &uploads.evaluations)?;
    save(&survey, &uploads.survey)?;

    let report = merge_files(&evaluations, &survey, &output, options)?;
    let bytes = std::fs::read(&output)
        .map_err(|e| ServerError::Internal(format!("Cannot read merged output: {}", e)))?;

    Ok((bytes, report))
}

fn save(path: &Path, bytes: &[u8]) -> ServerResult<()> {
    std::fs::write(path, bytes)
        .map_err(|e| ServerError::Internal(format!("Cannot store upload: {}", e)))
}

fn merge_options(config: &ServerConfig, query: &MergeQuery) -> MergeOptions {
    MergeOptions {
        skip_rows: query.skip_rows.unwrap_or(config.merge.skip_rows),
        unique_names: query.unique_names.unwrap_or(config.merge.unique_names),
        ..config.merge.clone()
    }
}

fn announce(job_id: &str, uploads: &Uploads) {
    log_info(format!(
        "📄 Job {}: {} ({} bytes) + {} ({} bytes)",
        job_id,
        uploads.evaluations_name.as_deref().unwrap_or("file1"),
        uploads.evaluations.len(),
        uploads.survey_name.as_deref().unwrap_or("file2"),
        uploads.survey.len(),
    ));
}

fn reject(job_id: &str, err: ServerError) -> ApiError {
    let status = status_for(&err);
    let stage = stage_for(&err);
    log_error(format!("Job {} failed ({}): {}", job_id, stage, err));
    (
        status,
        Json(error_response(job_id, &err.to_string(), Some(stage))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    fn uploads(evaluations: &str, survey: &str) -> Uploads {
        Uploads {
            evaluations: evaluations.as_bytes().to_vec(),
            evaluations_name: Some("evaluations.csv".into()),
            survey: survey.as_bytes().to_vec(),
            survey_name: None,
        }
    }

    fn evaluation_csv(name: &str, rating: &str) -> String {
        let header = crate::models::evaluation_required_columns().join(",");
        let meta = vec!["meta"; 13].join(",");
        let row = std::iter::once(name)
            .chain(std::iter::repeat(rating).take(12))
            .collect::<Vec<_>>()
            .join(",");
        format!("{header}\n{meta}\n{meta}\n{row}\n")
    }

    #[test]
    fn test_merge_in_workspace() {
        let survey = "Q1,Q2,Q3,Q4,Q5,Q6,Q7\nJane Doe,X,b,c,d,e,Z\n";
        let (bytes, report) = merge_in_workspace(
            "test-job",
            &uploads(&evaluation_csv("Jane Doe", "Good"), survey),
            &MergeOptions::default(),
        )
        .unwrap();

        assert_eq!(report.merged_rows, 1);
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "Full Name,Total Score,Q2,Q3,Q4,Q5,Q6,Q7\nJane Doe,36,X,b,c,d,e,Z\n"
        );
    }

    #[test]
    fn test_workspace_error_is_unprocessable() {
        let err = merge_in_workspace(
            "test-job",
            &uploads(&evaluation_csv("A", "Good"), "Q1,Q2\nA,x\n"),
            &MergeOptions::default(),
        )
        .unwrap_err();
        assert_eq!(status_for(&err), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.to_string().contains("missing required columns"));
    }

    #[test]
    fn test_query_overrides_config() {
        let config = ServerConfig::default();
        let query = MergeQuery {
            skip_rows: Some(0),
            unique_names: None,
        };
        let options = merge_options(&config, &query);
        assert_eq!(options.skip_rows, 0);
        assert!(!options.unique_names);
    }

    const BOUNDARY: &str = "survey-merge-boundary";

    fn multipart_body(parts: &[(&str, &str)]) -> String {
        let mut body = String::new();
        for (name, content) in parts {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
                 filename=\"{name}.csv\"\r\nContent-Type: text/csv\r\n\r\n{content}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    async fn post_upload(uri: &str, parts: &[(&str, &str)]) -> Response {
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        router(ServerConfig::default()).oneshot(request).await.unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_upload_missing_file2_is_bad_request() {
        let eval = evaluation_csv("Jane Doe", "Good");
        let response = post_upload("/api/process", &[("file1", &eval)]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["error"], "Both files are required!");
        assert_eq!(body["stage"], "upload");
    }

    #[tokio::test]
    async fn test_upload_empty_file2_is_bad_request() {
        let eval = evaluation_csv("Jane Doe", "Good");
        let response = post_upload("/api/process", &[("file1", &eval), ("file2", "")]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("Both files are required!"));
    }

    #[tokio::test]
    async fn test_upload_malformed_multipart_is_bad_request() {
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/api/process")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from("not a multipart body"))
            .unwrap();
        let response = router(ServerConfig::default()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_pair_returns_merged_csv() {
        let eval = evaluation_csv("Jane Doe", "Good");
        let survey = "Q1,Q2,Q3,Q4,Q5,Q6,Q7\nJane Doe,X,b,c,d,e,Z\n";

        for uri in ["/api/process", "/process"] {
            let response = post_upload(uri, &[("file1", &eval), ("file2", survey)]).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()["x-merged-rows"], "1");
            assert!(response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/csv"));
            assert_eq!(
                body_string(response).await,
                "Full Name,Total Score,Q2,Q3,Q4,Q5,Q6,Q7\nJane Doe,36,X,b,c,d,e,Z\n"
            );
        }
    }

    #[tokio::test]
    async fn test_upload_bad_schema_is_unprocessable() {
        let eval = evaluation_csv("Jane Doe", "Good");
        let response =
            post_upload("/api/process", &[("file1", &eval), ("file2", "Q1,Q2\nJane Doe,x\n")])
                .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["stage"], "schema");
    }
}
