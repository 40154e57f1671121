//! Convert and edit job endpoints.
//!
//! Each job runs on the blocking pool once a slot is free. A job whose client
//! goes away before it finishes has its engine process killed.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use soundshift_core::{
    CancelToken, ConversionRequest, ConverterError, EditRequest, ExecutionResult, RunControl,
};

use crate::metrics::{GaugeGuard, JOBS_RUNNING, JOBS_WAITING};
use crate::state::{AppState, SharedConverter};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for a format conversion
#[derive(Debug, Deserialize)]
pub struct ConvertBody {
    pub input_path: String,
    pub output_path: String,
    pub output_format: String,
}

/// Request body for an edit
#[derive(Debug, Deserialize)]
pub struct EditBody {
    pub input_path: String,
    pub output_path: String,
    #[serde(default)]
    pub volume_change_db: Option<f64>,
    #[serde(default)]
    pub bitrate: Option<String>,
    /// Signed so that negative rates reach validation instead of failing
    /// deserialization.
    #[serde(default)]
    pub sample_rate: Option<i64>,
    #[serde(default)]
    pub encoding: Option<String>,
}

impl TryFrom<EditBody> for EditRequest {
    type Error = ConverterError;

    fn try_from(body: EditBody) -> Result<Self, Self::Error> {
        let sample_rate = body
            .sample_rate
            .map(|rate| {
                u32::try_from(rate).map_err(|_| {
                    ConverterError::invalid_parameter(format!(
                        "sample rate must be a positive integer, got {rate}"
                    ))
                })
            })
            .transpose()?;

        Ok(EditRequest {
            input_path: body.input_path.into(),
            output_path: body.output_path.into(),
            volume_change_db: body.volume_change_db,
            bitrate: body.bitrate,
            sample_rate,
            encoding: body.encoding,
        })
    }
}

/// Outcome of a finished job
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job_id: String,
    pub succeeded: bool,
    pub exit_code: i32,
    pub duration_ms: u64,
    pub stderr_output: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct JobErrorResponse {
    pub error: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr_output: Option<String>,
}

pub type JobError = (StatusCode, Json<JobErrorResponse>);

fn error_response(err: &ConverterError) -> JobError {
    let status = match err {
        ConverterError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
        ConverterError::EngineNotFound { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ConverterError::Execution { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ConverterError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(JobErrorResponse {
            error: err.to_string(),
            kind: err.kind().to_string(),
            exit_code: err.exit_code(),
            stderr_output: err.stderr_output().map(str::to_string),
        }),
    )
}

fn internal_error(message: String) -> JobError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(JobErrorResponse {
            error: message,
            kind: "internal".to_string(),
            exit_code: None,
            stderr_output: None,
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Convert a file to the format implied by its output extension
pub async fn convert(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ConvertBody>,
) -> Result<Json<JobResponse>, JobError> {
    let req = ConversionRequest::new(body.input_path, body.output_path, body.output_format);
    run_job(&state, "convert", move |converter, control| {
        converter.convert_with(&req, control)
    })
    .await
}

/// Re-encode a file with the requested volume, rate, codec and bitrate
pub async fn edit(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EditBody>,
) -> Result<Json<JobResponse>, JobError> {
    let req = EditRequest::try_from(body).map_err(|e| error_response(&e))?;
    run_job(&state, "edit", move |converter, control| {
        converter.edit_with(&req, control)
    })
    .await
}

/// Cancels the job's engine process if the handler future is dropped.
struct CancelOnDrop(CancelToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

async fn run_job<F>(
    state: &AppState,
    operation: &'static str,
    job: F,
) -> Result<Json<JobResponse>, JobError>
where
    F: FnOnce(&SharedConverter, &RunControl) -> Result<ExecutionResult, ConverterError>
        + Send
        + 'static,
{
    let job_id = Uuid::new_v4().to_string();
    let span = info_span!("job", %job_id, operation);

    let waiting = GaugeGuard::inc(&JOBS_WAITING);
    let permit = state.job_slots().acquire_owned().await;
    drop(waiting);
    let permit = permit.map_err(|e| internal_error(format!("Job slots unavailable: {}", e)))?;

    let token = CancelToken::new();
    let _guard = CancelOnDrop(token.clone());
    let control = state.run_control().with_cancel(token);
    let converter = state.converter();

    let task_span = span.clone();
    let result = tokio::task::spawn_blocking(move || {
        let _enter = task_span.enter();
        let _permit = permit;
        let _running = GaugeGuard::inc(&JOBS_RUNNING);
        job(&converter, &control)
    })
    .await;

    let _enter = span.enter();
    match result {
        Ok(Ok(outcome)) => {
            info!(duration_ms = outcome.duration_ms, "Job finished");
            Ok(Json(JobResponse {
                job_id,
                succeeded: outcome.succeeded,
                exit_code: outcome.exit_code,
                duration_ms: outcome.duration_ms,
                stderr_output: outcome.stderr_output,
            }))
        }
        Ok(Err(e)) => {
            info!(kind = e.kind(), "Job failed");
            Err(error_response(&e))
        }
        Err(e) => {
            warn!("Job task failed: {}", e);
            Err(internal_error(format!("Job task failed: {}", e)))
        }
    }
}
