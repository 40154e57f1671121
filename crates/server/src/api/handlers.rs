use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use soundshift_core::{Codec, Config, FormatPolicy};

use crate::metrics::encode_metrics;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// The config holds no secrets, so it is returned as loaded.
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<Config> {
    Json(state.config().clone())
}

#[derive(Debug, Serialize)]
pub struct CodecInfo {
    pub identifier: &'static str,
    pub description: &'static str,
    pub extensions: &'static [&'static str],
}

impl From<Codec> for CodecInfo {
    fn from(codec: Codec) -> Self {
        Self {
            identifier: codec.identifier(),
            description: codec.description(),
            extensions: codec.extensions(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EngineInfoResponse {
    pub path: PathBuf,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub codecs: Vec<CodecInfo>,
    pub max_parallel_jobs: usize,
    pub timeout_secs: Option<u64>,
    pub format_policy: FormatPolicy,
}

/// Probe the engine binary and describe what the server can do with it.
pub async fn engine_info(State(state): State<Arc<AppState>>) -> Json<EngineInfoResponse> {
    let converter = state.converter();
    let probe = tokio::task::spawn_blocking(move || converter.validate()).await;

    let (available, version, error) = match probe {
        Ok(Ok(info)) => (true, info.version, None),
        Ok(Err(e)) => (false, None, Some(e.to_string())),
        Err(e) => {
            warn!("Engine probe task failed: {}", e);
            (false, None, Some(e.to_string()))
        }
    };

    let engine = &state.config().engine;
    Json(EngineInfoResponse {
        path: engine.path.clone(),
        available,
        version,
        error,
        codecs: Codec::ALL.iter().copied().map(CodecInfo::from).collect(),
        max_parallel_jobs: engine.max_parallel_jobs,
        timeout_secs: engine.timeout_secs,
        format_policy: engine.format_policy,
    })
}

pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
