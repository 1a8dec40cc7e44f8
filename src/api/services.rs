use std::collections::{BTreeMap, HashMap};

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::{info, warn};

use super::{
    error::ApiError,
    models::{DownloadAccepted, DownloadRequest, HealthResponse, ProbeRequest},
    state::AppState,
    utils::{read_body, require_json},
    validation::{require_url, to_submit_request},
};
use crate::jobs::{JobId, JobKind, JobStatus, quality_labels};
use crate::provider::MediaInfo;

/// Start a download (POST /downloads)
///
/// Validates the body, fills in the configured defaults and hands the job to
/// the runner. Responds `202` with the job id before any network activity.
pub async fn submit_download(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    require_json(&headers)?;
    let body = read_body(body, state.config.server.api.max_payload_bytes.as_usize()).await?;
    let request: DownloadRequest = serde_json::from_slice(&body)?;

    let submit = to_submit_request(request, &state.config.jobs).map_err(|e| {
        state.metrics.job_rejected();
        ApiError::InvalidPayload(e.to_string())
    })?;
    let job_id = state.runner.submit(submit)?;

    Ok((StatusCode::ACCEPTED, Json(DownloadAccepted { job_id })))
}

/// Current status of one job (GET /downloads/{job_id})
///
/// Unknown ids are not an error: the body is the `unknown` sentinel.
pub async fn get_download(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Json<JobStatus> {
    Json(state.runner.status(&job_id))
}

/// Every job seen since startup (GET /downloads)
pub async fn list_downloads(State(state): State<AppState>) -> Json<BTreeMap<JobId, JobStatus>> {
    Json(state.runner.registry().list())
}

/// Pre-flight metadata lookup (POST /probe)
pub async fn probe_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<Json<MediaInfo>, ApiError> {
    require_json(&headers)?;
    let body = read_body(body, state.config.server.api.max_payload_bytes.as_usize()).await?;
    let request: ProbeRequest = serde_json::from_slice(&body)?;
    let url = require_url(&request.url)?;

    match state.runner.probe(url).await {
        Ok(info) => {
            info!(url, title = %info.title, "URL probed");
            Ok(Json(info))
        }
        Err(err) => {
            warn!(url, error = %err, "URL probe failed");
            Err(ApiError::ProbeFailed(err.to_string()))
        }
    }
}

/// Quality labels accepted per kind (GET /qualities)
pub async fn list_qualities() -> Json<BTreeMap<&'static str, Vec<&'static str>>> {
    let labels = [JobKind::Video, JobKind::Audio, JobKind::Playlist]
        .into_iter()
        .map(|kind| (kind.as_str(), quality_labels(kind)))
        .collect();
    Json(labels)
}

/// Health check (GET /health)
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = HashMap::new();
    components.insert("api".to_string(), "healthy".to_string());
    components.insert("registry".to_string(), "healthy".to_string());
    components.insert(
        "provider".to_string(),
        state.runner.provider_name().to_string(),
    );

    let response = HealthResponse {
        status: "healthy".to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
        jobs: state.runner.registry().len(),
        metrics: state.metrics.snapshot(),
    };

    (StatusCode::OK, Json(response))
}
