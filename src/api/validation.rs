use super::error::ApiError;
use super::models::DownloadRequest;
use crate::config::JobsConfig;
use crate::jobs::{JobKind, SubmitRequest, UnknownKind};

/// Fill in defaults and parse the kind. URL emptiness is left to the runner.
pub fn to_submit_request(
    request: DownloadRequest,
    defaults: &JobsConfig,
) -> Result<SubmitRequest, UnknownKind> {
    let kind = match request.kind.as_deref().map(str::trim) {
        None | Some("") => JobKind::Video,
        Some(kind) => kind.parse()?,
    };

    let quality = request
        .quality
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .unwrap_or_else(|| defaults.default_quality.clone());

    let output_dir = request
        .output_dir
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| defaults.default_output_dir.clone());

    Ok(SubmitRequest {
        url: request.url,
        kind,
        quality,
        output_dir,
    })
}

pub fn require_url(url: &str) -> Result<&str, ApiError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ApiError::InvalidPayload("URL must not be empty".into()));
    }
    Ok(url)
}
