use super::models::Config;
use crate::humanize::ByteSize;
use thiserror::Error;

const MIN_PAYLOAD_BYTES: u64 = 1024;
const MAX_PAYLOAD_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("max_payload_bytes ({actual}) must be between {min} and {max}")]
    PayloadLimitOutOfRange { actual: ByteSize, min: ByteSize, max: ByteSize },

    #[error("provider.binary must not be empty")]
    EmptyProviderBinary,

    #[error("jobs.default_quality must not be empty")]
    EmptyDefaultQuality,

    #[error("telemetry.log_filter '{filter}' is not a valid filter: {reason}")]
    InvalidLogFilter { filter: String, reason: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_payload_limit(config)?;
    validate_provider(config)?;
    validate_jobs(config)?;
    validate_telemetry(config)?;
    Ok(())
}

fn validate_payload_limit(config: &Config) -> Result<(), ValidationError> {
    let actual = config.server.api.max_payload_bytes;
    if !(MIN_PAYLOAD_BYTES..=MAX_PAYLOAD_BYTES).contains(&actual.as_u64()) {
        return Err(ValidationError::PayloadLimitOutOfRange {
            actual,
            min: ByteSize(MIN_PAYLOAD_BYTES),
            max: ByteSize(MAX_PAYLOAD_BYTES),
        });
    }
    Ok(())
}

fn validate_provider(config: &Config) -> Result<(), ValidationError> {
    if config.provider.binary.trim().is_empty() {
        return Err(ValidationError::EmptyProviderBinary);
    }
    Ok(())
}

fn validate_jobs(config: &Config) -> Result<(), ValidationError> {
    if config.jobs.default_quality.trim().is_empty() {
        return Err(ValidationError::EmptyDefaultQuality);
    }
    Ok(())
}

fn validate_telemetry(config: &Config) -> Result<(), ValidationError> {
    let filter = &config.telemetry.log_filter;
    tracing_subscriber::EnvFilter::try_new(filter).map_err(|e| ValidationError::InvalidLogFilter {
        filter: filter.clone(),
        reason: e.to_string(),
    })?;
    Ok(())
}
