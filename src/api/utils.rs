//! Request plumbing shared by the JSON endpoints

use axum::http::HeaderMap;
use http_body_util::{BodyExt, LengthLimitError, Limited};

use crate::api::error::ApiError;

/// Accepts `application/json` with or without parameters. Rejects look-alikes
/// such as `application/jsonp` or `text/json`.
pub fn parse_content_type(content_type: &str) -> Result<mime::Mime, ApiError> {
    let media_type: mime::Mime = content_type.parse().map_err(|_| {
        ApiError::InvalidPayload(format!("invalid Content-Type: {}", content_type))
    })?;

    if media_type.type_() != mime::APPLICATION || media_type.subtype() != mime::JSON {
        return Err(ApiError::InvalidPayload(format!(
            "Content-Type must be application/json, got: {}/{}",
            media_type.type_(),
            media_type.subtype()
        )));
    }

    Ok(media_type)
}

pub fn require_json(headers: &HeaderMap) -> Result<(), ApiError> {
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?;
    parse_content_type(content_type)?;
    Ok(())
}

/// Collect the (already decompressed) body, refusing to buffer more than
/// `max_size` bytes
pub async fn read_body(body: axum::body::Body, max_size: usize) -> Result<Vec<u8>, ApiError> {
    let collected = Limited::new(body, max_size).collect().await.map_err(|err| {
        if err.downcast_ref::<LengthLimitError>().is_some() {
            ApiError::PayloadTooLarge(max_size)
        } else {
            ApiError::Internal(err.to_string())
        }
    })?;

    Ok(collected.to_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_type_valid() {
        assert!(parse_content_type("application/json").is_ok());
        assert!(parse_content_type("application/json; charset=utf-8").is_ok());
    }

    #[test]
    fn test_parse_content_type_invalid() {
        assert!(parse_content_type("application/jsonp").is_err());
        assert!(parse_content_type("text/json").is_err());
        assert!(parse_content_type("multipart/form-data").is_err());
        assert!(parse_content_type("").is_err());
    }

    #[test]
    fn test_require_json_missing_header() {
        let headers = HeaderMap::new();
        assert!(matches!(
            require_json(&headers),
            Err(ApiError::InvalidPayload(msg)) if msg.contains("missing")
        ));
    }

    #[tokio::test]
    async fn test_read_body_enforces_limit() {
        let body = axum::body::Body::from(vec![b'x'; 2048]);
        assert!(matches!(
            read_body(body, 1024).await,
            Err(ApiError::PayloadTooLarge(1024))
        ));

        let body = axum::body::Body::from(vec![b'x'; 1024]);
        assert_eq!(read_body(body, 1024).await.unwrap().len(), 1024);

        let body = axum::body::Body::from("{}");
        assert_eq!(read_body(body, 1024).await.unwrap(), b"{}".to_vec());
    }

    #[tokio::test]
    async fn test_read_body_stops_at_limit_for_large_upload() {
        let body = axum::body::Body::from(vec![0u8; 50 * 1024 * 1024]);
        let err = read_body(body, 64 * 1024).await.unwrap_err();
        assert!(matches!(err, ApiError::PayloadTooLarge(65536)));
        assert_eq!(err.to_string(), "payload exceeds limit of 65536 bytes");
    }
}
