//! # Custom Extractors & Validation
//!
//! Provides the [`Validate`] trait for request DTOs, helpers to extract and
//! validate JSON bodies in handlers, and the [`Caller`] extractor that reads
//! the acting participant from the `x-accord-participant` header.

use accord_core::ParticipantId;
use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::Json;

use crate::error::AppError;

/// Header carrying the acting participant's id.
pub const PARTICIPANT_HEADER: &str = "x-accord-participant";

/// Trait for request types that can validate their business rules
/// beyond what serde deserialization checks.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Reject blank strings in request fields.
pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    Ok(())
}

/// The participant a request acts as.
///
/// Missing header is 401; a header that is not a valid participant id is 400.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub ParticipantId);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(PARTICIPANT_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("missing {PARTICIPANT_HEADER} header")))?;
        let raw = value
            .to_str()
            .map_err(|_| AppError::BadRequest(format!("{PARTICIPANT_HEADER} is not valid text")))?;
        ParticipantId::new(raw)
            .map(Caller)
            .map_err(|e| AppError::BadRequest(format!("{PARTICIPANT_HEADER}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[derive(Debug, serde::Deserialize)]
    struct Probe {
        name: String,
    }

    impl Validate for Probe {
        fn validate(&self) -> Result<(), String> {
            require_non_empty("name", &self.name)
        }
    }

    async fn caller_from(header: Option<&str>) -> Result<Caller, AppError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(PARTICIPANT_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Caller::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn caller_reads_header() {
        let caller = caller_from(Some("alice")).await.unwrap();
        assert_eq!(caller.0.as_str(), "alice");
    }

    #[tokio::test]
    async fn missing_caller_is_unauthorized() {
        assert!(matches!(
            caller_from(None).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn blank_caller_is_bad_request() {
        assert!(matches!(
            caller_from(Some("")).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn validated_json_rejects_blank_field() {
        let err = extract_validated_json(Ok(Json(Probe {
            name: "  ".into(),
        })))
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("name")));
    }

    #[test]
    fn validated_json_passes_good_body() {
        let probe = extract_validated_json(Ok(Json(Probe {
            name: "ok".into(),
        })))
        .unwrap();
        assert_eq!(probe.name, "ok");
    }
}
