//! Errors returned by the Azure DevOps REST client

use serde::Deserialize;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Failure of one REST call
///
/// Messages come from the service's response body and never include the
/// request's credentials.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Non-success status. `type_key` names the service exception when the
    /// body carried one.
    #[error("API error (status {status}): {message}")]
    ApiError {
        status: u16,
        type_key: Option<String>,
        message: String,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Body the service attaches to failed calls
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceErrorBody {
    #[serde(default)]
    type_key: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ClientError {
    /// Error for a failed response
    ///
    /// A JSON service error body is unpacked into its message and exception
    /// type; anything else is kept verbatim as the message.
    pub fn api_error(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match serde_json::from_str::<ServiceErrorBody>(&body) {
            Ok(ServiceErrorBody {
                type_key,
                message: Some(message),
            }) => Self::ApiError {
                status,
                type_key,
                message,
            },
            _ => Self::ApiError {
                status,
                type_key: None,
                message: body,
            },
        }
    }

    /// Whether the addressed object does not exist
    ///
    /// Deleted release definitions come back as 400 with a
    /// `ReleaseDefinitionNotFoundException` rather than 404.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ApiError { status: 404, .. } => true,
            Self::ApiError {
                status: 400,
                type_key: Some(type_key),
                ..
            } => type_key.ends_with("NotFoundException"),
            Self::ApiError {
                status: 400,
                type_key: None,
                message,
            } => message.contains("NotFoundException"),
            _ => false,
        }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidRequest(format!("invalid URL: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_body_is_unpacked() {
        let err = ClientError::api_error(
            400,
            r#"{"$id":"1","typeKey":"ReleaseDefinitionNotFoundException","message":"VS402854: Definition not found","errorCode":0}"#,
        );
        assert!(matches!(
            &err,
            ClientError::ApiError { type_key: Some(k), .. } if k == "ReleaseDefinitionNotFoundException"
        ));
        assert_eq!(
            err.to_string(),
            "API error (status 400): VS402854: Definition not found"
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_not_found_classification() {
        assert!(ClientError::api_error(404, "gone").is_not_found());
        assert!(
            ClientError::api_error(400, "ReleaseDefinitionNotFoundException: no such definition")
                .is_not_found()
        );
        assert!(
            !ClientError::api_error(400, r#"{"typeKey":"InvalidRequestException","message":"bad"}"#)
                .is_not_found()
        );
        assert!(!ClientError::api_error(400, "bad request").is_not_found());
        assert!(!ClientError::api_error(500, "NotFoundException").is_not_found());
    }

    #[test]
    fn test_plain_body_is_kept() {
        let err = ClientError::api_error(503, "Service Unavailable");
        assert_eq!(err.to_string(), "API error (status 503): Service Unavailable");
    }
}
