use crate::decode::DecodeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpError {
    #[error("configuration error: {0}")]
    Config(&'static str),

    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("next page link {0} is not on the API host")]
    ForeignLink(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("ping failed: {}", .0.first_detail())]
    Ping(ApiError),

    #[error("unexpected http status: {0}")]
    UnexpectedStatus(reqwest::StatusCode),

    #[error("webhook signature does not match body")]
    InvalidSignature,
}

impl UpError {
    /// The service-reported errors, if the failure came from the API.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            UpError::Api(err) | UpError::Ping(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorObject {
    pub status: String,
    pub title: String,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
}

/// Points at the part of the request that caused the error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
}

/// Every error object from one failed response, in the order the service
/// listed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    errors: Vec<ErrorObject>,
    source: Option<ErrorSource>,
}

impl ApiError {
    pub fn errors(&self) -> &[ErrorObject] {
        &self.errors
    }

    /// Envelope-level source, when the service attached one.
    pub fn error_source(&self) -> Option<&ErrorSource> {
        self.source.as_ref()
    }

    pub fn details(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.detail.as_str())
    }

    pub fn first_detail(&self) -> &str {
        self.errors.first().map_or("", |e| e.detail.as_str())
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl From<ErrorResponse> for ApiError {
    fn from(response: ErrorResponse) -> Self {
        Self {
            errors: response.errors,
            source: response.source,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, detail) in self.details().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            f.write_str(detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_object(detail: &str) -> ErrorObject {
        ErrorObject {
            status: "500".to_string(),
            title: "Internal Server Error".to_string(),
            detail: detail.to_string(),
            source: None,
        }
    }

    fn envelope(details: &[&str]) -> ErrorResponse {
        ErrorResponse {
            errors: details.iter().map(|d| error_object(d)).collect(),
            source: None,
        }
    }

    #[test]
    fn single_error_renders_as_its_detail() {
        let err = ApiError::from(envelope(&["spilling the tea"]));
        assert_eq!(err.to_string(), "spilling the tea");
    }

    #[test]
    fn multiple_errors_keep_every_detail_in_order() {
        let err = ApiError::from(envelope(&["spilling the tea", "stirring the pot", "x"]));
        assert_eq!(err.to_string(), "spilling the tea; stirring the pot; x");
        assert_eq!(
            err.details().collect::<Vec<_>>(),
            vec!["spilling the tea", "stirring the pot", "x"]
        );
    }

    #[test]
    fn aggregates_from_the_same_entries_are_equal() {
        let a = ApiError::from(envelope(&["a", "b"]));
        let b = ApiError::from(envelope(&["a", "b"]));
        let reversed = ApiError::from(envelope(&["b", "a"]));
        assert_eq!(a, b);
        assert_ne!(a, reversed);
    }

    #[test]
    fn ping_error_surfaces_first_detail_only() {
        let err = UpError::Ping(ApiError::from(envelope(&["not authorized", "second"])));
        assert_eq!(err.to_string(), "ping failed: not authorized");
        assert_eq!(err.api_error().map(ApiError::len), Some(2));
    }

    #[test]
    fn decodes_envelope_with_source() {
        let body = br#"{"errors":[{"status":"400","title":"Invalid Request Parameter","detail":"bad size","source":{"parameter":"page[size]"}}]}"#;
        let parsed: ErrorResponse = crate::decode::decode(body).unwrap();
        let source = parsed.errors[0].source.as_ref().unwrap();
        assert_eq!(source.parameter.as_deref(), Some("page[size]"));
        assert!(source.pointer.is_none());
    }

    #[test]
    fn decodes_envelope_with_top_level_source() {
        let body = br#"{"errors":[{"status":"422","title":"Invalid Attribute","detail":"url is invalid"}],"source":{"pointer":"/data/attributes/url"}}"#;
        let parsed: ErrorResponse = crate::decode::decode(body).unwrap();
        assert_eq!(
            parsed.source.as_ref().and_then(|s| s.pointer.as_deref()),
            Some("/data/attributes/url")
        );
        let err = ApiError::from(parsed);
        assert_eq!(err.to_string(), "url is invalid");
        assert_eq!(
            err.error_source().and_then(|s| s.pointer.as_deref()),
            Some("/data/attributes/url")
        );
    }
}
