use crate::http::HttpError;
use crate::http::JsonResponse;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// The uniform boundary between transport failures and application decisions.
/// Exactly one of the two shapes; callers branch on it instead of catching
/// errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult<T> {
    Ok { data: T, status: u16 },
    Err { error: String, status: Option<u16> },
}

impl ApiResult<Value> {
    /// Normalizes a raw transport outcome. Never propagates `HttpError`.
    pub fn from_response(outcome: Result<JsonResponse, HttpError>) -> Self {
        match outcome {
            Ok(response) => ApiResult::Ok {
                data: response.body,
                status: response.status,
            },
            Err(err) => {
                let status = err.status();
                ApiResult::Err {
                    error: err.to_string(),
                    status,
                }
            }
        }
    }

    /// Reshapes the raw JSON payload into a typed value. A payload that does
    /// not match the expected shape becomes the `Err` variant with the same
    /// status.
    pub fn decode<T: DeserializeOwned>(self) -> ApiResult<T> {
        match self {
            ApiResult::Ok { data, status } => match serde_json::from_value(data) {
                Ok(data) => ApiResult::Ok { data, status },
                Err(err) => ApiResult::Err {
                    error: format!("unexpected response shape: {err}"),
                    status: Some(status),
                },
            },
            ApiResult::Err { error, status } => ApiResult::Err { error, status },
        }
    }
}

impl<T> ApiResult<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, ApiResult::Ok { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiResult::Ok { status, .. } => Some(*status),
            ApiResult::Err { status, .. } => *status,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ApiResult::Ok { .. } => None,
            ApiResult::Err { error, .. } => Some(error),
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            ApiResult::Ok { data, .. } => Some(data),
            ApiResult::Err { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        count: u32,
    }

    #[test]
    fn success_normalizes_with_status() {
        let result = ApiResult::from_response(Ok(JsonResponse {
            status: 200,
            body: serde_json::json!({ "count": 3 }),
        }));
        assert!(result.is_ok());
        assert_eq!(result.status(), Some(200));
        let decoded = result.decode::<Payload>();
        assert_eq!(decoded.into_data(), Some(Payload { count: 3 }));
    }

    #[test]
    fn failure_keeps_status_and_message() {
        let result = ApiResult::from_response(Err(HttpError::Status {
            status: 404,
            message: "no such collection".to_string(),
        }));
        assert!(!result.is_ok());
        assert_eq!(result.status(), Some(404));
        assert_eq!(result.error(), Some("no such collection"));
    }

    #[test]
    fn transport_failure_has_no_status() {
        let result = ApiResult::from_response(Err(HttpError::Transport {
            message: "connection refused".to_string(),
        }));
        assert_eq!(result.status(), None);
        assert_eq!(result.error(), Some("connection refused"));
    }

    #[test]
    fn shape_mismatch_becomes_err() {
        let result = ApiResult::from_response(Ok(JsonResponse {
            status: 200,
            body: serde_json::json!({ "count": "three" }),
        }));
        let decoded = result.decode::<Payload>();
        assert!(!decoded.is_ok());
        assert_eq!(decoded.status(), Some(200));
    }
}
