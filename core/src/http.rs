use crate::config::ClientConfig;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;
use tracing::warn;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("failed to construct http client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("{message}")]
    Transport { message: String },
    #[error("failed to decode response body: {0}")]
    Decode(#[source] reqwest::Error),
}

impl HttpError {
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// A failure is retryable iff no response was received at all, or the
    /// server answered 429 or any 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            HttpError::Transport { .. } => true,
            HttpError::Status { status, .. } => *status == 429 || *status >= 500,
            HttpError::Build(_) | HttpError::Decode(_) => false,
        }
    }
}

/// A parsed response: numeric status plus the JSON body.
#[derive(Debug, Clone)]
pub struct JsonResponse {
    pub status: u16,
    pub body: Value,
}

/// Delay before retry `retry` (0-indexed): doubles starting from `base`.
pub fn backoff_delay(base: Duration, retry: u32) -> Duration {
    base * 2u32.saturating_pow(retry)
}

/// HTTP transport with a fixed per-attempt timeout and automatic retry of
/// transient failures. Holds no state between logical requests.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    config: ClientConfig,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self, HttpError> {
        let inner = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(HttpError::Build)?;
        Ok(Self { inner, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn get(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<JsonResponse, HttpError> {
        self.execute(Method::GET, path, params, None).await
    }

    pub async fn post(&self, path: &str, body: Option<&Value>) -> Result<JsonResponse, HttpError> {
        self.execute(Method::POST, path, &[], body).await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<JsonResponse, HttpError> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut attempt: u32 = 0;
        loop {
            debug!(%method, %url, attempt, "dispatching request");
            match self.send_once(&method, &url, params, body).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    let delay = backoff_delay(self.config.base_backoff, attempt);
                    warn!(%url, attempt, delay_ms = delay.as_millis() as u64, "retrying after transient failure: {err}");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        params: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<JsonResponse, HttpError> {
        let mut request = self
            .inner
            .request(method.clone(), url)
            .header("Content-Type", "application/json");
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|err| HttpError::Transport {
            message: transport_message(&err),
        })?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| detail_message(&body))
                .unwrap_or_else(|| format!("Request failed with status {status}"));
            return Err(HttpError::Status { status, message });
        }
        let body = response.json::<Value>().await.map_err(HttpError::Decode)?;
        Ok(JsonResponse { status, body })
    }
}

/// Prefer the server-supplied `detail` field when an error body carries one.
fn detail_message(body: &Value) -> Option<String> {
    match body.get("detail")? {
        Value::String(detail) => Some(detail.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn transport_message(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "Request timed out".to_string()
    } else {
        err.to_string()
    }
}
