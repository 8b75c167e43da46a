//! # evo-client
//!
//! HTTP client for an Ollama-style text-completion endpoint.
//!
//! One request, one raw text response. The client performs no retries:
//! service failures are terminal for the loop and retrying them is
//! explicitly not this component's job.
//!
//! Wire format:
//!
//! ```text
//! POST {endpoint}
//! { "model": ..., "prompt": ..., "stream": false, "options": { "temperature": ... } }
//! -> { "response": "..." }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Failures of the completion service layer.
///
/// None of these are retried by the loop: an unreachable backend will not
/// become reachable by resubmitting the identical request immediately.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The network connection could not be established.
    #[error("completion service unreachable: {detail}")]
    Unreachable { detail: String },

    /// No response arrived within the caller-supplied timeout.
    #[error("no response from completion service within {after:?}")]
    Timeout { after: Duration },

    /// The service answered with a non-success HTTP status.
    #[error("completion service returned status {status}")]
    BadStatus { status: u16 },

    /// The service answered 2xx with an empty completion. Classified by
    /// the caller, not by the client: an empty string is a valid HTTP
    /// response but a useless completion.
    #[error("completion service returned an empty response")]
    EmptyResponse,

    /// The service answered 2xx with a body that does not decode as
    /// `{ "response": ... }`.
    #[error("malformed completion response: {detail}")]
    Malformed { detail: String },
}

/// Connection settings for the completion service.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Full URL of the generate endpoint.
    pub endpoint: String,
    /// Model name passed through in the request body.
    pub model: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/generate".to_string(),
            model: "codellama".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Client for the completion service.
pub struct CompletionClient {
    http: reqwest::Client,
    config: CompletionConfig,
}

impl CompletionClient {
    pub fn new(config: CompletionConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ServiceError::Unreachable {
                detail: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    /// Send one prompt and return the raw completion text.
    ///
    /// The returned text may be empty; the caller decides whether that is
    /// an error (the loop treats it as [`ServiceError::EmptyResponse`]).
    pub async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<String, ServiceError> {
        debug_assert!(!prompt.is_empty(), "Prompt must not be empty");
        debug_assert!(
            (0.0..=1.0).contains(&temperature),
            "Temperature must be in [0, 1]"
        );
        debug_assert!(timeout > Duration::ZERO, "Timeout must be positive");

        let body = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature },
        };

        let response = self
            .http
            .post(&self.config.endpoint)
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::BadStatus {
                status: status.as_u16(),
            });
        }

        let parsed: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| ServiceError::Malformed {
                    detail: e.to_string(),
                })?;

        Ok(parsed.response)
    }
}

/// Split transport failures into the two kinds the loop reports
/// differently: the request timed out, or the service never answered.
fn classify_transport_error(error: reqwest::Error, timeout: Duration) -> ServiceError {
    if error.is_timeout() {
        ServiceError::Timeout { after: timeout }
    } else {
        ServiceError::Unreachable {
            detail: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = GenerateRequest {
            model: "codellama",
            prompt: "write a program",
            stream: false,
            options: GenerateOptions { temperature: 0.4 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "codellama");
        assert_eq!(json["prompt"], "write a program");
        assert_eq!(json["stream"], false);
        assert!((json["options"]["temperature"].as_f64().unwrap() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_response_body_shape() {
        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"response":"int main(void) { return 0; }"}"#).unwrap();
        assert!(parsed.response.contains("int main"));

        // Extra fields from the service are tolerated.
        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"response":"x","model":"codellama","done":true}"#).unwrap();
        assert_eq!(parsed.response, "x");
    }

    #[test]
    fn test_default_config_targets_local_service() {
        let config = CompletionConfig::default();
        assert!(config.endpoint.contains("localhost:11434"));
        assert!(config.endpoint.ends_with("/api/generate"));
    }

    #[test]
    fn test_error_display() {
        let err = ServiceError::BadStatus { status: 503 };
        assert!(err.to_string().contains("503"));

        let err = ServiceError::Timeout {
            after: Duration::from_secs(30),
        };
        assert!(err.to_string().contains("30"));
    }
}
