//! HTTP client for the running field-services API.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Chat message in the shape the assistant routes accept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: &'static str,
    pub content: String,
}

impl Message {
    pub fn technician(content: impl Into<String>) -> Self {
        Self {
            role: "technician",
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant",
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Validation {
    pub valid: bool,
    pub missing: String,
    pub follow_up_questions: Vec<String>,
}

impl Validation {
    /// All follow-up questions as one line.
    pub fn follow_up(&self) -> String {
        self.follow_up_questions.join(" ")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientSummary {
    pub summary: String,
    pub notes: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CarReport {
    pub cause: String,
    pub action: String,
    pub result: String,
}

pub struct ServiceClient {
    client: Client,
    base_url: String,
}

impl ServiceClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .context("Failed to build HTTP client")?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn validate_work_status<B: Serialize>(&self, body: &B) -> Result<Validation> {
        self.post("/validate-work-status", body).await
    }

    pub async fn validate_reason_for_hold<B: Serialize>(&self, body: &B) -> Result<Validation> {
        self.post("/validate-reason-for-hold", body).await
    }

    pub async fn convert_to_client_summary<B: Serialize>(&self, body: &B) -> Result<ClientSummary> {
        self.post("/convert-to-client-summary", body).await
    }

    pub async fn convert_to_car<B: Serialize>(&self, body: &B) -> Result<CarReport> {
        self.post("/convert-to-car", body).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("POST {path} returned {status}: {body}");
        }
        response
            .json()
            .await
            .with_context(|| format!("POST {path} returned an unexpected body"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_validation_reply_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/validate-work-status"))
            .and(body_partial_json(json!({"operational_log": "Reset inverter"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "valid": false,
                "missing": "fault code",
                "follow_up_questions": ["Which fault code?", "Is it producing?"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ServiceClient::new(&server.uri()).unwrap();
        let verdict = client
            .validate_work_status(&json!({"operational_log": "Reset inverter"}))
            .await
            .unwrap();
        assert!(!verdict.valid);
        assert_eq!(verdict.follow_up(), "Which fault code? Is it producing?");
    }

    #[tokio::test]
    async fn test_error_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/convert-to-car"))
            .respond_with(ResponseTemplate::new(500).set_body_string("LLM_ERROR"))
            .mount(&server)
            .await;

        let client = ServiceClient::new(&server.uri()).unwrap();
        let err = client.convert_to_car(&json!({})).await.unwrap_err();
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("LLM_ERROR"));
    }
}
