//! Model-backed judging for evaluation runs: semantic similarity between an
//! expected and a generated follow-up question, and simulated technician
//! answers for multi-turn hold conversations.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const GRADER_MODEL: &str = "claude-haiku-4-5";
const GRADE_ATTEMPTS: usize = 2;
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Fallback when no model is available to play the technician.
pub const NO_ANSWER: &str = "Unable to generate response at this time.";

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

/// What the simulated technician knows when answering a hold follow-up.
#[derive(Debug, Clone, Copy)]
pub struct HoldAnswerContext<'a> {
    pub hold_reason: &'a str,
    pub hold_reason_type: &'a str,
    pub work_order_description: &'a str,
    pub plant: &'a str,
}

pub struct Grader {
    client: Client,
    api_key: Option<String>,
    messages_url: String,
}

impl Grader {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_base_url(api_key, ANTHROPIC_BASE_URL)
    }

    pub fn with_base_url(api_key: Option<String>, base_url: &str) -> Result<Self> {
        if api_key.is_none() {
            warn!("ANTHROPIC_API_KEY not set; similarity scores will be 0 and answers canned");
        }
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .context("Failed to build grader HTTP client")?,
            api_key,
            messages_url: format!("{}/v1/messages", base_url.trim_end_matches('/')),
        })
    }

    /// Similarity in `[0, 1]`. Any failure scores 0 so the run stays strict.
    pub async fn similarity(&self, expected: &str, generated: &str) -> f64 {
        let prompt = format!(
            "You are a strict grader. Compare two follow-up questions. \
             Output only one number from 0 to 100 representing semantic similarity in meaning.\n\
             Expected: {expected}\n\
             Generated: {generated}\n\
             Answer in percentage format. Example: 90, or 10, or 20\n\
             Answer:"
        );
        for attempt in 1..=GRADE_ATTEMPTS {
            match self.complete(&prompt, 10, 0.0).await {
                Ok(text) => match parse_score(&text) {
                    Some(score) => return score,
                    None => warn!("Grader reply {text:?} has no score (attempt {attempt})"),
                },
                Err(e) => warn!("Grader call failed (attempt {attempt}): {e:#}"),
            }
        }
        0.0
    }

    /// A short, realistic technician reply to a hold follow-up question.
    pub async fn technician_answer(&self, ctx: HoldAnswerContext<'_>, question: &str) -> String {
        let prompt = format!(
            "You are a field technician responding to a follow-up question about a work order hold.\n\n\
             CONTEXT:\n\
             Work Order Description: {}\n\
             Plant: {}\n\
             Hold Reason Type: {}\n\
             Original Hold Reason: {}\n\n\
             FOLLOW-UP QUESTION: {question}\n\n\
             Write a concise reply of 2-3 sentences that answers the question directly, \
             uses the right terminology for the equipment, and gives specific details \
             where possible, in a professional but informal tone.\n\nResponse:",
            ctx.work_order_description, ctx.plant, ctx.hold_reason_type, ctx.hold_reason
        );
        match self.complete(&prompt, 150, 0.7).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => NO_ANSWER.to_string(),
            Err(e) => {
                warn!("Technician answer generation failed: {e:#}");
                NO_ANSWER.to_string()
            }
        }
    }

    async fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("no API key configured"))?;
        let response = self
            .client
            .post(&self.messages_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&json!({
                "model": GRADER_MODEL,
                "max_tokens": max_tokens,
                "temperature": temperature,
                "messages": [{"role": "user", "content": prompt}],
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            bail!("grader API returned {status}");
        }
        let body: MessagesResponse = response.json().await?;
        body.content
            .into_iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text)
            .ok_or_else(|| anyhow!("grader returned no text"))
    }
}

/// First number of up to three digits in `text`, as a fraction of 100.
pub fn parse_score(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .take(3)
        .collect();
    let score: f64 = digits.parse().ok()?;
    Some(score.clamp(0.0, 100.0) / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("85"), Some(0.85));
        assert_eq!(parse_score("Similarity: 70%"), Some(0.7));
        assert_eq!(parse_score("100.0"), Some(1.0));
        assert_eq!(parse_score("4500"), Some(1.0));
        assert_eq!(parse_score("no idea"), None);
    }

    #[tokio::test]
    async fn test_without_key_scores_zero() {
        let grader = Grader::new(None).unwrap();
        assert_eq!(grader.similarity("a", "a").await, 0.0);
    }

    #[tokio::test]
    async fn test_similarity_from_model_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "grader-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "72"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let grader =
            Grader::with_base_url(Some("grader-key".to_string()), &server.uri()).unwrap();
        let score = grader
            .similarity("Which fault code?", "What fault code was shown?")
            .await;
        assert!((score - 0.72).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_unparseable_replies_score_zero_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "similar"}]
            })))
            .expect(GRADE_ATTEMPTS as u64)
            .mount(&server)
            .await;

        let grader = Grader::with_base_url(Some("k".to_string()), &server.uri()).unwrap();
        assert_eq!(grader.similarity("a", "b").await, 0.0);
    }
}
