/// Content Generator module
///
/// Calls the Gemini `generateContent` endpoint with the configured prompt and
/// turns its response envelope into plain post text. Failures are logged and
/// reported as "no content"; the next scheduled cycle is the retry.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;
use crate::workflow::ContentSource;

/// Gemini API request/response structures
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate, if any
    fn first_text(self) -> Option<String> {
        self.candidates?
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// Remove literal `**` emphasis markers, leaving every other character as is
pub fn clean_markdown(text: &str) -> String {
    text.replace("**", "")
}

pub struct ContentGenerator {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    prompt: String,
}

impl ContentGenerator {
    pub fn new(
        api_base: &str,
        model: &str,
        api_key: impl Into<String>,
        prompt: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for generation")?;

        Ok(Self {
            http_client,
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                api_base.trim_end_matches('/'),
                model
            ),
            api_key: api_key.into(),
            prompt: prompt.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.gemini_api_base,
            &config.gemini_model,
            config.gemini_api_key.clone(),
            config.post_prompt.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Generate one post, or `None` when the API produced nothing usable
    pub async fn generate(&self) -> Option<String> {
        match self.request_text().await {
            Ok(Some(raw)) => {
                let cleaned = clean_markdown(&raw);
                if cleaned.trim().is_empty() {
                    log::warn!("Generation returned only whitespace; skipping");
                    return None;
                }
                log::info!("Generated post text ({} chars)", cleaned.chars().count());
                Some(cleaned)
            }
            Ok(None) => {
                log::warn!("Generation response contained no candidate text");
                None
            }
            Err(e) => {
                log::warn!("Content generation failed: {:#}", e);
                None
            }
        }
    }

    async fn request_text(&self) -> Result<Option<String>> {
        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: self.prompt.clone(),
                }],
            }],
        };

        log::debug!("Requesting generation from {}", self.endpoint);

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&request)
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("Failed to send generation request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            anyhow::bail!("Gemini API error (status {}): {}", status, error_text);
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| e.without_url())
            .context("Failed to read generation response body")?;

        let parsed: GenerateContentResponse = serde_json::from_str(&response_text)
            .with_context(|| {
                format!(
                    "Failed to parse generation response. Response was: {}",
                    response_text
                )
            })?;

        Ok(parsed.first_text())
    }
}

#[async_trait]
impl ContentSource for ContentGenerator {
    async fn generate(&self) -> Option<String> {
        ContentGenerator::generate(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator(server: &MockServer) -> ContentGenerator {
        ContentGenerator::new(
            &server.uri(),
            "gemini-test",
            "gm-key",
            "write a post",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn candidate_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [
                { "content": { "parts": [ { "text": text } ], "role": "model" } }
            ]
        })
    }

    #[test]
    fn clean_markdown_strips_only_double_asterisks() {
        assert_eq!(
            clean_markdown("**Bold** take: *single* stays, a**b**c"),
            "Bold take: *single* stays, abc"
        );
        assert_eq!(clean_markdown("no markers here"), "no markers here");
        assert_eq!(clean_markdown("****"), "");
    }

    #[test]
    fn clean_markdown_leaves_no_double_asterisks() {
        for input in ["***x***", "a ** b", "**", "*****"] {
            assert!(!clean_markdown(input).contains("**"), "input {input:?}");
        }
    }

    #[test]
    fn response_without_candidates_has_no_text() {
        let parsed: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.first_text().is_none());

        let parsed: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(parsed.first_text().is_none());

        let parsed: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert!(parsed.first_text().is_none());
    }

    #[tokio::test]
    async fn generate_returns_cleaned_first_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "gm-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [ { "parts": [ { "text": "write a post" } ] } ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body(
                "**Ship small.** Review often.",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let text = generator(&server).generate().await;
        assert_eq!(text.as_deref(), Some("Ship small. Review often."));
    }

    #[tokio::test]
    async fn generate_returns_none_without_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "promptFeedback": { "blockReason": "OTHER" }
            })))
            .mount(&server)
            .await;

        assert!(generator(&server).generate().await.is_none());
    }

    #[tokio::test]
    async fn generate_returns_none_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
            .expect(1)
            .mount(&server)
            .await;

        assert!(generator(&server).generate().await.is_none());
    }

    #[tokio::test]
    async fn api_key_stays_out_of_urls_and_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("ok")))
            .mount(&server)
            .await;
        generator(&server).generate().await;
        let requests = server.received_requests().await.unwrap();
        assert!(requests.iter().all(|r| !r.url.as_str().contains("gm-key")));

        let unreachable = ContentGenerator::new(
            "http://127.0.0.1:9",
            "m",
            "SECRET-KEY-123",
            "prompt",
            Duration::from_secs(2),
        )
        .unwrap();
        let err = unreachable.request_text().await.unwrap_err();
        assert!(!format!("{:#}", err).contains("SECRET-KEY-123"), "error: {err:#}");
    }

    #[tokio::test]
    async fn generate_returns_none_on_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(candidate_body("too late"))
                    .set_delay(Duration::from_millis(1500)),
            )
            .expect(1)
            .mount(&server)
            .await;
        let slow = ContentGenerator::new(
            &server.uri(),
            "gemini-test",
            "gm-key",
            "write a post",
            Duration::from_millis(200),
        )
        .unwrap();

        assert!(slow.generate().await.is_none());
    }

    #[tokio::test]
    async fn generate_returns_none_on_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        assert!(generator(&server).generate().await.is_none());
    }

    #[tokio::test]
    async fn generate_treats_marker_only_text_as_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("** **")))
            .mount(&server)
            .await;

        assert!(generator(&server).generate().await.is_none());
    }
}
