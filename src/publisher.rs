/// Post Publisher module
///
/// Submits finished text to the LinkedIn `ugcPosts` endpoint. Publishing is
/// best effort: errors are logged and returned as an outcome, never raised.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::config::Config;
use crate::workflow::PostSink;

/// Body of a ugcPosts create request
#[derive(Debug, Serialize)]
pub struct PostPayload {
    author: String,
    #[serde(rename = "lifecycleState")]
    lifecycle_state: &'static str,
    #[serde(rename = "specificContent")]
    specific_content: SpecificContent,
    visibility: Visibility,
}

#[derive(Debug, Serialize)]
struct SpecificContent {
    #[serde(rename = "com.linkedin.ugc.ShareContent")]
    share_content: ShareContent,
}

#[derive(Debug, Serialize)]
struct ShareContent {
    #[serde(rename = "shareCommentary")]
    share_commentary: ShareCommentary,
    #[serde(rename = "shareMediaCategory")]
    share_media_category: &'static str,
}

#[derive(Debug, Serialize)]
struct ShareCommentary {
    text: String,
}

#[derive(Debug, Serialize)]
struct Visibility {
    #[serde(rename = "com.linkedin.ugc.MemberNetworkVisibility")]
    member_network_visibility: &'static str,
}

impl PostPayload {
    /// A published, public, text-only post
    pub fn new(author: &str, text: &str) -> Self {
        Self {
            author: author.to_string(),
            lifecycle_state: "PUBLISHED",
            specific_content: SpecificContent {
                share_content: ShareContent {
                    share_commentary: ShareCommentary {
                        text: text.to_string(),
                    },
                    share_media_category: "NONE",
                },
            },
            visibility: Visibility {
                member_network_visibility: "PUBLIC",
            },
        }
    }
}

/// Result of one publish attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Post created; carries the post id when the API returned one
    Published { post_id: Option<String> },
    /// Nothing to publish
    Skipped,
    Failed(String),
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishOutcome::Published { .. })
    }
}

pub struct PostPublisher {
    http_client: reqwest::Client,
    endpoint: String,
    access_token: String,
    author_urn: String,
}

impl PostPublisher {
    pub fn new(
        api_base: &str,
        access_token: impl Into<String>,
        author_urn: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for publishing")?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/v2/ugcPosts", api_base.trim_end_matches('/')),
            access_token: access_token.into(),
            author_urn: author_urn.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.linkedin_api_base,
            config.linkedin_access_token.clone(),
            config.linkedin_author_urn.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Publish `text` as a new post
    ///
    /// Absent or blank text is a no-op and makes no request.
    pub async fn publish(&self, text: Option<&str>) -> PublishOutcome {
        let text = match text {
            Some(t) if !t.trim().is_empty() => t,
            _ => {
                log::info!("No content to publish; skipping");
                return PublishOutcome::Skipped;
            }
        };

        match self.send(text).await {
            Ok(post_id) => {
                log::info!(
                    "Post published successfully (id: {})",
                    post_id.as_deref().unwrap_or("unknown")
                );
                PublishOutcome::Published { post_id }
            }
            Err(e) => {
                log::error!("Failed to publish post: {:#}", e);
                PublishOutcome::Failed(format!("{:#}", e))
            }
        }
    }

    async fn send(&self, text: &str) -> Result<Option<String>> {
        let payload = PostPayload::new(&self.author_urn, text);

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&payload)
            .send()
            .await
            .context("Failed to send post request")?;

        let status = response.status();
        if !matches!(status.as_u16(), 200 | 201) {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            anyhow::bail!("LinkedIn API error (status {}): {}", status, error_text);
        }

        let header_id = response
            .headers()
            .get("x-restli-id")
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        if header_id.is_some() {
            return Ok(header_id);
        }

        // Some API versions only return the id in the body
        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                log::debug!("Post created but response body was not JSON: {}", e);
                serde_json::Value::Null
            }
        };
        Ok(body.get("id").and_then(|v| v.as_str()).map(str::to_string))
    }
}

#[async_trait]
impl PostSink for PostPublisher {
    async fn publish(&self, text: Option<&str>) -> PublishOutcome {
        PostPublisher::publish(self, text).await
    }
}
