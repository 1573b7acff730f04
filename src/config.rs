/// Configuration module for managing environment variables and API keys
///
/// This module loads and validates all configuration values from environment
/// variables (typically from a .env file). Missing credentials are reported
/// here, at startup, and never deferred to the first API call.

use anyhow::{anyhow, Result};
use std::env;
use std::time::Duration;

/// Longest accepted posting interval (one year)
pub const MAX_POST_INTERVAL_HOURS: u64 = 24 * 365;

/// Longest accepted keep-alive interval (one day)
pub const MAX_KEEP_ALIVE_INTERVAL_MINUTES: u64 = 24 * 60;

/// Prompt sent to the generative API when `POST_PROMPT` is not set
pub const DEFAULT_PROMPT: &str = "Write a short, engaging LinkedIn post (under 200 words) \
sharing one practical insight about software engineering or technology careers. \
Use a friendly professional tone, end with a question to invite discussion, \
and include two or three relevant hashtags. Do not use markdown formatting.";

#[derive(Debug, Clone)]
pub struct Config {
    /// Google Gemini API key
    pub gemini_api_key: String,

    /// Gemini model used for generation (e.g., "gemini-1.5-flash")
    pub gemini_model: String,

    /// Base URL of the generative API
    pub gemini_api_base: String,

    /// LinkedIn OAuth access token used as a bearer credential
    pub linkedin_access_token: String,

    /// Author URN of the posting account (e.g., "urn:li:person:abc123")
    pub linkedin_author_urn: String,

    /// Base URL of the LinkedIn API
    pub linkedin_api_base: String,

    /// Prompt used for every generated post
    pub post_prompt: String,

    /// Port for the HTTP server
    pub port: u16,

    /// Public base URL of this service, used as the keep-alive target
    pub public_url: String,

    /// Whether the keep-alive pinger is active
    pub keep_alive_enabled: bool,

    pub keep_alive_interval_minutes: u64,

    /// Attempts per keep-alive cycle (never less than 1)
    pub keep_alive_retries: u32,

    /// Constant delay between failed keep-alive attempts
    pub keep_alive_backoff_secs: u64,

    /// Timeout of a single keep-alive request
    pub keep_alive_timeout_secs: u64,

    /// Hours between scheduled posts (never less than 1)
    pub post_interval_hours: u64,

    /// Timeout applied to generation and publish requests
    pub request_timeout_secs: u64,

    /// Run one workflow immediately after boot
    pub run_on_startup: bool,

    /// Bearer secret protecting the manual trigger endpoint (optional)
    pub trigger_secret: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if any required environment variable is missing
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// Empty values are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let gemini_api_key = get("GEMINI_API_KEY")
            .ok_or_else(|| anyhow!("GEMINI_API_KEY must be set"))?;
        let linkedin_access_token = get("LINKEDIN_ACCESS_TOKEN")
            .ok_or_else(|| anyhow!("LINKEDIN_ACCESS_TOKEN must be set"))?;
        let linkedin_person_id = get("LINKEDIN_PERSON_ID")
            .ok_or_else(|| anyhow!("LINKEDIN_PERSON_ID must be set"))?;

        let port: u16 = get("PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let public_url = Self::detect_public_url(&get)
            .unwrap_or_else(|| format!("http://127.0.0.1:{}", port));

        Ok(Config {
            gemini_api_key,

            gemini_model: get("GEMINI_MODEL")
                .unwrap_or_else(|| "gemini-1.5-flash".to_string()),

            gemini_api_base: get("GEMINI_API_BASE")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string()),

            linkedin_access_token,

            linkedin_author_urn: Self::author_urn(&linkedin_person_id),

            linkedin_api_base: get("LINKEDIN_API_BASE")
                .unwrap_or_else(|| "https://api.linkedin.com".to_string()),

            post_prompt: get("POST_PROMPT").unwrap_or_else(|| DEFAULT_PROMPT.to_string()),

            port,
            public_url,

            keep_alive_enabled: get("KEEP_ALIVE_ENABLED")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),

            keep_alive_interval_minutes: get("KEEP_ALIVE_INTERVAL_MINUTES")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(8)
                .clamp(1, MAX_KEEP_ALIVE_INTERVAL_MINUTES),

            keep_alive_retries: get("KEEP_ALIVE_RETRIES")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(3)
                .max(1),

            keep_alive_backoff_secs: get("KEEP_ALIVE_BACKOFF_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),

            keep_alive_timeout_secs: get("KEEP_ALIVE_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(10)
                .max(1),

            post_interval_hours: get("POST_INTERVAL_HOURS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                .clamp(1, MAX_POST_INTERVAL_HOURS),

            request_timeout_secs: get("REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(15)
                .max(1),

            run_on_startup: get("RUN_ON_STARTUP")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),

            trigger_secret: get("TRIGGER_SECRET"),
        })
    }

    /// Auto-detect the public URL from cloud platform environment variables
    fn detect_public_url<G>(get: &G) -> Option<String>
    where
        G: Fn(&str) -> Option<String>,
    {
        // Explicit setting wins
        if let Some(url) = get("PUBLIC_URL") {
            return Some(with_scheme(&url));
        }

        // Render
        if let Some(url) = get("RENDER_EXTERNAL_URL") {
            return Some(with_scheme(&url));
        }

        // Railway provides RAILWAY_PUBLIC_DOMAIN
        if let Some(domain) = get("RAILWAY_PUBLIC_DOMAIN") {
            return Some(with_scheme(&domain));
        }

        // Fly.io provides FLY_APP_NAME
        if let Some(app_name) = get("FLY_APP_NAME") {
            return Some(format!("https://{}.fly.dev", app_name));
        }

        None
    }

    /// Accept either a bare member id or a full URN
    fn author_urn(person_id: &str) -> String {
        let person_id = person_id.trim();
        if person_id.starts_with("urn:li:") {
            person_id.to_string()
        } else {
            format!("urn:li:person:{}", person_id)
        }
    }

    /// URL the keep-alive pinger targets
    pub fn health_url(&self) -> String {
        format!("{}/health", self.public_url.trim_end_matches('/'))
    }

    pub fn post_interval(&self) -> Duration {
        Duration::from_secs(self.post_interval_hours.saturating_mul(3600).max(1))
    }

    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.keep_alive_interval_minutes.saturating_mul(60).max(1))
    }

    /// Human readable description of the posting schedule
    pub fn schedule_description(&self) -> String {
        if self.post_interval_hours == 1 {
            "every hour".to_string()
        } else {
            format!("every {} hours", self.post_interval_hours)
        }
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no" | "off"
    )
}

fn with_scheme(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}
