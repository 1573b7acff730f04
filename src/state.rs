/// Service State Module
///
/// Process-wide context read by the HTTP endpoints. Built once at startup
/// and shared behind an `Arc`; nothing in it changes afterwards.

use chrono::{DateTime, Utc};
use std::time::Instant;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct ServiceState {
    pub service_name: String,
    pub started_at: DateTime<Utc>,
    started: Instant,
    pub keep_alive_enabled: bool,
    pub keep_alive_interval_minutes: u64,
    pub keep_alive_retries: u32,
    pub keep_alive_backoff_secs: u64,
    /// Human readable posting schedule, e.g. "every 5 hours"
    pub schedule: String,
}

impl ServiceState {
    pub fn new(config: &Config) -> Self {
        Self {
            service_name: env!("CARGO_PKG_NAME").to_string(),
            started_at: Utc::now(),
            started: Instant::now(),
            keep_alive_enabled: config.keep_alive_enabled,
            keep_alive_interval_minutes: config.keep_alive_interval_minutes,
            keep_alive_retries: config.keep_alive_retries,
            keep_alive_backoff_secs: config.keep_alive_backoff_secs,
            schedule: config.schedule_description(),
        }
    }

    /// Seconds since the service started
    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}
