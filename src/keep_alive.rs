/// Keep-Alive module
///
/// Pings the service's own `/health` endpoint so free-tier hosts do not idle
/// the process. Each cycle makes up to `max_attempts` requests with a constant
/// backoff between failures. An exhausted cycle is logged and forgotten; the
/// next timer firing starts over at attempt 1.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;

/// Suspends between failed attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingState {
    Attempting(u32),
    Succeeded,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure(String),
}

#[derive(Debug, Clone)]
pub struct PingAttempt {
    pub attempt: u32,
    pub outcome: AttemptOutcome,
    pub at: DateTime<Utc>,
}

/// Trace of one keep-alive cycle
#[derive(Debug, Clone)]
pub struct PingReport {
    pub attempts: Vec<PingAttempt>,
    pub state: PingState,
}

impl PingReport {
    pub fn succeeded(&self) -> bool {
        self.state == PingState::Succeeded
    }
}

pub struct KeepAlivePinger {
    http_client: reqwest::Client,
    health_url: String,
    enabled: bool,
    max_attempts: u32,
    backoff: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl KeepAlivePinger {
    pub fn new(
        health_url: impl Into<String>,
        enabled: bool,
        max_attempts: u32,
        backoff: Duration,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for keep-alive")?;

        Ok(Self {
            http_client,
            health_url: health_url.into(),
            enabled,
            max_attempts: max_attempts.max(1),
            backoff,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.health_url(),
            config.keep_alive_enabled,
            config.keep_alive_retries,
            Duration::from_secs(config.keep_alive_backoff_secs),
            Duration::from_secs(config.keep_alive_timeout_secs),
        )
    }

    /// Replace the backoff sleeper
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn health_url(&self) -> &str {
        &self.health_url
    }

    /// One timer firing: a no-op when disabled, otherwise a full retry cycle
    pub async fn tick(&self) -> Option<PingReport> {
        if !self.enabled {
            log::debug!("Keep-alive disabled; skipping ping");
            return None;
        }
        Some(self.run_cycle().await)
    }

    /// Whether one retry cycle reached the health endpoint
    pub async fn ping_with_retry(&self) -> bool {
        self.run_cycle().await.succeeded()
    }

    /// Run one retry cycle and return its trace
    pub async fn run_cycle(&self) -> PingReport {
        let mut attempts = Vec::new();
        let mut state = PingState::Attempting(1);

        while let PingState::Attempting(n) = state {
            log::debug!(
                "Keep-alive ping {}/{} -> {}",
                n,
                self.max_attempts,
                self.health_url
            );

            let outcome = match self.ping_once().await {
                Ok(()) => AttemptOutcome::Success,
                Err(e) => AttemptOutcome::Failure(format!("{:#}", e)),
            };

            state = match &outcome {
                AttemptOutcome::Success => {
                    log::info!("Keep-alive ping succeeded on attempt {}", n);
                    PingState::Succeeded
                }
                AttemptOutcome::Failure(reason) if n < self.max_attempts => {
                    log::warn!(
                        "Keep-alive ping failed (attempt {}/{}): {}. Retrying in {:?}...",
                        n,
                        self.max_attempts,
                        reason,
                        self.backoff
                    );
                    PingState::Attempting(n + 1)
                }
                AttemptOutcome::Failure(reason) => {
                    log::error!(
                        "Keep-alive ping failed after {} attempts: {}. Will try again next cycle.",
                        self.max_attempts,
                        reason
                    );
                    PingState::Exhausted
                }
            };

            attempts.push(PingAttempt {
                attempt: n,
                outcome,
                at: Utc::now(),
            });

            if matches!(state, PingState::Attempting(_)) {
                self.sleeper.sleep(self.backoff).await;
            }
        }

        PingReport { attempts, state }
    }

    async fn ping_once(&self) -> Result<()> {
        let response = self
            .http_client
            .get(&self.health_url)
            .send()
            .await
            .context("Health request failed")?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            anyhow::bail!("Health endpoint returned status {}", status);
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Records requested sleeps without waiting
    #[derive(Default)]
    pub(crate) struct RecordingSleeper(pub Mutex<Vec<Duration>>);

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.0.lock().unwrap().push(duration);
        }
    }

    pub(crate) fn pinger(
        url: &str,
        attempts: u32,
        sleeper: Arc<RecordingSleeper>,
    ) -> KeepAlivePinger {
        pinger_with_timeout(url, attempts, sleeper, Duration::from_secs(2))
    }

    fn pinger_with_timeout(
        url: &str,
        attempts: u32,
        sleeper: Arc<RecordingSleeper>,
        timeout: Duration,
    ) -> KeepAlivePinger {
        KeepAlivePinger::new(url, true, attempts, Duration::from_secs(30), timeout)
            .unwrap()
            .with_sleeper(sleeper)
    }

    async fn flaky_server(failures: u64) -> MockServer {
        let server = MockServer::start().await;
        if failures > 0 {
            Mock::given(method("GET"))
                .and(path("/health"))
                .respond_with(ResponseTemplate::new(503))
                .up_to_n_times(failures)
                .expect(failures)
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn succeeds_first_try_without_sleeping() {
        let server = flaky_server(0).await;
        let sleeper = Arc::new(RecordingSleeper::default());
        let p = pinger(&format!("{}/health", server.uri()), 3, sleeper.clone());

        let report = p.run_cycle().await;

        assert!(report.succeeded());
        assert_eq!(report.attempts.len(), 1);
        assert!(sleeper.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn recovers_after_k_failures() {
        for k in 1..3u64 {
            let server = flaky_server(k).await;
            let sleeper = Arc::new(RecordingSleeper::default());
            let p = pinger(&format!("{}/health", server.uri()), 3, sleeper.clone());

            let report = p.run_cycle().await;

            assert_eq!(report.state, PingState::Succeeded);
            assert_eq!(report.attempts.len() as u64, k + 1);
            assert_eq!(
                report.attempts.last().map(|a| &a.outcome),
                Some(&AttemptOutcome::Success)
            );
            let sleeps = sleeper.0.lock().unwrap().clone();
            assert_eq!(sleeps.len() as u64, k);
            assert!(sleeps.iter().all(|d| *d == Duration::from_secs(30)));
        }
    }

    #[tokio::test]
    async fn always_failing_endpoint_exhausts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(4)
            .mount(&server)
            .await;
        let sleeper = Arc::new(RecordingSleeper::default());
        let p = pinger(&format!("{}/health", server.uri()), 4, sleeper.clone());

        let report = p.run_cycle().await;

        assert_eq!(report.state, PingState::Exhausted);
        assert_eq!(
            report.attempts.iter().map(|a| a.attempt).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        assert_eq!(sleeper.0.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn non_200_success_codes_count_as_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;
        let sleeper = Arc::new(RecordingSleeper::default());
        let p = pinger(&format!("{}/health", server.uri()), 2, sleeper);

        assert!(!p.ping_with_retry().await);
    }

    #[tokio::test]
    async fn unreachable_endpoint_exhausts() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let p = pinger("http://127.0.0.1:9/health", 3, sleeper.clone());

        let report = p.run_cycle().await;

        assert_eq!(report.state, PingState::Exhausted);
        assert_eq!(report.attempts.len(), 3);
        assert_eq!(sleeper.0.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn slow_health_endpoint_times_out_and_exhausts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(1500)))
            .expect(3)
            .mount(&server)
            .await;
        let sleeper = Arc::new(RecordingSleeper::default());
        let p = pinger_with_timeout(
            &format!("{}/health", server.uri()),
            3,
            sleeper.clone(),
            Duration::from_millis(200),
        );

        let report = p.run_cycle().await;

        assert_eq!(report.state, PingState::Exhausted);
        assert_eq!(report.attempts.len(), 3);
        assert!(report
            .attempts
            .iter()
            .all(|a| matches!(a.outcome, AttemptOutcome::Failure(_))));
        assert_eq!(sleeper.0.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn disabled_pinger_makes_no_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let p = KeepAlivePinger::new(
            format!("{}/health", server.uri()),
            false,
            3,
            Duration::from_secs(30),
            Duration::from_secs(2),
        )
        .unwrap();

        assert!(p.tick().await.is_none());
    }
}
