/// Scheduler Module
///
/// Owns the two recurring timers: the content workflow and the keep-alive
/// ping. Every firing is dispatched as its own task, so a slow or failing job
/// never delays or stops either timer.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::keep_alive::KeepAlivePinger;
use crate::workflow::Workflow;

/// Work fired by a timer
#[async_trait]
pub trait ScheduledJob: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Run once; failures must be absorbed by the job itself
    async fn run_once(&self);
}

#[async_trait]
impl ScheduledJob for Workflow {
    fn name(&self) -> &'static str {
        "content workflow"
    }

    async fn run_once(&self) {
        self.run().await;
    }
}

#[async_trait]
impl ScheduledJob for KeepAlivePinger {
    fn name(&self) -> &'static str {
        "keep-alive"
    }

    async fn run_once(&self) {
        self.tick().await;
    }
}

pub struct Scheduler {
    content_job: Arc<dyn ScheduledJob>,
    content_interval: Duration,
    keep_alive_job: Arc<dyn ScheduledJob>,
    keep_alive_interval: Duration,
    run_on_startup: bool,
    running: AtomicBool,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(
        content_job: Arc<dyn ScheduledJob>,
        content_interval: Duration,
        keep_alive_job: Arc<dyn ScheduledJob>,
        keep_alive_interval: Duration,
    ) -> Self {
        Self {
            content_job,
            content_interval,
            keep_alive_job,
            keep_alive_interval,
            run_on_startup: false,
            running: AtomicBool::new(false),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Dispatch one content run as soon as the scheduler starts
    pub fn run_on_startup(mut self, enabled: bool) -> Self {
        self.run_on_startup = enabled;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Arm both timers. Returns `false` if they were already armed.
    pub fn start(&self) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            log::warn!("Scheduler already running; start ignored");
            return false;
        }

        log::info!(
            "Starting scheduler (content every {:?}, keep-alive every {:?})",
            self.content_interval,
            self.keep_alive_interval
        );

        if self.run_on_startup {
            log::info!("Dispatching startup {} run", self.content_job.name());
            dispatch(self.content_job.clone());
        }

        let timers = vec![
            spawn_recurring(self.content_job.clone(), self.content_interval),
            spawn_recurring(self.keep_alive_job.clone(), self.keep_alive_interval),
        ];

        match self.handles.lock() {
            Ok(mut handles) => handles.extend(timers),
            Err(poisoned) => poisoned.into_inner().extend(timers),
        }

        true
    }

    /// Abort both timers. In-flight runs are abandoned.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        let handles = match self.handles.lock() {
            Ok(mut handles) => std::mem::take(&mut *handles),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for handle in handles {
            handle.abort();
        }

        log::info!("Scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Fire `job` every `every`, skipping the immediate first tick
fn spawn_recurring(job: Arc<dyn ScheduledJob>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Skip the first tick (immediate execution)
        interval.tick().await;

        loop {
            interval.tick().await;
            log::info!("Scheduled {} triggered", job.name());
            dispatch(job.clone());
        }
    })
}

fn dispatch(job: Arc<dyn ScheduledJob>) {
    tokio::spawn(async move {
        job.run_once().await;
    });
}
