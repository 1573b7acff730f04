/// Application module
///
/// Wires configuration into the generator, publisher, pinger, scheduler and
/// HTTP server, then runs until the process is asked to stop.

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::generator::ContentGenerator;
use crate::http_server::{start_server, AppState};
use crate::keep_alive::KeepAlivePinger;
use crate::publisher::PostPublisher;
use crate::scheduler::Scheduler;
use crate::state::ServiceState;
use crate::workflow::Workflow;

/// Run the bot with the given configuration
pub async fn run(config: Config) -> Result<()> {
    log::info!("Initializing services...");

    let service = Arc::new(ServiceState::new(&config));

    let generator = Arc::new(ContentGenerator::from_config(&config)?);
    let publisher = Arc::new(PostPublisher::from_config(&config)?);
    let workflow = Arc::new(Workflow::new(generator, publisher));

    let pinger = Arc::new(KeepAlivePinger::from_config(&config)?);
    if pinger.is_enabled() {
        log::info!(
            "Keep-alive enabled: pinging {} every {} minutes ({} attempts, {}s backoff)",
            pinger.health_url(),
            config.keep_alive_interval_minutes,
            config.keep_alive_retries,
            config.keep_alive_backoff_secs
        );
    } else {
        log::info!("Keep-alive disabled");
    }

    let scheduler = Scheduler::new(
        workflow.clone(),
        config.post_interval(),
        pinger,
        config.keep_alive_interval(),
    )
    .run_on_startup(config.run_on_startup);

    log::info!("Posting schedule: {}", service.schedule);
    scheduler.start();

    let state = AppState {
        service,
        workflow,
        trigger_secret: config.trigger_secret.clone(),
    };

    let result = start_server(state, config.port, shutdown_signal()).await;

    scheduler.stop();
    log::info!("Shutdown complete");

    result
}

/// Resolves on Ctrl+C or, on unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("Shutdown signal received");
}
