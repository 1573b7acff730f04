/// LinkedIn Autopost Bot
///
/// Generates a post with Gemini on a fixed schedule and publishes it to
/// LinkedIn. A keep-alive pinger hits the bot's own `/health` endpoint so
/// free-tier hosts do not put the process to sleep.

use linkedin_autopost_bot::{app, config};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load .env before the logger so RUST_LOG can come from it
    dotenv::dotenv().ok();

    // Initialize logger
    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder.parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()));
    builder.init();

    log::info!("Starting LinkedIn Autopost Bot...");

    // Missing credentials are fatal before anything starts
    let cfg = match config::Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app::run(cfg).await {
        log::error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}
