/// LinkedIn Autopost Bot Library
///
/// Scheduled Gemini-to-LinkedIn posting: content generation, publishing,
/// the workflow that joins them, a self keep-alive pinger, the timers that
/// drive both, and the HTTP surface.

pub mod app;
pub mod config;
pub mod generator;
pub mod http_server;
pub mod keep_alive;
pub mod publisher;
pub mod scheduler;
pub mod state;
pub mod workflow;
