//! fixture-responder: a UDP fixture server for resiliency testing
//!
//! Answers length-prefixed JSON requests with canned fixture data while
//! simulating an imperfect network:
//! - Random response drops (configurable delivery threshold)
//! - Random response delay (500-1500 ms by default)
//! - Per-topology fixture sets read fresh on every request
//! - Configuration via CLI arguments or TOML file

mod config;
mod dispatch;
mod faults;
mod fixtures;
mod frame;
mod lookup;
mod protocol;
mod server;
mod stats;

use config::Config;
use server::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (exits with usage on missing arguments)
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        address = %config.listen.ip(),
        port = config.listen.port(),
        topology = %config.topology,
        threshold = config.threshold,
        data_dir = %config.data_dir.display(),
        base_delay_ms = config.base_delay.as_millis() as u64,
        jitter_ms = config.jitter.as_millis() as u64,
        random_lookup = config.random_lookup,
        "Starting fixture-responder"
    );

    // One thread: delayed sends are tasks on the same event loop
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let server = Server::bind(&config)?;
        server.run().await
    })?;

    Ok(())
}
