use std::env;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use asterisk_mirror::config::{ConfigStore, DEFAULT_CONFIG_PATH};
use asterisk_mirror::{MotorControllerBuilder, Orchestrator, SimulatedGpio};

/// Environment variable naming the override file.
const CONFIG_ENV: &str = "ASTERISK_MIRROR_CONFIG";

/// Filter from `RUST_LOG`, falling back to `info` when unset or invalid.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(env::var(EnvFilter::DEFAULT_ENV).ok()))
        .init();

    let path = env::args()
        .nth(1)
        .or_else(|| env::var(CONFIG_ENV).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let settings = ConfigStore::load(&[&path])
        .and_then(|store| store.settings())
        .with_context(|| format!("loading configuration from {}", path))?;

    let motor = MotorControllerBuilder::new()
        .from_settings(&settings)
        .and_then(|builder| builder.build(SimulatedGpio::new()))
        .context("setting up the motor")?;

    let mut orchestrator = Orchestrator::new(&settings, Arc::new(motor))
        .context("building routines")?;
    orchestrator.start().context("starting routines")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building signal runtime")?;
    runtime
        .block_on(tokio::signal::ctrl_c())
        .context("waiting for Ctrl-C")?;

    info!("Ctrl-C received, shutting down");
    orchestrator.stop();
    Ok(())
}
