//! Binary entrypoint for the IBN API server.
use ibn_api::{run, AppState, DEFAULT_ADDR};
use ibn_core::Settings;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Default listen address can be overridden with IBN_ADDR
    let addr = std::env::var("IBN_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let state = AppState::from_settings(Settings::from_env()?)?;
    run(&addr, state).await
}
