use modeploy_deployer::build_controller;
use modeploy_deployer::server;
use modeploy_deployer::shared::config::DeployerConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("modeploy_deployer=info,info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = DeployerConfig::from_env();
    info!(
        listen_addr = %config.listen_addr,
        app_name = %config.app_name,
        call_timeout_secs = config.call_timeout.as_secs(),
        push_max_attempts = config.push_retry.max_attempts,
        forwarding = ?config.property_forwarding,
        "Starting module deployer"
    );

    let shutdown = CancellationToken::new();
    let controller = build_controller(&config, shutdown.clone())?;

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                signal_token.cancel();
            }
            Err(error) => warn!(error = %error, "Failed to listen for shutdown signal"),
        }
    });

    server::serve(config.listen_addr, controller, shutdown).await?;

    info!("Module deployer stopped");
    Ok(())
}
