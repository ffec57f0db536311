mod factory;

use std::sync::Arc;

use clap::Parser;
use relay_engine::config::RelayConfig;
use relay_engine::{DataBus, Engine};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "relay-server", about = "Robot soccer telemetry relay")]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(long, default_value = "relay.toml", env = "RELAY_CONFIG")]
    config: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    tracing::info!(config = %cli.config, "loading configuration");
    let config = match RelayConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    let mut engine = Engine::new(Arc::new(DataBus::new()));
    for proc_cfg in &config.processors {
        let added = factory::build(proc_cfg).and_then(|p| engine.add(p));
        if let Err(e) = added {
            tracing::error!(processor = %proc_cfg.name, error = %e, "failed to set up processor");
            std::process::exit(1);
        }
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to register Ctrl+C handler");
            std::process::exit(1);
        }
        tracing::info!("shutting down...");
        on_signal.cancel();
    });

    tracing::info!(
        processors = config.processors.len(),
        tick_ms = config.tick_ms,
        "relay-server started, press Ctrl+C to stop"
    );
    if let Err(e) = engine
        .run(config.tick_period(), config.halt_on_error, cancel)
        .await
    {
        tracing::error!(error = %e, "engine stopped");
        std::process::exit(1);
    }
    tracing::info!(ticks = engine.ticks(), "relay-server stopped");
}
