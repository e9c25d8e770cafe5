use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use warden::{bootstrap, config::AppConfig, watchdog::WatchdogError};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "warden.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the watchdog until interrupted.
    Run,
    /// Loads and validates the configuration, then exits.
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => run(&cli.config).await?,
        Commands::CheckConfig => {
            AppConfig::from_file(&cli.config)?;
            println!("configuration OK");
        }
    }

    Ok(())
}

async fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!(path = %config_path.display(), "loading configuration");
    let config = AppConfig::from_file(config_path)?;
    let shutdown_timeout = config.watchdog.shutdown_timeout;

    let mut watchdog = bootstrap::build_watchdog(&config)?;
    watchdog.start()?;

    wait_for_shutdown_signal().await;

    match watchdog.stop(shutdown_timeout).await {
        Ok(()) => {}
        Err(WatchdogError::ShutdownTimeout(deadline)) => {
            tracing::warn!(
                ?deadline,
                "shutdown deadline elapsed; exiting with tasks still draining"
            );
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to register SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT (Ctrl+C) received, initiating graceful shutdown."),
        _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
    }
}
