use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use crate::application::LedgerService;
use crate::http::{AppState, create_router};
use crate::logging::{self, LogFormat};

/// Vestup - HTTP Ledger Service
#[derive(Parser)]
#[command(name = "vestup")]
#[command(about = "A minimal HTTP ledger: per-user balances with an append-only history")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "vestup.db")]
    pub database: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Run the HTTP API server
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        listen: String,

        /// Default log filter when RUST_LOG is unset
        #[arg(long, default_value = "vestup=info,tower_http=info")]
        log_level: String,

        /// Log output format: pretty or json
        #[arg(long, default_value = "pretty")]
        log_format: String,
    },

    /// Verify ledger integrity
    Check,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Serve {
                listen,
                log_level,
                log_format,
            } => {
                logging::init(&log_level, LogFormat::from_str_lossy(&log_format));

                let service = LedgerService::init(&self.database).await?;
                let state = AppState::new(service);
                let router = create_router(state.clone());

                let listener = TcpListener::bind(&listen)
                    .await
                    .with_context(|| format!("Failed to bind {}", listen))?;
                tracing::info!(address = %listen, database = %self.database, "ledger API listening");

                axum::serve(listener, router)
                    .with_graceful_shutdown(shutdown_signal())
                    .await
                    .context("Server error")?;

                state.ledger.close().await;
            }

            Commands::Check => {
                let service = LedgerService::connect(&self.database).await?;
                run_check_command(&service).await?;
            }
        }

        Ok(())
    }
}

async fn run_check_command(service: &LedgerService) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = service.check_integrity().await?;

    println!("Users:        {}", report.user_count);
    println!("Transactions: {}", report.transaction_count);
    println!();

    if report.is_clean() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for issue in report.issues() {
            println!("  - {}", issue);
        }
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
}

/// Resolves when the process receives Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
