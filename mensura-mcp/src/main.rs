//! Mensura MCP Server
//!
//! Line-delimited JSON-RPC over stdio. Logs go to stderr; stdout carries
//! only protocol messages.

mod config;
mod server;

use std::process::ExitCode;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::server::{Server, PROTOCOL_VERSION};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = Config::from_env();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        protocol = PROTOCOL_VERSION,
        catalog = ?config.catalog_path,
        export = %config.export_path.display(),
        "Mensura MCP server starting"
    );

    let mut server = match Server::new(config) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "failed to load catalog");
            return ExitCode::FAILURE;
        }
    };

    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();
    info!("server ready, waiting for requests");

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let Some(response) = server.process_line(line) else {
                    continue;
                };
                if let Err(e) = write_line(&mut stdout, &response).await {
                    error!(error = %e, "error writing response");
                    break;
                }
            }
            Ok(None) => {
                // EOF - client disconnected
                info!("client disconnected");
                break;
            }
            Err(e) => {
                error!(error = %e, "error reading input");
                break;
            }
        }
    }

    info!("server shutting down");
    ExitCode::SUCCESS
}

async fn write_line(stdout: &mut io::Stdout, line: &str) -> std::io::Result<()> {
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}
