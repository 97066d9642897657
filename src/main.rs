use bvtk_server::BvtkServer;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use config::ServerConfig;
use install::InstallClient;
use rmcp::ServiceExt;
use std::io;
use tracing_subscriber::{self, EnvFilter};
mod bvtk_server;
mod cleanup;
mod config;
mod error;
mod install;
mod locator;
mod node_tree;
mod runner;
mod script;
mod tools;
mod workspace;

/// MCP server that imports BVtkNodes JSON configurations into Blender
/// Runs the stdio server when no subcommand is given
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    config: ServerConfig,
}

#[derive(Subcommand)]
enum Command {
    /// Run the MCP server using stdio transport
    #[command(alias = "stdio")]
    Server,
    /// Register this server with MCP clients
    Install {
        /// Client to register with; prompts when omitted
        #[arg(long, value_enum)]
        client: Option<InstallClient>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();
    match args.command {
        Some(Command::Server) | None => run_server(args.config).await,
        Some(Command::Install { client }) => install::install(client),
    }
}

async fn run_server(config: ServerConfig) -> Result<()> {
    tracing::debug!("Debug MCP tracing enabled");

    let ctx = config
        .into_context()
        .wrap_err("Could not resolve the desktop directory")?;

    let service = BvtkServer::new(ctx)
        .serve(rmcp::transport::stdio())
        .await
        .inspect_err(|e| {
            tracing::error!("serving error: {:?}", e);
        })?;
    tracing::info!("BVtkNodes MCP server running on stdio");
    service.waiting().await?;

    tracing::info!("Bye!");
    Ok(())
}
