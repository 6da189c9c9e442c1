//! slotd: serves the built-in RPC modules over TCP.

mod modules;

use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use slotrun::config::DEFAULT_MAX_FRAME_LEN;
use slotrun::config::DEFAULT_PORT;
use slotrun::config::ServerConfig;
use slotrun::registry::DEFAULT_MODULE_DIR;
use slotrun::server::Server;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "slotd")]
#[command(about = "Key-indexed RPC server for embedded co-processors")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "SLOTD_BIND", default_value_t = format!("0.0.0.0:{}", DEFAULT_PORT))]
    bind: String,

    /// Catalog directory `module.load` requests resolve against
    #[arg(long, env = "SLOTD_MODULE_DIR", default_value = DEFAULT_MODULE_DIR)]
    module_dir: String,

    /// Largest accepted frame, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_LEN)]
    max_frame_len: usize,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();

    let catalog = Arc::new(modules::catalog(&args.module_dir));
    tracing::info!(?catalog, "modules available");

    let config = ServerConfig { bind: args.bind, module_dir: args.module_dir, max_frame_len: args.max_frame_len };
    let server = Server::bind(config.clone(), catalog)
        .await
        .with_context(|| format!("could not listen on {}", config.bind))?;
    server.run().await.context("server stopped")?;
    Ok(())
}
