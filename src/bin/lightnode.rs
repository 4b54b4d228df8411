use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lightnode::args::NodeArgs;
use lightnode::{FrameLog, NodeConfig};

fn main() -> anyhow::Result<()> {
    let args = NodeArgs::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = NodeConfig::load(&args.config)?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(port) = args.session_port {
        config.session_port = port;
    }
    if let Some(port) = args.command_port {
        config.command_port = port;
    }

    // Without a hardware driver attached, frames only go to the trace log.
    let handle = lightnode::Handle::spawn(&config, FrameLog)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime
        .block_on(tokio::signal::ctrl_c())
        .context("failed to wait for ctrl-c")?;

    info!(connected = handle.is_connected(), "shutting down");
    drop(handle);
    return Ok(());
}
