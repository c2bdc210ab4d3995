//! RPC endpoint pinger
//!
//! Sends low-value probe transactions through each cluster's prioritized RPC
//! endpoints, measures confirmation latency and loss, fails over between
//! endpoints and alerts on sustained loss.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────── per cluster ────────────────────────┐
//!   │                                                              │
//!   │  ProbeWorkerPool ──current()──▶ FailoverPool ◀──report_*──┐  │
//!   │        │                                                  │  │
//!   │        ├──submit / poll──▶ RpcProbeClient ──▶ RPC endpoint │  │
//!   │        │                                                  │  │
//!   │        └──PingResult──▶ ResultSink ──▶ ResultStore ───────┘  │
//!   │                              │            │                  │
//!   │                              ▼            ▼                  │
//!   │                         Prometheus   ReportEngine ──▶ Slack / Discord
//!   │                                           │                  │
//!   │                                           ▼                  │
//!   │                                      StatusBoard ──▶ /status │
//!   └──────────────────────────────────────────────────────────────┘
//!                RetentionJob ──delete_older_than──▶ ResultStore
//! ```

use clap::Parser;
use std::path::PathBuf;

use rpc_pinger::config::load_config;
use rpc_pinger::lifecycle::{AppContext, Shutdown};
use rpc_pinger::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "rpc-pinger")]
#[command(about = "Probe RPC endpoints with synthetic transactions", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Clusters to probe: "all" or a comma separated list of names
    #[arg(long, default_value = "all")]
    clusters: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    init_logging(&config.logging);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        clusters = %cli.clusters,
        "rpc-pinger starting"
    );

    let ctx = AppContext::build(config, &cli.clusters).await?;
    ctx.run(Shutdown::new()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
