//! `logctx` demo server binary.

use std::net::SocketAddr;

use clap::Parser;
use tracing::info;

use logctx_server::logging;
use logctx_server::network::{NetworkConfig, NetworkModule};
use logctx_server::service::PoolConfig;

/// Request-scoped diagnostic context demo server.
#[derive(Debug, Parser)]
#[command(name = "logctx-server")]
struct Args {
    /// Bind address.
    #[arg(long, default_value = "0.0.0.0", env = "LOGCTX_HOST")]
    host: String,

    /// Port to listen on (0 = OS-assigned).
    #[arg(long, default_value_t = 8080, env = "LOGCTX_PORT")]
    port: u16,

    /// Worker pool size.
    #[arg(long, default_value_t = 5)]
    workers: usize,

    /// Worker pool queue capacity; submissions beyond it are rejected.
    #[arg(long, default_value_t = 100)]
    queue_capacity: usize,

    /// Log filter directives (falls back to RUST_LOG, then "info").
    #[arg(long)]
    log_filter: Option<String>,

    /// Expose Prometheus metrics on this address (e.g. 0.0.0.0:9090).
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_logging(args.log_filter.as_deref())?;

    if let Some(addr) = args.metrics_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!("Prometheus exporter listening on {}", addr);
    }

    let config = NetworkConfig {
        host: args.host,
        port: args.port,
        ..NetworkConfig::default()
    };
    let pool_config = PoolConfig {
        workers: args.workers,
        queue_capacity: args.queue_capacity,
    };

    let mut module = NetworkModule::new(config, pool_config);
    let port = module.start().await?;
    info!("logctx server listening on port {}", port);

    module
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
}
