use clap::Parser;
use dohproxy_domain::CliOverrides;
use dohproxy_jobs::MetricsReportJob;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod bootstrap;
mod di;
mod server;

#[derive(Parser)]
#[command(name = "dohproxy")]
#[command(version)]
#[command(about = "DNS proxy forwarding plain DNS queries to a JSON DoH resolver")]
struct Cli {
    /// Configuration file path (JSON, or TOML with a .toml extension)
    #[arg(value_name = "CONFIG")]
    config: Option<String>,

    /// Listen host
    #[arg(long)]
    listen_host: Option<String>,

    /// Listen port
    #[arg(long)]
    listen_port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        listen_host: cli.listen_host,
        listen_port: cli.listen_port,
        log_level: cli.log_level,
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;

    bootstrap::init_logging(&config);

    info!("Starting dohproxy v{}", env!("CARGO_PKG_VERSION"));

    let shutdown = CancellationToken::new();
    let dns_services = di::DnsServices::new(&config, shutdown.child_token()).await?;

    let metrics_job = Arc::new(
        MetricsReportJob::from_config(dns_services.metrics.clone(), &config.metrics)
            .with_cancellation(shutdown.child_token()),
    );
    let metrics_handle = Arc::clone(&metrics_job).start();

    let listen = &config.server.listen_address;
    let listen_addr = listen
        .socket_addr()
        .ok_or_else(|| anyhow::anyhow!("Invalid listen address: {}", listen.join()))?;

    let dns_server = tokio::spawn(server::start_dns_server(
        listen_addr,
        dns_services.handler_use_case.clone(),
        Duration::from_secs(config.server.tcp_idle_timeout_seconds),
        shutdown.child_token(),
    ));

    tokio::select! {
        _ = wait_for_signal() => {
            info!("Shutdown signal received");
        }
        result = dns_server => {
            match result {
                Ok(Ok(())) => info!("DNS server stopped"),
                Ok(Err(e)) => error!(error = %e, "DNS server error"),
                Err(e) => error!(error = %e, "DNS server task failed"),
            }
        }
    }

    shutdown.cancel();
    let _ = metrics_handle.await;
    metrics_job.report();

    info!("Server shutdown complete");
    Ok(())
}

async fn wait_for_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = wait_for_sigterm() => {}
    }
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!(error = %e, "Failed to register SIGTERM handler");
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await
}
