use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use time::{format_description::well_known, OffsetDateTime};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use net_diag_rs::config::{self, LookupConfig, ScanConfig, ServerConfig};
use net_diag_rs::types::{ScanRequest, ScanResult};
use net_diag_rs::{ports, scanner, server};

/// net-diag-rs: network diagnostics web service with a TCP port reachability scanner.
#[derive(Debug, Parser)]
#[command(
    name = "net-diag-rs",
    version,
    about = "Network diagnostics web service: IP info, ping, TCP port reachability and firewall command hints.",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service.
    Serve(ServeArgs),
    /// Probe ports on a host once and print the results.
    Scan(ScanArgs),
}

#[derive(Debug, Clone, Args)]
struct ProbeArgs {
    /// Per-port connect timeout in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = config::DEFAULT_CONNECT_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,

    /// Max concurrent connect attempts within one scan.
    #[arg(long, default_value_t = config::DEFAULT_CONCURRENCY)]
    concurrency: usize,
}

impl ProbeArgs {
    fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            connect_timeout: Duration::from_millis(self.timeout_ms),
            concurrency: self.concurrency,
        }
    }
}

#[derive(Debug, Args)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, default_value = config::DEFAULT_BIND)]
    bind: String,

    /// Directory with the static UI (index.html).
    #[arg(long = "ui-dir", default_value = "ui")]
    ui_dir: PathBuf,

    /// Timeout for external IP and geolocation lookups in milliseconds.
    #[arg(long = "lookup-timeout-ms", default_value_t = config::DEFAULT_LOOKUP_TIMEOUT.as_millis() as u64)]
    lookup_timeout_ms: u64,

    /// URL returning this server's public IP as `{"ip": ...}`.
    #[arg(long = "self-ip-url", default_value = config::DEFAULT_SELF_IP_URL)]
    self_ip_url: String,

    /// Base URL of the geolocation service (`<base>/<ip>/json/`).
    #[arg(long = "geo-url", default_value = config::DEFAULT_GEO_URL)]
    geo_url: String,

    #[command(flatten)]
    probe: ProbeArgs,
}

#[derive(Debug, Args)]
struct ScanArgs {
    /// Hostname or IP literal to probe.
    #[arg(long)]
    host: String,

    /// Comma separated ports, e.g. "22,80,443".
    #[arg(long)]
    ports: String,

    /// Write results as pretty JSON to this path (optional).
    #[arg(long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    probe: ProbeArgs,
}

#[derive(Serialize)]
struct ScanReport<'a> {
    finished_at: String,
    #[serde(flatten)]
    scan: &'a ScanResult,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Scan(args) => scan_once(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = ServerConfig {
        bind: args.bind,
        ui_dir: args.ui_dir,
        scan: args.probe.scan_config(),
        lookup: LookupConfig {
            self_ip_url: args.self_ip_url,
            geo_base_url: args.geo_url,
            timeout: Duration::from_millis(args.lookup_timeout_ms),
        },
    };
    info!(
        bind = %config.bind,
        ui_dir = %config.ui_dir.display(),
        timeout_ms = config.scan.connect_timeout.as_millis() as u64,
        concurrency = config.scan.effective_concurrency(),
        "net-diag-rs starting"
    );

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown requested");
        on_signal.cancel();
    });

    server::spawn_server(config, shutdown).await
}

async fn scan_once(args: ScanArgs) -> Result<()> {
    let req = ScanRequest::new(&args.host, ports::parse_port_list(&args.ports))?;
    let results = scanner::scan(&req, &args.probe.scan_config()).await;
    print_results_table(&results);

    if let Some(path) = args.output.as_deref() {
        match write_results_json(path, &results) {
            Ok(()) => info!("Wrote JSON results to {}", path.display()),
            Err(e) => warn!("Failed to write JSON to {}: {e:#}", path.display()),
        }
    }
    Ok(())
}

fn print_results_table(results: &ScanResult) {
    let port_w = results
        .iter()
        .map(|(p, _)| p.to_string().len())
        .max()
        .unwrap_or(0)
        .max("port".len());

    println!(
        "\n{}: {} open of {} probed",
        results.host,
        results.open_count(),
        results.len()
    );
    println!("{:>port_w$}  {}", "port", "state", port_w = port_w);
    println!("{:->port_w$}  {:-<5}", "", "", port_w = port_w);
    for (port, outcome) in results.iter() {
        println!("{:>port_w$}  {}", port, outcome, port_w = port_w);
    }
}

fn write_results_json(path: &Path, results: &ScanResult) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create output file: {}", path.display()))?;
    let finished_at = OffsetDateTime::now_utc()
        .format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"));
    serde_json::to_writer_pretty(
        file,
        &ScanReport {
            finished_at,
            scan: results,
        },
    )?;
    Ok(())
}
