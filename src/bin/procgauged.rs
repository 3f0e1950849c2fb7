//! procgauged - per-process resource usage exporter.
//!
//! Serves `<namespace>_process_{memory,cpu,virtualmem}` gauges labeled by process
//! name and type. Every scrape runs one collection pass over `/proc`.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::net::SocketAddr;
use std::process;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use clap::Parser;
use prometheus::core::Collector;
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(any(test, not(target_os = "linux")))]
use procgauge::collector::MockFs;
use procgauge::collector::ProcfsSource;
#[cfg(target_os = "linux")]
use procgauge::collector::RealFs;
use procgauge::exporter::ProcessMetrics;

const HEALTH_PATH: &str = "/health";

/// Per-process resource usage exporter.
#[derive(Parser, Debug)]
#[command(name = "procgauged", about = "Per-process resource usage exporter", version = procgauge::VERSION)]
struct Args {
    /// Listen address.
    #[arg(long, default_value = "0.0.0.0:9256", env = "PROCGAUGE_LISTEN")]
    listen: SocketAddr,

    /// Path under which metrics are exposed.
    #[arg(
        long,
        default_value = "/metrics",
        env = "PROCGAUGE_TELEMETRY_PATH",
        value_parser = parse_telemetry_path
    )]
    telemetry_path: String,

    /// Path to /proc filesystem.
    #[arg(long, default_value = "/proc", env = "PROCGAUGE_PROC_PATH")]
    proc_path: String,

    /// Memory page size in bytes, used to convert statm pages into bytes.
    #[arg(long, default_value = "4096", env = "PROCGAUGE_PAGE_SIZE", value_parser = parse_page_size)]
    page_size: u64,

    /// Metric namespace. Families are named <namespace>_process_<system>.
    #[arg(long, default_value = "node", env = "PROCGAUGE_NAMESPACE")]
    namespace: String,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Validates the telemetry path: a static absolute route that does not shadow
/// the health endpoint.
fn parse_telemetry_path(s: &str) -> Result<String, String> {
    let s = s.trim();
    if !s.starts_with('/') {
        return Err(format!("telemetry path must start with '/': '{}'", s));
    }
    if s.contains(['{', '}', '*']) {
        return Err(format!(
            "telemetry path must not contain '{{', '}}' or '*': '{}'",
            s
        ));
    }
    if s.len() > 1 && s[1..].split('/').any(str::is_empty) {
        return Err(format!("telemetry path has an empty segment: '{}'", s));
    }
    if s == HEALTH_PATH {
        return Err(format!("telemetry path conflicts with {}", HEALTH_PATH));
    }
    Ok(s.to_string())
}

/// Parses a page size in bytes: a power of two, at least 1024.
fn parse_page_size(s: &str) -> Result<u64, String> {
    let size: u64 = s
        .trim()
        .parse()
        .map_err(|_| format!("invalid page size: '{}'", s))?;
    if size < 1024 || !size.is_power_of_two() {
        return Err(format!(
            "page size must be a power of two and at least 1024: {}",
            size
        ));
    }
    Ok(size)
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["procgauged", "procgauge"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn create_metrics(args: &Args) -> prometheus::Result<Box<dyn Collector>> {
    #[cfg(target_os = "linux")]
    let source = ProcfsSource::new(RealFs::new(), &args.proc_path);
    #[cfg(not(target_os = "linux"))]
    let source = {
        warn!(proc = %args.proc_path, "not running on Linux, serving mock process data");
        mock_source()
    };

    let source = source.with_page_size(args.page_size);
    Ok(Box::new(ProcessMetrics::new(source, &args.namespace)?))
}

/// Mock scenario tree; its files always live under `/proc`.
#[cfg(any(test, not(target_os = "linux")))]
fn mock_source() -> ProcfsSource<MockFs> {
    ProcfsSource::new(MockFs::typical_system(), "/proc")
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    info!(
        version = procgauge::VERSION,
        listen = %args.listen,
        proc = %args.proc_path,
        page_size = args.page_size,
        namespace = %args.namespace,
        "procgauged starting"
    );

    let registry = Registry::new();
    let registered = create_metrics(&args).and_then(|metrics| registry.register(metrics));
    if let Err(e) = registered {
        error!(error = %e, "failed to set up process metrics");
        process::exit(1);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(serve(args, registry)) {
        error!(error = %e, "server error");
        process::exit(1);
    }

    info!("procgauged stopped");
}

fn router(telemetry_path: &str, registry: Registry) -> Router {
    Router::new()
        .route(telemetry_path, get(handle_metrics))
        .route(HEALTH_PATH, get(handle_health))
        .with_state(registry)
}

async fn serve(args: Args, registry: Registry) -> std::io::Result<()> {
    let app = router(&args.telemetry_path, registry);

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!(addr = %args.listen, path = %args.telemetry_path, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

async fn handle_health() -> &'static str {
    "ok"
}

/// Runs a collection pass on the blocking pool and renders the text format.
async fn handle_metrics(State(registry): State<Registry>) -> Response {
    let families = match tokio::task::spawn_blocking(move || registry.gather()).await {
        Ok(families) => families,
        Err(e) => {
            error!(error = %e, "scrape task failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "scrape failed").into_response();
        }
    };

    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&families, &mut buffer) {
        error!(error = %e, "failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, "encoding failed").into_response();
    }

    ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], buffer).into_response()
}
