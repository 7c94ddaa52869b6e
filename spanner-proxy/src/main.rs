//! Standalone launcher for the Cassandra-to-Spanner proxy.
//!
//! Starts the proxy so CQL clients (like cqlsh) can connect to it as if it
//! were a Cassandra node, then blocks until SIGINT or SIGTERM.

use std::process::ExitCode;

use clap::Parser;
use spanner_proxy::{close_cluster, new_cluster, Options};
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable selecting the development log formatter.
const CLI_ENV_VAR: &str = "ADAPTER_CLI_ENV";

#[derive(Parser, Debug)]
#[command(name = "spanner-cassandra-proxy")]
#[command(about = "Local Cassandra wire-protocol proxy for Spanner", long_about = None)]
struct Args {
    /// The Spanner database URI (required).
    #[arg(long = "db")]
    db: Option<String>,

    /// Proxy listener address. Defaults to :9042 to bind all network
    /// interfaces due to docker forwarding.
    #[arg(long = "tcp", default_value = ":9042")]
    tcp: String,

    /// The number of channels when dialing the grpc connection.
    #[arg(long = "grpc-channels", default_value_t = 4)]
    grpc_channels: usize,

    /// Log level (debug|info|warn|error|fatal).
    #[arg(long = "log", default_value = "info")]
    log: String,

    /// The maximum commit delay in milliseconds. 0 disables it.
    #[arg(long = "max_commit_delay", default_value_t = 0)]
    max_commit_delay: u32,
}

fn parse_log_level(level: &str) -> Option<LevelFilter> {
    match level {
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" => Some(LevelFilter::WARN),
        // `fatal` has no tracing counterpart; the nearest level applies.
        "error" | "fatal" => Some(LevelFilter::ERROR),
        _ => None,
    }
}

fn init_logging(level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var(CLI_ENV_VAR).as_deref() == Ok("dev") {
        builder.pretty().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let Some(database_uri) = args.db else {
        eprintln!("Error: --db is required");
        return ExitCode::FAILURE;
    };

    let Some(level) = parse_log_level(&args.log) else {
        eprintln!("Error: invalid log level '{}'", args.log);
        return ExitCode::FAILURE;
    };
    init_logging(level);

    let mut opts = Options::new(database_uri.clone());
    opts.tcp_endpoint = args.tcp;
    opts.num_grpc_channels = args.grpc_channels;
    opts.max_commit_delay = args.max_commit_delay;

    let config = match new_cluster(opts).await {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Failed to initialize Spanner Cassandra proxy");
            return ExitCode::FAILURE;
        }
    };

    info!(
        database = %database_uri,
        contact_point = %config.contact_point,
        "Spanner Cassandra proxy created successfully",
    );

    shutdown_signal().await;

    info!("Shutting down Spanner Cassandra proxy...");
    close_cluster(&config);
    ExitCode::SUCCESS
}
