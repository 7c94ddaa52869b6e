//! Embedded-mode quick start.
//!
//! Starts a proxy for the given database and prints the contact point a CQL
//! driver should be configured with.
//!
//! How to use:
//! cargo run --example quickstart -- projects/<p>/instances/<i>/databases/<d>

use spanner_proxy::{close_cluster, new_cluster, Options};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let database_uri = std::env::args()
        .nth(1)
        .expect("usage: quickstart <database-uri>");

    let config = new_cluster(Options::new(database_uri))
        .await
        .expect("failed to start the proxy");

    println!(
        "Proxy running; point your CQL driver at {} (protocol v4).",
        config.contact_point
    );
    println!("Press Ctrl-C to stop the proxy...");
    tokio::signal::ctrl_c().await.unwrap();

    close_cluster(&config);
}
