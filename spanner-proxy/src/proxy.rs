//! The TCP front-end: listener, accept loop, per-connection task fan-out.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::connection::DriverConnection;
use crate::errors::ProxyError;
use crate::executor::RequestExecutor;
use crate::options::Options;
use crate::rpc::{AdapterRpc, GrpcAdapterRpc};
use crate::session::AdapterClient;
use crate::state::GlobalState;

/// A running Spanner adapter proxy.
///
/// Closing the proxy (explicitly or by dropping it) stops the listener;
/// connections already accepted drain to their natural end.
pub struct TcpProxy {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
}

impl TcpProxy {
    /// Starts a proxy backed by a gRPC channel pool to the configured
    /// Spanner endpoint.
    pub async fn new(opts: Options) -> Result<TcpProxy, ProxyError> {
        let rpc = Arc::new(GrpcAdapterRpc::connect(&opts)?);
        Self::with_rpc(opts, rpc).await
    }

    /// Starts a proxy on a caller-provided RPC binding. Used to substitute
    /// a custom transport; the proxy behaves identically.
    pub async fn with_rpc(opts: Options, rpc: Arc<dyn AdapterRpc>) -> Result<TcpProxy, ProxyError> {
        let client = Arc::new(AdapterClient::new(rpc, opts.clone())?);

        // The initial session must exist before the first connection is
        // accepted; failing to create one is a startup failure.
        client
            .create_session()
            .await
            .map_err(ProxyError::CreateSession)?;

        let global_state = Arc::new(GlobalState::default());

        let endpoint = normalize_endpoint(&opts.tcp_endpoint);
        let listener = TcpListener::bind(endpoint.as_str())
            .await
            .map_err(|err| ProxyError::Listen(endpoint.clone(), err))?;
        let local_addr = listener
            .local_addr()
            .map_err(|err| ProxyError::Listen(endpoint, err))?;
        info!(%local_addr, "Spanner proxy listening");

        let (shutdown, shutdown_rx) = watch::channel(false);
        tokio::spawn(accept_loop(
            listener,
            opts,
            client,
            global_state,
            shutdown_rx,
        ));

        Ok(TcpProxy {
            local_addr,
            shutdown,
        })
    }

    /// The address the proxy is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops the listener. In-flight connections drain to their next
    /// natural exit.
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }
}

async fn accept_loop(
    listener: TcpListener,
    opts: Options,
    client: Arc<AdapterClient>,
    global_state: Arc<GlobalState>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut next_connection_id: u64 = 0;
    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = shutdown.changed() => break,
        };

        let (stream, peer_addr) = match accepted {
            Ok(accepted) => accepted,
            Err(err) => {
                error!(error = %err, "Spanner proxy failed to accept connection");
                break;
            }
        };

        let connection_id = next_connection_id;
        next_connection_id += 1;
        debug!(connection_id, %peer_addr, "Spanner proxy received a connection");

        let connection = DriverConnection {
            connection_id,
            stream,
            protocol: opts.protocol.clone(),
            client: client.clone(),
            executor: RequestExecutor::new(client.clone(), global_state.clone()),
            global_state: global_state.clone(),
        };
        tokio::spawn(connection.run());
    }

    debug!("Spanner proxy accept loop exited");
}

/// Accepts `host:port` endpoints as well as the bare `:port` form, which
/// binds all interfaces.
fn normalize_endpoint(endpoint: &str) -> String {
    if let Some(port) = endpoint.strip_prefix(':') {
        format!("0.0.0.0:{port}")
    } else {
        endpoint.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_normalization() {
        assert_eq!(normalize_endpoint(":9042"), "0.0.0.0:9042");
        assert_eq!(normalize_endpoint("localhost:9042"), "localhost:9042");
        assert_eq!(normalize_endpoint("10.0.0.1:19042"), "10.0.0.1:19042");
    }
}
