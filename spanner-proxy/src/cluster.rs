//! The outbound front-end for embedding the proxy in a host application:
//! a driver-facing cluster configuration pointing at the local listener.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use crate::errors::ProxyError;
use crate::options::Options;
use crate::proxy::TcpProxy;
use crate::rpc::AdapterRpc;

/// How the driver should pick a host for each request. There is a single
/// logical backend behind the proxy, so token-aware routing is pointless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSelectionPolicy {
    RoundRobin,
    TokenAware,
}

/// A cluster configuration for the CQL driver, pre-populated to point at
/// the proxy. Every field may be overridden before handing it to a driver.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    id: u64,
    /// Address of the proxy's local listener.
    pub contact_point: SocketAddr,
    /// Native protocol version to negotiate.
    pub protocol_version: u8,
    pub host_selection: HostSelectionPolicy,
    /// How long writes may be coalesced before hitting the socket.
    pub write_coalesce_wait: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

/// Proxies created by [`new_cluster`], keyed by config id so that a later
/// [`close_cluster`] call can find the right one.
fn proxies() -> &'static Mutex<HashMap<u64, TcpProxy>> {
    static PROXIES: OnceLock<Mutex<HashMap<u64, TcpProxy>>> = OnceLock::new();
    PROXIES.get_or_init(Default::default)
}

static NEXT_CONFIG_ID: AtomicU64 = AtomicU64::new(0);

/// Starts a proxy for the given options and returns a cluster configuration
/// for the CQL driver pointing at it.
pub async fn new_cluster(opts: Options) -> Result<ClusterConfig, ProxyError> {
    let proxy = TcpProxy::new(opts).await?;
    Ok(register(proxy))
}

/// Like [`new_cluster`], on a caller-provided RPC binding.
pub async fn new_cluster_with_rpc(
    opts: Options,
    rpc: Arc<dyn AdapterRpc>,
) -> Result<ClusterConfig, ProxyError> {
    let proxy = TcpProxy::with_rpc(opts, rpc).await?;
    Ok(register(proxy))
}

fn register(proxy: TcpProxy) -> ClusterConfig {
    let config = ClusterConfig {
        id: NEXT_CONFIG_ID.fetch_add(1, Ordering::Relaxed),
        contact_point: proxy.local_addr(),
        protocol_version: 4,
        host_selection: HostSelectionPolicy::RoundRobin,
        write_coalesce_wait: Duration::ZERO,
        connect_timeout: Duration::from_secs(60),
        request_timeout: Duration::from_secs(60),
    };
    proxies().lock().unwrap().insert(config.id, proxy);
    config
}

/// Tears down the proxy behind the given cluster configuration. Closing a
/// configuration twice is a no-op.
pub fn close_cluster(config: &ClusterConfig) {
    if let Some(proxy) = proxies().lock().unwrap().remove(&config.id) {
        proxy.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{pb, AdaptMessageStream};
    use async_trait::async_trait;
    use tonic::metadata::MetadataMap;
    use tonic::Status;

    struct IdleRpc;

    #[async_trait]
    impl AdapterRpc for IdleRpc {
        async fn create_session(
            &self,
            _request: pb::CreateSessionRequest,
            _metadata: MetadataMap,
        ) -> Result<pb::Session, Status> {
            Ok(pb::Session {
                name: "sessions/test".to_owned(),
            })
        }

        async fn adapt_message(
            &self,
            _request: pb::AdaptMessageRequest,
            _metadata: MetadataMap,
        ) -> Result<AdaptMessageStream, Status> {
            Err(Status::unimplemented("idle"))
        }
    }

    fn options() -> Options {
        let mut opts = Options::new("projects/p/instances/i/databases/d");
        // Port 0 so that concurrently running tests never collide.
        opts.tcp_endpoint = "127.0.0.1:0".to_owned();
        opts
    }

    #[tokio::test]
    async fn config_points_at_proxy_with_driver_defaults() {
        let config = new_cluster_with_rpc(options(), Arc::new(IdleRpc)).await.unwrap();

        assert_eq!(config.contact_point.ip().to_string(), "127.0.0.1");
        assert_ne!(config.contact_point.port(), 0);
        assert_eq!(config.protocol_version, 4);
        assert_eq!(config.host_selection, HostSelectionPolicy::RoundRobin);
        assert_eq!(config.write_coalesce_wait, Duration::ZERO);
        assert_eq!(config.connect_timeout, Duration::from_secs(60));
        assert_eq!(config.request_timeout, Duration::from_secs(60));

        close_cluster(&config);
    }

    #[tokio::test]
    async fn double_close_is_noop() {
        let config = new_cluster_with_rpc(options(), Arc::new(IdleRpc)).await.unwrap();
        close_cluster(&config);
        close_cluster(&config);
    }
}
