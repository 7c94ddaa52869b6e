use std::sync::Arc;
use std::time::Duration;

use tonic::metadata::MetadataMap;

use crate::protocol::{CassandraProtocol, Protocol};

/// Default Spanner adapter endpoint.
pub(crate) const DEFAULT_SPANNER_ENDPOINT: &str = "https://spanner.googleapis.com";

/// Default local listener endpoint for embedded use.
pub(crate) const DEFAULT_TCP_ENDPOINT: &str = "localhost:9042";

/// Default size of the gRPC channel pool.
pub(crate) const DEFAULT_NUM_GRPC_CHANNELS: usize = 4;

/// Adapter sessions have a 7-day lifetime and are refreshed 1 day before
/// expiry to provide a buffer against potential delays.
pub const SESSION_REFRESH_INTERVAL: Duration = Duration::from_secs(6 * 24 * 60 * 60);

/// A hook invoked before every outbound RPC; used to inject credentials or
/// other custom metadata.
pub type MetadataHook = Arc<dyn Fn(&mut MetadataMap) + Send + Sync>;

/// Options for configuring the proxy.
#[derive(Clone)]
pub struct Options {
    /// Spanner database uri to connect to. Required.
    pub database_uri: String,
    /// Spanner service endpoint. Defaults to `https://spanner.googleapis.com`.
    pub spanner_endpoint: String,
    /// Endpoint to start the local TCP server on. Defaults to
    /// `localhost:9042`. A bare `:port` binds all interfaces.
    pub tcp_endpoint: String,
    /// Wire protocol spoken on the TCP side.
    pub protocol: Arc<dyn Protocol>,
    /// Number of gRPC channels in the pool. Non-positive values behave as
    /// the default of 4.
    pub num_grpc_channels: usize,
    /// Whether to disable automatic retry for the AdaptMessage API.
    pub disable_adapt_message_retry: bool,
    /// Maximum commit delay in milliseconds attached to DML requests.
    /// 0 disables the attachment.
    pub max_commit_delay: u32,
    /// How old a session may grow before it is proactively re-created.
    pub session_refresh_interval: Duration,
    /// Invoked before each outbound RPC to inject credentials or other
    /// custom metadata.
    pub metadata_hook: Option<MetadataHook>,
}

impl Options {
    pub fn new(database_uri: impl Into<String>) -> Self {
        Options {
            database_uri: database_uri.into(),
            spanner_endpoint: DEFAULT_SPANNER_ENDPOINT.to_owned(),
            tcp_endpoint: DEFAULT_TCP_ENDPOINT.to_owned(),
            protocol: Arc::new(CassandraProtocol),
            num_grpc_channels: DEFAULT_NUM_GRPC_CHANNELS,
            disable_adapt_message_retry: false,
            max_commit_delay: 0,
            session_refresh_interval: SESSION_REFRESH_INTERVAL,
            metadata_hook: None,
        }
    }

    pub(crate) fn effective_num_grpc_channels(&self) -> usize {
        if self.num_grpc_channels == 0 {
            DEFAULT_NUM_GRPC_CHANNELS
        } else {
            self.num_grpc_channels
        }
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("database_uri", &self.database_uri)
            .field("spanner_endpoint", &self.spanner_endpoint)
            .field("tcp_endpoint", &self.tcp_endpoint)
            .field("protocol", &self.protocol.name())
            .field("num_grpc_channels", &self.num_grpc_channels)
            .field("disable_adapt_message_retry", &self.disable_adapt_message_retry)
            .field("max_commit_delay", &self.max_commit_delay)
            .field("session_refresh_interval", &self.session_refresh_interval)
            .field("metadata_hook", &self.metadata_hook.as_ref().map(|_| "…"))
            .finish()
    }
}
