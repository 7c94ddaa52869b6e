//! The gRPC binding to the Spanner adapter service.
//!
//! [`AdapterRpc`] is the seam the rest of the proxy talks through: a
//! streaming RPC client with `CreateSession` and `AdaptMessage` operations.
//! [`GrpcAdapterRpc`] is the production implementation, a round-robin pool
//! of HTTP/2 channels. Tests substitute their own implementation.

pub mod pb;

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tonic::metadata::MetadataMap;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tonic::{Request, Status};

use crate::errors::ProxyError;
use crate::options::Options;
use pb::adapter_client::AdapterClient;

/// The ordered chunks of a single AdaptMessage reply.
pub type AdaptMessageStream = BoxStream<'static, Result<pb::AdaptMessageResponse, Status>>;

/// The streaming RPC surface of the adapter backend.
#[async_trait]
pub trait AdapterRpc: Send + Sync + 'static {
    async fn create_session(
        &self,
        request: pb::CreateSessionRequest,
        metadata: MetadataMap,
    ) -> Result<pb::Session, Status>;

    /// Issues an AdaptMessage call. The send half is closed once the request
    /// is on the wire; the returned stream is the receive half.
    async fn adapt_message(
        &self,
        request: pb::AdaptMessageRequest,
        metadata: MetadataMap,
    ) -> Result<AdaptMessageStream, Status>;
}

const USER_AGENT: &str = concat!("spanner-cassandra-proxy-rs/v", env!("CARGO_PKG_VERSION"));

/// Environment variable enabling direct-connectivity channel options.
const ENABLE_DIRECT_ACCESS_ENV: &str = "GOOGLE_SPANNER_ENABLE_DIRECT_ACCESS";

/// A pool of gRPC channels to the adapter endpoint, picked round-robin per
/// call.
pub struct GrpcAdapterRpc {
    channels: Vec<Channel>,
    next: AtomicUsize,
}

impl GrpcAdapterRpc {
    /// Builds the channel pool. Channels connect lazily, so this does not
    /// wait for the endpoint to be reachable.
    pub fn connect(opts: &Options) -> Result<Self, ProxyError> {
        let uri = if opts.spanner_endpoint.contains("://") {
            opts.spanner_endpoint.clone()
        } else {
            format!("https://{}", opts.spanner_endpoint)
        };
        let use_tls = uri.starts_with("https://");
        let direct_access = std::env::var(ENABLE_DIRECT_ACCESS_ENV)
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        let mut channels = Vec::with_capacity(opts.effective_num_grpc_channels());
        for _ in 0..opts.effective_num_grpc_channels() {
            let mut endpoint = Endpoint::from_shared(uri.clone())
                .and_then(|e| e.user_agent(USER_AGENT))
                .map_err(|err| ProxyError::InvalidSpannerEndpoint(uri.clone(), err))?;
            if use_tls {
                endpoint = endpoint
                    .tls_config(ClientTlsConfig::new().with_native_roots())
                    .map_err(|err| ProxyError::InvalidSpannerEndpoint(uri.clone(), err))?;
            }
            if direct_access {
                endpoint = endpoint.tcp_nodelay(true).http2_adaptive_window(true);
            }
            channels.push(endpoint.connect_lazy());
        }

        Ok(GrpcAdapterRpc {
            channels,
            next: AtomicUsize::new(0),
        })
    }

    fn client(&self) -> AdapterClient<Channel> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.channels.len();
        AdapterClient::new(self.channels[idx].clone())
            .max_decoding_message_size(i32::MAX as usize)
    }
}

#[async_trait]
impl AdapterRpc for GrpcAdapterRpc {
    async fn create_session(
        &self,
        request: pb::CreateSessionRequest,
        metadata: MetadataMap,
    ) -> Result<pb::Session, Status> {
        let mut request = Request::new(request);
        *request.metadata_mut() = metadata;
        let response = self.client().create_session(request).await?;
        Ok(response.into_inner())
    }

    async fn adapt_message(
        &self,
        request: pb::AdaptMessageRequest,
        metadata: MetadataMap,
    ) -> Result<AdaptMessageStream, Status> {
        let mut request = Request::new(request);
        *request.metadata_mut() = metadata;
        let response = self.client().adapt_message(request).await?;
        Ok(response.into_inner().boxed())
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(v, "1" | "t" | "T" | "true" | "TRUE" | "True")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_env_values() {
        for v in ["1", "t", "T", "true", "TRUE", "True"] {
            assert!(parse_bool(v));
        }
        for v in ["0", "false", "FALSE", "", "yes"] {
            assert!(!parse_bool(v));
        }
    }

    #[tokio::test]
    async fn pool_size_respected() {
        let mut opts = Options::new("projects/p/instances/i/databases/d");
        opts.num_grpc_channels = 2;
        let rpc = GrpcAdapterRpc::connect(&opts).unwrap();
        assert_eq!(rpc.channels.len(), 2);
    }
}
