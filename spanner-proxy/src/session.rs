//! The adapter client: outbound metadata and the shared server session.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tonic::metadata::{AsciiMetadataValue, MetadataMap};
use tonic::Status;

use crate::errors::ProxyError;
use crate::options::Options;
use crate::retry::run_with_retry;
use crate::rpc::{pb, AdapterRpc};

/// Metadata header naming the resource being operated on.
const RESOURCE_PREFIX_HEADER: &str = "google-cloud-resource-prefix";

/// Metadata header instructing the backend to execute on the write-serving
/// replica.
const ROUTE_TO_LEADER_HEADER: &str = "x-goog-spanner-route-to-leader";

/// The server session all requests are scoped to.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub(crate) name: String,
    pub(crate) create_time: Instant,
}

/// Wraps the RPC binding with outbound metadata and the session lifecycle.
/// The session is guarded by a read/write lock: the fast path takes a shared
/// read, a refresh swaps the value atomically under the exclusive lock.
pub(crate) struct AdapterClient {
    opts: Options,
    rpc: Arc<dyn AdapterRpc>,
    resource_prefix: AsciiMetadataValue,
    session: RwLock<Option<Session>>,
}

impl AdapterClient {
    pub(crate) fn new(rpc: Arc<dyn AdapterRpc>, opts: Options) -> Result<Self, ProxyError> {
        let resource_prefix = AsciiMetadataValue::try_from(opts.database_uri.as_str())
            .map_err(|_| ProxyError::InvalidDatabaseUri(opts.database_uri.clone()))?;
        Ok(AdapterClient {
            opts,
            rpc,
            resource_prefix,
            session: RwLock::new(None),
        })
    }

    pub(crate) fn rpc(&self) -> &Arc<dyn AdapterRpc> {
        &self.rpc
    }

    pub(crate) fn opts(&self) -> &Options {
        &self.opts
    }

    /// The metadata sent with every outbound call.
    pub(crate) fn call_metadata(&self, route_to_leader: bool) -> MetadataMap {
        let mut metadata = MetadataMap::new();
        metadata.insert(RESOURCE_PREFIX_HEADER, self.resource_prefix.clone());
        if route_to_leader {
            metadata.insert(ROUTE_TO_LEADER_HEADER, AsciiMetadataValue::from_static("true"));
        }
        if let Some(hook) = &self.opts.metadata_hook {
            hook(&mut metadata);
        }
        metadata
    }

    /// Creates a fresh session with retry and swaps it in. The create time
    /// is stamped before the RPC is issued, so the refresh clock starts at
    /// attempt time.
    pub(crate) async fn create_session(&self) -> Result<(), Status> {
        let request = pb::CreateSessionRequest {
            parent: self.opts.database_uri.clone(),
            session: Some(pb::Session::default()),
        };

        run_with_retry(false, || {
            let request = request.clone();
            async move {
                let create_time = Instant::now();
                let response = self
                    .rpc
                    .create_session(request, self.call_metadata(false))
                    .await?;
                *self.session.write().await = Some(Session {
                    name: response.name,
                    create_time,
                });
                Ok(())
            }
        })
        .await
    }

    /// Returns the current session, re-creating it first when it is close to
    /// expiry. A failed refresh surfaces the error and leaves the old
    /// session in place, so a later caller can retry.
    pub(crate) async fn get_or_refresh_session(&self) -> Result<Session, Status> {
        {
            let session = self.session.read().await;
            if let Some(session) = session.as_ref() {
                if session.create_time.elapsed() <= self.opts.session_refresh_interval {
                    return Ok(session.clone());
                }
            }
        }

        self.create_session().await?;
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| Status::internal("session missing after successful create"))
    }

    #[cfg(test)]
    pub(crate) async fn session_name(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::AdaptMessageStream;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeRpc {
        create_calls: AtomicUsize,
        fail_after_first: AtomicBool,
    }

    impl FakeRpc {
        fn new() -> Arc<Self> {
            Arc::new(FakeRpc {
                create_calls: AtomicUsize::new(0),
                fail_after_first: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl AdapterRpc for FakeRpc {
        async fn create_session(
            &self,
            request: pb::CreateSessionRequest,
            metadata: MetadataMap,
        ) -> Result<pb::Session, Status> {
            assert_eq!(request.parent, "projects/p/instances/i/databases/d");
            assert_eq!(
                metadata.get(RESOURCE_PREFIX_HEADER).unwrap(),
                "projects/p/instances/i/databases/d"
            );
            let call = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call > 1 && self.fail_after_first.load(Ordering::SeqCst) {
                return Err(Status::permission_denied("database gone"));
            }
            Ok(pb::Session {
                name: format!("sessions/{call}"),
            })
        }

        async fn adapt_message(
            &self,
            _request: pb::AdaptMessageRequest,
            _metadata: MetadataMap,
        ) -> Result<AdaptMessageStream, Status> {
            unimplemented!("not used in session tests")
        }
    }

    fn options() -> Options {
        Options::new("projects/p/instances/i/databases/d")
    }

    #[tokio::test]
    async fn fresh_session_not_refreshed() {
        let rpc = FakeRpc::new();
        let client = AdapterClient::new(rpc.clone(), options()).unwrap();
        client.create_session().await.unwrap();

        let session = client.get_or_refresh_session().await.unwrap();
        assert_eq!(session.name, "sessions/1");
        assert_eq!(rpc.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_session_replaced_before_use() {
        let rpc = FakeRpc::new();
        let mut opts = options();
        opts.session_refresh_interval = Duration::ZERO;
        let client = AdapterClient::new(rpc.clone(), opts).unwrap();
        client.create_session().await.unwrap();

        let session = client.get_or_refresh_session().await.unwrap();
        assert_eq!(session.name, "sessions/2");
        assert_eq!(rpc.create_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_old_session() {
        let rpc = FakeRpc::new();
        let mut opts = options();
        opts.session_refresh_interval = Duration::ZERO;
        let client = AdapterClient::new(rpc.clone(), opts).unwrap();
        client.create_session().await.unwrap();
        rpc.fail_after_first.store(true, Ordering::SeqCst);

        let err = client.get_or_refresh_session().await.unwrap_err();
        assert_eq!(err.code(), tonic::Code::PermissionDenied);
        assert_eq!(client.session_name().await.as_deref(), Some("sessions/1"));
    }

    #[tokio::test]
    async fn route_to_leader_metadata() {
        let rpc = FakeRpc::new();
        let client = AdapterClient::new(rpc, options()).unwrap();

        let metadata = client.call_metadata(true);
        assert_eq!(metadata.get(ROUTE_TO_LEADER_HEADER).unwrap(), "true");
        let metadata = client.call_metadata(false);
        assert!(metadata.get(ROUTE_TO_LEADER_HEADER).is_none());
    }

    #[tokio::test]
    async fn metadata_hook_applied() {
        let rpc = FakeRpc::new();
        let mut opts = options();
        opts.metadata_hook = Some(Arc::new(|metadata: &mut MetadataMap| {
            metadata.insert("authorization", AsciiMetadataValue::from_static("Bearer token"));
        }));
        let client = AdapterClient::new(rpc, opts).unwrap();

        let metadata = client.call_metadata(false);
        assert_eq!(metadata.get("authorization").unwrap(), "Bearer token");
    }
}
