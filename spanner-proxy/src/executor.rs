//! Request classification, attachment preparation and RPC submission.

use std::sync::Arc;

use bytes::Bytes;
use spanner_cql::frame::request::{BatchStatement, Request};
use spanner_cql::frame::response::error::{DbError, Error};
use tonic::Status;

use crate::retry::run_with_retry;
use crate::rpc::{pb, AdaptMessageStream};
use crate::session::AdapterClient;
use crate::state::{GlobalState, PREPARED_QUERY_ID_ATTACHMENT_PREFIX};

/// Attachment key carrying the commit-delay hint on DML requests.
const MAX_COMMIT_DELAY_ATTACHMENT: &str = "max_commit_delay";

/// Server-assigned prepared ids of write statements start with this byte.
const WRITE_ACTION_QUERY_ID_PREFIX: u8 = b'W';

/// Whether the request modifies data, which routes it to the leader replica.
pub(crate) fn is_dml(request: &Request) -> bool {
    match request {
        // A query id starting with `W` indicates the id originates from a
        // prepared DML statement.
        Request::Execute(execute) => {
            execute.id.first() == Some(&WRITE_ACTION_QUERY_ID_PREFIX)
        }
        // A batch is always DML.
        Request::Batch(_) => true,
        Request::Query(query) => !query.contents.to_lowercase().starts_with("select"),
        _ => false,
    }
}

pub(crate) struct RequestExecutor {
    client: Arc<AdapterClient>,
    global_state: Arc<GlobalState>,
}

impl RequestExecutor {
    pub(crate) fn new(client: Arc<AdapterClient>, global_state: Arc<GlobalState>) -> Self {
        RequestExecutor {
            client,
            global_state,
        }
    }

    fn try_insert_attachment(
        &self,
        query_id: &[u8],
        attachments: &mut std::collections::HashMap<String, String>,
    ) -> Option<Error> {
        let key = format!(
            "{}{}",
            PREPARED_QUERY_ID_ATTACHMENT_PREFIX,
            String::from_utf8_lossy(query_id)
        );
        if let Some(val) = self.global_state.load(&key) {
            attachments.insert(key, val);
            return None;
        }
        Some(Error {
            error: DbError::Unprepared {
                statement_id: Bytes::copy_from_slice(query_id),
            },
            reason: "Unknown prepared query in client side cache".to_owned(),
        })
    }

    /// Prepares the attachments for an EXECUTE or BATCH request. Returns a
    /// driver-visible error message on a prepared-query cache miss, in which
    /// case no RPC must be issued.
    pub(crate) fn prepare_attachments(
        &self,
        request: &Request,
        outbound: &mut pb::AdaptMessageRequest,
    ) -> Option<Error> {
        let max_commit_delay = self.client.opts().max_commit_delay;
        match request {
            Request::Execute(execute) => {
                if max_commit_delay > 0 && is_dml(request) {
                    outbound.attachments.insert(
                        MAX_COMMIT_DELAY_ATTACHMENT.to_owned(),
                        max_commit_delay.to_string(),
                    );
                }
                self.try_insert_attachment(&execute.id, &mut outbound.attachments)
            }
            Request::Batch(batch) => {
                // A batch is always DML.
                if max_commit_delay > 0 {
                    outbound.attachments.insert(
                        MAX_COMMIT_DELAY_ATTACHMENT.to_owned(),
                        max_commit_delay.to_string(),
                    );
                }
                for statement in batch.statements.iter() {
                    // Only by-id children need a <pqid, hash> attachment pair.
                    // The whole batch is rejected on the first cache miss.
                    if let BatchStatement::Prepared { id } = statement {
                        if let Some(error) =
                            self.try_insert_attachment(id, &mut outbound.attachments)
                        {
                            return Some(error);
                        }
                    }
                }
                None
            }
            _ => None,
        }
    }

    /// Submits the request over the RPC binding through the retry wrapper.
    /// The send half closes once the request is on the wire; the returned
    /// stream is the receive half to drain.
    pub(crate) async fn submit(
        &self,
        request: pb::AdaptMessageRequest,
        route_to_leader: bool,
    ) -> Result<AdaptMessageStream, Status> {
        let metadata = self.client.call_metadata(route_to_leader);
        run_with_retry(self.client.opts().disable_adapt_message_retry, || {
            let request = request.clone();
            let metadata = metadata.clone();
            async move { self.client.rpc().adapt_message(request, metadata).await }
        })
        .await
    }
}
