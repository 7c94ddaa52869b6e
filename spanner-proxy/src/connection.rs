//! The per-connection loop: decode, dispatch, reassemble, write back.

use std::sync::Arc;

use futures::StreamExt;
use spanner_cql::frame::response::error::{DbError, Error as CqlError};
use spanner_cql::frame::FrameParams;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tonic::Status;
use tracing::{debug, error};

use crate::executor::{is_dml, RequestExecutor};
use crate::frame::{read_request_frame, RequestFrame, ResponseFrame};
use crate::protocol::Protocol;
use crate::rpc::{pb, AdaptMessageStream};
use crate::session::AdapterClient;
use crate::state::GlobalState;

/// A connection from a native database driver. One loop instance runs per
/// accepted TCP connection; each response is fully written before the next
/// inbound frame is decoded.
pub(crate) struct DriverConnection<S> {
    pub(crate) connection_id: u64,
    pub(crate) stream: S,
    pub(crate) protocol: Arc<dyn Protocol>,
    pub(crate) client: Arc<AdapterClient>,
    pub(crate) executor: RequestExecutor,
    pub(crate) global_state: Arc<GlobalState>,
}

#[derive(Debug, Error)]
enum RelayError {
    #[error("Error reading AdaptMessage response: {0}")]
    Recv(#[from] Status),
    #[error("Error writing payload to connection: {0}")]
    Write(#[from] std::io::Error),
}

impl<S: AsyncRead + AsyncWrite + Unpin> DriverConnection<S> {
    pub(crate) async fn run(mut self) {
        loop {
            let frame = match read_request_frame(&mut self.stream).await {
                Ok(frame) => frame,
                Err(err) => {
                    // Only EOF is expected when the peer closes the
                    // connection gracefully. Nothing can be written back
                    // either way, so the loop ends here.
                    if is_clean_close(&err) {
                        debug!(connection_id = self.connection_id, "Driver disconnected");
                    } else {
                        error!(
                            connection_id = self.connection_id,
                            error = %err,
                            "Error decoding frame from connection",
                        );
                    }
                    break;
                }
            };

            self.handle_frame(frame).await;
        }
        debug!(connection_id = self.connection_id, "Exiting recv loop");
    }

    async fn handle_frame(&mut self, frame: RequestFrame) {
        let params = frame.params;
        let payload = frame.payload();

        let request = match frame.deserialize() {
            Ok(request) => request,
            Err(err) => {
                error!(
                    connection_id = self.connection_id,
                    error = %err,
                    "Error decoding frame from payload",
                );
                // The payload is framed correctly but is not a valid
                // request body; tell the driver instead of dropping it.
                self.write_error(
                    params,
                    &CqlError {
                        error: DbError::SyntaxError,
                        reason: err.to_string(),
                    },
                )
                .await;
                return;
            }
        };

        let session = match self.client.get_or_refresh_session().await {
            Ok(session) => session,
            Err(err) => {
                error!(
                    connection_id = self.connection_id,
                    error = %err,
                    "Error getting or refreshing session",
                );
                self.write_error(
                    params,
                    &CqlError {
                        error: DbError::ServerError,
                        reason: err.to_string(),
                    },
                )
                .await;
                return;
            }
        };

        debug!(
            connection_id = self.connection_id,
            stream = params.stream,
            opcode = ?request.opcode(),
            payload_len = payload.len(),
            "Forwarding AdaptMessageRequest",
        );

        let mut outbound = pb::AdaptMessageRequest {
            name: session.name,
            protocol: self.protocol.name().to_owned(),
            payload,
            attachments: Default::default(),
        };

        // A cache miss produces a driver-visible error and skips the RPC.
        if let Some(error_message) = self.executor.prepare_attachments(&request, &mut outbound) {
            self.write_error(params, &error_message).await;
            return;
        }

        let response = match self.executor.submit(outbound, is_dml(&request)).await {
            Ok(response) => response,
            Err(err) => {
                error!(
                    connection_id = self.connection_id,
                    error = %err,
                    "Error sending AdaptMessageRequest to server",
                );
                self.write_error(
                    params,
                    &CqlError {
                        error: DbError::ServerError,
                        reason: err.to_string(),
                    },
                )
                .await;
                return;
            }
        };

        if let Err(err) = self.relay_response(response).await {
            error!(
                connection_id = self.connection_id,
                error = %err,
                "Error writing adapter response back to tcp",
            );
            self.write_error(
                params,
                &CqlError {
                    error: DbError::ServerError,
                    reason: err.to_string(),
                },
            )
            .await;
        }
    }

    /// Drains the response stream, merging state updates into the shared
    /// cache and reassembling chunked payloads into a single TCP write.
    async fn relay_response(&mut self, mut response: AdaptMessageStream) -> Result<(), RelayError> {
        let mut payloads: Vec<Vec<u8>> = Vec::new();

        while let Some(chunk) = response.next().await {
            let chunk = chunk?;
            for (key, val) in chunk.state_updates {
                self.global_state.store(key, val);
            }
            if !chunk.payload.is_empty() {
                payloads.push(chunk.payload);
            }
        }

        if let Some(merged) = merge_payloads(payloads) {
            debug!(
                connection_id = self.connection_id,
                response_len = merged.len(),
                "Writing adapter response",
            );
            self.stream.write_all(&merged).await?;
            self.stream.flush().await?;
        }
        Ok(())
    }

    async fn write_error(&mut self, params: FrameParams, error: &CqlError) {
        let frame = match ResponseFrame::forged_error(params, error) {
            Ok(frame) => frame,
            Err(err) => {
                error!(
                    connection_id = self.connection_id,
                    error = %err,
                    "Error serializing error response",
                );
                return;
            }
        };
        if let Err(err) = frame.write(&mut self.stream).await {
            error!(
                connection_id = self.connection_id,
                error = %err,
                "Error writing message back to tcp",
            );
        }
    }
}

fn is_clean_close(err: &spanner_cql::frame::frame_errors::FrameError) -> bool {
    matches!(
        err,
        spanner_cql::frame::frame_errors::FrameError::StdIoError(io_err)
            if io_err.kind() == std::io::ErrorKind::UnexpectedEof
    )
}

/// Merges response chunks into the byte sequence written to the driver.
/// With more than one chunk the last one carries the frame header and all
/// preceding ones carry body fragments in order.
fn merge_payloads(mut payloads: Vec<Vec<u8>>) -> Option<Vec<u8>> {
    if payloads.len() <= 1 {
        return payloads.pop();
    }

    let header = payloads.pop()?;
    let mut merged =
        Vec::with_capacity(header.len() + payloads.iter().map(Vec::len).sum::<usize>());
    merged.extend_from_slice(&header);
    for fragment in payloads.iter() {
        merged.extend_from_slice(fragment);
    }
    Some(merged)
}
