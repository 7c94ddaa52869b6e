//! Raw frame transport between the driver and the proxy.

use bytes::{Buf, BufMut, Bytes};
use spanner_cql::frame::frame_errors::FrameError;
use spanner_cql::frame::request::{Request, RequestDeserializationError, RequestOpcode};
use spanner_cql::frame::response::error::{Error as CqlError, ErrorSerializationError};
use spanner_cql::frame::response::ResponseOpcode;
use spanner_cql::frame::{
    encode_header, FrameParams, HEADER_SIZE, MAX_FRAME_BODY_SIZE, PROTOCOL_VERSION,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

/// A request frame with its header parsed and the body left opaque.
#[derive(Clone, Debug)]
pub(crate) struct RequestFrame {
    pub(crate) params: FrameParams,
    pub(crate) opcode: RequestOpcode,
    pub(crate) body: Bytes,
}

impl RequestFrame {
    pub(crate) fn deserialize(&self) -> Result<Request, RequestDeserializationError> {
        Request::deserialize(&mut &self.body[..], self.opcode)
    }

    /// The full header-plus-body payload forwarded to the RPC layer.
    pub(crate) fn payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(HEADER_SIZE + self.body.len());
        payload.extend_from_slice(&encode_header(self.params, self.opcode as u8, self.body.len()));
        payload.extend_from_slice(&self.body);
        payload
    }
}

/// A response frame the proxy synthesizes locally.
#[derive(Clone, Debug)]
pub(crate) struct ResponseFrame {
    pub(crate) params: FrameParams,
    pub(crate) opcode: ResponseOpcode,
    pub(crate) body: Bytes,
}

impl ResponseFrame {
    /// Creates an ERROR response on the request's stream. All header flags
    /// are cleared so that no warning/trace/custom-payload bits leak into a
    /// locally constructed frame.
    pub(crate) fn forged_error(
        request_params: FrameParams,
        error: &CqlError,
    ) -> Result<Self, ErrorSerializationError> {
        Ok(ResponseFrame {
            params: FrameParams {
                flags: 0,
                ..request_params.for_response()
            },
            opcode: ResponseOpcode::Error,
            body: error.to_bytes()?,
        })
    }

    pub(crate) async fn write(
        &self,
        writer: &mut (impl AsyncWrite + Unpin),
    ) -> Result<(), tokio::io::Error> {
        let header = encode_header(self.params, self.opcode as u8, self.body.len());
        writer.write_all(&header).await?;
        writer.write_all(&self.body).await?;
        writer.flush().await?;
        Ok(())
    }
}

pub(crate) async fn read_request_frame(
    reader: &mut (impl AsyncRead + Unpin),
) -> Result<RequestFrame, FrameError> {
    let mut raw_header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut raw_header[..]).await?;

    let mut buf = &raw_header[..];

    let version = buf.get_u8();
    if version & 0x80 != 0x00 {
        return Err(FrameError::FrameFromServer);
    }
    if version & 0x7F != PROTOCOL_VERSION {
        warn!("Received request with protocol version {}.", version & 0x7F);
    }

    let flags = buf.get_u8();
    let stream = buf.get_i16();

    let params = FrameParams {
        version,
        flags,
        stream,
    };

    let opcode = RequestOpcode::try_from(buf.get_u8())?;

    let length = buf.get_u32() as usize;
    if length > MAX_FRAME_BODY_SIZE {
        return Err(FrameError::BodyTooLarge(length, MAX_FRAME_BODY_SIZE));
    }

    let mut body = Vec::with_capacity(length).limit(length);
    while body.has_remaining_mut() {
        let n = reader.read_buf(&mut body).await?;
        if n == 0 {
            // EOF, too early
            return Err(FrameError::ConnectionClosed(body.remaining_mut(), length));
        }
    }

    Ok(RequestFrame {
        params,
        opcode,
        body: body.into_inner().into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use spanner_cql::frame::response::error::DbError;

    fn raw_frame(version: u8, stream: i16, opcode: u8, body: &[u8]) -> Vec<u8> {
        let mut frame = vec![version, 0x00];
        frame.extend_from_slice(&stream.to_be_bytes());
        frame.push(opcode);
        frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
        frame.extend_from_slice(body);
        frame
    }

    #[tokio::test]
    async fn raw_frame_roundtrip() {
        let raw = raw_frame(0x04, 42, 0x07, b"some opaque body");
        let frame = read_request_frame(&mut &raw[..]).await.unwrap();
        assert_eq!(frame.params.stream, 42);
        assert_eq!(frame.opcode, RequestOpcode::Query);
        assert_eq!(&frame.body[..], b"some opaque body");
        assert_eq!(frame.payload(), raw);
    }

    #[tokio::test]
    async fn response_direction_rejected() {
        let raw = raw_frame(0x84, 0, 0x07, b"");
        assert_matches!(
            read_request_frame(&mut &raw[..]).await,
            Err(FrameError::FrameFromServer)
        );
    }

    #[tokio::test]
    async fn unknown_opcode_rejected() {
        let raw = raw_frame(0x04, 0, 0x42, b"");
        assert_matches!(
            read_request_frame(&mut &raw[..]).await,
            Err(FrameError::TryFromPrimitiveError(_))
        );
    }

    #[tokio::test]
    async fn oversized_body_rejected() {
        let mut raw = raw_frame(0x04, 0, 0x07, b"");
        raw[5..9].copy_from_slice(&u32::MAX.to_be_bytes());
        assert_matches!(
            read_request_frame(&mut &raw[..]).await,
            Err(FrameError::BodyTooLarge(_, _))
        );
    }

    #[tokio::test]
    async fn truncated_body_is_connection_closed() {
        let mut raw = raw_frame(0x04, 0, 0x07, b"full body");
        raw.truncate(raw.len() - 4);
        assert_matches!(
            read_request_frame(&mut &raw[..]).await,
            Err(FrameError::ConnectionClosed(4, 9))
        );
    }

    #[test]
    fn forged_error_clears_flags_and_keeps_stream() {
        let request_params = FrameParams {
            version: 0x04,
            flags: 0x0A,
            stream: 117,
        };
        let error = CqlError {
            error: DbError::SyntaxError,
            reason: "bad frame".to_owned(),
        };
        let frame = ResponseFrame::forged_error(request_params, &error).unwrap();
        assert_eq!(frame.params.version, 0x84);
        assert_eq!(frame.params.flags, 0);
        assert_eq!(frame.params.stream, 117);
        assert_eq!(frame.opcode, ResponseOpcode::Error);

        let decoded = CqlError::deserialize(&mut &frame.body[..]).unwrap();
        assert_eq!(decoded, error);
    }
}
