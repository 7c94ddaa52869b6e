use super::TryFromPrimitiveError;
use thiserror::Error;

/// An error that occurred while reading or writing a raw frame.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Received frame marked as coming from the server")]
    FrameFromServer,
    #[error("Received frame marked as coming from a client")]
    FrameFromClient,
    #[error("Frame body length {0} exceeds the protocol maximum of {1}")]
    BodyTooLarge(usize, usize),
    #[error("Connection was closed before body was read: missing {0} out of {1}")]
    ConnectionClosed(usize, usize),
    #[error(transparent)]
    StdIoError(#[from] std::io::Error),
    #[error("Unrecognized opcode: {0}")]
    TryFromPrimitiveError(#[from] TryFromPrimitiveError<u8>),
}

/// An error that occurred during deserialization of a low-level in-wire type.
#[derive(Error, Debug)]
pub enum LowLevelDeserializationError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Not enough bytes! expected: {expected}, received: {received}")]
    TooFewBytesReceived { expected: usize, received: usize },
    #[error("Invalid value length: {0}")]
    InvalidValueLength(i32),
    #[error("UTF8 deserialization failed: {0}")]
    UTF8DeserializationError(#[from] std::str::Utf8Error),
    #[error(transparent)]
    TryFromPrimitiveError(#[from] TryFromPrimitiveError<u16>),
}
