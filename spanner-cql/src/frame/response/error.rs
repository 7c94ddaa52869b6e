//! The ERROR response bodies the proxy synthesizes locally, plus enough
//! deserialization to inspect them in tests.

use bytes::{BufMut, Bytes};
use thiserror::Error as ThisError;

use crate::frame::frame_errors::LowLevelDeserializationError;
use crate::frame::types;

/// An ERROR response: an error kind plus a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub error: DbError,
    pub reason: String,
}

/// The database error kinds this proxy produces or inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    /// Something unexpected happened server-side (or proxy-side).
    ServerError,
    /// The submitted statement could not be parsed.
    SyntaxError,
    /// The prepared statement id is not known.
    Unprepared {
        /// The prepared-statement id which the driver should re-prepare.
        statement_id: Bytes,
    },
    /// Any other error code, kept verbatim.
    Other(i32),
}

impl DbError {
    pub fn code(&self) -> i32 {
        match self {
            DbError::ServerError => 0x0000,
            DbError::SyntaxError => 0x2000,
            DbError::Unprepared { .. } => 0x2500,
            DbError::Other(code) => *code,
        }
    }
}

#[derive(Debug, ThisError)]
pub enum ErrorSerializationError {
    #[error("Error field too big to be serialized: {0}")]
    ValueTooBig(#[from] std::num::TryFromIntError),
}

#[derive(Debug, ThisError)]
pub enum ErrorParseError {
    #[error("Malformed error code: {0}")]
    CodeParseError(std::io::Error),
    #[error("Malformed error reason: {0}")]
    ReasonParseError(LowLevelDeserializationError),
    #[error("Malformed UNPREPARED statement id: {0}")]
    UnpreparedIdParseError(LowLevelDeserializationError),
}

impl Error {
    /// Serializes the full ERROR body: code, reason, then error-specific
    /// fields.
    pub fn serialize(&self, buf: &mut impl BufMut) -> Result<(), ErrorSerializationError> {
        types::write_int(self.error.code(), buf);
        types::write_string(&self.reason, buf)?;

        if let DbError::Unprepared { statement_id } = &self.error {
            types::write_short_bytes(statement_id, buf)?;
        }

        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Bytes, ErrorSerializationError> {
        let mut buf = Vec::new();
        self.serialize(&mut buf)?;
        Ok(buf.into())
    }

    pub fn deserialize(buf: &mut &[u8]) -> Result<Self, ErrorParseError> {
        let code = types::read_int(buf).map_err(ErrorParseError::CodeParseError)?;
        let reason = types::read_string(buf)
            .map_err(ErrorParseError::ReasonParseError)?
            .to_owned();

        let error = match code {
            0x0000 => DbError::ServerError,
            0x2000 => DbError::SyntaxError,
            0x2500 => DbError::Unprepared {
                statement_id: Bytes::copy_from_slice(
                    types::read_short_bytes(buf)
                        .map_err(ErrorParseError::UnpreparedIdParseError)?,
                ),
            },
            other => DbError::Other(other),
        };

        Ok(Error { error, reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_roundtrip() {
        let errors = [
            Error {
                error: DbError::ServerError,
                reason: "session refresh failed".to_owned(),
            },
            Error {
                error: DbError::SyntaxError,
                reason: "unexpected flags".to_owned(),
            },
            Error {
                error: DbError::Unprepared {
                    statement_id: Bytes::from_static(b"Wdml_id"),
                },
                reason: "Unknown prepared query in client side cache".to_owned(),
            },
        ];

        for error in errors {
            let bytes = error.to_bytes().unwrap();
            assert_eq!(Error::deserialize(&mut &bytes[..]).unwrap(), error);
        }
    }

    #[test]
    fn unknown_code_preserved() {
        let error = Error {
            error: DbError::Other(0x1001),
            reason: "overloaded".to_owned(),
        };
        let bytes = error.to_bytes().unwrap();
        let deserialized = Error::deserialize(&mut &bytes[..]).unwrap();
        assert_eq!(deserialized.error.code(), 0x1001);
    }
}
