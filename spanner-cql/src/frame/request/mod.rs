//! CQL requests sent by the client.

pub mod auth_response;
pub mod batch;
pub mod execute;
pub mod options;
pub mod prepare;
pub mod query;
pub mod register;
pub mod startup;

use thiserror::Error;

pub use auth_response::AuthResponse;
pub use batch::{Batch, BatchStatement, BatchType};
pub use execute::Execute;
pub use options::Options;
pub use prepare::Prepare;
pub use query::Query;
pub use register::Register;
pub use startup::Startup;

use super::frame_errors::LowLevelDeserializationError;
use super::types::Consistency;
use super::TryFromPrimitiveError;
use batch::BatchTypeParseError;

/// Opcode of a request, used to identify the request type in a CQL frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum RequestOpcode {
    Startup = 0x01,
    Options = 0x05,
    Query = 0x07,
    Prepare = 0x09,
    Execute = 0x0A,
    Register = 0x0B,
    Batch = 0x0D,
    AuthResponse = 0x0F,
}

impl TryFrom<u8> for RequestOpcode {
    type Error = TryFromPrimitiveError<u8>;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Startup),
            0x05 => Ok(Self::Options),
            0x07 => Ok(Self::Query),
            0x09 => Ok(Self::Prepare),
            0x0A => Ok(Self::Execute),
            0x0B => Ok(Self::Register),
            0x0D => Ok(Self::Batch),
            0x0F => Ok(Self::AuthResponse),
            _ => Err(TryFromPrimitiveError {
                enum_name: "RequestOpcode",
                primitive: value,
            }),
        }
    }
}

/// Requests that can be serialized into a CQL frame body.
pub trait SerializableRequest {
    const OPCODE: RequestOpcode;

    fn serialize(&self, buf: &mut Vec<u8>) -> Result<(), RequestSerializationError>;

    fn to_bytes(&self) -> Result<bytes::Bytes, RequestSerializationError> {
        let mut v = Vec::new();
        self.serialize(&mut v)?;
        Ok(v.into())
    }
}

#[derive(Debug, Error)]
pub enum RequestSerializationError {
    #[error("Value too big to be serialized: {0}")]
    ValueTooBig(#[from] std::num::TryFromIntError),
}

/// An error type returned when deserialization of a request fails.
#[derive(Debug, Error)]
pub enum RequestDeserializationError {
    #[error("Low level deser error: {0}")]
    LowLevelDeserialization(#[from] LowLevelDeserializationError),
    #[error("Io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Specified flags are not recognised: {:02x}", flags)]
    UnknownFlags { flags: u8 },
    #[error("Named values in frame are not supported")]
    NamedValuesUnsupported,
    #[error("Expected SerialConsistency, got regular Consistency: {0}")]
    ExpectedSerialConsistency(Consistency),
    #[error(transparent)]
    BatchTypeParse(#[from] BatchTypeParseError),
    #[error("Unexpected batch statement kind: {0}")]
    UnexpectedBatchStatementKind(u8),
}

/// A request deserialized from a CQL frame body.
#[derive(Debug)]
pub enum Request {
    Startup(Startup),
    Options(Options),
    Query(Query),
    Prepare(Prepare),
    Execute(Execute),
    Register(Register),
    Batch(Batch),
    AuthResponse(AuthResponse),
}

impl Request {
    /// Deserializes a request body given the opcode from its frame header.
    pub fn deserialize(
        buf: &mut &[u8],
        opcode: RequestOpcode,
    ) -> Result<Self, RequestDeserializationError> {
        match opcode {
            RequestOpcode::Startup => Startup::deserialize(buf).map(Self::Startup),
            RequestOpcode::Options => Options::deserialize(buf).map(Self::Options),
            RequestOpcode::Query => Query::deserialize(buf).map(Self::Query),
            RequestOpcode::Prepare => Prepare::deserialize(buf).map(Self::Prepare),
            RequestOpcode::Execute => Execute::deserialize(buf).map(Self::Execute),
            RequestOpcode::Register => Register::deserialize(buf).map(Self::Register),
            RequestOpcode::Batch => Batch::deserialize(buf).map(Self::Batch),
            RequestOpcode::AuthResponse => {
                AuthResponse::deserialize(buf).map(Self::AuthResponse)
            }
        }
    }

    pub fn opcode(&self) -> RequestOpcode {
        match self {
            Request::Startup(_) => RequestOpcode::Startup,
            Request::Options(_) => RequestOpcode::Options,
            Request::Query(_) => RequestOpcode::Query,
            Request::Prepare(_) => RequestOpcode::Prepare,
            Request::Execute(_) => RequestOpcode::Execute,
            Request::Register(_) => RequestOpcode::Register,
            Request::Batch(_) => RequestOpcode::Batch,
            Request::AuthResponse(_) => RequestOpcode::AuthResponse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::query::QueryParameters;
    use super::*;
    use crate::frame::value::SerializedValues;

    #[test]
    fn opcode_roundtrip() {
        for opcode in [
            RequestOpcode::Startup,
            RequestOpcode::Options,
            RequestOpcode::Query,
            RequestOpcode::Prepare,
            RequestOpcode::Execute,
            RequestOpcode::Register,
            RequestOpcode::Batch,
            RequestOpcode::AuthResponse,
        ] {
            assert_eq!(RequestOpcode::try_from(opcode as u8).unwrap(), opcode);
        }
        assert!(RequestOpcode::try_from(0x42).is_err());
    }

    #[test]
    fn request_ser_de_identity() {
        // Query
        let query = Query {
            contents: "SELECT key, val FROM demo.keyval WHERE key = ?".to_owned(),
            parameters: QueryParameters {
                consistency: Consistency::One,
                values: {
                    let mut values = SerializedValues::new();
                    values.add_value(Some(b"test_key")).unwrap();
                    values
                },
                ..Default::default()
            },
        };
        let body = query.to_bytes().unwrap();
        let deserialized = match Request::deserialize(&mut &body[..], RequestOpcode::Query) {
            Ok(Request::Query(q)) => q,
            other => panic!("expected Query, got {:?}", other),
        };
        assert_eq!(deserialized, query);

        // Execute
        let execute = Execute {
            id: bytes::Bytes::from_static(b"Wdml_id"),
            parameters: QueryParameters::default(),
        };
        let body = execute.to_bytes().unwrap();
        let deserialized = match Request::deserialize(&mut &body[..], RequestOpcode::Execute) {
            Ok(Request::Execute(e)) => e,
            other => panic!("expected Execute, got {:?}", other),
        };
        assert_eq!(deserialized, execute);

        // Batch
        let batch = Batch {
            batch_type: BatchType::Logged,
            statements: vec![
                BatchStatement::Query {
                    text: "INSERT INTO demo.keyval (key, val) VALUES (?, ?)".to_owned(),
                },
                BatchStatement::Prepared {
                    id: bytes::Bytes::from_static(b"Wupdate_id"),
                },
            ],
            values: vec![SerializedValues::new(), SerializedValues::new()],
            consistency: Consistency::Quorum,
            serial_consistency: None,
            timestamp: None,
        };
        let body = batch.to_bytes().unwrap();
        let deserialized = match Request::deserialize(&mut &body[..], RequestOpcode::Batch) {
            Ok(Request::Batch(b)) => b,
            other => panic!("expected Batch, got {:?}", other),
        };
        assert_eq!(deserialized, batch);
    }
}
