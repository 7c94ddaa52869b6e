use byteorder::ReadBytesExt;
use bytes::{BufMut, Bytes};
use thiserror::Error;

use super::{
    RequestDeserializationError, RequestOpcode, RequestSerializationError, SerializableRequest,
};
use crate::frame::types::{self, Consistency, SerialConsistency};
use crate::frame::value::SerializedValues;

// Batch flags
const FLAG_WITH_SERIAL_CONSISTENCY: u8 = 0x10;
const FLAG_WITH_DEFAULT_TIMESTAMP: u8 = 0x20;
const ALL_FLAGS: u8 = FLAG_WITH_SERIAL_CONSISTENCY | FLAG_WITH_DEFAULT_TIMESTAMP;

/// A BATCH request: a list of prepared and unprepared child statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub batch_type: BatchType,
    pub statements: Vec<BatchStatement>,
    /// Bind values, one list per statement.
    pub values: Vec<SerializedValues>,
    pub consistency: Consistency,
    pub serial_consistency: Option<SerialConsistency>,
    pub timestamp: Option<i64>,
}

/// The type of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BatchType {
    Logged = 0,
    Unlogged = 1,
    Counter = 2,
}

#[derive(Debug, Error)]
#[error("Bad BatchType value: {value}")]
pub struct BatchTypeParseError {
    value: u8,
}

impl TryFrom<u8> for BatchType {
    type Error = BatchTypeParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Logged),
            1 => Ok(Self::Unlogged),
            2 => Ok(Self::Counter),
            _ => Err(BatchTypeParseError { value }),
        }
    }
}

/// A single child statement of a batch: either inline query text or a
/// prepared-statement id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatement {
    Query { text: String },
    Prepared { id: Bytes },
}

impl BatchStatement {
    fn serialize(&self, buf: &mut impl BufMut) -> Result<(), RequestSerializationError> {
        match self {
            Self::Query { text } => {
                buf.put_u8(0);
                types::write_long_string(text, buf)?;
            }
            Self::Prepared { id } => {
                buf.put_u8(1);
                types::write_short_bytes(id, buf)?;
            }
        }
        Ok(())
    }

    fn deserialize(buf: &mut &[u8]) -> Result<Self, RequestDeserializationError> {
        let kind = buf.read_u8()?;
        match kind {
            0 => {
                let text = types::read_long_string(buf)?.to_owned();
                Ok(Self::Query { text })
            }
            1 => {
                let id = Bytes::copy_from_slice(types::read_short_bytes(buf)?);
                Ok(Self::Prepared { id })
            }
            other => Err(RequestDeserializationError::UnexpectedBatchStatementKind(
                other,
            )),
        }
    }
}

impl SerializableRequest for Batch {
    const OPCODE: RequestOpcode = RequestOpcode::Batch;

    fn serialize(&self, buf: &mut Vec<u8>) -> Result<(), RequestSerializationError> {
        buf.put_u8(self.batch_type as u8);

        types::write_short_length(self.statements.len(), buf)?;
        for (statement, values) in self.statements.iter().zip(self.values.iter()) {
            statement.serialize(buf)?;
            values.write_to_request(buf);
        }

        types::write_consistency(self.consistency, buf);

        let mut flags = 0;
        if self.serial_consistency.is_some() {
            flags |= FLAG_WITH_SERIAL_CONSISTENCY;
        }
        if self.timestamp.is_some() {
            flags |= FLAG_WITH_DEFAULT_TIMESTAMP;
        }
        buf.put_u8(flags);

        if let Some(serial_consistency) = self.serial_consistency {
            types::write_serial_consistency(serial_consistency, buf);
        }
        if let Some(timestamp) = self.timestamp {
            types::write_long(timestamp, buf);
        }

        Ok(())
    }
}

impl Batch {
    pub fn deserialize(buf: &mut &[u8]) -> Result<Self, RequestDeserializationError> {
        let batch_type = BatchType::try_from(buf.read_u8()?)?;

        let statements_count = types::read_short_length(buf)?;
        let mut statements = Vec::with_capacity(statements_count);
        let mut values = Vec::with_capacity(statements_count);
        for _ in 0..statements_count {
            statements.push(BatchStatement::deserialize(buf)?);
            values.push(SerializedValues::new_from_frame(buf)?);
        }

        let consistency = types::read_consistency(buf)?;

        let flags = buf.read_u8()?;
        let unknown_flags = flags & (!ALL_FLAGS);
        if unknown_flags != 0 {
            return Err(RequestDeserializationError::UnknownFlags {
                flags: unknown_flags,
            });
        }

        let serial_consistency = ((flags & FLAG_WITH_SERIAL_CONSISTENCY) != 0)
            .then(|| types::read_consistency(buf))
            .transpose()?
            .map(|consistency| {
                SerialConsistency::try_from(consistency)
                    .map_err(RequestDeserializationError::ExpectedSerialConsistency)
            })
            .transpose()?;
        let timestamp = if (flags & FLAG_WITH_DEFAULT_TIMESTAMP) != 0 {
            Some(types::read_long(buf)?)
        } else {
            None
        };

        Ok(Self {
            batch_type,
            statements,
            values,
            consistency,
            serial_consistency,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn bad_batch_type_rejected() {
        let buf = [7u8, 0, 0];
        assert_matches!(
            Batch::deserialize(&mut &buf[..]),
            Err(RequestDeserializationError::BatchTypeParse(_))
        );
    }

    #[test]
    fn bad_statement_kind_rejected() {
        let mut buf = Vec::new();
        buf.put_u8(BatchType::Logged as u8);
        types::write_short(1, &mut buf);
        buf.put_u8(9);
        assert_matches!(
            Batch::deserialize(&mut &buf[..]),
            Err(RequestDeserializationError::UnexpectedBatchStatementKind(9))
        );
    }

    #[test]
    fn mixed_batch_roundtrip() {
        let batch = Batch {
            batch_type: BatchType::Unlogged,
            statements: vec![
                BatchStatement::Query {
                    text: "INSERT INTO demo.keyval (key, val) VALUES ('k', 'v')".to_owned(),
                },
                BatchStatement::Prepared {
                    id: Bytes::from_static(b"Wdml_id"),
                },
            ],
            values: vec![SerializedValues::new(), {
                let mut values = SerializedValues::new();
                values.add_value(Some(b"test_key")).unwrap();
                values
            }],
            consistency: Consistency::LocalQuorum,
            serial_consistency: Some(SerialConsistency::Serial),
            timestamp: Some(32432),
        };

        let mut buf = Vec::new();
        batch.serialize(&mut buf).unwrap();
        assert_eq!(Batch::deserialize(&mut &buf[..]).unwrap(), batch);
    }
}
