use byteorder::ReadBytesExt;
use bytes::BufMut;

use super::{
    RequestDeserializationError, RequestOpcode, RequestSerializationError, SerializableRequest,
};
use crate::frame::types::{self, Consistency, SerialConsistency};
use crate::frame::value::SerializedValues;

// Query flags
const FLAG_VALUES: u8 = 0x01;
const FLAG_SKIP_METADATA: u8 = 0x02;
const FLAG_PAGE_SIZE: u8 = 0x04;
const FLAG_WITH_PAGING_STATE: u8 = 0x08;
const FLAG_WITH_SERIAL_CONSISTENCY: u8 = 0x10;
const FLAG_WITH_DEFAULT_TIMESTAMP: u8 = 0x20;
const FLAG_WITH_NAMES_FOR_VALUES: u8 = 0x40;
const ALL_FLAGS: u8 = FLAG_VALUES
    | FLAG_SKIP_METADATA
    | FLAG_PAGE_SIZE
    | FLAG_WITH_PAGING_STATE
    | FLAG_WITH_SERIAL_CONSISTENCY
    | FLAG_WITH_DEFAULT_TIMESTAMP
    | FLAG_WITH_NAMES_FOR_VALUES;

/// A QUERY request: an unprepared statement with its execution parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub contents: String,
    pub parameters: QueryParameters,
}

impl SerializableRequest for Query {
    const OPCODE: RequestOpcode = RequestOpcode::Query;

    fn serialize(&self, buf: &mut Vec<u8>) -> Result<(), RequestSerializationError> {
        types::write_long_string(&self.contents, buf)?;
        self.parameters.serialize(buf)?;
        Ok(())
    }
}

impl Query {
    pub fn deserialize(buf: &mut &[u8]) -> Result<Self, RequestDeserializationError> {
        let contents = types::read_long_string(buf)?.to_owned();
        let parameters = QueryParameters::deserialize(buf)?;

        Ok(Self {
            contents,
            parameters,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParameters {
    pub consistency: Consistency,
    pub serial_consistency: Option<SerialConsistency>,
    pub timestamp: Option<i64>,
    pub page_size: Option<i32>,
    pub paging_state: Option<Vec<u8>>,
    pub skip_metadata: bool,
    pub values: SerializedValues,
}

impl Default for QueryParameters {
    fn default() -> Self {
        Self {
            consistency: Default::default(),
            serial_consistency: None,
            timestamp: None,
            page_size: None,
            paging_state: None,
            skip_metadata: false,
            values: SerializedValues::new(),
        }
    }
}

impl QueryParameters {
    pub fn serialize(&self, buf: &mut impl BufMut) -> Result<(), RequestSerializationError> {
        types::write_consistency(self.consistency, buf);

        let mut flags = 0;
        if !self.values.is_empty() {
            flags |= FLAG_VALUES;
        }
        if self.skip_metadata {
            flags |= FLAG_SKIP_METADATA;
        }
        if self.page_size.is_some() {
            flags |= FLAG_PAGE_SIZE;
        }
        if self.paging_state.is_some() {
            flags |= FLAG_WITH_PAGING_STATE;
        }
        if self.serial_consistency.is_some() {
            flags |= FLAG_WITH_SERIAL_CONSISTENCY;
        }
        if self.timestamp.is_some() {
            flags |= FLAG_WITH_DEFAULT_TIMESTAMP;
        }

        buf.put_u8(flags);

        if !self.values.is_empty() {
            self.values.write_to_request(buf);
        }
        if let Some(page_size) = self.page_size {
            types::write_int(page_size, buf);
        }
        if let Some(paging_state) = &self.paging_state {
            types::write_bytes_opt(Some(paging_state), buf)?;
        }
        if let Some(serial_consistency) = self.serial_consistency {
            types::write_serial_consistency(serial_consistency, buf);
        }
        if let Some(timestamp) = self.timestamp {
            types::write_long(timestamp, buf);
        }

        Ok(())
    }

    pub fn deserialize(buf: &mut &[u8]) -> Result<Self, RequestDeserializationError> {
        let consistency = types::read_consistency(buf)?;

        let flags = buf.read_u8()?;
        let unknown_flags = flags & (!ALL_FLAGS);
        if unknown_flags != 0 {
            return Err(RequestDeserializationError::UnknownFlags {
                flags: unknown_flags,
            });
        }
        let values_flag = (flags & FLAG_VALUES) != 0;
        let skip_metadata = (flags & FLAG_SKIP_METADATA) != 0;
        let page_size_flag = (flags & FLAG_PAGE_SIZE) != 0;
        let paging_state_flag = (flags & FLAG_WITH_PAGING_STATE) != 0;
        let serial_consistency_flag = (flags & FLAG_WITH_SERIAL_CONSISTENCY) != 0;
        let default_timestamp_flag = (flags & FLAG_WITH_DEFAULT_TIMESTAMP) != 0;
        let values_have_names_flag = (flags & FLAG_WITH_NAMES_FOR_VALUES) != 0;

        if values_have_names_flag {
            return Err(RequestDeserializationError::NamedValuesUnsupported);
        }

        let values = if values_flag {
            SerializedValues::new_from_frame(buf)?
        } else {
            SerializedValues::new()
        };

        let page_size = page_size_flag.then(|| types::read_int(buf)).transpose()?;
        let paging_state = if paging_state_flag {
            types::read_bytes_opt(buf)?.map(|b| b.to_vec())
        } else {
            None
        };
        let serial_consistency = serial_consistency_flag
            .then(|| types::read_consistency(buf))
            .transpose()?
            .map(|consistency| {
                SerialConsistency::try_from(consistency)
                    .map_err(RequestDeserializationError::ExpectedSerialConsistency)
            })
            .transpose()?;
        let timestamp = if default_timestamp_flag {
            Some(types::read_long(buf)?)
        } else {
            None
        };

        Ok(Self {
            consistency,
            serial_consistency,
            timestamp,
            page_size,
            paging_state,
            skip_metadata,
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn named_values_rejected() {
        let mut buf = Vec::new();
        types::write_long_string("select * from t where k = :name", &mut buf).unwrap();
        types::write_consistency(Consistency::One, &mut buf);
        buf.push(FLAG_VALUES | FLAG_WITH_NAMES_FOR_VALUES);

        assert_matches!(
            Query::deserialize(&mut &buf[..]),
            Err(RequestDeserializationError::NamedValuesUnsupported)
        );
    }

    #[test]
    fn unknown_flags_rejected() {
        let mut buf = Vec::new();
        types::write_long_string("select * from t", &mut buf).unwrap();
        types::write_consistency(Consistency::One, &mut buf);
        buf.push(0x80);

        assert_matches!(
            Query::deserialize(&mut &buf[..]),
            Err(RequestDeserializationError::UnknownFlags { flags: 0x80 })
        );
    }

    #[test]
    fn parameters_roundtrip() {
        let parameters = QueryParameters {
            consistency: Consistency::Quorum,
            serial_consistency: Some(SerialConsistency::LocalSerial),
            timestamp: Some(3423434),
            page_size: Some(323),
            paging_state: Some(vec![2, 1, 3, 7]),
            skip_metadata: false,
            values: {
                let mut values = SerializedValues::new();
                values.add_value(Some(b"2137")).unwrap();
                values
            },
        };

        let mut buf = Vec::new();
        parameters.serialize(&mut buf).unwrap();
        assert_eq!(QueryParameters::deserialize(&mut &buf[..]).unwrap(), parameters);
    }
}
