use bytes::Bytes;

use super::query::QueryParameters;
use super::{
    RequestDeserializationError, RequestOpcode, RequestSerializationError, SerializableRequest,
};
use crate::frame::types;

/// An EXECUTE request: a previously prepared statement identified by the
/// server-assigned id, plus execution parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execute {
    pub id: Bytes,
    pub parameters: QueryParameters,
}

impl SerializableRequest for Execute {
    const OPCODE: RequestOpcode = RequestOpcode::Execute;

    fn serialize(&self, buf: &mut Vec<u8>) -> Result<(), RequestSerializationError> {
        types::write_short_bytes(&self.id[..], buf)?;
        self.parameters.serialize(buf)?;
        Ok(())
    }
}

impl Execute {
    pub fn deserialize(buf: &mut &[u8]) -> Result<Self, RequestDeserializationError> {
        let id = Bytes::copy_from_slice(types::read_short_bytes(buf)?);
        let parameters = QueryParameters::deserialize(buf)?;

        Ok(Self { id, parameters })
    }
}
