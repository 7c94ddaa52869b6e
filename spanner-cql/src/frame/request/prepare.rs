use super::{
    RequestDeserializationError, RequestOpcode, RequestSerializationError, SerializableRequest,
};
use crate::frame::types;

/// A PREPARE request: the statement text to prepare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepare {
    pub query: String,
}

impl SerializableRequest for Prepare {
    const OPCODE: RequestOpcode = RequestOpcode::Prepare;

    fn serialize(&self, buf: &mut Vec<u8>) -> Result<(), RequestSerializationError> {
        types::write_long_string(&self.query, buf)?;
        Ok(())
    }
}

impl Prepare {
    pub fn deserialize(buf: &mut &[u8]) -> Result<Self, RequestDeserializationError> {
        let query = types::read_long_string(buf)?.to_owned();
        Ok(Self { query })
    }
}
