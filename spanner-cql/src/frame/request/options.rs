use super::{
    RequestDeserializationError, RequestOpcode, RequestSerializationError, SerializableRequest,
};

/// An OPTIONS request. The body is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options;

impl SerializableRequest for Options {
    const OPCODE: RequestOpcode = RequestOpcode::Options;

    fn serialize(&self, _buf: &mut Vec<u8>) -> Result<(), RequestSerializationError> {
        Ok(())
    }
}

impl Options {
    pub fn deserialize(_buf: &mut &[u8]) -> Result<Self, RequestDeserializationError> {
        Ok(Options)
    }
}
