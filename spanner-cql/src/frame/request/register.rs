use super::{
    RequestDeserializationError, RequestOpcode, RequestSerializationError, SerializableRequest,
};
use crate::frame::types;

/// A REGISTER request: the event types the driver wants to receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    pub event_types: Vec<String>,
}

impl SerializableRequest for Register {
    const OPCODE: RequestOpcode = RequestOpcode::Register;

    fn serialize(&self, buf: &mut Vec<u8>) -> Result<(), RequestSerializationError> {
        types::write_string_list(&self.event_types, buf)?;
        Ok(())
    }
}

impl Register {
    pub fn deserialize(buf: &mut &[u8]) -> Result<Self, RequestDeserializationError> {
        let event_types = types::read_string_list(buf)?;
        Ok(Self { event_types })
    }
}
