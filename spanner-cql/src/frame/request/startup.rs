use std::collections::HashMap;

use super::{
    RequestDeserializationError, RequestOpcode, RequestSerializationError, SerializableRequest,
};
use crate::frame::types;

/// A STARTUP request: the driver's connection options (CQL version,
/// compression, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Startup {
    pub options: HashMap<String, String>,
}

impl SerializableRequest for Startup {
    const OPCODE: RequestOpcode = RequestOpcode::Startup;

    fn serialize(&self, buf: &mut Vec<u8>) -> Result<(), RequestSerializationError> {
        types::write_string_map(&self.options, buf)?;
        Ok(())
    }
}

impl Startup {
    pub fn deserialize(buf: &mut &[u8]) -> Result<Self, RequestDeserializationError> {
        let options = types::read_string_map(buf)?;
        Ok(Self { options })
    }
}
