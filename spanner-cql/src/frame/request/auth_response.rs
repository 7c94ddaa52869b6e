use super::{
    RequestDeserializationError, RequestOpcode, RequestSerializationError, SerializableRequest,
};
use crate::frame::types;

/// An AUTH_RESPONSE request: the driver's answer to an authentication
/// challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    pub response: Option<Vec<u8>>,
}

impl SerializableRequest for AuthResponse {
    const OPCODE: RequestOpcode = RequestOpcode::AuthResponse;

    fn serialize(&self, buf: &mut Vec<u8>) -> Result<(), RequestSerializationError> {
        types::write_bytes_opt(self.response.as_deref(), buf)?;
        Ok(())
    }
}

impl AuthResponse {
    pub fn deserialize(buf: &mut &[u8]) -> Result<Self, RequestDeserializationError> {
        let response = types::read_bytes_opt(buf)?.map(|b| b.to_vec());
        Ok(Self { response })
    }
}
