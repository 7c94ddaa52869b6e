//! Raw bind-value lists carried by QUERY, EXECUTE and BATCH requests.

use bytes::BufMut;

use super::frame_errors::LowLevelDeserializationError;
use super::types;

/// A list of serialized bind values, kept in wire form.
///
/// The proxy never interprets bind values; it only needs to walk over them
/// when parsing a request body, so the values are stored as the raw
/// `[value]` sequence they arrived in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializedValues {
    serialized_values: Vec<u8>,
    element_count: u16,
}

impl SerializedValues {
    pub const fn new() -> Self {
        SerializedValues {
            serialized_values: Vec::new(),
            element_count: 0,
        }
    }

    pub fn element_count(&self) -> u16 {
        self.element_count
    }

    pub fn is_empty(&self) -> bool {
        self.element_count == 0
    }

    /// Appends a single value. `None` is serialized as a null value.
    pub fn add_value(&mut self, value: Option<&[u8]>) -> Result<(), std::num::TryFromIntError> {
        types::write_bytes_opt(value, &mut self.serialized_values)?;
        self.element_count += 1;
        Ok(())
    }

    /// Writes the value count followed by the raw values.
    pub fn write_to_request(&self, buf: &mut impl BufMut) {
        buf.put_u16(self.element_count);
        buf.put_slice(&self.serialized_values);
    }

    /// Reads a value list from a frame body, leaving values opaque.
    pub fn new_from_frame(buf: &mut &[u8]) -> Result<Self, LowLevelDeserializationError> {
        let element_count = types::read_short(buf)?;

        let initial = *buf;
        for _ in 0..element_count {
            types::read_bytes_opt(buf)?;
        }
        let consumed = initial.len() - buf.len();

        Ok(SerializedValues {
            serialized_values: initial[..consumed].to_vec(),
            element_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_roundtrip() {
        let mut values = SerializedValues::new();
        values.add_value(Some(b"test_key")).unwrap();
        values.add_value(None).unwrap();
        assert_eq!(values.element_count(), 2);

        let mut buf = Vec::new();
        values.write_to_request(&mut buf);

        let deserialized = SerializedValues::new_from_frame(&mut &buf[..]).unwrap();
        assert_eq!(deserialized, values);
    }

    #[test]
    fn truncated_values_rejected() {
        let mut buf = Vec::new();
        types::write_short(3, &mut buf);
        types::write_bytes_opt(Some(b"only one"), &mut buf).unwrap();
        assert!(SerializedValues::new_from_frame(&mut &buf[..]).is_err());
    }
}
