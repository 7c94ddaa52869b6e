//! The capability bundle a wire protocol exposes to the generic proxy
//! machinery. Only [`CassandraProtocol`] exists today; the seam keeps the
//! payload-peeking logic in one place.

use spanner_cql::frame::request::RequestOpcode;
use spanner_cql::frame::HEADER_SIZE;

pub trait Protocol: Send + Sync {
    /// Protocol name sent with every AdaptMessage request.
    fn name(&self) -> &'static str;

    /// Length of a frame header in bytes.
    fn frame_header_length(&self) -> usize;

    /// Body length encoded in the given header bytes.
    fn frame_body_length(&self, header: &[u8]) -> usize;

    /// Prepared-statement ids referenced by the given payload, if any.
    fn extract_keys(&self, payload: &[u8]) -> Vec<String>;
}

/// The Cassandra v4 native protocol.
#[derive(Debug, Clone, Copy, Default)]
pub struct CassandraProtocol;

impl Protocol for CassandraProtocol {
    fn name(&self) -> &'static str {
        "cassandra"
    }

    fn frame_header_length(&self) -> usize {
        HEADER_SIZE
    }

    fn frame_body_length(&self, header: &[u8]) -> usize {
        u32::from_be_bytes([header[5], header[6], header[7], header[8]]) as usize
    }

    fn extract_keys(&self, payload: &[u8]) -> Vec<String> {
        // Only EXECUTE payloads carry a prepared-statement id: a 2-byte
        // big-endian length at offset 9 followed by the id bytes.
        if payload.len() < HEADER_SIZE + 2 || payload[4] != RequestOpcode::Execute as u8 {
            return Vec::new();
        }

        let id_len = u16::from_be_bytes([payload[9], payload[10]]) as usize;
        if payload.len() < HEADER_SIZE + 2 + id_len {
            return Vec::new();
        }
        let id = &payload[HEADER_SIZE + 2..HEADER_SIZE + 2 + id_len];

        vec![String::from_utf8_lossy(id).into_owned()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn execute_payload(id: &[u8]) -> Vec<u8> {
        let mut payload = vec![0x04, 0x00, 0x00, 0x01, 0x0A, 0x00, 0x00, 0x00, 0x00];
        payload.extend_from_slice(&(id.len() as u16).to_be_bytes());
        payload.extend_from_slice(id);
        payload
    }

    #[test]
    fn extracts_execute_id() {
        let protocol = CassandraProtocol;
        let keys = protocol.extract_keys(&execute_payload(b"Wdml_id"));
        assert_eq!(keys, vec!["Wdml_id".to_owned()]);
    }

    #[test]
    fn ignores_other_opcodes() {
        let protocol = CassandraProtocol;
        let mut payload = execute_payload(b"Wdml_id");
        payload[4] = RequestOpcode::Query as u8;
        assert!(protocol.extract_keys(&payload).is_empty());
    }

    #[test]
    fn truncated_payloads_yield_no_keys() {
        let protocol = CassandraProtocol;
        // Shorter than header + id length prefix.
        assert!(protocol.extract_keys(&[0x04, 0x00, 0x00, 0x01, 0x0A]).is_empty());
        // Id length claims more bytes than are present.
        let mut payload = execute_payload(b"Wdml_id");
        payload.truncate(payload.len() - 3);
        assert!(protocol.extract_keys(&payload).is_empty());
    }

    #[test]
    fn body_length_read_from_header() {
        let protocol = CassandraProtocol;
        let header = [0x04, 0x00, 0x00, 0x01, 0x07, 0x00, 0x07, 0xA1, 0x20];
        assert_eq!(protocol.frame_header_length(), 9);
        assert_eq!(protocol.frame_body_length(&header), 500_000);
    }
}
