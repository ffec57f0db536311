use crate::error::RelayError;

/// Encoded width of one packet value.
pub const VALUE_SIZE: usize = 8;

/// Fixed-layout numeric buffer sent to the robot command transport.
///
/// On the wire: consecutive IEEE-754 `f64` values, little-endian.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandPacket {
    values: Vec<f64>,
}

impl CommandPacket {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.values.len() * VALUE_SIZE);
        for v in &self.values {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RelayError> {
        if bytes.len() % VALUE_SIZE != 0 {
            return Err(RelayError::format(format!(
                "command packet length {} is not a multiple of {VALUE_SIZE}",
                bytes.len()
            )));
        }
        let values = bytes
            .chunks_exact(VALUE_SIZE)
            .map(|chunk| {
                let mut raw = [0u8; VALUE_SIZE];
                raw.copy_from_slice(chunk);
                f64::from_le_bytes(raw)
            })
            .collect();
        Ok(Self { values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_little_endian() {
        let packet = CommandPacket::new(vec![1.0, -2.5]);
        let bytes = packet.to_bytes();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..8], &[0, 0, 0, 0, 0, 0, 0xf0, 0x3f]);
        assert_eq!(CommandPacket::from_bytes(&bytes).unwrap(), packet);
    }

    #[test]
    fn rejects_ragged_length() {
        let err = CommandPacket::from_bytes(&[0u8; 12]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Format);
    }

    #[test]
    fn empty_packet_is_empty_buffer() {
        let packet = CommandPacket::new(Vec::new());
        assert!(packet.is_empty());
        assert!(packet.to_bytes().is_empty());
    }
}
