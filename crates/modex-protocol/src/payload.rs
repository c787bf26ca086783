//! Binary array payloads.
//!
//! Arrays travel as raw little-endian IEEE-754 doubles with no framing:
//!
//! ```text
//! +-----------+-----------+-----+-----------+
//! | f64 (LE)  | f64 (LE)  | ... | f64 (LE)  |   n * 8 bytes
//! +-----------+-----------+-----+-----------+
//! ```
//!
//! The receiver learns `n` beforehand (through a size query) and must treat
//! any other byte count as an error.

use std::ops::Deref;

use crate::error::{ProtocolError, ProtocolResult};

/// Size of one encoded element, in bytes.
pub const ELEMENT_SIZE: usize = std::mem::size_of::<f64>();

/// An array of doubles exchanged through a session variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayPayload(Vec<f64>);

impl ArrayPayload {
    /// Wraps a vector of values.
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Number of bytes `n` elements occupy on the wire.
    pub fn byte_len(n: usize) -> usize {
        n.saturating_mul(ELEMENT_SIZE)
    }

    /// Encodes `values` as little-endian bytes.
    pub fn encode(values: &[f64]) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(Self::byte_len(values.len()));
        for value in values {
            buffer.extend_from_slice(&value.to_le_bytes());
        }
        buffer
    }

    /// Decodes a body that must hold exactly `n` elements.
    pub fn decode_exact(bytes: &[u8], n: usize) -> ProtocolResult<Self> {
        let expected = Self::byte_len(n);
        if bytes.len() != expected {
            return Err(ProtocolError::SizeMismatch {
                expected,
                received: bytes.len(),
            });
        }
        Ok(Self::decode_chunks(bytes))
    }

    /// Decodes a body of unknown length. The length must be a multiple of
    /// [`ELEMENT_SIZE`].
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        if bytes.len() % ELEMENT_SIZE != 0 {
            return Err(ProtocolError::decode(format!(
                "payload of {} bytes is not a whole number of doubles",
                bytes.len()
            )));
        }
        Ok(Self::decode_chunks(bytes))
    }

    fn decode_chunks(bytes: &[u8]) -> Self {
        let values = bytes
            .chunks_exact(ELEMENT_SIZE)
            .map(|chunk| {
                let mut raw = [0u8; ELEMENT_SIZE];
                raw.copy_from_slice(chunk);
                f64::from_le_bytes(raw)
            })
            .collect();
        Self(values)
    }

    /// Encodes this payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        Self::encode(&self.0)
    }

    /// Returns the values.
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl Deref for ArrayPayload {
    type Target = [f64];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<f64>> for ArrayPayload {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

impl From<ArrayPayload> for Vec<f64> {
    fn from(payload: ArrayPayload) -> Self {
        payload.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_little_endian() {
        let bytes = ArrayPayload::encode(&[1.0]);
        assert_eq!(bytes, vec![0, 0, 0, 0, 0, 0, 0xf0, 0x3f]);
    }

    #[test]
    fn encode_then_decode_is_bit_identical() {
        let values = [1.5, -2.25, 0.0, -0.0, f64::MIN_POSITIVE, f64::INFINITY];
        let encoded = ArrayPayload::encode(&values);
        let decoded = ArrayPayload::decode_exact(&encoded, values.len()).unwrap();
        for (a, b) in values.iter().zip(decoded.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn nan_bits_survive() {
        let nan = f64::from_bits(0x7ff8_0000_0000_0001);
        let decoded = ArrayPayload::decode_exact(&ArrayPayload::encode(&[nan]), 1).unwrap();
        assert_eq!(decoded[0].to_bits(), nan.to_bits());
    }

    #[test]
    fn short_body_is_size_mismatch() {
        let err = ArrayPayload::decode_exact(&[0u8; 23], 3).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::SizeMismatch {
                expected: 24,
                received: 23
            }
        ));
    }

    #[test]
    fn long_body_is_size_mismatch() {
        assert!(ArrayPayload::decode_exact(&[0u8; 32], 3).is_err());
    }

    #[test]
    fn empty_payload() {
        assert!(ArrayPayload::encode(&[]).is_empty());
        assert!(ArrayPayload::decode_exact(&[], 0).unwrap().is_empty());
    }

    #[test]
    fn decode_requires_whole_elements() {
        assert_eq!(ArrayPayload::decode(&[0u8; 16]).unwrap().len(), 2);
        assert!(ArrayPayload::decode(&[0u8; 9]).is_err());
    }
}
