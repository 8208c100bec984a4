//! Content hashing for the event log, using BLAKE3 over CBOR.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

use crate::Error;

/// A 32-byte BLAKE3 digest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Hash the CBOR encoding of `value`.
    pub fn of_value<T: Serialize>(value: &T) -> Result<Self, Error> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)?;
        Ok(Self::of(&buf))
    }

    /// Lowercase hex, 64 characters.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in self.0 {
            // writing to a String cannot fail
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({}..)", &self.to_hex()[..12])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_hash_is_deterministic() {
        let a = Hash::of_value(&(1u64, "alice")).unwrap();
        let b = Hash::of_value(&(1u64, "alice")).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, Hash::of_value(&(2u64, "alice")).unwrap());
    }

    #[test]
    fn hex_is_lowercase_and_full_length() {
        let hex = Hash::of(b"ballot").to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert_eq!(Hash([0xab; 32]).to_hex(), "ab".repeat(32));
    }
}
