//! 256-bit nonce for the header tail
//!
//! The nonce occupies header bytes 108..140 and is treated as a 256-bit
//! little-endian integer. Each worker seeds its own nonce from the OS RNG
//! and then counts upward; see [`Nonce256::random`] for the bit layout.

use crate::core::constants::NONCE_SIZE;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;

/// A 256-bit little-endian nonce
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Nonce256([u8; NONCE_SIZE]);

impl Nonce256 {
    /// The all-zero nonce
    pub const fn zero() -> Self {
        Self([0u8; NONCE_SIZE])
    }

    /// Wrap raw little-endian bytes
    pub const fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Draw a fresh starting nonce from the OS RNG, then clear bytes 0..2
    /// and 30..32, matching the daemon's internal miner (`nonce <<= 32;
    /// nonce >>= 16`). The low two bytes become per-worker counter space
    /// and the top two are reserved for protocol fields; 224 random bits
    /// remain, so cross-worker collisions are negligible.
    pub fn random() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut bytes);
        bytes[0] = 0;
        bytes[1] = 0;
        bytes[30] = 0;
        bytes[31] = 0;
        Self(bytes)
    }

    /// Parse a display-order hex string (as returned by `getblock`),
    /// reversing into the little-endian storage order.
    pub fn from_display_hex(hex_str: &str) -> Option<Self> {
        let bytes = hex::decode(hex_str).ok()?;
        let mut array: [u8; NONCE_SIZE] = bytes.try_into().ok()?;
        array.reverse();
        Some(Self(array))
    }

    /// The little-endian bytes
    pub const fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }

    /// Increment as a 256-bit little-endian integer, propagating carry.
    /// Wraps on full overflow.
    pub fn increment(&mut self) {
        for byte in self.0.iter_mut() {
            let (next, carry) = byte.overflowing_add(1);
            *byte = next;
            if !carry {
                return;
            }
        }
    }
}

impl Default for Nonce256 {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Debug for Nonce256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        write!(f, "Nonce256({})", hex::encode(reversed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_no_carry() {
        let mut n = Nonce256::zero();
        n.increment();
        assert_eq!(n.as_bytes()[0], 1);
        assert_eq!(&n.as_bytes()[1..], &[0u8; 31][..]);
    }

    #[test]
    fn test_increment_carry_propagation() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xff;
        bytes[1] = 0xff;
        let mut n = Nonce256::from_bytes(bytes);
        n.increment();
        assert_eq!(n.as_bytes()[0], 0);
        assert_eq!(n.as_bytes()[1], 0);
        assert_eq!(n.as_bytes()[2], 1);
    }

    #[test]
    fn test_increment_full_overflow_wraps() {
        let mut n = Nonce256::from_bytes([0xff; 32]);
        n.increment();
        assert_eq!(n, Nonce256::zero());
    }

    #[test]
    fn test_random_clears_reserved_bytes() {
        for _ in 0..16 {
            let n = Nonce256::random();
            assert_eq!(n.as_bytes()[0], 0);
            assert_eq!(n.as_bytes()[1], 0);
            assert_eq!(n.as_bytes()[30], 0);
            assert_eq!(n.as_bytes()[31], 0);
        }
    }

    #[test]
    fn test_random_nonces_are_distinct() {
        // 224 random bits: two draws colliding would indicate a broken RNG.
        let a = Nonce256::random();
        let b = Nonce256::random();
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_display_hex_reverses() {
        let hex_str = "00004b208177028c86cd2875902953277897cebc15806b139d16c180b25a1262";
        let n = Nonce256::from_display_hex(hex_str).unwrap();
        // Last display byte becomes the first little-endian byte.
        assert_eq!(n.as_bytes()[0], 0x62);
        assert_eq!(n.as_bytes()[31], 0x00);
    }
}
