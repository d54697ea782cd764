//! 256-bit hash values with explicit byte-order constructors
//!
//! Hex strings for block hashes come in two orderings: *display* order
//! (byte-reversed, as printed by block explorers and most RPC fields) and
//! *internal* order (as the bytes are stored and serialized). Mixing them
//! up is the single most common mining bug, so this type only offers named
//! constructors and never converts implicitly.

use crate::error::{Error, Result, TemplateError};
use std::fmt;

/// A 32-byte hash stored in internal (serialization) byte order
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash256([u8; 32]);

impl Hash256 {
    /// Wrap bytes already in internal order
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a display-order hex string (e.g. `previousblockhash` from
    /// `getblocktemplate`), reversing into internal order.
    pub fn from_display_hex(hex_str: &str) -> Result<Self> {
        let mut bytes = decode_exact(hex_str)?;
        bytes.reverse();
        Ok(Self(bytes))
    }

    /// Parse an internal-order hex string (e.g. `randomxseedhash`) without
    /// reversing.
    pub fn from_internal_hex(hex_str: &str) -> Result<Self> {
        Ok(Self(decode_exact(hex_str)?))
    }

    /// The bytes in internal order
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex in display order (byte-reversed), as block hashes are shown
    pub fn to_display_hex(&self) -> String {
        let mut reversed = self.0;
        reversed.reverse();
        hex::encode(reversed)
    }

    /// Hex in internal order
    pub fn to_internal_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short display-order suffix used in status lines (last 4 bytes of the
    /// internal representation, as the daemon prints the epoch tag)
    pub fn short_tag(&self) -> String {
        hex::encode(&self.0[28..])
    }
}

fn decode_exact(hex_str: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(hex_str)
        .map_err(|e| Error::Template(TemplateError::InvalidHash(e.to_string())))?;
    let array: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
        Error::Template(TemplateError::InvalidHash(format!(
            "expected 32 bytes, got {}",
            v.len()
        )))
    })?;
    Ok(array)
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self.to_display_hex())
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_hex())
    }
}
