//! Core types for block headers, targets and nonces
//!
//! Everything in this module is pure byte manipulation: no I/O, no FFI.
//! The byte-order rules live here and nowhere else.

mod block;
mod hash;
mod nonce;
mod target;
mod template;

pub use block::{encode_compact_size, serialize_block};
pub use hash::Hash256;
pub use nonce::Nonce256;
pub use target::Target;
pub use template::BlockTemplate;

/// Sizes and offsets of the serialized block header
pub mod constants {
    /// Full header size: prefix + nonce
    pub const HEADER_SIZE: usize = 140;

    /// Header prefix: version(4) + prev(32) + merkle(32) + commitments(32)
    /// + time(4) + bits(4)
    pub const HEADER_PREFIX_SIZE: usize = 108;

    /// Byte offset of the nonce within the full header
    pub const NONCE_OFFSET: usize = HEADER_PREFIX_SIZE;

    /// Size of the 256-bit nonce in bytes
    pub const NONCE_SIZE: usize = 32;

    /// Size of a RandomX hash in bytes
    pub const HASH_SIZE: usize = 32;

    /// Size of the difficulty target in bytes
    pub const TARGET_SIZE: usize = 32;

    /// Size of the RandomX seed hash in bytes
    pub const SEED_SIZE: usize = 32;
}

/// Blocks per RandomX epoch (power of two, matches the daemon)
pub const EPOCH_BLOCKS: u64 = 2048;

/// Blocks of lag before a new seed takes effect
pub const EPOCH_LAG: u64 = 96;

/// Height of the block whose hash seeds RandomX for block `height`.
///
/// Matches the daemon: zero until the first epoch boundary plus lag has
/// passed, then rounded down to the previous epoch boundary.
pub fn seed_height(height: u64) -> u64 {
    if height <= EPOCH_BLOCKS + EPOCH_LAG {
        0
    } else {
        (height - EPOCH_LAG - 1) & !(EPOCH_BLOCKS - 1)
    }
}

/// One-based epoch number for display
pub fn epoch_number(seed_height: u64) -> u64 {
    seed_height / EPOCH_BLOCKS + 1
}
