//! Block template parsing and header assembly
//!
//! Converts a `getblocktemplate` reply into a [`BlockTemplate`] holding the
//! 108-byte serialized header prefix. The trailing 32-byte nonce is kept
//! separate and only combined via [`BlockTemplate::full_header`]; workers
//! never share a mutable header buffer.
//!
//! Header prefix layout (all multi-byte scalars little-endian, all hashes
//! in internal byte order):
//!
//! ```text
//! offset   0  version (4)
//! offset   4  previous block hash (32)
//! offset  36  merkle root (32)
//! offset  68  block commitments hash (32)
//! offset 100  time (4)
//! offset 104  bits (4)
//! ```
//!
//! The RPC returns `previousblockhash`, `merkleroot` and
//! `blockcommitmentshash` in display order (byte-reversed) and
//! `randomxseedhash` in internal order. Getting this wrong produces
//! headers that hash to garbage, so the constructors on [`Hash256`] are
//! the only way bytes enter this module.

use crate::core::constants::{HEADER_PREFIX_SIZE, HEADER_SIZE, NONCE_OFFSET};
use crate::core::{Hash256, Nonce256, Target};
use crate::error::{Error, Result};
use serde_json::Value;

/// Parsed block template, immutable for the duration of one mining session
#[derive(Clone, Debug)]
pub struct BlockTemplate {
    pub version: u32,
    pub previous_block_hash: Hash256,
    pub merkle_root: Hash256,
    pub block_commitments: Hash256,
    pub time: u32,
    pub bits: u32,
    pub target: Target,
    pub height: u32,
    pub seed_height: u64,
    pub seed_hash: Hash256,
    pub next_seed_hash: Option<Hash256>,
    /// Serialized header without the nonce, ready for hashing
    pub header_prefix: [u8; HEADER_PREFIX_SIZE],
    pub coinbase_txn_hex: String,
    pub other_txn_hex: Vec<String>,
}

impl BlockTemplate {
    /// Parse the result object of a `getblocktemplate` call.
    pub fn from_rpc(template: &Value) -> Result<Self> {
        let version = required_u64(template, "version")? as u32;

        let previous_block_hash =
            hash_field(template, "previousblockhash", ByteOrder::Display)?;

        let time = required_u64(template, "curtime")? as u32;

        // `bits` arrives as a big-endian hex string.
        let bits_str = required_str(template, "bits")?;
        let bits = u32::from_str_radix(bits_str, 16)
            .map_err(|e| Error::template_invalid("bits", e.to_string()))?;
        let target = Target::from_compact(bits)?;

        let height = required_u64(template, "height")? as u32;
        let seed_height = required_u64(template, "randomxseedheight")?;
        let seed_hash = hash_field(template, "randomxseedhash", ByteOrder::Internal)?;

        let next_seed_hash = match template.get("randomxnextseedhash") {
            Some(Value::String(s)) if s.len() == 64 => {
                Some(Hash256::from_internal_hex(s)?)
            }
            _ => None,
        };

        // Merkle root and commitments live under `defaultroots`; the
        // commitments hash also appears at top level on older nodes.
        let roots = template.get("defaultroots");
        let merkle_root = match roots.and_then(|r| r.get("merkleroot")) {
            Some(Value::String(s)) => Hash256::from_display_hex(s)
                .map_err(|e| Error::template_invalid("defaultroots.merkleroot", e.to_string()))?,
            _ => return Err(Error::template_missing("defaultroots.merkleroot")),
        };
        let commitments_str = roots
            .and_then(|r| r.get("blockcommitmentshash"))
            .or_else(|| template.get("blockcommitmentshash"));
        let block_commitments = match commitments_str {
            Some(Value::String(s)) => Hash256::from_display_hex(s)
                .map_err(|e| Error::template_invalid("blockcommitmentshash", e.to_string()))?,
            _ => return Err(Error::template_missing("blockcommitmentshash")),
        };

        let coinbase_txn_hex = match template
            .get("coinbasetxn")
            .and_then(|c| c.get("data"))
        {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(Error::template_missing("coinbasetxn.data")),
        };

        let mut other_txn_hex = Vec::new();
        if let Some(Value::Array(txns)) = template.get("transactions") {
            for txn in txns {
                if let Some(Value::String(data)) = txn.get("data") {
                    other_txn_hex.push(data.clone());
                }
            }
        }

        let header_prefix = build_header_prefix(
            version,
            &previous_block_hash,
            &merkle_root,
            &block_commitments,
            time,
            bits,
        );

        Ok(Self {
            version,
            previous_block_hash,
            merkle_root,
            block_commitments,
            time,
            bits,
            target,
            height,
            seed_height,
            seed_hash,
            next_seed_hash,
            header_prefix,
            coinbase_txn_hex,
            other_txn_hex,
        })
    }

    /// Assemble the full 140-byte header from the prefix and a nonce.
    pub fn full_header(&self, nonce: &Nonce256) -> [u8; HEADER_SIZE] {
        let mut header = [0u8; HEADER_SIZE];
        header[..HEADER_PREFIX_SIZE].copy_from_slice(&self.header_prefix);
        header[NONCE_OFFSET..].copy_from_slice(nonce.as_bytes());
        header
    }
}

/// Hex byte-order of a template hash field
enum ByteOrder {
    Display,
    Internal,
}

fn hash_field(template: &Value, field: &'static str, order: ByteOrder) -> Result<Hash256> {
    let s = required_str(template, field)?;
    let parsed = match order {
        ByteOrder::Display => Hash256::from_display_hex(s),
        ByteOrder::Internal => Hash256::from_internal_hex(s),
    };
    parsed.map_err(|e| Error::template_invalid(field, e.to_string()))
}

fn required_str<'a>(template: &'a Value, field: &'static str) -> Result<&'a str> {
    template
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::template_missing(field))
}

fn required_u64(template: &Value, field: &'static str) -> Result<u64> {
    template
        .get(field)
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::template_missing(field))
}

fn build_header_prefix(
    version: u32,
    prev: &Hash256,
    merkle: &Hash256,
    commitments: &Hash256,
    time: u32,
    bits: u32,
) -> [u8; HEADER_PREFIX_SIZE] {
    let mut prefix = [0u8; HEADER_PREFIX_SIZE];
    prefix[0..4].copy_from_slice(&version.to_le_bytes());
    prefix[4..36].copy_from_slice(prev.as_bytes());
    prefix[36..68].copy_from_slice(merkle.as_bytes());
    prefix[68..100].copy_from_slice(commitments.as_bytes());
    prefix[100..104].copy_from_slice(&time.to_le_bytes());
    prefix[104..108].copy_from_slice(&bits.to_le_bytes());
    prefix
}
