//! Block submission serialization
//!
//! A submitted block is `header(140) || nSolution || transactions`, where
//! `nSolution` is the 32-byte RandomX PoW hash carried in the equihash
//! solution slot, and vector lengths use Bitcoin compact-size encoding.

use crate::core::constants::{HASH_SIZE, HEADER_SIZE};
use crate::error::{Error, Result};

/// Append a Bitcoin compact-size varint.
pub fn encode_compact_size(n: u64, out: &mut Vec<u8>) {
    match n {
        0..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

/// Serialize a solved block into the hex string `submitblock` expects:
/// full header, the PoW hash as the solution vector, then the coinbase
/// and remaining transactions verbatim from the template.
pub fn serialize_block(
    header: &[u8; HEADER_SIZE],
    pow_hash: &[u8; HASH_SIZE],
    coinbase_txn_hex: &str,
    other_txn_hex: &[String],
) -> Result<String> {
    let coinbase = hex::decode(coinbase_txn_hex)
        .map_err(|e| Error::template_invalid("coinbasetxn.data", e.to_string()))?;

    let mut block = Vec::with_capacity(HEADER_SIZE + 1 + HASH_SIZE + 9 + coinbase.len());
    block.extend_from_slice(header);

    encode_compact_size(HASH_SIZE as u64, &mut block);
    block.extend_from_slice(pow_hash);

    encode_compact_size(1 + other_txn_hex.len() as u64, &mut block);
    block.extend_from_slice(&coinbase);
    for txn_hex in other_txn_hex {
        let txn = hex::decode(txn_hex)
            .map_err(|e| Error::template_invalid("transactions.data", e.to_string()))?;
        block.extend_from_slice(&txn);
    }

    Ok(hex::encode(block))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varint(n: u64) -> Vec<u8> {
        let mut out = Vec::new();
        encode_compact_size(n, &mut out);
        out
    }

    #[test]
    fn test_compact_size_one_byte() {
        assert_eq!(varint(0), vec![0x00]);
        assert_eq!(varint(0xfc), vec![0xfc]);
    }

    #[test]
    fn test_compact_size_two_byte() {
        assert_eq!(varint(0xfd), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(varint(0xffff), vec![0xfd, 0xff, 0xff]);
    }

    #[test]
    fn test_compact_size_four_byte() {
        assert_eq!(varint(0x1_0000), vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(varint(0xffff_ffff), vec![0xfe, 0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_compact_size_eight_byte() {
        assert_eq!(
            varint(0x1_0000_0000),
            vec![0xff, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_serialize_block_layout() {
        let header = [0x11u8; HEADER_SIZE];
        let pow_hash = [0x22u8; HASH_SIZE];
        let coinbase = "aabbcc";
        let txns = vec!["dd".to_string(), "eeff".to_string()];

        let hex_block = serialize_block(&header, &pow_hash, coinbase, &txns).unwrap();
        let bytes = hex::decode(&hex_block).unwrap();

        // header
        assert_eq!(&bytes[..HEADER_SIZE], &header[..]);
        // solution: varint(32) then the hash
        assert_eq!(bytes[HEADER_SIZE], 0x20);
        assert_eq!(
            &bytes[HEADER_SIZE + 1..HEADER_SIZE + 1 + HASH_SIZE],
            &pow_hash[..]
        );
        // tx count: coinbase + 2 others
        let tx_count_off = HEADER_SIZE + 1 + HASH_SIZE;
        assert_eq!(bytes[tx_count_off], 3);
        // transactions follow verbatim
        assert_eq!(
            &bytes[tx_count_off + 1..],
            &[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]
        );
    }

    #[test]
    fn test_serialize_block_rejects_bad_hex() {
        let header = [0u8; HEADER_SIZE];
        let pow_hash = [0u8; HASH_SIZE];
        assert!(serialize_block(&header, &pow_hash, "not-hex", &[]).is_err());
        assert!(
            serialize_block(&header, &pow_hash, "aa", &["xyz".to_string()]).is_err()
        );
    }
}
