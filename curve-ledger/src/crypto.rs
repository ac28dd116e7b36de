//! Hashing for blocks
//!
//! A block digest is SHA-256 over the decimal `index`, `timestamp`, the
//! `previous_hash` string and `nonce`, followed by the transaction's
//! canonical JSON. Output is lowercase hex.

use crate::types::{Block, Hash, Timestamp, Transaction};
use crate::{Error, Result};
use sha2::{Digest, Sha256};

/// Compute the digest sealing a block over its transaction
pub fn hash_block(
    index: u64,
    timestamp: Timestamp,
    previous_hash: &Hash,
    nonce: u64,
    transaction: &Transaction,
) -> Result<Hash> {
    let payload = transaction
        .canonical_bytes()
        .map_err(|e| Error::Hashing(format!("Failed to serialize transaction: {}", e)))?;

    let mut preimage = format!("{}{}{}{}", index, timestamp, previous_hash, nonce).into_bytes();
    preimage.extend_from_slice(&payload);

    Ok(Hash::from_hex(hex::encode(hash_bytes(&preimage))))
}

/// Recompute the digest of a stored block
pub fn rehash(block: &Block, transaction: &Transaction) -> Result<Hash> {
    hash_block(
        block.index,
        block.timestamp,
        &block.previous_hash,
        block.nonce,
        transaction,
    )
}

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn sample_tx() -> Transaction {
        Transaction::new("alice", "bob", Decimal::from(40))
    }

    #[test]
    fn test_hash_is_deterministic() {
        let tx = sample_tx();
        let parent = Hash::from_hex("00abc");
        let h1 = hash_block(3, 1_700_000_000_000, &parent, 42, &tx).unwrap();
        let h2 = hash_block(3, 1_700_000_000_000, &parent, 42, &tx).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let h = hash_block(0, 0, &Hash::genesis_parent(), 0, &Transaction::genesis()).unwrap();
        assert_eq!(h.as_str().len(), 64);
        assert!(h.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_hash_matches_manual_concatenation() {
        let tx = sample_tx();
        let parent = Hash::from_hex("0");
        let expected = {
            let mut data = b"1".to_vec();
            data.extend_from_slice(b"1000");
            data.extend_from_slice(b"0");
            data.extend_from_slice(b"5");
            data.extend_from_slice(&tx.canonical_bytes().unwrap());
            hex::encode(hash_bytes(&data))
        };
        let h = hash_block(1, 1000, &parent, 5, &tx).unwrap();
        assert_eq!(h.as_str(), expected);
    }

    #[test]
    fn test_every_field_affects_hash() {
        let tx = sample_tx();
        let parent = Hash::from_hex("00abc");
        let base = hash_block(1, 10, &parent, 1, &tx).unwrap();

        assert_ne!(base, hash_block(2, 10, &parent, 1, &tx).unwrap());
        assert_ne!(base, hash_block(1, 11, &parent, 1, &tx).unwrap());
        assert_ne!(base, hash_block(1, 10, &Hash::from_hex("00abd"), 1, &tx).unwrap());
        assert_ne!(base, hash_block(1, 10, &parent, 2, &tx).unwrap());

        let other = Transaction::new("alice", "bob", Decimal::from(41));
        assert_ne!(base, hash_block(1, 10, &parent, 1, &other).unwrap());
    }

    #[test]
    fn test_equal_amounts_hash_equally() {
        let parent = Hash::genesis_parent();
        let whole = Transaction::new("alice", "bob", Decimal::from(40));
        let scaled = Transaction::new("alice", "bob", Decimal::new(4000, 2));
        assert_eq!(
            hash_block(1, 1, &parent, 0, &whole).unwrap(),
            hash_block(1, 1, &parent, 0, &scaled).unwrap()
        );
    }

    #[test]
    fn test_hash_bytes() {
        let data = b"test data";
        assert_eq!(hash_bytes(data), hash_bytes(data));
        assert_ne!(hash_bytes(data), hash_bytes(b"different data"));
    }
}
