//! Primitive value types shared by every contract
//!
//! Addresses are 20 bytes and identifiers are 32-byte keccak digests. Both
//! serialize as `0x`-prefixed hex strings so they can be used as JSON map keys
//! in persisted world state.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

use crate::error::{DaoError, Result};

/// Token quantity in base units (18 decimals)
pub type Amount = u128;

/// One whole token in base units
pub const UNIT: Amount = 1_000_000_000_000_000_000;

/// Block height
pub type BlockNumber = u64;

/// Seconds since the unix epoch
pub type Timestamp = u64;

fn decode_hex<const N: usize>(s: &str) -> Result<[u8; N]> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(trimmed)
        .map_err(|e| DaoError::InvalidParameter(format!("invalid hex {s:?}: {e}")))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        DaoError::InvalidParameter(format!("expected {} bytes, got {}", N, b.len()))
    })
}

macro_rules! hex_newtype {
    ($name:ident, $len:expr) => {
        impl $name {
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = DaoError;

            fn from_str(s: &str) -> Result<Self> {
                decode_hex::<{ $len }>(s).map($name)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

/// 20-byte account or contract address
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; 20]);

hex_newtype!(Address, 20);

impl Address {
    /// Sentinel for "nobody": unset delegates, disabled recipients, and the
    /// wildcard executor identity.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Fixed burn sink `0x000000000000000000000000000000000000dEaD`
    pub const BURN: Address = Address([
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xde, 0xad,
    ]);

    /// Last 20 bytes of a 32-byte digest
    pub fn from_digest(digest: &H256) -> Self {
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest.0[12..]);
        Address(out)
    }

    /// Deterministic address for a human-readable label (tests, fixtures)
    pub fn from_label(label: &str) -> Self {
        Self::from_digest(&keccak256(label.as_bytes()))
    }

    /// Contract address created by `deployer` with the given deployment nonce
    pub fn derive_contract(deployer: Address, nonce: u64) -> Self {
        Self::from_digest(&keccak_concat(&[&deployer.0, &nonce.to_be_bytes()]))
    }
}

/// 32-byte identifier (proposal ids, operation ids, digests)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct H256(pub [u8; 32]);

hex_newtype!(H256, 32);

impl H256 {
    pub const ZERO: H256 = H256([0u8; 32]);

    /// Left-aligned copy of an address XORed into this value
    pub fn xor_address(&self, address: Address) -> H256 {
        let mut out = self.0;
        for (i, b) in address.0.iter().enumerate() {
            out[i] ^= b;
        }
        H256(out)
    }
}

/// Keccak-256 digest of `data`
pub fn keccak256(data: &[u8]) -> H256 {
    keccak_concat(&[data])
}

/// Keccak-256 digest of the concatenation of `parts`
pub fn keccak_concat(parts: &[&[u8]]) -> H256 {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    H256(out)
}

/// Amount as a 32-byte big-endian word
pub fn amount_word(amount: Amount) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[16..].copy_from_slice(&amount.to_be_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burn_address_display() {
        assert_eq!(
            Address::BURN.to_string(),
            "0x000000000000000000000000000000000000dead"
        );
        assert!(!Address::BURN.is_zero());
        assert!(Address::ZERO.is_zero());
    }

    #[test]
    fn test_address_parse_roundtrip() {
        let addr = Address::from_label("alice");
        let parsed: Address = addr.to_string().parse().unwrap();
        assert_eq!(addr, parsed);

        let unprefixed: Address = "000000000000000000000000000000000000dEaD".parse().unwrap();
        assert_eq!(unprefixed, Address::BURN);
    }

    #[test]
    fn test_address_parse_rejects_bad_length() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("not hex".parse::<Address>().is_err());
    }

    #[test]
    fn test_labels_are_distinct() {
        assert_ne!(Address::from_label("alice"), Address::from_label("bob"));
        assert_eq!(Address::from_label("alice"), Address::from_label("alice"));
    }

    #[test]
    fn test_contract_addresses_depend_on_nonce() {
        let deployer = Address::from_label("deployer");
        assert_ne!(
            Address::derive_contract(deployer, 0),
            Address::derive_contract(deployer, 1)
        );
    }

    #[test]
    fn test_keccak_known_vector() {
        // keccak256("") as used by Ethereum
        assert_eq!(
            keccak256(b"").to_hex(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_address_as_json_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(Address::BURN, 7u64);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"0x000000000000000000000000000000000000dead":7}"#);
        let back: std::collections::BTreeMap<Address, u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[&Address::BURN], 7);
    }

    #[test]
    fn test_xor_address_is_involution() {
        let h = keccak256(b"description");
        let a = Address::from_label("governor");
        assert_eq!(h.xor_address(a).xor_address(a), h);
        assert_ne!(h.xor_address(a), h);
    }
}
