//! Ledger data structures.

use crate::digest::Hash256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format tag carried by every block.
pub const SCHEMA: &str = "fabric-chain/1.0";

/// A file admitted into a block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileRecord {
    /// Path as given when the block was built
    pub path: String,
    /// Length of the file in bytes
    pub bytes: u64,
    /// SHA-256 of the file contents
    pub sha256: Hash256,
}

/// An Ed25519 signature over a block hash.
///
/// Key and signature lengths are checked when a record is decoded, so a
/// loaded `Signature` always has a 32-byte key and a 64-byte signature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Signature {
    /// Signer name (e.g. "alice")
    pub signer: String,
    /// Ed25519 public key of the signer
    #[serde(rename = "pubkey_b64", with = "b64_fixed")]
    pub pubkey: [u8; 32],
    /// Ed25519 signature over the raw 32 bytes of `block_hash`
    #[serde(rename = "sig_b64", with = "b64_fixed")]
    pub signature: [u8; 64],
}

impl Signature {
    pub fn pubkey_b64(&self) -> String {
        b64_fixed::encode(&self.pubkey)
    }
}

/// One ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Block {
    pub schema: String,

    /// Position in the ledger, starting at 0
    pub index: u64,

    /// Creation time, second precision
    #[serde(with = "timestamp_format")]
    pub timestamp: DateTime<Utc>,

    /// `block_hash` of the previous block; `None` for the genesis block
    pub prev_hash: Option<Hash256>,

    /// Files covered by this block, in the order they were given
    pub files: Vec<FileRecord>,

    /// Merkle root over `files[..].sha256`
    pub merkle_root: Hash256,

    #[serde(default)]
    pub notes: String,

    /// Digest of the canonical encoding of every field above
    pub block_hash: Hash256,

    #[serde(default)]
    pub signatures: Vec<Signature>,
}

impl Block {
    /// The fields covered by `block_hash`.
    pub fn unsigned(&self) -> UnsignedBlock<'_> {
        UnsignedBlock {
            schema: &self.schema,
            index: self.index,
            timestamp: self.timestamp,
            prev_hash: self.prev_hash,
            files: &self.files,
            merkle_root: self.merkle_root,
            notes: &self.notes,
        }
    }

    /// Digests of the recorded files, in block order.
    pub fn leaves(&self) -> Vec<Hash256> {
        self.files.iter().map(|f| f.sha256).collect()
    }

    /// Names of every signer on this block, in signature order.
    pub fn signers(&self) -> impl Iterator<Item = &str> {
        self.signatures.iter().map(|s| s.signer.as_str())
    }
}

/// Borrowed view of a block without `block_hash` and `signatures`.
#[derive(Debug, Clone, Serialize)]
pub struct UnsignedBlock<'a> {
    pub schema: &'a str,
    pub index: u64,
    #[serde(with = "timestamp_format")]
    pub timestamp: DateTime<Utc>,
    pub prev_hash: Option<Hash256>,
    pub files: &'a [FileRecord],
    pub merkle_root: Hash256,
    pub notes: &'a str,
}

/// `YYYY-MM-DDTHH:MM:SSZ` timestamps.
pub mod timestamp_format {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let naive = NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)?;
        Ok(Utc.from_utc_datetime(&naive))
    }
}

/// Base64 text for fixed-length byte arrays, rejecting any other length.
pub mod b64_fixed {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn encode(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    /// Decode base64 text that must hold exactly `N` bytes.
    pub fn decode<const N: usize>(text: &str) -> Result<[u8; N], String> {
        let raw = STANDARD
            .decode(text.trim())
            .map_err(|err| format!("invalid base64: {err}"))?;
        <[u8; N]>::try_from(raw.as_slice())
            .map_err(|_| format!("expected {N} bytes, got {}", raw.len()))
    }

    pub fn serialize<S, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&encode(bytes))
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn signature_json(pubkey_len: usize, sig_len: usize) -> serde_json::Value {
        json!({
            "signer": "alice",
            "pubkey_b64": b64_fixed::encode(&vec![1u8; pubkey_len]),
            "sig_b64": b64_fixed::encode(&vec![2u8; sig_len]),
        })
    }

    #[test]
    fn test_signature_decodes_fixed_lengths() {
        let sig: Signature = serde_json::from_value(signature_json(32, 64)).unwrap();
        assert_eq!(sig.signer, "alice");
        assert_eq!(sig.pubkey, [1u8; 32]);
        assert_eq!(sig.signature, [2u8; 64]);
    }

    #[test]
    fn test_signature_rejects_short_key() {
        let result: Result<Signature, _> = serde_json::from_value(signature_json(31, 64));
        assert!(result.unwrap_err().to_string().contains("expected 32 bytes"));
    }

    #[test]
    fn test_signature_rejects_long_signature() {
        let result: Result<Signature, _> = serde_json::from_value(signature_json(32, 65));
        assert!(result.unwrap_err().to_string().contains("expected 64 bytes"));
    }

    #[test]
    fn test_signature_rejects_bad_base64() {
        let mut value = signature_json(32, 64);
        value["sig_b64"] = json!("not base64!");
        assert!(serde_json::from_value::<Signature>(value).is_err());
    }

    #[test]
    fn test_timestamp_format() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        let json = json!({"t": "2025-03-04T05:06:07Z"});

        #[derive(Deserialize, Serialize)]
        struct Wrapper {
            #[serde(with = "timestamp_format")]
            t: DateTime<Utc>,
        }
        let parsed: Wrapper = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(parsed.t, ts);
        assert_eq!(serde_json::to_value(&parsed).unwrap(), json);
    }

    #[test]
    fn test_timestamp_rejects_fractional_seconds() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(with = "timestamp_format")]
            #[allow(dead_code)]
            t: DateTime<Utc>,
        }
        let result: Result<Wrapper, _> =
            serde_json::from_value(json!({"t": "2025-03-04T05:06:07.5Z"}));
        assert!(result.is_err());
    }
}
