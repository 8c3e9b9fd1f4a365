use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// The only digest algorithm ModelVault produces or accepts.
pub const SHA256: &str = "sha256";

/// Content identifier for a blob: `sha256:<64 lowercase hex characters>`.
///
/// Identical content always produces the same `Digest`, so blobs referenced by
/// several manifests are stored once. On the wire a digest is a plain string;
/// on disk the `:` separator is replaced by `-` (see [`Digest::blob_file_name`]).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Wrap a raw SHA-256 output.
    pub fn from_sha256(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// Parse the `sha256:<hex>` form.
    ///
    /// The `sha256-<hex>` blob file form is accepted as well so that names
    /// read back from a blob directory parse without rewriting.
    ///
    /// ```
    /// use mvault_types::Digest;
    ///
    /// let hex = "ab".repeat(32);
    /// let digest = Digest::parse(&format!("sha256:{hex}")).unwrap();
    /// assert_eq!(digest.hex(), hex);
    /// assert!(Digest::parse("md5:abc").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidDigest {
            digest: s.to_string(),
            reason: reason.into(),
        };

        let (algorithm, hex_part) = s
            .split_once(':')
            .or_else(|| s.split_once('-'))
            .ok_or_else(|| invalid("missing algorithm separator"))?;
        if algorithm != SHA256 {
            return Err(invalid("unsupported algorithm"));
        }
        if hex_part.len() != 64 {
            return Err(invalid("expected 64 hex characters"));
        }
        if hex_part.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(invalid("hex must be lowercase"));
        }
        Self::from_hex(hex_part)
    }

    /// Parse a bare 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded hash without the algorithm prefix.
    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }

    /// File name used for the blob in a blob directory (`sha256-<hex>`).
    pub fn blob_file_name(&self) -> String {
        format!("{SHA256}-{}", self.hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({SHA256}:{})", hex::encode(&self.0[..6]))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SHA256}:{}", self.hex())
    }
}

impl FromStr for Digest {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
