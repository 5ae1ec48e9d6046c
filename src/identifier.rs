//! Content identifier module
//!
//! Wraps a CID (v0 or v1). Equality and hashing look only at the multihash, so the
//! legacy `Qm...` form and the modern `bafy...` form of the same content compare equal.

use cid::multihash::Multihash;
use cid::{Cid, Version};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Multicodec for dag-pb nodes (directories, and every CIDv0)
pub const DAG_PB: u64 = 0x70;
/// Multicodec for raw leaves (CIDv1 files)
pub const RAW: u64 = 0x55;
/// Multihash code for SHA2-256
pub const SHA2_256: u64 = 0x12;

/// Identifier encoding version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CidVersion {
    /// Legacy base58btc `Qm...` form
    V0,
    /// Modern multibase form
    #[default]
    V1,
}

/// Failure to parse a content identifier
#[derive(Debug, thiserror::Error)]
#[error("invalid content identifier '{input}': {reason}")]
pub struct ParseIdentifierError {
    pub input: String,
    pub reason: String,
}

/// Immutable handle naming a content-addressed object
#[derive(Clone, Copy)]
pub struct ContentIdentifier {
    cid: Cid,
}

impl ContentIdentifier {
    /// Build an identifier from a SHA2-256 digest.
    ///
    /// V0 is only expressible for dag-pb content; raw content asked for as V0 is
    /// still addressed by the same multihash, under a dag-pb v0 CID.
    pub fn from_sha256(digest: &[u8; 32], codec: u64, version: CidVersion) -> Self {
        // A 32-byte digest always fits a 64-byte multihash
        let hash = Multihash::<64>::wrap(SHA2_256, digest)
            .unwrap_or_else(|_| unreachable!("32-byte digest exceeds multihash capacity"));
        let cid = match version {
            CidVersion::V0 => Cid::new_v0(hash).unwrap_or_else(|_| Cid::new_v1(codec, hash)),
            CidVersion::V1 => Cid::new_v1(codec, hash),
        };
        Self { cid }
    }

    pub fn version(&self) -> CidVersion {
        match self.cid.version() {
            Version::V0 => CidVersion::V0,
            Version::V1 => CidVersion::V1,
        }
    }

    pub fn codec(&self) -> u64 {
        self.cid.codec()
    }

    /// Raw multihash bytes, the version-independent content key
    pub fn content_key(&self) -> Vec<u8> {
        self.cid.hash().to_bytes()
    }

    /// Same content, expressed as CIDv1
    pub fn to_v1(&self) -> Self {
        Self {
            cid: Cid::new_v1(self.cid.codec(), *self.cid.hash()),
        }
    }

    /// Fixed-codec CIDv1 form, equal for every spelling of the same multihash
    ///
    /// Unlike [`Self::to_v1`], the codec is dropped too, so a raw CIDv1 and the
    /// dag-pb CIDv0 of one file print the same.
    pub fn canonical(&self) -> Self {
        Self {
            cid: Cid::new_v1(RAW, *self.cid.hash()),
        }
    }

    /// Same content, expressed as CIDv0 when the hash allows it
    pub fn to_v0(&self) -> Option<Self> {
        Cid::new_v0(*self.cid.hash()).ok().map(|cid| Self { cid })
    }
}

impl FromStr for ContentIdentifier {
    type Err = ParseIdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseIdentifierError {
                input: String::new(),
                reason: "identifier is empty".to_string(),
            });
        }
        Cid::try_from(s)
            .map(|cid| Self { cid })
            .map_err(|e| ParseIdentifierError {
                input: s.to_string(),
                reason: e.to_string(),
            })
    }
}

impl PartialEq for ContentIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.cid.hash() == other.cid.hash()
    }
}

impl Eq for ContentIdentifier {}

impl Hash for ContentIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cid.hash().hash(state);
    }
}

impl fmt::Display for ContentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cid)
    }
}

impl fmt::Debug for ContentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentIdentifier({})", self.cid)
    }
}
