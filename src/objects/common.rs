//! Common types shared across Metalink objects.
//!
//! This module contains the verification types attached to a file entry:
//! - [`HashType`] - Known digest algorithms
//! - [`Checksum`] - A whole-file digest
//! - [`PieceHashList`] - Per-piece digests with a declared piece length
//! - [`Signature`] - A detached signature over the file
//!
//! It also parses the publication dates found on the document element.

use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Metalink Namespaces
// ============================================================================

/// Metalink 3.0 namespace
pub const XMLNS_METALINK_V3: &str = "http://www.metalinker.org/";

/// Metalink 4 (RFC 5854) namespace
pub const XMLNS_METALINK_V4: &str = "urn:ietf:params:xml:ns:metalink";

// ============================================================================
// Hash Types
// ============================================================================

/// Digest algorithms a Metalink document can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HashType {
    /// MD5 (128-bit)
    Md5,
    /// SHA-1 (160-bit)
    Sha1,
    /// SHA-224 (224-bit)
    Sha224,
    /// SHA-256 (256-bit)
    Sha256,
    /// SHA-384 (384-bit)
    Sha384,
    /// SHA-512 (512-bit)
    Sha512,
}

impl HashType {
    /// Returns the expected length of the digest in hexadecimal characters.
    pub fn expected_hex_len(&self) -> usize {
        match self {
            HashType::Md5 => 32,
            HashType::Sha1 => 40,
            HashType::Sha224 => 56,
            HashType::Sha256 => 64,
            HashType::Sha384 => 96,
            HashType::Sha512 => 128,
        }
    }

    /// Returns the IANA hash function text name used by Metalink.
    pub fn as_str(&self) -> &'static str {
        match self {
            HashType::Md5 => "md5",
            HashType::Sha1 => "sha-1",
            HashType::Sha224 => "sha-224",
            HashType::Sha256 => "sha-256",
            HashType::Sha384 => "sha-384",
            HashType::Sha512 => "sha-512",
        }
    }
}

impl FromStr for HashType {
    type Err = Error;

    /// Accepts both the IANA names ("sha-256") and the dashless
    /// spelling Metalink 3 generators often emit ("sha256").
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "md5" => Ok(HashType::Md5),
            "sha-1" | "sha1" => Ok(HashType::Sha1),
            "sha-224" | "sha224" => Ok(HashType::Sha224),
            "sha-256" | "sha256" => Ok(HashType::Sha256),
            "sha-384" | "sha384" => Ok(HashType::Sha384),
            "sha-512" | "sha512" => Ok(HashType::Sha512),
            _ => Err(Error::grammar(format!("unknown hash type: {}", s))),
        }
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Verification Objects
// ============================================================================

/// A whole-file digest.
///
/// The algorithm is kept exactly as the document spelled it; the digest is
/// stored as a lowercase hexadecimal string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Checksum {
    /// Algorithm name as written in the `type` attribute
    pub algorithm: String,
    /// Hex digest
    pub digest: String,
}

impl Checksum {
    /// Creates a checksum, normalizing the digest to lowercase.
    pub fn new(algorithm: impl Into<String>, digest: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            digest: digest.into().to_lowercase(),
        }
    }

    /// Returns the algorithm as a known [`HashType`], if recognized.
    pub fn hash_type(&self) -> Option<HashType> {
        self.algorithm.parse().ok()
    }

    /// Returns false if the digest length does not fit the algorithm.
    ///
    /// Digests of unrecognized algorithms are never flagged.
    pub fn has_expected_length(&self) -> bool {
        self.hash_type()
            .map_or(true, |t| self.digest.len() == t.expected_hex_len())
    }
}

/// Per-piece digests for a file, in piece order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PieceHashList {
    /// Declared piece length in bytes
    pub length: u64,
    /// Algorithm name as written in the `type` attribute
    pub algorithm: String,
    /// Lowercase hex digests, one per piece
    pub hashes: Vec<String>,
}

impl PieceHashList {
    /// Creates an empty piece list.
    pub fn new(length: u64, algorithm: impl Into<String>) -> Self {
        Self {
            length,
            algorithm: algorithm.into(),
            hashes: Vec::new(),
        }
    }

    /// Appends the digest of the next piece.
    pub fn push(&mut self, digest: impl Into<String>) {
        self.hashes.push(digest.into().to_lowercase());
    }

    /// Returns the number of pieces.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Returns true if no piece digests were listed.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Returns the algorithm as a known [`HashType`], if recognized.
    pub fn hash_type(&self) -> Option<HashType> {
        self.algorithm.parse().ok()
    }
}

/// A detached signature over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Signature {
    /// Signature type ("pgp") or media type ("application/pgp-signature")
    pub signature_type: String,
    /// Name of the signature file, when given
    pub file: Option<String>,
    /// The signature body
    pub body: String,
}

impl Signature {
    /// Creates a signature with an empty body.
    pub fn new(signature_type: impl Into<String>) -> Self {
        Self {
            signature_type: signature_type.into(),
            file: None,
            body: String::new(),
        }
    }
}

// ============================================================================
// Dates
// ============================================================================

/// Parses a publication date.
///
/// Metalink 4 uses RFC 3339 in `<published>`, Metalink 3 uses RFC 822 in
/// the `pubdate` attribute. Both are accepted either way; a date with no
/// offset is taken as UTC.
pub fn parse_published(s: &str) -> Result<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Ok(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive).fixed_offset());
    }

    Err(Error::grammar(format!("cannot parse date: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_type_names() {
        assert_eq!("sha-1".parse::<HashType>().unwrap(), HashType::Sha1);
        assert_eq!("SHA256".parse::<HashType>().unwrap(), HashType::Sha256);
        assert_eq!("md5".parse::<HashType>().unwrap(), HashType::Md5);
        assert!("crc32".parse::<HashType>().is_err());
        assert_eq!(HashType::Sha512.to_string(), "sha-512");
        assert_eq!(HashType::Sha1.expected_hex_len(), 40);
    }

    #[test]
    fn test_checksum_normalizes_digest() {
        let checksum = Checksum::new("sha-1", "ABCD1234");
        assert_eq!(checksum.digest, "abcd1234");
        assert_eq!(checksum.algorithm, "sha-1");
        assert_eq!(checksum.hash_type(), Some(HashType::Sha1));

        let unknown = Checksum::new("tiger", "00");
        assert_eq!(unknown.hash_type(), None);
    }

    #[test]
    fn test_checksum_length() {
        let sha1 = Checksum::new("sha1", "9ab1d2c4a16a1f8f7b13bde3e2bc1d0f2f6e0a24");
        assert!(sha1.has_expected_length());
        assert!(!Checksum::new("sha-1", "abcd1234").has_expected_length());
        assert!(!Checksum::new("md5", "9ab1d2c4a16a1f8f7b13bde3e2bc1d0f2f6e0a24").has_expected_length());
        assert!(Checksum::new("tiger", "00").has_expected_length());
    }

    #[test]
    fn test_piece_hash_list() {
        let mut pieces = PieceHashList::new(262144, "sha1");
        assert!(pieces.is_empty());
        pieces.push("AA");
        pieces.push("bb");
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces.hashes, vec!["aa", "bb"]);
        assert_eq!(pieces.hash_type(), Some(HashType::Sha1));
    }

    #[test]
    fn test_parse_published() {
        let v4 = parse_published("2009-05-15T12:23:23Z").unwrap();
        assert_eq!(v4.timestamp(), 1242390203);

        let v3 = parse_published("Fri, 15 May 2009 12:23:23 +0000").unwrap();
        assert_eq!(v3, v4);

        let naive = parse_published("2009-05-15T12:23:23").unwrap();
        assert_eq!(naive, v4);

        assert!(parse_published("last tuesday").is_err());
    }
}
