//! MetalinkEntry - one downloadable file described by the document.
//!
//! An entry carries the file's identity (name, size, version, language,
//! OS), where to get it (resources), and how to check it (checksums,
//! piece hashes, signature).

use crate::objects::common::{Checksum, HashType, PieceHashList, Signature};
use crate::objects::resource::{Resource, ResourceType};

/// A single `<file>` of a Metalink document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetalinkEntry {
    /// File name from the `name` attribute
    pub filename: String,
    /// Total size in bytes
    pub size: Option<u64>,
    /// File version
    pub version: Option<String>,
    /// Language of the file content
    pub language: Option<String>,
    /// Operating system the file targets
    pub os: Option<String>,
    /// Connection limit for the whole file
    pub max_connections: Option<u32>,
    /// Mirrors in document order
    pub resources: Vec<Resource>,
    /// Whole-file digests
    pub checksums: Vec<Checksum>,
    /// Per-piece digests
    pub piece_hashes: Option<PieceHashList>,
    /// Detached signature
    pub signature: Option<Signature>,
}

impl MetalinkEntry {
    /// Creates an entry with a filename.
    pub fn with_filename(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }

    /// Appends a resource.
    pub fn add_resource(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    /// Appends a checksum.
    pub fn add_checksum(&mut self, checksum: Checksum) {
        self.checksums.push(checksum);
    }

    /// Returns the checksum for a given algorithm, if listed.
    pub fn checksum(&self, hash_type: HashType) -> Option<&Checksum> {
        self.checksums
            .iter()
            .find(|c| c.hash_type() == Some(hash_type))
    }

    /// Removes resources the download engine has no client for.
    pub fn drop_unsupported_resources(&mut self) {
        self.resources.retain(|r| r.resource_type.is_supported());
    }

    /// Keeps only resources of the given protocol families.
    pub fn restrict_protocols(&mut self, types: &[ResourceType]) {
        self.resources.retain(|r| types.contains(&r.resource_type));
    }

    /// Sorts resources by priority, lowest value first.
    ///
    /// Resources without a priority go last. The sort is stable, so
    /// document order breaks ties.
    pub fn reorder_resources_by_priority(&mut self) {
        self.resources
            .sort_by_key(|r| (r.priority.is_none(), r.priority.unwrap_or(0)));
    }

    /// Moves resources located in any of `locations` to the front.
    ///
    /// Relative order within each group is preserved.
    pub fn prefer_locations(&mut self, locations: &[&str]) {
        let (mut preferred, rest): (Vec<_>, Vec<_>) = self
            .resources
            .drain(..)
            .partition(|r| locations.iter().any(|l| r.is_located_in(l)));
        preferred.extend(rest);
        self.resources = preferred;
    }
}
