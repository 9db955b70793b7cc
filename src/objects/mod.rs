//! Metalink object types.
//!
//! This module contains the domain model a Metalink document is parsed
//! into:
//!
//! - [`Metalinker`] - The root document with its file entries
//! - [`MetalinkEntry`] - A downloadable file
//! - [`Resource`] - A mirror or torrent for a file
//!
//! Also provides verification types:
//! - [`Checksum`] and [`HashType`] - Whole-file digests
//! - [`PieceHashList`] - Per-piece digests
//! - [`Signature`] - Detached signatures

mod common;
mod entry;
mod metalinker;
mod resource;

// Re-export common types
pub use common::{
    parse_published, Checksum, HashType, PieceHashList, Signature, XMLNS_METALINK_V3,
    XMLNS_METALINK_V4,
};

// Re-export main object types
pub use entry::MetalinkEntry;
pub use metalinker::Metalinker;
pub use resource::{Resource, ResourceType};
