//! The Metalink grammar as a static transition table.
//!
//! Each [`ParserState`] corresponds to a position in the document. The
//! [`TRANSITIONS`] table lists, for each container state, which element
//! names open which child state. An element that has no entry for the
//! current state is ignored as [`ParserState::Unknown`], together with
//! everything inside it.
//!
//! The table covers both Metalink 3.0 (`<files>`, `<resources>`,
//! `<verification>`) and Metalink 4 (RFC 5854), which puts `<url>`,
//! `<hash>`, `<pieces>` and `<signature>` directly under `<file>`.

use crate::objects::{XMLNS_METALINK_V3, XMLNS_METALINK_V4};
use self::ParserState as S;

/// A grammar position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserState {
    /// Before the document element
    Root,
    /// Inside `<metalink>`
    Document,
    /// Inside `<files>`
    FileList,
    /// Inside `<file>`
    FileEntry,
    /// `<size>` of a file
    FileSize,
    /// `<version>` of a file
    FileVersion,
    /// `<language>` of a file
    FileLanguage,
    /// `<os>` of a file
    FileOs,
    /// `<generator>` of the document
    DocumentGenerator,
    /// `<published>` of the document
    DocumentPublished,
    /// Inside `<resources>`
    ResourceList,
    /// `<url>` or `<metaurl>`
    Resource,
    /// Inside `<verification>`
    ChecksumList,
    /// A whole-file `<hash>`
    Checksum,
    /// Inside `<pieces>`
    PieceHashList,
    /// A piece `<hash>`
    PieceHash,
    /// `<signature>`
    Signature,
    /// An element the grammar does not know, and all its content
    Unknown,
}

impl ParserState {
    /// Returns true if the element's text is a value the grammar keeps.
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            ParserState::FileSize
                | ParserState::FileVersion
                | ParserState::FileLanguage
                | ParserState::FileOs
                | ParserState::DocumentGenerator
                | ParserState::DocumentPublished
                | ParserState::Resource
                | ParserState::Checksum
                | ParserState::PieceHash
                | ParserState::Signature
        )
    }

    /// Looks up the state opened by `element` under this state.
    pub fn child(self, element: &str) -> Option<ParserState> {
        TRANSITIONS
            .iter()
            .find(|t| t.parent == self && t.element == element)
            .map(|t| t.child)
    }
}

/// One row of the grammar table.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    /// State the element appears in
    pub parent: ParserState,
    /// Local name of the element
    pub element: &'static str,
    /// State the element opens
    pub child: ParserState,
}

const fn t(parent: ParserState, element: &'static str, child: ParserState) -> Transition {
    Transition {
        parent,
        element,
        child,
    }
}

/// The Metalink grammar.
pub static TRANSITIONS: &[Transition] = &[
    t(S::Root, "metalink", S::Document),
    t(S::Document, "files", S::FileList),
    t(S::Document, "file", S::FileEntry),
    t(S::Document, "generator", S::DocumentGenerator),
    t(S::Document, "published", S::DocumentPublished),
    t(S::FileList, "file", S::FileEntry),
    t(S::FileEntry, "size", S::FileSize),
    t(S::FileEntry, "version", S::FileVersion),
    t(S::FileEntry, "language", S::FileLanguage),
    t(S::FileEntry, "os", S::FileOs),
    t(S::FileEntry, "resources", S::ResourceList),
    t(S::FileEntry, "verification", S::ChecksumList),
    t(S::FileEntry, "url", S::Resource),
    t(S::FileEntry, "metaurl", S::Resource),
    t(S::FileEntry, "hash", S::Checksum),
    t(S::FileEntry, "pieces", S::PieceHashList),
    t(S::FileEntry, "signature", S::Signature),
    t(S::ResourceList, "url", S::Resource),
    t(S::ChecksumList, "hash", S::Checksum),
    t(S::ChecksumList, "pieces", S::PieceHashList),
    t(S::ChecksumList, "signature", S::Signature),
    t(S::PieceHashList, "hash", S::PieceHash),
];

/// Returns true if elements in `namespace` belong to the Metalink grammar.
///
/// Documents with no namespace at all are accepted too.
pub fn is_metalink_namespace(namespace: &str) -> bool {
    namespace.is_empty() || namespace == XMLNS_METALINK_V3 || namespace == XMLNS_METALINK_V4
}
