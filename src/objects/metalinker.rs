//! Metalinker - the root object of a parsed Metalink document.

use crate::objects::entry::MetalinkEntry;
use chrono::{DateTime, FixedOffset};

/// The parsed document: its metadata and the file entries in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metalinker {
    // === Document Metadata ===
    /// Metalink 3 `version` attribute
    pub version: Option<String>,
    /// Tool that generated the document
    pub generator: Option<String>,
    /// Publication date
    pub published: Option<DateTime<FixedOffset>>,

    // === Entries ===
    entries: Vec<MetalinkEntry>,
}

impl Metalinker {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a completed entry.
    pub fn add_entry(&mut self, entry: MetalinkEntry) {
        self.entries.push(entry);
    }

    /// Returns the entries in document order.
    pub fn entries(&self) -> &[MetalinkEntry] {
        &self.entries
    }

    /// Returns an iterator over the entries.
    pub fn iter(&self) -> std::slice::Iter<'_, MetalinkEntry> {
        self.entries.iter()
    }

    /// Consumes the document and returns its entries.
    pub fn into_entries(self) -> Vec<MetalinkEntry> {
        self.entries
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the document listed no files.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entries matching every given criterion.
    ///
    /// A `None` criterion matches any entry. A given criterion only matches
    /// entries that declare the same value.
    pub fn query_entries(
        &self,
        version: Option<&str>,
        language: Option<&str>,
        os: Option<&str>,
    ) -> Vec<&MetalinkEntry> {
        fn matches(wanted: Option<&str>, actual: Option<&String>) -> bool {
            match wanted {
                None => true,
                Some(w) => actual.is_some_and(|a| a == w),
            }
        }

        self.entries
            .iter()
            .filter(|e| {
                matches(version, e.version.as_ref())
                    && matches(language, e.language.as_ref())
                    && matches(os, e.os.as_ref())
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a Metalinker {
    type Item = &'a MetalinkEntry;
    type IntoIter = std::slice::Iter<'a, MetalinkEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
