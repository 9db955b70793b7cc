//! Metalink parser state machine.
//!
//! [`MetalinkParserStateMachine`] receives normalized begin/end events and
//! keeps a stack of frames mirroring the open elements. Each frame records
//! the grammar state and the element that opened it, so every end event can
//! be checked against the frame it pops.
//!
//! Aggregates (file entries, resources, checksums, piece lists, signatures)
//! are allocated when their element opens, filled from attributes at once
//! and from leaf text as it closes, and attached to their owner only when
//! their own element closes.

use crate::adapter::{Attribute, ElementHandler, ElementName};
use crate::error::{Error, Result};
use crate::grammar::{is_metalink_namespace, ParserState};
use crate::objects::{
    parse_published, Checksum, MetalinkEntry, Metalinker, PieceHashList, Resource,
    ResourceType, Signature,
};
use chrono::{DateTime, FixedOffset};
use std::str::FromStr;
use tracing::{debug, trace, warn};

/// One open element.
#[derive(Debug)]
struct Frame {
    state: ParserState,
    element: String,
}

/// A resource under construction.
#[derive(Debug)]
struct PendingResource {
    resource: Resource,
    /// The element carried no `type`, so the URL scheme decides
    infer_type: bool,
}

/// Builds a [`Metalinker`] from element events.
///
/// One instance serves exactly one document.
#[derive(Debug, Default)]
pub struct MetalinkParserStateMachine {
    stack: Vec<Frame>,
    metalinker: Metalinker,
    finished: bool,

    // Objects being built
    entry: Option<MetalinkEntry>,
    resource: Option<PendingResource>,
    checksum: Option<Checksum>,
    pieces: Option<PieceHashList>,
    signature: Option<Signature>,
}

impl MetalinkParserStateMachine {
    /// Creates a state machine positioned before the document element.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state of the innermost open element.
    pub fn current_state(&self) -> ParserState {
        self.stack
            .last()
            .map(|f| f.state)
            .unwrap_or(ParserState::Root)
    }

    /// Returns the number of open elements.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Returns true once the document element has closed.
    pub fn finished(&self) -> bool {
        self.finished && self.stack.is_empty()
    }

    /// Returns the completed document.
    ///
    /// Fails with [`Error::IncompleteDocument`] if the document element has
    /// not closed yet.
    pub fn into_result(self) -> Result<Metalinker> {
        if !self.finished() {
            return Err(Error::IncompleteDocument);
        }
        Ok(self.metalinker)
    }

    fn entry_mut(&mut self) -> Result<&mut MetalinkEntry> {
        self.entry
            .as_mut()
            .ok_or_else(|| Error::grammar("no <file> under construction"))
    }

    fn pieces_mut(&mut self) -> Result<&mut PieceHashList> {
        self.pieces
            .as_mut()
            .ok_or_else(|| Error::grammar("no <pieces> under construction"))
    }

    /// Allocates the object a state stands for and copies its attributes.
    fn open(&mut self, state: ParserState, element: &str, attrs: &[Attribute]) -> Result<()> {
        match state {
            ParserState::Document => {
                self.metalinker.version = optional(attrs, "version").map(str::to_string);
                self.metalinker.generator = optional(attrs, "generator").map(str::to_string);
                if let Some(pubdate) = optional(attrs, "pubdate") {
                    self.metalinker.published = published(pubdate);
                }
            }
            ParserState::FileEntry => {
                let name = required(attrs, "name", element)?;
                if name.trim().is_empty() {
                    return Err(Error::grammar("<file> has an empty name"));
                }
                self.entry = Some(MetalinkEntry::with_filename(name));
            }
            ParserState::ResourceList => {
                let max_connections = number(attrs, "maxconnections", element)?;
                self.entry_mut()?.max_connections = max_connections;
            }
            ParserState::Resource => {
                self.resource = Some(open_resource(element, attrs)?);
            }
            ParserState::Checksum => {
                let algorithm = required(attrs, "type", element)?;
                self.checksum = Some(Checksum::new(algorithm, ""));
            }
            ParserState::PieceHashList => {
                let length: u64 = number(attrs, "length", element)?
                    .ok_or_else(|| Error::grammar("<pieces> is missing attribute length"))?;
                if length == 0 {
                    return Err(Error::grammar("<pieces> length must be positive"));
                }
                let algorithm = required(attrs, "type", element)?;
                self.pieces = Some(PieceHashList::new(length, algorithm));
            }
            ParserState::PieceHash => {
                let index: Option<usize> = number(attrs, "piece", element)?;
                let expected = self.pieces_mut()?.len();
                if let Some(index) = index {
                    if index != expected {
                        return Err(Error::grammar(format!(
                            "piece hash {} listed where piece {} was expected",
                            index, expected
                        )));
                    }
                }
            }
            ParserState::Signature => {
                let signature_type = optional(attrs, "type")
                    .or_else(|| optional(attrs, "mediatype"))
                    .ok_or_else(|| Error::grammar("<signature> is missing attribute type"))?;
                let mut signature = Signature::new(signature_type);
                signature.file = optional(attrs, "file").map(str::to_string);
                self.signature = Some(signature);
            }
            _ => {}
        }
        Ok(())
    }

    /// Stores a leaf value or attaches a completed aggregate.
    fn close(&mut self, state: ParserState, text: &str) -> Result<()> {
        match state {
            ParserState::Document => {
                self.finished = true;
            }
            ParserState::FileEntry => {
                let entry = self
                    .entry
                    .take()
                    .ok_or_else(|| Error::grammar("no <file> under construction"))?;
                debug!(
                    filename = %entry.filename,
                    resources = entry.resources.len(),
                    "file entry complete"
                );
                self.metalinker.add_entry(entry);
            }
            ParserState::FileSize => {
                let size: u64 = text
                    .parse()
                    .map_err(|_| Error::grammar(format!("invalid <size>: {:?}", text)))?;
                self.entry_mut()?.size = Some(size);
            }
            ParserState::FileVersion => {
                self.entry_mut()?.version = non_empty(text);
            }
            ParserState::FileLanguage => {
                self.entry_mut()?.language = non_empty(text);
            }
            ParserState::FileOs => {
                self.entry_mut()?.os = non_empty(text);
            }
            ParserState::DocumentGenerator => {
                self.metalinker.generator = non_empty(text);
            }
            ParserState::DocumentPublished => {
                self.metalinker.published = published(text);
            }
            ParserState::Resource => {
                let PendingResource {
                    mut resource,
                    infer_type,
                } = self
                    .resource
                    .take()
                    .ok_or_else(|| Error::grammar("no <url> under construction"))?;
                if text.is_empty() {
                    return Err(Error::grammar("resource has an empty URL"));
                }
                resource.url = text.to_string();
                if infer_type {
                    resource.resource_type = ResourceType::from_url(text);
                }
                self.entry_mut()?.add_resource(resource);
            }
            ParserState::Checksum => {
                let mut checksum = self
                    .checksum
                    .take()
                    .ok_or_else(|| Error::grammar("no <hash> under construction"))?;
                if text.is_empty() {
                    return Err(Error::grammar(format!(
                        "<hash type=\"{}\"> has no digest",
                        checksum.algorithm
                    )));
                }
                checksum.digest = text.to_lowercase();
                if !checksum.has_expected_length() {
                    warn!(
                        algorithm = %checksum.algorithm,
                        len = checksum.digest.len(),
                        "digest length does not match its algorithm"
                    );
                }
                self.entry_mut()?.add_checksum(checksum);
            }
            ParserState::PieceHashList => {
                let pieces = self
                    .pieces
                    .take()
                    .ok_or_else(|| Error::grammar("no <pieces> under construction"))?;
                self.entry_mut()?.piece_hashes = Some(pieces);
            }
            ParserState::PieceHash => {
                if text.is_empty() {
                    return Err(Error::grammar("piece <hash> has no digest"));
                }
                self.pieces_mut()?.push(text);
            }
            ParserState::Signature => {
                let mut signature = self
                    .signature
                    .take()
                    .ok_or_else(|| Error::grammar("no <signature> under construction"))?;
                signature.body = text.to_string();
                self.entry_mut()?.signature = Some(signature);
            }
            ParserState::Root
            | ParserState::FileList
            | ParserState::ResourceList
            | ParserState::ChecksumList
            | ParserState::Unknown => {}
        }
        Ok(())
    }
}

impl ElementHandler for MetalinkParserStateMachine {
    fn begin_element(&mut self, name: &ElementName, attrs: &[Attribute]) -> Result<()> {
        if self.finished {
            return Err(Error::grammar(format!(
                "<{}> after the end of the document element",
                name.local_name
            )));
        }

        let parent = self.current_state();
        let state = if is_metalink_namespace(&name.namespace) {
            parent
                .child(&name.local_name)
                .unwrap_or(ParserState::Unknown)
        } else {
            ParserState::Unknown
        };

        if parent == ParserState::Root && state != ParserState::Document {
            return Err(Error::grammar(format!(
                "document element must be <metalink>, found <{}>",
                name.local_name
            )));
        }
        if state == ParserState::Unknown && parent != ParserState::Unknown {
            debug!(element = %name.local_name, namespace = %name.namespace, ?parent, "ignoring unknown element");
        }

        self.open(state, &name.local_name, attrs)?;
        trace!(element = %name.local_name, ?state, depth = self.stack.len() + 1, "begin");
        self.stack.push(Frame {
            state,
            element: name.local_name.clone(),
        });
        Ok(())
    }

    fn end_element(&mut self, name: &ElementName, characters: &str) -> Result<()> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| Error::grammar(format!("unexpected </{}>", name.local_name)))?;
        if frame.element != name.local_name {
            return Err(Error::grammar(format!(
                "expected </{}>, found </{}>",
                frame.element, name.local_name
            )));
        }

        trace!(element = %frame.element, state = ?frame.state, "end");
        self.close(frame.state, characters.trim())
    }

    fn needs_characters_buffering(&self) -> bool {
        self.current_state().is_leaf()
    }
}

fn open_resource(element: &str, attrs: &[Attribute]) -> Result<PendingResource> {
    let (resource_type, infer_type) = if element == "metaurl" {
        let media_type = required(attrs, "mediatype", element)?;
        (ResourceType::from_media_type(media_type), false)
    } else {
        match optional(attrs, "type") {
            Some(ty) => (ty.parse().unwrap_or(ResourceType::NotSupported), false),
            None => (ResourceType::NotSupported, true),
        }
    };

    let mut resource = Resource::new(resource_type);
    resource.location = optional(attrs, "location").map(str::to_string);
    resource.priority = number(attrs, "priority", element)?;
    resource.preference = number(attrs, "preference", element)?;
    resource.max_connections = number(attrs, "maxconnections", element)?;

    Ok(PendingResource {
        resource,
        infer_type,
    })
}

/// Returns the value of an unprefixed attribute.
fn optional<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|a| a.local_name == name && a.namespace.is_empty())
        .map(|a| a.value.as_str())
}

fn required<'a>(attrs: &'a [Attribute], name: &str, element: &str) -> Result<&'a str> {
    optional(attrs, name).ok_or_else(|| {
        Error::grammar(format!("<{}> is missing attribute {}", element, name))
    })
}

/// Parses an optional numeric attribute; a malformed value is an error.
fn number<T: FromStr>(attrs: &[Attribute], name: &str, element: &str) -> Result<Option<T>> {
    optional(attrs, name)
        .map(|v| {
            v.trim().parse().map_err(|_| {
                Error::grammar(format!("<{}> has invalid {}: {:?}", element, name, v))
            })
        })
        .transpose()
}

/// Parses a publication date; a malformed date is logged and dropped.
fn published(text: &str) -> Option<DateTime<FixedOffset>> {
    match parse_published(text) {
        Ok(date) => Some(date),
        Err(e) => {
            warn!(date = %text, error = %e, "ignoring unparsable publication date");
            None
        }
    }
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
