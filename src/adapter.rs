//! Event adapter between the tokenizer and the grammar.
//!
//! The adapter owns a namespace-aware `quick-xml` reader and turns its
//! events into normalized begin/end calls on an [`ElementHandler`]:
//!
//! - start tags become an [`ElementName`] plus typed [`Attribute`] records;
//! - character data is collected only while the handler asks for it, in a
//!   stack of frames that nests exactly with the open elements;
//! - end tags carry the collected text of the element they close.
//!
//! Raw start-tag bytes are only ever touched by [`decode_attributes`].

use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::name::{QName, ResolveResult};
use quick_xml::NsReader;
use std::io::BufRead;
use std::str;
use tracing::{trace, warn};

/// A namespace-resolved element name.
///
/// A missing prefix or namespace is an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementName {
    /// Local part of the name
    pub local_name: String,
    /// Prefix as written in the document
    pub prefix: String,
    /// Resolved namespace URI
    pub namespace: String,
}

impl ElementName {
    /// Creates a name with no prefix and no namespace.
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            ..Default::default()
        }
    }
}

/// An attribute of a start tag, valid for the duration of one begin event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attribute {
    /// Local part of the attribute name
    pub local_name: String,
    /// Prefix as written in the document
    pub prefix: String,
    /// Resolved namespace URI (empty for unprefixed attributes)
    pub namespace: String,
    /// Unescaped value
    pub value: String,
}

impl Attribute {
    /// Creates an unprefixed attribute.
    pub fn new(local_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            value: value.into(),
            ..Default::default()
        }
    }
}

/// Receiver of normalized element events.
pub trait ElementHandler {
    /// Called for every start tag, in document order.
    fn begin_element(&mut self, name: &ElementName, attrs: &[Attribute]) -> Result<()>;

    /// Called for every end tag with the element's captured text, or an
    /// empty string if its text was not captured.
    fn end_element(&mut self, name: &ElementName, characters: &str) -> Result<()>;

    /// Returns true while text of the innermost open element must be kept.
    fn needs_characters_buffering(&self) -> bool;
}

/// Text collected for one open element.
#[derive(Debug)]
struct CharacterFrame {
    element: String,
    depth: usize,
    text: String,
}

/// Owned form of a tokenizer event.
enum ParsedEvent {
    Start {
        name: ElementName,
        attrs: Vec<Attribute>,
    },
    End {
        name: ElementName,
    },
    Empty {
        name: ElementName,
        attrs: Vec<Attribute>,
    },
    Text {
        text: String,
    },
    Eof,
}

/// Drives an [`ElementHandler`] from a byte stream.
pub struct EventAdapter<R, H> {
    reader: NsReader<R>,
    buf: Vec<u8>,
    handler: H,
    characters: Vec<CharacterFrame>,
    depth: usize,
}

impl<R: BufRead, H: ElementHandler> EventAdapter<R, H> {
    /// Creates an adapter reading from `reader`.
    pub fn new(reader: R, handler: H) -> Self {
        Self {
            reader: NsReader::from_reader(reader),
            buf: Vec::with_capacity(4096),
            handler,
            characters: Vec::new(),
            depth: 0,
        }
    }

    /// Reads until end of input, then returns the handler.
    ///
    /// The reader is dropped on return, whether the run succeeded or not.
    pub fn run(mut self) -> Result<H> {
        loop {
            match self.next_event()? {
                ParsedEvent::Start { name, attrs } => self.begin(name, &attrs)?,
                ParsedEvent::End { name } => self.end(name)?,
                ParsedEvent::Empty { name, attrs } => {
                    let end_name = name.clone();
                    self.begin(name, &attrs)?;
                    self.end(end_name)?;
                }
                ParsedEvent::Text { text } => self.append_characters(&text)?,
                ParsedEvent::Eof => break,
            }
        }
        trace!(depth = self.depth, "tokenizer reached end of input");
        Ok(self.handler)
    }

    /// Reads the next event of interest and converts it to owned data.
    fn next_event(&mut self) -> Result<ParsedEvent> {
        loop {
            self.buf.clear();

            let (ns, event) = self.reader.read_resolved_event_into(&mut self.buf)?;
            let namespace = namespace_uri(ns)?;

            let parsed = match event {
                XmlEvent::Start(ref e) => ParsedEvent::Start {
                    name: element_name(e.name(), namespace)?,
                    attrs: decode_attributes(&self.reader, e)?,
                },
                XmlEvent::End(ref e) => ParsedEvent::End {
                    name: element_name(e.name(), namespace)?,
                },
                XmlEvent::Empty(ref e) => ParsedEvent::Empty {
                    name: element_name(e.name(), namespace)?,
                    attrs: decode_attributes(&self.reader, e)?,
                },
                XmlEvent::Text(ref e) => ParsedEvent::Text {
                    text: e.unescape()?.into_owned(),
                },
                XmlEvent::CData(ref e) => ParsedEvent::Text {
                    text: str::from_utf8(e)?.to_string(),
                },
                XmlEvent::Eof => ParsedEvent::Eof,
                _ => continue,
            };
            return Ok(parsed);
        }
    }

    fn begin(&mut self, name: ElementName, attrs: &[Attribute]) -> Result<()> {
        self.handler.begin_element(&name, attrs)?;
        self.depth += 1;
        if self.handler.needs_characters_buffering() {
            self.characters.push(CharacterFrame {
                element: name.local_name,
                depth: self.depth,
                text: String::new(),
            });
        }
        Ok(())
    }

    fn append_characters(&mut self, text: &str) -> Result<()> {
        if self.depth == 0 {
            if text.trim().is_empty() {
                return Ok(());
            }
            return Err(Error::Syntax(format!(
                "character data outside the document element: {:?}",
                text.trim()
            )));
        }
        if !self.handler.needs_characters_buffering() {
            return Ok(());
        }
        match self.characters.last_mut() {
            Some(frame) if frame.depth == self.depth => {
                frame.text.push_str(text);
                Ok(())
            }
            _ => Err(Error::grammar(format!(
                "no character buffer for the element open at depth {}",
                self.depth
            ))),
        }
    }

    fn end(&mut self, name: ElementName) -> Result<()> {
        let characters = if self.handler.needs_characters_buffering() {
            let frame = self.characters.pop().ok_or_else(|| {
                Error::grammar(format!("no character buffer to close for </{}>", name.local_name))
            })?;
            if frame.depth != self.depth || frame.element != name.local_name {
                return Err(Error::grammar(format!(
                    "character buffer of <{}> closed by </{}>",
                    frame.element, name.local_name
                )));
            }
            frame.text
        } else {
            String::new()
        };

        self.depth = self
            .depth
            .checked_sub(1)
            .ok_or_else(|| Error::grammar(format!("unexpected </{}>", name.local_name)))?;
        self.handler.end_element(&name, &characters)
    }
}

/// Converts a namespace resolution into a URI string.
fn namespace_uri(ns: ResolveResult<'_>) -> Result<String> {
    match ns {
        ResolveResult::Bound(uri) => Ok(str::from_utf8(uri.as_ref())?.to_string()),
        ResolveResult::Unbound => Ok(String::new()),
        ResolveResult::Unknown(prefix) => {
            warn!(
                prefix = %String::from_utf8_lossy(&prefix),
                "undeclared namespace prefix"
            );
            Ok(String::new())
        }
    }
}

fn element_name(qname: QName<'_>, namespace: String) -> Result<ElementName> {
    let local_name = str::from_utf8(qname.local_name().as_ref())?.to_string();
    let prefix = match qname.prefix() {
        Some(p) => str::from_utf8(p.as_ref())?.to_string(),
        None => String::new(),
    };
    Ok(ElementName {
        local_name,
        prefix,
        namespace,
    })
}

/// Decodes the attributes of a start tag into typed records.
///
/// This is the only place that reads the tokenizer's raw attribute bytes.
/// Namespace declarations are consumed by the reader and are not reported.
pub fn decode_attributes<R>(reader: &NsReader<R>, start: &BytesStart<'_>) -> Result<Vec<Attribute>> {
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }

        let (ns, local) = reader.resolve_attribute(attr.key);
        let namespace = namespace_uri(ns)?;
        let prefix = match attr.key.prefix() {
            Some(p) => str::from_utf8(p.as_ref())?.to_string(),
            None => String::new(),
        };
        attrs.push(Attribute {
            local_name: str::from_utf8(local.as_ref())?.to_string(),
            prefix,
            namespace,
            value: attr.unescape_value()?.into_owned(),
        });
    }
    Ok(attrs)
}
