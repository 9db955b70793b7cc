//! Metalink processor.
//!
//! The processor wires the pieces together for the two ways a document
//! reaches us: as a complete file on disk, or as a byte source that is read
//! window by window (a document still being downloaded, say).
//!
//! # Example
//!
//! ```rust,no_run
//! use metalink_rs::processor::{MetalinkProcessor, ProcessorOptions};
//!
//! let processor = MetalinkProcessor::with_options(ProcessorOptions::new().window_size(8192));
//! let metalinker = processor.parse_file("ubuntu.metalink").unwrap();
//!
//! for entry in &metalinker {
//!     println!("{}: {} mirror(s)", entry.filename, entry.resources.len());
//! }
//! ```

use crate::adapter::EventAdapter;
use crate::error::{Error, ParseError, Result};
use crate::feeder::{sniff_encoding, ChunkFeeder, DEFAULT_WINDOW_SIZE};
use crate::objects::Metalinker;
use crate::source::ByteSource;
use crate::state_machine::MetalinkParserStateMachine;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Configuration for a [`MetalinkProcessor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorOptions {
    /// Bytes read from a byte source per window
    pub window_size: usize,
}

impl ProcessorOptions {
    /// Creates the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the window size used by [`MetalinkProcessor::parse_stream`].
    ///
    /// Values below 1 are raised to 1.
    pub fn window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size.max(1);
        self
    }
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

/// Parses Metalink documents into [`Metalinker`] objects.
///
/// Every call runs on a fresh state machine; nothing carries over from one
/// call to the next.
#[derive(Debug, Clone, Default)]
pub struct MetalinkProcessor {
    options: ProcessorOptions,
}

impl MetalinkProcessor {
    /// Creates a processor with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a processor with the given options.
    pub fn with_options(options: ProcessorOptions) -> Self {
        Self { options }
    }

    /// Returns the processor's options.
    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    /// Parses a complete Metalink file.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> std::result::Result<Metalinker, ParseError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "parsing Metalink file");
        finish(self.parse_file_inner(path))
    }

    /// Parses a Metalink document from a byte source, window by window.
    pub fn parse_stream<S: ByteSource>(
        &self,
        source: S,
    ) -> std::result::Result<Metalinker, ParseError> {
        debug!(window_size = self.options.window_size, "parsing Metalink stream");
        finish(self.parse_stream_inner(source))
    }

    fn parse_file_inner(&self, path: &Path) -> Result<Metalinker> {
        let mut reader = BufReader::new(File::open(path)?);
        let bom = sniff_encoding(reader.fill_buf()?)?;
        reader.consume(bom);
        parse_document(reader)
    }

    fn parse_stream_inner<S: ByteSource>(&self, source: S) -> Result<Metalinker> {
        let feeder = ChunkFeeder::open(source, self.options.window_size)?;
        parse_document(feeder)
    }
}

/// Runs one document through a fresh state machine.
///
/// The tokenizer and its input are owned by the adapter and dropped before
/// this returns, on success and on every error.
fn parse_document<R: BufRead>(reader: R) -> Result<Metalinker> {
    let adapter = EventAdapter::new(reader, MetalinkParserStateMachine::new());
    let stm = adapter.run()?;
    stm.into_result()
}

fn finish(result: Result<Metalinker>) -> std::result::Result<Metalinker, ParseError> {
    match result {
        Ok(metalinker) => {
            debug!(entries = metalinker.len(), "Metalink document parsed");
            Ok(metalinker)
        }
        Err(e) => {
            debug!(error = %e, "Metalink document rejected");
            Err(ParseError::from(e))
        }
    }
}

/// Parses a complete Metalink file with default options.
pub fn parse_file(path: impl AsRef<Path>) -> std::result::Result<Metalinker, ParseError> {
    MetalinkProcessor::new().parse_file(path)
}

/// Parses a Metalink document from a byte source with default options.
pub fn parse_stream<S: ByteSource>(source: S) -> std::result::Result<Metalinker, ParseError> {
    MetalinkProcessor::new().parse_stream(source)
}

/// Parses an in-memory Metalink document.
pub fn parse_slice(data: &[u8]) -> std::result::Result<Metalinker, ParseError> {
    MetalinkProcessor::new().parse_stream(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Checksum, ResourceType};
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::io::{self, Write};
    use std::rc::Rc;

    const SIMPLE_METALINK: &str = r#"<metalink><file name="a.iso"><resources><url priority="1">http://x/a.iso</url></resources><verification><hash type="sha-1">abcd1234</hash></verification></file></metalink>"#;

    const V3_METALINK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metalink version="3.0" xmlns="http://www.metalinker.org/" generator="Metalink Editor/2.0dev" pubdate="Fri, 15 May 2009 12:23:23 +0000">
  <files>
    <file name="ubuntu-9.04-desktop-i386.iso">
      <size>732909568</size>
      <version>9.04</version>
      <language>en-US</language>
      <os>Linux-x86</os>
      <description>Ubuntu 9.04 desktop CD</description>
      <verification>
        <hash type="md5">F84CC5D27F6C4E3B1A1AB5FCB9C3EBA6</hash>
        <hash type="sha1">9ab1d2c4a16a1f8f7b13bde3e2bc1d0f2f6e0a24</hash>
        <pieces length="262144" type="sha1">
          <hash piece="0">1c1b6d2fa5b6b1e9fa7ba9a4e3a2fd02b0c54f19</hash>
          <hash piece="1">4ee0a66c1ea8b2d7b5d05a2a4ac9bbcf7ad2a11e</hash>
        </pieces>
        <signature type="pgp" file="ubuntu-9.04-desktop-i386.iso.sig">-----BEGIN PGP SIGNATURE-----
iEYEABECAAYFAkoN
-----END PGP SIGNATURE-----</signature>
      </verification>
      <resources maxconnections="5">
        <url type="ftp" location="us" preference="90">ftp://ftp.example.com/ubuntu-9.04-desktop-i386.iso</url>
        <url type="http" location="jp" preference="100">http://jp.example.com/ubuntu-9.04-desktop-i386.iso</url>
        <url type="bittorrent" preference="100">http://torrent.example.com/ubuntu-9.04-desktop-i386.iso.torrent</url>
      </resources>
    </file>
    <file name="ubuntu-9.04-desktop-amd64.iso">
      <resources>
        <url type="http">http://example.com/ubuntu-9.04-desktop-amd64.iso</url>
      </resources>
    </file>
  </files>
</metalink>"#;

    const V4_METALINK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metalink xmlns="urn:ietf:params:xml:ns:metalink" xmlns:ext="http://example.com/ext">
  <generator>MirrorBrain/2.9.2</generator>
  <published>2009-05-15T12:23:23Z</published>
  <file name="example.ext">
    <identity>Example</identity>
    <size>14471447</size>
    <hash type="sha-256">F0AD929CD259957E160EA442EB80986B5F01E6D4A3C2AE3B28E2C12C1E2C7D4D</hash>
    <ext:mirrorlist><url>http://ignored.example.com/</url></ext:mirrorlist>
    <url location="de" priority="1">ftp://ftp.example.com/example.ext</url>
    <url location="fr" priority="1">http://example.com/example.ext</url>
    <metaurl mediatype="torrent" priority="2">http://example.com/example.ext.torrent</metaurl>
  </file>
</metalink>"#;

    fn processor(window_size: usize) -> MetalinkProcessor {
        MetalinkProcessor::with_options(ProcessorOptions::new().window_size(window_size))
    }

    fn reason(result: std::result::Result<Metalinker, ParseError>) -> Error {
        result.err().unwrap().into_reason()
    }

    #[test]
    fn test_parse_simple_document() {
        let doc = parse_slice(SIMPLE_METALINK.as_bytes()).unwrap();

        assert_eq!(doc.len(), 1);
        let entry = &doc.entries()[0];
        assert_eq!(entry.filename, "a.iso");
        assert_eq!(entry.resources.len(), 1);
        assert_eq!(entry.resources[0].url, "http://x/a.iso");
        assert_eq!(entry.resources[0].priority, Some(1));
        assert_eq!(entry.resources[0].resource_type, ResourceType::Http);
        assert_eq!(entry.checksums, vec![Checksum::new("sha-1", "abcd1234")]);
    }

    #[test]
    fn test_parse_v3_document() {
        let doc = parse_slice(V3_METALINK.as_bytes()).unwrap();

        assert_eq!(doc.version.as_deref(), Some("3.0"));
        assert_eq!(doc.generator.as_deref(), Some("Metalink Editor/2.0dev"));
        assert_eq!(doc.published.unwrap().timestamp(), 1242390203);

        let names: Vec<_> = doc.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(
            names,
            vec!["ubuntu-9.04-desktop-i386.iso", "ubuntu-9.04-desktop-amd64.iso"]
        );

        let entry = &doc.entries()[0];
        assert_eq!(entry.size, Some(732909568));
        assert_eq!(entry.version.as_deref(), Some("9.04"));
        assert_eq!(entry.language.as_deref(), Some("en-US"));
        assert_eq!(entry.os.as_deref(), Some("Linux-x86"));
        assert_eq!(entry.max_connections, Some(5));
        assert_eq!(entry.checksums.len(), 2);
        assert_eq!(entry.checksums[0].digest, "f84cc5d27f6c4e3b1a1ab5fcb9c3eba6");

        let types: Vec<_> = entry.resources.iter().map(|r| r.resource_type).collect();
        assert_eq!(
            types,
            vec![ResourceType::Ftp, ResourceType::Http, ResourceType::BitTorrent]
        );

        let pieces = entry.piece_hashes.as_ref().unwrap();
        assert_eq!(pieces.length, 262144);
        assert_eq!(pieces.len(), 2);

        let signature = entry.signature.as_ref().unwrap();
        assert!(signature.body.starts_with("-----BEGIN PGP SIGNATURE-----"));
        assert!(signature.body.ends_with("-----END PGP SIGNATURE-----"));
    }

    #[test]
    fn test_parse_v4_document() {
        let doc = parse_slice(V4_METALINK.as_bytes()).unwrap();

        assert_eq!(doc.generator.as_deref(), Some("MirrorBrain/2.9.2"));
        assert_eq!(doc.published.unwrap().timestamp(), 1242390203);

        let entry = &doc.entries()[0];
        assert_eq!(entry.size, Some(14471447));
        assert_eq!(entry.checksums[0].algorithm, "sha-256");

        let urls: Vec<_> = entry.resources.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "ftp://ftp.example.com/example.ext",
                "http://example.com/example.ext",
                "http://example.com/example.ext.torrent",
            ]
        );
        assert_eq!(entry.resources[0].resource_type, ResourceType::Ftp);
        assert_eq!(entry.resources[2].resource_type, ResourceType::BitTorrent);
    }

    #[test]
    fn test_chunking_does_not_change_result() {
        let expected = processor(4096).parse_stream(V3_METALINK.as_bytes()).unwrap();
        for window in [1, 2, 3, 5, 7, 64, 1000] {
            let doc = processor(window).parse_stream(V3_METALINK.as_bytes()).unwrap();
            assert_eq!(doc, expected, "window size {}", window);
        }

        let expected = processor(4096).parse_stream(V4_METALINK.as_bytes()).unwrap();
        let doc = processor(1).parse_stream(V4_METALINK.as_bytes()).unwrap();
        assert_eq!(doc, expected);
    }

    #[test]
    fn test_digest_split_across_windows() {
        let prefix = r#"<metalink><file name="a"><hash type="sha-1">"#;
        let xml = format!("{}abcd1234</hash></file></metalink>", prefix);

        // The first window ends four characters into the digest.
        let doc = processor(prefix.len() + 4)
            .parse_stream(xml.as_bytes())
            .unwrap();
        assert_eq!(doc.entries()[0].checksums[0].digest, "abcd1234");

        // Same digest, interrupted by a comment and a CDATA section.
        let xml = r#"<metalink><file name="a"><hash type="sha-1">ab<!-- x -->cd<![CDATA[12]]>34</hash></file></metalink>"#;
        let doc = processor(3).parse_stream(xml.as_bytes()).unwrap();
        assert_eq!(doc.entries()[0].checksums[0].digest, "abcd1234");
    }

    #[test]
    fn test_entry_order_follows_document() {
        let mut xml = String::from("<metalink><files>");
        let names: Vec<String> = (0..50).map(|i| format!("file-{:02}-{}", (i * 37) % 50, i)).collect();
        for name in &names {
            xml.push_str(&format!(
                r#"<file name="{}"><resources><url>http://x/{}</url></resources></file>"#,
                name, name
            ));
        }
        xml.push_str("</files></metalink>");

        let doc = processor(13).parse_stream(xml.as_bytes()).unwrap();
        let parsed: Vec<_> = doc.iter().map(|e| e.filename.clone()).collect();
        assert_eq!(parsed, names);
    }

    #[test]
    fn test_truncated_document_fails() {
        let cut = SIMPLE_METALINK.find("</file>").unwrap();
        for end in [cut, cut + 3, SIMPLE_METALINK.len() - 1] {
            let err = reason(parse_slice(&SIMPLE_METALINK.as_bytes()[..end]));
            assert!(
                matches!(err, Error::IncompleteDocument | Error::Syntax(_)),
                "truncated at {}: {:?}",
                end,
                err
            );
        }
    }

    #[test]
    fn test_unknown_elements_do_not_disturb_siblings() {
        let xml = r#"<metalink>
  <file name="a">
    <resources>
      <mirrorstats><url>http://stats/</url></mirrorstats>
      <url>http://x/a</url>
    </resources>
    <verification><tiger>0000</tiger><hash type="md5">00ff</hash></verification>
  </file>
</metalink>"#;
        let doc = parse_slice(xml.as_bytes()).unwrap();
        let entry = &doc.entries()[0];
        assert_eq!(entry.resources.len(), 1);
        assert_eq!(entry.resources[0].url, "http://x/a");
        assert_eq!(entry.checksums, vec![Checksum::new("md5", "00ff")]);
    }

    #[test]
    fn test_small_source_rejected() {
        let err = reason(parse_slice(b"<m>"));
        assert!(matches!(err, Error::SourceTooSmall { available: 3 }));
    }

    #[test]
    fn test_malformed_xml_is_syntax_error() {
        let err = reason(parse_slice(b"<metalink><file name=\"a\"></metalink>"));
        assert!(matches!(err, Error::Syntax(_)));

        let err = reason(parse_slice(b"<metalink><file name='a' name='b'/></metalink>"));
        assert!(matches!(err, Error::Syntax(_)));
    }

    #[test]
    fn test_stray_text_around_document_fails() {
        let doc = r#"<metalink><file name="a"><url>http://x</url></file></metalink>"#;
        for xml in [
            format!("{}trailing junk", doc),
            format!("leading junk{}", doc),
            format!("<?xml version=\"1.0\"?>\nx\n{}", doc),
        ] {
            for window in [1, 4096] {
                let err = reason(processor(window).parse_stream(xml.as_bytes()));
                assert!(matches!(err, Error::Syntax(_)), "{:?}: {:?}", xml, err);
            }
        }

        let padded = format!("\n{}\n\n", doc);
        assert_eq!(parse_slice(padded.as_bytes()).unwrap().len(), 1);
    }

    #[test]
    fn test_grammar_errors_surface() {
        let err = reason(parse_slice(b"<rss><channel/></rss>"));
        assert!(matches!(err, Error::Grammar(_)));

        let err = reason(parse_slice(b"<metalink><file/></metalink>"));
        assert!(matches!(err, Error::Grammar(_)));
    }

    #[test]
    fn test_non_utf8_encoding_rejected() {
        let utf16: Vec<u8> = "\u{feff}<metalink/>"
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        let err = reason(parse_slice(&utf16));
        assert!(matches!(err, Error::Syntax(_)));
    }

    #[test]
    fn test_utf8_bom_accepted() {
        let mut data = b"\xEF\xBB\xBF".to_vec();
        data.extend_from_slice(SIMPLE_METALINK.as_bytes());
        let doc = parse_slice(&data).unwrap();
        assert_eq!(doc.len(), 1);
    }

    /// Counts how often it is dropped.
    struct DropCountingSource {
        data: &'static [u8],
        drops: Rc<Cell<usize>>,
    }

    impl ByteSource for DropCountingSource {
        fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
            self.data.read_at(buf, offset)
        }
    }

    impl Drop for DropCountingSource {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    #[test]
    fn test_source_released_once_on_every_path() {
        let inputs: [&'static [u8]; 4] = [
            SIMPLE_METALINK.as_bytes(),
            b"<metalink><file name=\"a\"></metalink>",
            b"<metalink><file/></metalink>",
            b"<me",
        ];
        for data in inputs {
            let drops = Rc::new(Cell::new(0));
            let source = DropCountingSource {
                data,
                drops: Rc::clone(&drops),
            };
            let _ = processor(5).parse_stream(source);
            assert_eq!(drops.get(), 1);
        }
    }

    /// Fails every read after the probe.
    struct FailingSource;

    impl ByteSource for FailingSource {
        fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
            if offset == 0 {
                let n = buf.len().min(4);
                buf[..n].copy_from_slice(&b"<met"[..n]);
                Ok(n)
            } else {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer went away"))
            }
        }
    }

    #[test]
    fn test_source_errors_surface_as_io() {
        let err = reason(parse_stream(FailingSource));
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::ConnectionReset));
    }

    #[test]
    fn test_parse_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(V3_METALINK.as_bytes()).unwrap();
        file.flush().unwrap();

        let from_file = parse_file(file.path()).unwrap();
        let from_stream = parse_stream(std::fs::File::open(file.path()).unwrap()).unwrap();
        assert_eq!(from_file, from_stream);
        assert_eq!(from_file.len(), 2);
    }

    #[test]
    fn test_parse_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = reason(parse_file(dir.path().join("missing.metalink")));
        assert!(matches!(err, Error::Io(_)));

        let path = dir.path().join("truncated.metalink");
        std::fs::write(&path, &SIMPLE_METALINK[..40]).unwrap();
        let err = reason(parse_file(&path));
        assert!(matches!(err, Error::IncompleteDocument | Error::Syntax(_)));

        let path = dir.path().join("empty.metalink");
        std::fs::write(&path, "").unwrap();
        let err = reason(parse_file(&path));
        assert!(matches!(err, Error::IncompleteDocument));
    }

    #[test]
    fn test_parse_calls_are_independent() {
        let processor = MetalinkProcessor::new();
        assert!(processor.parse_stream(b"<metalink><file name=\"x\">".as_slice()).is_err());
        let doc = processor.parse_stream(SIMPLE_METALINK.as_bytes()).unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.entries()[0].filename, "a.iso");
    }

    #[test]
    fn test_options() {
        assert_eq!(ProcessorOptions::default().window_size, DEFAULT_WINDOW_SIZE);
        assert_eq!(ProcessorOptions::new().window_size(0).window_size, 1);
        assert_eq!(processor(64).options().window_size, 64);
    }
}
