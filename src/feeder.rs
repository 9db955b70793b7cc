//! Chunk feeder for incremental parsing.
//!
//! [`ChunkFeeder`] reads a [`ByteSource`] in fixed-size windows at strictly
//! increasing offsets and hands them to the tokenizer through
//! [`BufRead`]. The tokenizer pulls as much as it needs; window boundaries
//! fall wherever they fall and never have to line up with XML tokens.
//!
//! Before any window is read, a 4-byte probe lets us sniff the document
//! encoding. A source shorter than the probe is rejected outright.

use crate::error::{Error, Result};
use crate::source::ByteSource;
use std::io::{self, BufRead, Read};
use tracing::{debug, trace};

/// Number of leading bytes read to detect the document encoding.
pub const PROBE_LEN: usize = 4;

/// Default window size used when feeding the tokenizer.
pub const DEFAULT_WINDOW_SIZE: usize = 4096;

/// Feeds a byte source to the tokenizer window by window.
pub struct ChunkFeeder<S> {
    source: S,
    window: Vec<u8>,
    window_size: usize,
    pos: usize,
    filled: usize,
    offset: u64,
    exhausted: bool,
    chunks: usize,
}

impl<S: ByteSource> ChunkFeeder<S> {
    /// Probes the source and prepares it for feeding.
    ///
    /// Fails with [`Error::SourceTooSmall`] if fewer than [`PROBE_LEN`]
    /// bytes are available, and with [`Error::Syntax`] if the probe reveals
    /// an encoding other than UTF-8.
    pub fn open(mut source: S, window_size: usize) -> Result<Self> {
        let window_size = window_size.max(1);
        let mut window = vec![0u8; window_size.max(PROBE_LEN)];

        let mut got = 0;
        while got < PROBE_LEN {
            let n = read_retrying(&mut source, &mut window[got..PROBE_LEN], got as u64)?;
            if n == 0 {
                break;
            }
            got += n;
        }
        if got < PROBE_LEN {
            return Err(Error::SourceTooSmall { available: got });
        }

        let bom = sniff_encoding(&window[..PROBE_LEN])?;
        trace!(bom, window_size, "probed byte source");

        Ok(Self {
            source,
            window,
            window_size,
            pos: bom,
            filled: PROBE_LEN,
            offset: PROBE_LEN as u64,
            exhausted: false,
            chunks: 1,
        })
    }

    /// Returns the offset of the next window to read.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the number of non-empty chunks handed out so far,
    /// counting the probe.
    pub fn chunks_fed(&self) -> usize {
        self.chunks
    }

    /// Returns true once a zero-length read has marked the end of the source.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Consumes the feeder and returns the source.
    pub fn into_inner(self) -> S {
        self.source
    }

    fn read_window(&mut self) -> io::Result<()> {
        let n = read_retrying(
            &mut self.source,
            &mut self.window[..self.window_size],
            self.offset,
        )?;
        self.pos = 0;
        self.filled = n;
        if n == 0 {
            self.exhausted = true;
            debug!(offset = self.offset, chunks = self.chunks, "byte source exhausted");
        } else {
            trace!(offset = self.offset, len = n, "feeding chunk");
            self.offset += n as u64;
            self.chunks += 1;
        }
        Ok(())
    }
}

impl<S: ByteSource> Read for ChunkFeeder<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<S: ByteSource> BufRead for ChunkFeeder<S> {
    /// Returns the unread part of the current window, reading the next one
    /// when it is used up. After the source is exhausted this returns an
    /// empty slice, which the tokenizer takes as end of input.
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.filled && !self.exhausted {
            self.read_window()?;
        }
        Ok(&self.window[self.pos..self.filled])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.filled);
    }
}

fn read_retrying<S: ByteSource>(source: &mut S, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    loop {
        match source.read_at(buf, offset) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Detects the document encoding from its leading bytes.
///
/// Returns the length of a UTF-8 byte-order mark to skip (0 or 3). Byte
/// patterns of UTF-16, UTF-32 or EBCDIC documents are rejected since the
/// tokenizer only reads UTF-8. Works on prefixes shorter than
/// [`PROBE_LEN`] as well.
pub fn sniff_encoding(prefix: &[u8]) -> Result<usize> {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (&[0x00, 0x00, 0xFE, 0xFF], "UTF-32BE"),
        (&[0xFF, 0xFE, 0x00, 0x00], "UTF-32LE"),
        (&[0xFE, 0xFF], "UTF-16BE"),
        (&[0xFF, 0xFE], "UTF-16LE"),
        (&[0x00, 0x3C, 0x00, 0x3F], "UTF-16BE"),
        (&[0x3C, 0x00, 0x3F, 0x00], "UTF-16LE"),
        (&[0x4C, 0x6F, 0xA7, 0x94], "EBCDIC"),
    ];

    if prefix.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return Ok(3);
    }
    for (signature, name) in SIGNATURES {
        if prefix.starts_with(signature) {
            return Err(Error::Syntax(format!("unsupported document encoding: {}", name)));
        }
    }
    Ok(0)
}
