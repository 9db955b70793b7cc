//! Streaming Metalink parser for Rust.
//!
//! This crate reads Metalink documents (Metalink 3.0 and RFC 5854
//! Metalink 4) into a [`Metalinker`]: the list of files a download
//! engine should fetch, with their mirrors, checksums, piece hashes and
//! signatures.
//!
//! # Features
//!
//! - **Incremental parsing**: Documents are fed to the tokenizer window by
//!   window, so a document can be parsed while it is still arriving.
//! - **Grammar table**: Known elements are mapped through a static
//!   transition table; unknown elements and extension namespaces are
//!   skipped.
//! - **Mirror selection**: Resources can be filtered by protocol and
//!   ordered by priority or location.
//! - **Serde Support**: Optional serialization with the `serde` feature.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use metalink_rs::parse_file;
//!
//! let metalinker = parse_file("ubuntu.metalink").unwrap();
//!
//! for entry in &metalinker {
//!     println!("File: {}, Size: {:?}", entry.filename, entry.size);
//!     for resource in &entry.resources {
//!         println!("  {} {}", resource.resource_type, resource.url);
//!     }
//! }
//! ```
//!
//! # Streaming API
//!
//! Any [`ByteSource`] can be parsed in fixed-size windows:
//!
//! ```rust,no_run
//! use metalink_rs::processor::{MetalinkProcessor, ProcessorOptions};
//! use std::fs::File;
//!
//! let processor = MetalinkProcessor::with_options(ProcessorOptions::new().window_size(1024));
//! let metalinker = processor.parse_stream(File::open("ubuntu.metalink").unwrap()).unwrap();
//! println!("{} file(s)", metalinker.len());
//! ```
//!
//! # Module Structure
//!
//! - [`objects`] - Metalink data structures
//! - [`processor`] - File and stream entry points
//! - [`source`] - Positioned byte sources
//! - [`feeder`] - Window-by-window feeding of the tokenizer
//! - [`adapter`] - Tokenizer events to element events
//! - [`grammar`] - Grammar states and transition table
//! - [`state_machine`] - Builds the document from element events
//! - [`error`] - Error types
//!
//! # Optional Features
//!
//! - `serde` - Enable serde serialization/deserialization support
//! - `cli` - Build the `metalink_info` command-line tool

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod adapter;
pub mod error;
pub mod feeder;
pub mod grammar;
pub mod objects;
pub mod processor;
pub mod source;
pub mod state_machine;

// Re-export commonly used types at the crate root
pub use error::{Error, ParseError, Result};
pub use objects::{
    Checksum, HashType, MetalinkEntry, Metalinker, PieceHashList, Resource, ResourceType,
    Signature,
};
pub use processor::{parse_file, parse_slice, parse_stream, MetalinkProcessor, ProcessorOptions};
pub use source::ByteSource;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
