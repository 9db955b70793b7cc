//! metalink_info - Print the contents of a Metalink file.
//!
//! This tool parses a Metalink document and lists every file it describes,
//! together with its size, checksums and mirrors.
//!
//! # Usage
//!
//! ```bash
//! metalink_info [OPTIONS] <FILENAME>
//! ```
//!
//! # Examples
//!
//! ```bash
//! # List files and mirrors
//! metalink_info ubuntu.metalink
//!
//! # Parse in 512-byte windows, as a download in progress would be
//! metalink_info --stream --chunk-size 512 ubuntu.metalink
//!
//! # Put mirrors in Japan and Korea first
//! metalink_info --location jp --location kr ubuntu.metalink
//!
//! # Enable debug output
//! metalink_info --debug ubuntu.metalink
//! ```

use std::fs::File;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use metalink_rs::objects::{MetalinkEntry, Metalinker};
use metalink_rs::processor::{MetalinkProcessor, ProcessorOptions};
use metalink_rs::ParseError;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Print the contents of a Metalink file.
#[derive(Parser, Debug)]
#[command(name = "metalink_info")]
#[command(version = VERSION)]
#[command(about = "Print the files and mirrors listed in a Metalink file")]
struct Args {
    /// Metalink file to read
    filename: String,

    /// Parse the file window by window instead of as a whole
    #[arg(long)]
    stream: bool,

    /// Window size in bytes for --stream
    #[arg(long, default_value_t = 4096)]
    chunk_size: usize,

    /// Preferred mirror location (ISO 3166-1 code); may be repeated
    ///
    /// Mirrors in these locations are listed first.
    #[arg(long = "location")]
    locations: Vec<String>,

    /// Enable debug output
    ///
    /// Logs parser progress to stderr. RUST_LOG overrides the level.
    #[arg(long)]
    debug: bool,
}

fn init_logging(debug: bool) {
    let default = if debug { "metalink_rs=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(args: &Args) -> Result<Metalinker, ParseError> {
    if args.stream {
        let processor =
            MetalinkProcessor::with_options(ProcessorOptions::new().window_size(args.chunk_size));
        let file = File::open(&args.filename).map_err(metalink_rs::Error::from)?;
        processor.parse_stream(file)
    } else {
        MetalinkProcessor::new().parse_file(&args.filename)
    }
}

/// Applies the mirror ordering the user asked for.
fn arrange(entry: &mut MetalinkEntry, locations: &[String]) {
    entry.reorder_resources_by_priority();
    if !locations.is_empty() {
        let locations: Vec<&str> = locations.iter().map(String::as_str).collect();
        entry.prefer_locations(&locations);
    }
}

fn describe(entry: &MetalinkEntry) -> String {
    let mut out = format!("{}\n", entry.filename);
    if let Some(size) = entry.size {
        out.push_str(&format!("  size: {}\n", size));
    }
    for (label, value) in [
        ("version", &entry.version),
        ("language", &entry.language),
        ("os", &entry.os),
    ] {
        if let Some(value) = value {
            out.push_str(&format!("  {}: {}\n", label, value));
        }
    }
    for checksum in &entry.checksums {
        out.push_str(&format!("  {}: {}\n", checksum.algorithm, checksum.digest));
    }
    if let Some(pieces) = &entry.piece_hashes {
        out.push_str(&format!(
            "  pieces: {} x {} bytes ({})\n",
            pieces.len(),
            pieces.length,
            pieces.algorithm
        ));
    }
    if let Some(signature) = &entry.signature {
        out.push_str(&format!("  signature: {}\n", signature.signature_type));
    }
    for resource in &entry.resources {
        let location = resource.location.as_deref().unwrap_or("--");
        out.push_str(&format!(
            "  [{}] {:<10} {}\n",
            location,
            resource.resource_type.as_str(),
            resource.url
        ));
    }
    out
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.debug);

    let metalinker = match load(&args) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error reading {}: {}", args.filename, e);
            return Err(e.into());
        }
    };

    if let Some(generator) = &metalinker.generator {
        println!("generator: {}", generator);
    }
    if let Some(published) = &metalinker.published {
        println!("published: {}", published.to_rfc3339());
    }

    for mut entry in metalinker.into_entries() {
        arrange(&mut entry, &args.locations);
        print!("{}", describe(&entry));
    }

    Ok(())
}
