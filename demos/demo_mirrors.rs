//! demo_mirrors - Count mirrors per location and protocol.
//!
//! This demo reads a Metalink file and reports, for every mirror location,
//! how many usable resources it offers and over which protocols. Resources
//! the download engine cannot use are left out.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example demo_mirrors <filename.metalink>
//! ```
//!
//! # Output
//!
//! The output is a formatted table with columns:
//! - Location: Mirror location (or "(none)" if not given)
//! - Count: Number of resources in that location
//! - Protocols: Protocols offered there

use std::collections::{BTreeMap, BTreeSet};
use std::env;

use metalink_rs::objects::{Metalinker, ResourceType};

/// Resources found in one location.
#[derive(Default)]
struct LocationStats {
    count: u64,
    protocols: BTreeSet<&'static str>,
}

impl LocationStats {
    fn add(&mut self, resource_type: ResourceType) {
        self.count += 1;
        self.protocols.insert(resource_type.as_str());
    }
}

/// Groups the usable resources of every entry by location.
fn collect_stats(metalinker: Metalinker) -> BTreeMap<String, LocationStats> {
    let mut stats: BTreeMap<String, LocationStats> = BTreeMap::new();

    for mut entry in metalinker.into_entries() {
        entry.drop_unsupported_resources();
        for resource in &entry.resources {
            let location = resource
                .location
                .as_deref()
                .map(str::to_lowercase)
                .unwrap_or_default();
            stats
                .entry(location)
                .or_default()
                .add(resource.resource_type);
        }
    }

    stats
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <filename.metalink>", args[0]);
        std::process::exit(1);
    }

    let metalinker = match metalink_rs::parse_file(&args[1]) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error parsing Metalink: {}", e);
            return Err(e.into());
        }
    };

    println!("{:>10}    {:>6}  {}", "Location", "Count", "Protocols");

    for (location, s) in collect_stats(metalinker) {
        let display_location = if location.is_empty() {
            "(none)"
        } else {
            location.as_str()
        };
        let protocols: Vec<_> = s.protocols.into_iter().collect();
        println!(
            "{:>10}    {:>6}  {}",
            display_location,
            s.count,
            protocols.join(",")
        );
    }

    Ok(())
}
