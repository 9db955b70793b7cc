//! Resource - a single mirror or peer-to-peer source for a file.

use std::fmt;
use std::str::FromStr;

/// Protocol family of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResourceType {
    /// Plain HTTP mirror
    Http,
    /// HTTPS mirror
    Https,
    /// FTP mirror
    Ftp,
    /// A .torrent describing the file
    BitTorrent,
    /// Anything the download engine has no client for
    NotSupported,
}

impl ResourceType {
    /// Infers the type from a URL scheme.
    ///
    /// Used when a `<url>` omits its `type` attribute, which Metalink 4
    /// always does.
    pub fn from_url(url: &str) -> Self {
        match url.split_once("://") {
            Some((scheme, _)) => scheme.parse().unwrap_or(ResourceType::NotSupported),
            None => ResourceType::NotSupported,
        }
    }

    /// Maps a `<metaurl mediatype>` value to a type.
    pub fn from_media_type(media_type: &str) -> Self {
        match media_type.to_lowercase().as_str() {
            "torrent" | "application/x-bittorrent" => ResourceType::BitTorrent,
            _ => ResourceType::NotSupported,
        }
    }

    /// Returns the Metalink 3 `type` attribute value.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Http => "http",
            ResourceType::Https => "https",
            ResourceType::Ftp => "ftp",
            ResourceType::BitTorrent => "bittorrent",
            ResourceType::NotSupported => "unsupported",
        }
    }

    /// Returns true if the download engine can use this resource.
    pub fn is_supported(&self) -> bool {
        !matches!(self, ResourceType::NotSupported)
    }
}

impl FromStr for ResourceType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "http" => ResourceType::Http,
            "https" => ResourceType::Https,
            "ftp" => ResourceType::Ftp,
            "bittorrent" | "torrent" => ResourceType::BitTorrent,
            _ => ResourceType::NotSupported,
        })
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A location the file can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resource {
    /// Protocol family
    pub resource_type: ResourceType,
    /// The URL
    pub url: String,
    /// ISO 3166-1 country code of the mirror
    pub location: Option<String>,
    /// Metalink 4 priority (1 is most preferred)
    pub priority: Option<u32>,
    /// Metalink 3 preference (100 is most preferred)
    pub preference: Option<u32>,
    /// Per-mirror connection limit
    pub max_connections: Option<u32>,
}

impl Resource {
    /// Creates a resource with an empty URL.
    pub fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            url: String::new(),
            location: None,
            priority: None,
            preference: None,
            max_connections: None,
        }
    }

    /// Creates a resource for a URL, inferring its type from the scheme.
    pub fn with_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let mut resource = Self::new(ResourceType::from_url(&url));
        resource.url = url;
        resource
    }

    /// Returns true if the mirror's location matches (case-insensitive).
    pub fn is_located_in(&self, location: &str) -> bool {
        self.location
            .as_deref()
            .is_some_and(|l| l.eq_ignore_ascii_case(location))
    }
}
