//! Server version parsing and pagination strategy selection

use once_cell::sync::Lazy;
use regex::Regex;

use super::models::GitlabVersion;

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\.(\d+)\.(\d+)").expect("Invalid version regex"));

/// Numeric `major.minor.patch` prefix of a GitLab version string
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ParsedVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ParsedVersion {
    /// Parse the leading `major.minor.patch` of `version`
    ///
    /// Suffixes such as `-ee` or `-pre` are ignored. Returns `None` for empty or
    /// malformed strings.
    #[must_use]
    pub fn parse(version: &str) -> Option<Self> {
        let caps = VERSION_RE.captures(version)?;
        Some(Self {
            major: caps[1].parse().ok()?,
            minor: caps[2].parse().ok()?,
            patch: caps[3].parse().ok()?,
        })
    }

    #[must_use]
    pub fn from_gitlab(version: Option<&GitlabVersion>) -> Option<Self> {
        version.and_then(|v| Self::parse(&v.version))
    }
}

/// How project listings are paged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStrategy {
    /// `page=N` with `x-total-pages`
    Offset,
    /// `pagination=keyset` with `Link` header
    Keyset,
}

impl PaginationStrategy {
    /// Pick the strategy for a server version
    ///
    /// Unknown versions use offset pagination. Known versions use offset only
    /// when `major < 13 && minor < 1`; everything else uses keyset.
    #[must_use]
    pub fn for_version(version: Option<ParsedVersion>) -> Self {
        match version {
            None => Self::Offset,
            Some(v) if v.major < 13 && v.minor < 1 => Self::Offset,
            Some(_) => Self::Keyset,
        }
    }
}
