//! Error types for install discovery.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::{Channel, ResolutionOptions};
use crate::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storefront {
    Steam,
    Epic,
}

impl fmt::Display for Storefront {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Storefront::Steam => write!(f, "Steam"),
            Storefront::Epic => write!(f, "Epic Games"),
        }
    }
}

/// Failure of a single storefront lookup.
#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("{storefront} is not installed properly: registry value {key_path}\\{value_name} not found")]
    NotInstalled {
        storefront: Storefront,
        key_path: &'static str,
        value_name: &'static str,
    },
    #[error("{} does not exist", .0.display())]
    MissingFile(PathBuf),
    #[error("{storefront} directory \"{}\" does not exist", .path.display())]
    MissingDirectory {
        storefront: Storefront,
        path: PathBuf,
    },
    #[error("No library folders block in Steam VDF at {}", .0.display())]
    NoLibraryFolders(PathBuf),
    #[error("Could not parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: sfvdf::ParseError,
    },
    #[error("Unexpected layout in {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Could not find installed game in any {0} library")]
    NotFound(Storefront),
}

/// Failure of [`super::GameFinder::resolve`].
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("invalid options: {0}")]
    InvalidOptions(#[from] ValidationError),
    #[error("game lookup is not supported on {platform}; pass the install directory instead")]
    UnsupportedPlatform { platform: String },
    #[error("Could not find {channel} installation: {source}. Options={options}")]
    Resolution {
        channel: Channel,
        options: ResolutionOptions,
        #[source]
        source: StorefrontError,
    },
    #[error("An unknown error occurred looking for the {channel} installation. Options={options}")]
    Unknown {
        channel: Channel,
        options: ResolutionOptions,
    },
}

impl ResolveError {
    /// The storefront failure behind a `Resolution` error.
    pub fn storefront_error(&self) -> Option<&StorefrontError> {
        match self {
            ResolveError::Resolution { source, .. } => Some(source),
            _ => None,
        }
    }

    /// True when every consulted storefront was scanned without a match.
    pub fn is_not_found(&self) -> bool {
        matches!(self.storefront_error(), Some(StorefrontError::NotFound(_)))
    }
}
