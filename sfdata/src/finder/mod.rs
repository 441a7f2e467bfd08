//! Locates an installed copy of Satisfactory through Steam or the Epic Games
//! Launcher.
//!
//! Steam is tried first unless Epic-only was requested. A failed Steam lookup
//! falls through to Epic unless Steam-only was requested. Storefront metadata
//! is often stale (uninstalled games still listed, wrong branch recorded), so
//! every Steam candidate is checked against the filesystem and unusable
//! entries are skipped rather than treated as fatal.

mod epic;
mod error;
mod steam;

pub use epic::{
    EPIC_REGISTRY_KEY, EPIC_REGISTRY_VALUE, ITEM_EXTENSION, LauncherItemManifest, MANIFESTS_DIR,
    catalog_item_id,
};
pub use error::{ResolveError, Storefront, StorefrontError};
pub use steam::{
    AppManifest, AppState, LIBRARY_FOLDERS_VDF, STEAM_APP_ID, STEAM_REGISTRY_KEY,
    STEAM_REGISTRY_VALUE, StorefrontLibrary, UserConfig, app_manifest_name,
};

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sfvdf::KvObject;

use crate::fs::{FileSystem, HostFs};
use crate::registry::{HostPlatform, HostRegistry, PlatformInfo, RegistryReader};
use crate::validation::{ONE_OF, Test, ValidationError, Validator, fill_template};

/// Satisfactory release track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Experimental,
    EarlyAccess,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Experimental, Channel::EarlyAccess];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Experimental => "experimental",
            Channel::EarlyAccess => "earlyaccess",
        }
    }

    fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(Channel::as_str).collect()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError {
                errors: vec![fill_template(ONE_OF, &["channel", &Self::names().join(", ")])],
            })
    }
}

/// What to look for and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionOptions {
    channel: Channel,
    only_steam: bool,
    only_epic: bool,
}

impl Default for ResolutionOptions {
    fn default() -> Self {
        Self::new(Channel::Experimental, false, false)
    }
}

impl ResolutionOptions {
    /// Builds options without checking them; [`GameFinder::resolve`] validates.
    pub fn new(channel: Channel, only_steam: bool, only_epic: bool) -> Self {
        Self {
            channel,
            only_steam,
            only_epic,
        }
    }

    /// Builds options from a channel name, validating everything.
    pub fn parse(channel: &str, only_steam: bool, only_epic: bool) -> Result<Self, ValidationError> {
        Validator::accumulate()
            .require_mutually_exclusive(&storefront_flags(only_steam, only_epic))?
            .require_one_of("channel", &channel, &Channel::names())?
            .finish(None)?;
        let channel = channel.parse()?;
        Ok(Self::new(channel, only_steam, only_epic))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        Validator::accumulate()
            .require_mutually_exclusive(&storefront_flags(self.only_steam, self.only_epic))?
            .finish(None)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn only_steam(&self) -> bool {
        self.only_steam
    }

    pub fn only_epic(&self) -> bool {
        self.only_epic
    }
}

impl fmt::Display for ResolutionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ channel: {}, onlySteam: {}, onlyEpic: {} }}",
            self.channel, self.only_steam, self.only_epic
        )
    }
}

fn storefront_flags(only_steam: bool, only_epic: bool) -> [Test<'static>; 2] {
    [
        Test::new("onlySteam", only_steam),
        Test::new("onlyEpic", only_epic),
    ]
}

/// Outcome of checking one library or manifest entry.
pub(crate) enum Scan<T> {
    Found(T),
    /// This entry is unusable; keep scanning.
    Skip(String),
    /// Stop the whole storefront lookup.
    Abort(StorefrontError),
}

/// Returns the first entry `check` accepts.
fn first_match<I, T, F>(storefront: Storefront, entries: I, mut check: F) -> Result<T, StorefrontError>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Scan<T>,
{
    for entry in entries {
        match check(entry) {
            Scan::Found(found) => return Ok(found),
            Scan::Skip(reason) => log::debug!("{}: skipping {}", storefront, reason),
            Scan::Abort(err) => return Err(err),
        }
    }
    Err(StorefrontError::NotFound(storefront))
}

/// Install resolver over injectable registry, filesystem and platform access.
pub struct GameFinder<'a> {
    registry: &'a dyn RegistryReader,
    fs: &'a dyn FileSystem,
    platform: &'a dyn PlatformInfo,
}

impl<'a> GameFinder<'a> {
    pub fn new(
        registry: &'a dyn RegistryReader,
        fs: &'a dyn FileSystem,
        platform: &'a dyn PlatformInfo,
    ) -> Self {
        Self {
            registry,
            fs,
            platform,
        }
    }

    /// Finds the install directory for `options.channel()`.
    ///
    /// Nothing is cached; every call re-reads the registry and manifests.
    pub fn resolve(&self, options: &ResolutionOptions) -> Result<PathBuf, ResolveError> {
        options.validate()?;

        if !self.platform.supports_registry_lookup() {
            return Err(ResolveError::UnsupportedPlatform {
                platform: self.platform.name().to_string(),
            });
        }

        let channel = options.channel();
        let wrap = |source: StorefrontError| ResolveError::Resolution {
            channel,
            options: *options,
            source,
        };

        if !options.only_epic() {
            match self.find_steam(channel) {
                Ok(path) => {
                    log::info!("Found {} installation via Steam: {}", channel, path.display());
                    return Ok(path);
                }
                Err(err) if options.only_steam() => return Err(wrap(err)),
                Err(err) => log::info!("Steam lookup failed, trying Epic Games: {}", err),
            }
        }

        if !options.only_steam() {
            return self
                .find_epic(channel)
                .inspect(|path| {
                    log::info!(
                        "Found {} installation via Epic Games: {}",
                        channel,
                        path.display()
                    )
                })
                .map_err(wrap);
        }

        Err(ResolveError::Unknown {
            channel,
            options: *options,
        })
    }

    fn read_registry(
        &self,
        storefront: Storefront,
        key_path: &'static str,
        value_name: &'static str,
    ) -> Result<PathBuf, StorefrontError> {
        self.registry
            .read_string(key_path, value_name)
            .map(PathBuf::from)
            .ok_or(StorefrontError::NotInstalled {
                storefront,
                key_path,
                value_name,
            })
    }

    fn load_vdf(&self, path: &Path) -> Result<KvObject, StorefrontError> {
        let text = self
            .fs
            .read_to_string(path)
            .map_err(|source| StorefrontError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        sfvdf::from_str(&text).map_err(|source| StorefrontError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Resolves against the real registry and filesystem.
pub fn find_game(options: &ResolutionOptions) -> Result<PathBuf, ResolveError> {
    let registry = HostRegistry::default();
    GameFinder::new(&registry, &HostFs, &HostPlatform).resolve(options)
}

#[cfg(test)]
mod tests;
