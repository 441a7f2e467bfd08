use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::IgnoredAny;
use sfvdf::{KvObject, KvValue};

use super::{Channel, GameFinder, Scan, Storefront, StorefrontError, first_match};

pub const STEAM_APP_ID: &str = "526870";
pub const STEAM_REGISTRY_KEY: &str = r"SOFTWARE\WOW6432Node\Valve\Steam";
pub const STEAM_REGISTRY_VALUE: &str = "InstallPath";
pub const LIBRARY_FOLDERS_VDF: &str = "libraryfolders.vdf";

const STEAMAPPS_DIR: &str = "steamapps";
const COMMON_DIR: &str = "common";

pub fn app_manifest_name(app_id: &str) -> String {
    format!("appmanifest_{}.acf", app_id)
}

/// A Steam library folder and the apps Steam believes are installed in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontLibrary {
    pub path: PathBuf,
    pub installed_app_ids: BTreeSet<String>,
}

impl StorefrontLibrary {
    fn steamapps(&self) -> PathBuf {
        self.path.join(STEAMAPPS_DIR)
    }
}

#[derive(Deserialize)]
struct LibraryFolderEntry {
    path: String,
    apps: BTreeMap<String, IgnoredAny>,
}

impl TryFrom<&KvValue> for StorefrontLibrary {
    type Error = sfvdf::Error;

    fn try_from(value: &KvValue) -> Result<Self, Self::Error> {
        let entry: LibraryFolderEntry = sfvdf::from_value(value)?;
        Ok(StorefrontLibrary {
            path: PathBuf::from(entry.path),
            installed_app_ids: entry.apps.into_keys().collect(),
        })
    }
}

/// `appmanifest_<id>.acf`, reduced to what channel matching needs.
#[derive(Debug, Clone, Default)]
pub struct AppManifest {
    pub app_state: AppState,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppState {
    #[serde(default)]
    pub installdir: Option<String>,
    #[serde(rename = "UserConfig", default)]
    pub user_config: Option<UserConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub betakey: Option<String>,
}

impl AppManifest {
    /// Reads the `AppState` block, matched by position since its key case
    /// is not fixed.
    pub fn from_vdf(vdf: &KvObject) -> Result<Self, String> {
        let (_, state) = vdf.root().ok_or("no top-level block")?;
        let app_state = sfvdf::from_object(state).map_err(|err| err.to_string())?;
        Ok(Self { app_state })
    }

    /// Only a `betakey` of exactly `experimental` marks the experimental
    /// branch; any other key, or none, is early access.
    pub fn channel(&self) -> Channel {
        let betakey = self
            .app_state
            .user_config
            .as_ref()
            .and_then(|config| config.betakey.as_deref());
        match betakey {
            Some("experimental") => Channel::Experimental,
            _ => Channel::EarlyAccess,
        }
    }

    pub fn install_dir(&self) -> Option<&str> {
        self.app_state.installdir.as_deref()
    }
}

impl GameFinder<'_> {
    pub(crate) fn find_steam(&self, channel: Channel) -> Result<PathBuf, StorefrontError> {
        let root = self.read_registry(Storefront::Steam, STEAM_REGISTRY_KEY, STEAM_REGISTRY_VALUE)?;
        log::debug!("Steam install root: {}", root.display());

        let vdf_path = root.join(STEAMAPPS_DIR).join(LIBRARY_FOLDERS_VDF);
        if !self.fs.is_file(&vdf_path) {
            return Err(StorefrontError::MissingFile(vdf_path));
        }

        let vdf = self.load_vdf(&vdf_path)?;
        let (_, folders) = vdf
            .root()
            .ok_or_else(|| StorefrontError::NoLibraryFolders(vdf_path.clone()))?;

        first_match(Storefront::Steam, folders, |(key, value)| {
            self.check_library(key, value, channel)
        })
    }

    fn check_library(&self, key: &str, value: &KvValue, channel: Channel) -> Scan<PathBuf> {
        let library = match StorefrontLibrary::try_from(value) {
            Ok(library) => library,
            Err(err) => return Scan::Skip(format!("library entry \"{}\": {}", key, err)),
        };
        if !self.fs.is_dir(&library.path) {
            return Scan::Skip(format!("library {} does not exist", library.path.display()));
        }
        if !library.installed_app_ids.contains(STEAM_APP_ID) {
            return Scan::Skip(format!(
                "library {} does not list app {}",
                library.path.display(),
                STEAM_APP_ID
            ));
        }

        let steamapps = library.steamapps();
        let manifest_path = steamapps.join(app_manifest_name(STEAM_APP_ID));
        if !self.fs.is_file(&manifest_path) {
            return Scan::Skip(format!("{} does not exist", manifest_path.display()));
        }

        let manifest = match self.load_app_manifest(&manifest_path) {
            Ok(manifest) => manifest,
            Err(StorefrontError::Io { path, source }) => {
                return Scan::Abort(StorefrontError::Io { path, source });
            }
            Err(err) => return Scan::Skip(err.to_string()),
        };

        let installed = manifest.channel();
        if installed != channel {
            return Scan::Skip(format!(
                "library {} has the {} branch installed",
                library.path.display(),
                installed
            ));
        }

        let Some(install_dir) = manifest.install_dir() else {
            return Scan::Skip(format!("{} has no installdir", manifest_path.display()));
        };

        let install_path = steamapps.join(COMMON_DIR).join(install_dir);
        if !self.fs.is_dir(&install_path) {
            return Scan::Skip(format!("{} does not exist", install_path.display()));
        }
        Scan::Found(install_path)
    }

    fn load_app_manifest(&self, path: &Path) -> Result<AppManifest, StorefrontError> {
        let vdf = self.load_vdf(path)?;
        AppManifest::from_vdf(&vdf).map_err(|reason| StorefrontError::Malformed {
            path: path.to_path_buf(),
            reason,
        })
    }
}
