use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{Channel, GameFinder, Scan, Storefront, StorefrontError, first_match};

pub const EPIC_REGISTRY_KEY: &str = r"SOFTWARE\WOW6432Node\Epic Games\EpicGamesLauncher";
pub const EPIC_REGISTRY_VALUE: &str = "AppDataPath";
pub const MANIFESTS_DIR: &str = "Manifests";
pub const ITEM_EXTENSION: &str = ".item";

/// Epic's catalog item id for each release track. Display names are not
/// stable enough to match on.
pub fn catalog_item_id(channel: Channel) -> &'static str {
    match channel {
        Channel::Experimental => "ef4a63daa7d4420e91420a72050be89d",
        Channel::EarlyAccess => "b915dfe8dcf74770841c82a4162dc954",
    }
}

/// One `.item` file from the launcher's `Manifests` directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LauncherItemManifest {
    pub catalog_item_id: String,
    pub install_location: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub app_name: Option<String>,
}

impl GameFinder<'_> {
    pub(crate) fn find_epic(&self, channel: Channel) -> Result<PathBuf, StorefrontError> {
        let catalog_id = catalog_item_id(channel);
        let data_root = self.read_registry(Storefront::Epic, EPIC_REGISTRY_KEY, EPIC_REGISTRY_VALUE)?;

        let manifests = data_root.join(MANIFESTS_DIR);
        if !self.fs.is_dir(&manifests) {
            return Err(StorefrontError::MissingDirectory {
                storefront: Storefront::Epic,
                path: manifests,
            });
        }

        let files = self
            .fs
            .list_files(&manifests)
            .map_err(|source| StorefrontError::Io {
                path: manifests.clone(),
                source,
            })?;
        let items = files.into_iter().filter(|path| {
            path.file_name()
                .is_some_and(|name| name.to_string_lossy().ends_with(ITEM_EXTENSION))
        });

        first_match(Storefront::Epic, items, |path| self.check_item(&path, catalog_id))
    }

    fn check_item(&self, path: &Path, catalog_id: &str) -> Scan<PathBuf> {
        let text = match self.fs.read_to_string(path) {
            Ok(text) => text,
            Err(source) => {
                return Scan::Abort(StorefrontError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        // Only the id has to be readable to rule an item out.
        let json: serde_json::Value = match serde_json::from_str(&text) {
            Ok(json) => json,
            Err(err) => return Scan::Skip(format!("{}: {}", path.display(), err)),
        };
        let Some(id) = json.get("CatalogItemId").and_then(|id| id.as_str()) else {
            return Scan::Skip(format!("{} has no CatalogItemId", path.display()));
        };
        if id != catalog_id {
            return Scan::Skip(format!("{} is catalog item {}", path.display(), id));
        }

        match LauncherItemManifest::deserialize(json) {
            Ok(item) => {
                log::debug!(
                    "Matched {} ({})",
                    item.display_name.as_deref().unwrap_or("unnamed item"),
                    item.app_name.as_deref().unwrap_or("?")
                );
                Scan::Found(PathBuf::from(item.install_location))
            }
            Err(err) => Scan::Skip(format!("{}: {}", path.display(), err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_differ_per_channel() {
        assert_eq!(
            catalog_item_id(Channel::Experimental),
            "ef4a63daa7d4420e91420a72050be89d"
        );
        assert_eq!(
            catalog_item_id(Channel::EarlyAccess),
            "b915dfe8dcf74770841c82a4162dc954"
        );
    }

    #[test]
    fn item_manifest_ignores_unknown_fields() {
        let item: LauncherItemManifest = serde_json::from_str(
            r#"{
                "FormatVersion": 0,
                "DisplayName": "Satisfactory Experimental",
                "CatalogItemId": "ef4a63daa7d4420e91420a72050be89d",
                "InstallLocation": "C:\\Program Files\\Epic Games\\SatisfactoryExperimental",
                "AppName": "CrabTest"
            }"#,
        )
        .unwrap();
        assert_eq!(
            item.install_location,
            r"C:\Program Files\Epic Games\SatisfactoryExperimental"
        );
        assert_eq!(item.display_name.as_deref(), Some("Satisfactory Experimental"));
    }
}
