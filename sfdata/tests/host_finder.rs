//! Resolves against real directories on disk, with only the registry and
//! platform faked.

use sfdata::finder::{
    Channel, EPIC_REGISTRY_KEY, EPIC_REGISTRY_VALUE, GameFinder, ResolutionOptions,
    STEAM_APP_ID, STEAM_REGISTRY_KEY, STEAM_REGISTRY_VALUE, app_manifest_name, catalog_item_id,
};
use sfdata::fs::HostFs;
use sfdata::testing::{FakePlatform, MemoryRegistry};
use sfvdf::{KvObject, KvValue};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn library_folders(libraries: &[&Path]) -> String {
    let mut folders = KvObject::new();
    for (index, library) in libraries.iter().enumerate() {
        let mut apps = KvObject::new();
        apps.push(STEAM_APP_ID, KvValue::Str("8000000000".to_string()));
        let mut entry = KvObject::new();
        entry.push("path", KvValue::Str(library.display().to_string()));
        entry.push("label", KvValue::Str(String::new()));
        entry.push("apps", KvValue::Obj(apps));
        folders.push(index.to_string(), KvValue::Obj(entry));
    }
    let mut root = KvObject::new();
    root.push("libraryfolders", KvValue::Obj(folders));
    root.to_string()
}

fn install_on_branch(library: &Path, betakey: &str) {
    let steamapps = library.join("steamapps");
    fs::create_dir_all(steamapps.join("common").join("FactoryGame")).unwrap();
    fs::write(
        steamapps.join(app_manifest_name(STEAM_APP_ID)),
        format!(
            "\"AppState\"\n{{\n\t\"appid\"\t\t\"526870\"\n\t\"installdir\"\t\t\"FactoryGame\"\n\t\"UserConfig\"\n\t{{\n\t\t\"betakey\"\t\t\"{}\"\n\t}}\n}}\n",
            betakey
        ),
    )
    .unwrap();
}

#[test]
fn steam_libraries_on_disk() {
    let dir = tempdir().unwrap();
    let steam = dir.path().join("Steam");
    let early = dir.path().join("LibraryA");
    let experimental = dir.path().join("Library B");
    fs::create_dir_all(steam.join("steamapps")).unwrap();
    fs::write(
        steam.join("steamapps").join("libraryfolders.vdf"),
        library_folders(&[&early, &experimental]),
    )
    .unwrap();
    install_on_branch(&early, "");
    install_on_branch(&experimental, "experimental");

    let registry = MemoryRegistry::new().with_string(
        STEAM_REGISTRY_KEY,
        STEAM_REGISTRY_VALUE,
        &steam.display().to_string(),
    );
    let platform = FakePlatform::windows();
    let finder = GameFinder::new(&registry, &HostFs, &platform);

    let path = finder
        .resolve(&ResolutionOptions::new(Channel::Experimental, true, false))
        .unwrap();
    assert_eq!(path, experimental.join("steamapps").join("common").join("FactoryGame"));

    let path = finder
        .resolve(&ResolutionOptions::new(Channel::EarlyAccess, true, false))
        .unwrap();
    assert_eq!(path, early.join("steamapps").join("common").join("FactoryGame"));
}

#[test]
fn epic_manifests_on_disk() {
    let dir = tempdir().unwrap();
    let manifests = dir.path().join("EpicData").join("Manifests");
    fs::create_dir_all(manifests.join("Pending")).unwrap();
    let item = serde_json::json!({
        "DisplayName": "Satisfactory",
        "CatalogItemId": catalog_item_id(Channel::EarlyAccess),
        "InstallLocation": "E:\\Epic\\SatisfactoryEarlyAccess",
    });
    fs::write(manifests.join("0A1B2C.item"), item.to_string()).unwrap();
    fs::write(manifests.join("Pending").join("ignored.item"), "{").unwrap();

    let registry = MemoryRegistry::new().with_string(
        EPIC_REGISTRY_KEY,
        EPIC_REGISTRY_VALUE,
        &dir.path().join("EpicData").display().to_string(),
    );
    let platform = FakePlatform::windows();
    let finder = GameFinder::new(&registry, &HostFs, &platform);

    let path = finder
        .resolve(&ResolutionOptions::new(Channel::EarlyAccess, false, true))
        .unwrap();
    assert_eq!(path, Path::new("E:\\Epic\\SatisfactoryEarlyAccess"));

    let err = finder
        .resolve(&ResolutionOptions::new(Channel::Experimental, false, true))
        .unwrap_err();
    assert!(err.is_not_found());
}
