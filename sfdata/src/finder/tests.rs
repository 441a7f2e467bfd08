use super::*;
use crate::testing::{FakePlatform, MemoryFs, MemoryRegistry};

const STEAM_ROOT: &str = "/steam";
const EPIC_DATA: &str = "/epic";
const LIBRARY_VDF: &str = "/steam/steamapps/libraryfolders.vdf";
const MANIFESTS: &str = "/epic/Manifests";

fn steam_registry() -> MemoryRegistry {
    MemoryRegistry::new().with_string(STEAM_REGISTRY_KEY, STEAM_REGISTRY_VALUE, STEAM_ROOT)
}

fn both_registry() -> MemoryRegistry {
    steam_registry().with_string(EPIC_REGISTRY_KEY, EPIC_REGISTRY_VALUE, EPIC_DATA)
}

fn epic_registry() -> MemoryRegistry {
    MemoryRegistry::new().with_string(EPIC_REGISTRY_KEY, EPIC_REGISTRY_VALUE, EPIC_DATA)
}

/// `libraryfolders.vdf` listing each library with its app ids.
fn library_folders(libraries: &[(&str, &[&str])]) -> String {
    let mut vdf = String::from("\"libraryfolders\"\n{\n");
    for (index, (path, apps)) in libraries.iter().enumerate() {
        vdf.push_str(&format!("\t\"{}\"\n\t{{\n\t\t\"path\"\t\t\"{}\"\n", index, path));
        vdf.push_str("\t\t\"label\"\t\t\"\"\n\t\t\"apps\"\n\t\t{\n");
        for app in apps.iter() {
            vdf.push_str(&format!("\t\t\t\"{}\"\t\t\"4096\"\n", app));
        }
        vdf.push_str("\t\t}\n\t}\n");
    }
    vdf.push_str("}\n");
    vdf
}

fn app_manifest(betakey: Option<&str>) -> String {
    let user_config = match betakey {
        Some(key) => format!("\t\"UserConfig\"\n\t{{\n\t\t\"betakey\"\t\t\"{}\"\n\t}}\n", key),
        None => String::new(),
    };
    format!(
        "\"AppState\"\n{{\n\t\"appid\"\t\t\"526870\"\n\t\"name\"\t\t\"Satisfactory\"\n\t\"installdir\"\t\t\"FactoryGame\"\n{}}}\n",
        user_config
    )
}

fn manifest_path(library: &str) -> PathBuf {
    Path::new(library)
        .join("steamapps")
        .join(app_manifest_name(STEAM_APP_ID))
}

fn install_path(library: &str) -> PathBuf {
    Path::new(library)
        .join("steamapps")
        .join("common")
        .join("FactoryGame")
}

/// A library holding a complete install on the given branch.
fn with_installed(fs: MemoryFs, library: &str, betakey: Option<&str>) -> MemoryFs {
    fs.with_file(manifest_path(library), app_manifest(betakey))
        .with_dir(install_path(library))
}

fn item(catalog_id: &str, install_location: &str) -> String {
    format!(
        r#"{{
    "FormatVersion": 0,
    "DisplayName": "Satisfactory",
    "CatalogItemId": "{}",
    "InstallLocation": "{}",
    "AppName": "CrabEA"
}}"#,
        catalog_id, install_location
    )
}

fn resolve(
    registry: &MemoryRegistry,
    fs: &MemoryFs,
    options: ResolutionOptions,
) -> Result<PathBuf, ResolveError> {
    GameFinder::new(registry, fs, &FakePlatform::windows()).resolve(&options)
}

#[test]
fn conflicting_storefront_flags_fail_before_any_io() {
    let registry = both_registry();
    let fs = with_installed(
        MemoryFs::new().with_file(LIBRARY_VDF, library_folders(&[("/lib1", &[STEAM_APP_ID])])),
        "/lib1",
        None,
    );

    for channel in Channel::ALL {
        let err = resolve(&registry, &fs, ResolutionOptions::new(channel, true, true)).unwrap_err();
        match err {
            ResolveError::InvalidOptions(err) => {
                assert_eq!(err.errors, vec!["onlySteam, onlyEpic are mutually exclusive"]);
            }
            other => panic!("expected InvalidOptions, got {:?}", other),
        }
    }
    assert_eq!(registry.reads(), 0);
    assert_eq!(fs.accesses(), 0);
}

#[test]
fn unknown_channel_is_invalid() {
    let err = ResolutionOptions::parse("stable", false, false).unwrap_err();
    assert_eq!(
        err.errors,
        vec!["channel must be one of: experimental, earlyaccess"]
    );

    assert!(ResolutionOptions::parse("Experimental", false, false).is_err());
    assert!("EarlyAccess".parse::<Channel>().is_err());

    // Accumulates every problem
    let err = ResolutionOptions::parse("stable", true, true).unwrap_err();
    assert_eq!(err.errors.len(), 2);

    let options = ResolutionOptions::parse("earlyaccess", true, false).unwrap();
    assert_eq!(options.channel(), Channel::EarlyAccess);
    assert!(options.only_steam());
    assert!(!options.only_epic());
}

#[test]
fn early_access_library_resolves_and_experimental_is_not_found() {
    let registry = both_registry();
    let fs = with_installed(
        MemoryFs::new()
            .with_file(LIBRARY_VDF, library_folders(&[("/lib1", &[STEAM_APP_ID])]))
            .with_dir(MANIFESTS),
        "/lib1",
        None,
    );

    let path = resolve(
        &registry,
        &fs,
        ResolutionOptions::new(Channel::EarlyAccess, false, false),
    )
    .unwrap();
    assert_eq!(path, PathBuf::from("/lib1/steamapps/common/FactoryGame"));

    let err = resolve(&registry, &fs, ResolutionOptions::default()).unwrap_err();
    assert!(err.is_not_found(), "{:?}", err);
    assert!(matches!(
        err.storefront_error(),
        Some(StorefrontError::NotFound(Storefront::Epic))
    ));
    assert_eq!(
        err.to_string(),
        "Could not find experimental installation: Could not find installed game in any \
         Epic Games library. Options={ channel: experimental, onlySteam: false, onlyEpic: false }"
    );
}

#[test]
fn fallthrough_reports_missing_epic_launcher() {
    let registry = steam_registry();
    let fs = with_installed(
        MemoryFs::new().with_file(LIBRARY_VDF, library_folders(&[("/lib1", &[STEAM_APP_ID])])),
        "/lib1",
        None,
    );

    let err = resolve(&registry, &fs, ResolutionOptions::default()).unwrap_err();
    assert!(!err.is_not_found());
    assert!(matches!(
        err.storefront_error(),
        Some(StorefrontError::NotInstalled {
            storefront: Storefront::Epic,
            ..
        })
    ));
    assert_eq!(registry.reads(), 2);
}

#[test]
fn experimental_branch_in_second_library_is_found() {
    let registry = steam_registry();
    let fs = MemoryFs::new().with_file(
        LIBRARY_VDF,
        library_folders(&[("/lib1", &[STEAM_APP_ID]), ("/lib2", &["440", STEAM_APP_ID])]),
    );
    let fs = with_installed(fs, "/lib1", None);
    let fs = with_installed(fs, "/lib2", Some("experimental"));

    let path = resolve(
        &registry,
        &fs,
        ResolutionOptions::new(Channel::Experimental, true, false),
    )
    .unwrap();
    assert_eq!(path, PathBuf::from("/lib2/steamapps/common/FactoryGame"));
}

#[test]
fn first_matching_library_wins() {
    let registry = steam_registry();
    let fs = MemoryFs::new().with_file(
        LIBRARY_VDF,
        library_folders(&[("/lib1", &[STEAM_APP_ID]), ("/lib2", &[STEAM_APP_ID])]),
    );
    let fs = with_installed(fs, "/lib1", Some("public"));
    let fs = with_installed(fs, "/lib2", None);

    let path = resolve(
        &registry,
        &fs,
        ResolutionOptions::new(Channel::EarlyAccess, true, false),
    )
    .unwrap();
    assert_eq!(path, PathBuf::from("/lib1/steamapps/common/FactoryGame"));
}

#[test]
fn library_with_missing_path_is_skipped() {
    let registry = steam_registry();
    let fs = with_installed(
        MemoryFs::new().with_file(
            LIBRARY_VDF,
            library_folders(&[("/gone", &[STEAM_APP_ID]), ("/lib2", &[STEAM_APP_ID])]),
        ),
        "/lib2",
        None,
    );

    let path = resolve(
        &registry,
        &fs,
        ResolutionOptions::new(Channel::EarlyAccess, true, false),
    )
    .unwrap();
    assert_eq!(path, PathBuf::from("/lib2/steamapps/common/FactoryGame"));
}

#[test]
fn stale_steam_entries_are_skipped() {
    let only_steam = ResolutionOptions::new(Channel::EarlyAccess, true, false);
    let registry = steam_registry();

    // Steam does not list the app in this library
    let fs = with_installed(
        MemoryFs::new().with_file(LIBRARY_VDF, library_folders(&[("/lib1", &["440"])])),
        "/lib1",
        None,
    );
    assert!(resolve(&registry, &fs, only_steam).unwrap_err().is_not_found());

    // Listed, but no app manifest
    let fs = MemoryFs::new()
        .with_file(LIBRARY_VDF, library_folders(&[("/lib1", &[STEAM_APP_ID])]))
        .with_dir(install_path("/lib1"));
    assert!(resolve(&registry, &fs, only_steam).unwrap_err().is_not_found());

    // Manifest present, install directory removed
    let fs = MemoryFs::new()
        .with_file(LIBRARY_VDF, library_folders(&[("/lib1", &[STEAM_APP_ID])]))
        .with_file(manifest_path("/lib1"), app_manifest(None));
    assert!(resolve(&registry, &fs, only_steam).unwrap_err().is_not_found());

    // Manifest without installdir
    let fs = MemoryFs::new()
        .with_file(LIBRARY_VDF, library_folders(&[("/lib1", &[STEAM_APP_ID])]))
        .with_file(manifest_path("/lib1"), "\"AppState\" { \"appid\" \"526870\" }")
        .with_dir(install_path("/lib1"));
    assert!(resolve(&registry, &fs, only_steam).unwrap_err().is_not_found());
}

#[test]
fn malformed_library_entries_are_skipped() {
    let registry = steam_registry();
    let vdf = r#""libraryfolders"
{
    "contentstatsid"    "-1234"
    "0" { "label" "" "apps" { "526870" "1" } }
    "1" { "path" "/lib1" }
    "2" { "path" "/lib2" "apps" { "526870" "1" } }
}"#;
    let fs = with_installed(MemoryFs::new().with_file(LIBRARY_VDF, vdf), "/lib2", None);

    let path = resolve(
        &registry,
        &fs,
        ResolutionOptions::new(Channel::EarlyAccess, true, false),
    )
    .unwrap();
    assert_eq!(path, PathBuf::from("/lib2/steamapps/common/FactoryGame"));
}

#[test]
fn corrupt_app_manifest_is_skipped() {
    let registry = steam_registry();
    let fs = MemoryFs::new()
        .with_file(
            LIBRARY_VDF,
            library_folders(&[("/lib1", &[STEAM_APP_ID]), ("/lib2", &[STEAM_APP_ID])]),
        )
        .with_file(manifest_path("/lib1"), "\"AppState\"\n{\n\t\"installdir\" \"Factory")
        .with_dir(install_path("/lib1"));
    let fs = with_installed(fs, "/lib2", None);

    let path = resolve(
        &registry,
        &fs,
        ResolutionOptions::new(Channel::EarlyAccess, true, false),
    )
    .unwrap();
    assert_eq!(path, PathBuf::from("/lib2/steamapps/common/FactoryGame"));
}

#[test]
fn unreadable_app_manifest_aborts_steam() {
    let registry = steam_registry();
    let fs = MemoryFs::new()
        .with_file(
            LIBRARY_VDF,
            library_folders(&[("/lib1", &[STEAM_APP_ID]), ("/lib2", &[STEAM_APP_ID])]),
        )
        .with_unreadable_file(manifest_path("/lib1"));
    let fs = with_installed(fs, "/lib2", None);

    let err = resolve(
        &registry,
        &fs,
        ResolutionOptions::new(Channel::EarlyAccess, true, false),
    )
    .unwrap_err();
    assert!(matches!(
        err.storefront_error(),
        Some(StorefrontError::Io { .. })
    ));
}

#[test]
fn library_manifest_problems_abort_steam() {
    let only_steam = ResolutionOptions::new(Channel::EarlyAccess, true, false);
    let registry = steam_registry();

    let fs = MemoryFs::new().with_dir("/steam/steamapps");
    let err = resolve(&registry, &fs, only_steam).unwrap_err();
    assert!(matches!(
        err.storefront_error(),
        Some(StorefrontError::MissingFile(path)) if path == Path::new(LIBRARY_VDF)
    ));

    let fs = MemoryFs::new().with_file(LIBRARY_VDF, "\"libraryfolders\"\n{\n\t\"0\"\n\t{\n");
    let err = resolve(&registry, &fs, only_steam).unwrap_err();
    assert!(matches!(
        err.storefront_error(),
        Some(StorefrontError::Parse { .. })
    ));

    let fs = MemoryFs::new().with_file(LIBRARY_VDF, "\"contentstatsid\" \"-1\"");
    let err = resolve(&registry, &fs, only_steam).unwrap_err();
    assert!(matches!(
        err.storefront_error(),
        Some(StorefrontError::NoLibraryFolders(_))
    ));
}

#[test]
fn library_folders_root_key_case_is_ignored() {
    let registry = steam_registry();
    let vdf = library_folders(&[("/lib1", &[STEAM_APP_ID])]).replacen(
        "libraryfolders",
        "LibraryFolders",
        1,
    );
    let fs = with_installed(MemoryFs::new().with_file(LIBRARY_VDF, vdf), "/lib1", None);

    let path = resolve(
        &registry,
        &fs,
        ResolutionOptions::new(Channel::EarlyAccess, true, false),
    )
    .unwrap();
    assert_eq!(path, install_path("/lib1"));

    let empty = MemoryFs::new().with_file(LIBRARY_VDF, "\"LibraryFolders\" { }");
    let err = resolve(
        &registry,
        &empty,
        ResolutionOptions::new(Channel::EarlyAccess, true, false),
    )
    .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn only_steam_failure_is_not_swallowed() {
    let registry = epic_registry();
    let fs = MemoryFs::new().with_file(
        Path::new(MANIFESTS).join("sf.item"),
        item(catalog_item_id(Channel::Experimental), "/games/sf"),
    );

    let err = resolve(
        &registry,
        &fs,
        ResolutionOptions::new(Channel::Experimental, true, false),
    )
    .unwrap_err();
    assert!(matches!(
        err.storefront_error(),
        Some(StorefrontError::NotInstalled {
            storefront: Storefront::Steam,
            ..
        })
    ));
    assert_eq!(registry.reads(), 1);
}

#[test]
fn steam_success_never_consults_epic() {
    let registry = both_registry();
    let fs = with_installed(
        MemoryFs::new()
            .with_file(LIBRARY_VDF, library_folders(&[("/lib1", &[STEAM_APP_ID])]))
            .with_file(
                Path::new(MANIFESTS).join("sf.item"),
                item(catalog_item_id(Channel::EarlyAccess), "/epic/games/sf"),
            ),
        "/lib1",
        None,
    );

    let path = resolve(
        &registry,
        &fs,
        ResolutionOptions::new(Channel::EarlyAccess, false, false),
    )
    .unwrap();
    assert_eq!(path, install_path("/lib1"));
    assert_eq!(registry.reads(), 1);
}

#[test]
fn steam_failure_falls_through_to_epic() {
    let registry = both_registry();
    let fs = MemoryFs::new().with_file(
        Path::new(MANIFESTS).join("sf.item"),
        item(catalog_item_id(Channel::Experimental), "/epic/games/sf"),
    );

    let path = resolve(&registry, &fs, ResolutionOptions::default()).unwrap();
    assert_eq!(path, PathBuf::from("/epic/games/sf"));
}

#[test]
fn epic_returns_install_location_verbatim() {
    let registry = epic_registry();
    let fs = MemoryFs::new()
        .with_file(
            Path::new(MANIFESTS).join("aaa.item"),
            item(catalog_item_id(Channel::EarlyAccess), "/games/SatisfactoryEA"),
        )
        .with_file(
            Path::new(MANIFESTS).join("bbb.item"),
            item(
                catalog_item_id(Channel::Experimental),
                "D:/Epic Games/SatisfactoryExperimental",
            ),
        )
        .with_file(Path::new(MANIFESTS).join("notes.txt"), "not json");

    let path = resolve(
        &registry,
        &fs,
        ResolutionOptions::new(Channel::Experimental, false, true),
    )
    .unwrap();
    assert_eq!(path, PathBuf::from("D:/Epic Games/SatisfactoryExperimental"));
    assert!(!fs.is_dir(&path));
}

#[test]
fn unusable_epic_items_are_skipped() {
    let registry = epic_registry();
    let experimental = catalog_item_id(Channel::Experimental);
    let fs = MemoryFs::new()
        .with_file(Path::new(MANIFESTS).join("a.item"), "{ not json")
        .with_file(Path::new(MANIFESTS).join("b.item"), r#"{"DisplayName": "x"}"#)
        .with_file(
            Path::new(MANIFESTS).join("c.item"),
            format!(r#"{{"CatalogItemId": "{}"}}"#, experimental),
        );

    let err = resolve(
        &registry,
        &fs,
        ResolutionOptions::new(Channel::Experimental, false, true),
    )
    .unwrap_err();
    assert!(err.is_not_found());

    let fs = MemoryFs::new()
        .with_file(Path::new(MANIFESTS).join("a.item"), "{ not json")
        .with_file(
            Path::new(MANIFESTS).join("d.item"),
            item(experimental, "/games/sf"),
        );
    let path = resolve(
        &registry,
        &fs,
        ResolutionOptions::new(Channel::Experimental, false, true),
    )
    .unwrap();
    assert_eq!(path, PathBuf::from("/games/sf"));
}

#[test]
fn missing_epic_manifests_directory() {
    let registry = epic_registry();
    let fs = MemoryFs::new().with_dir(EPIC_DATA);

    let err = resolve(
        &registry,
        &fs,
        ResolutionOptions::new(Channel::Experimental, false, true),
    )
    .unwrap_err();
    assert!(matches!(
        err.storefront_error(),
        Some(StorefrontError::MissingDirectory {
            storefront: Storefront::Epic,
            ..
        })
    ));
    assert!(
        err.to_string()
            .contains("Epic Games directory \"/epic/Manifests\" does not exist")
    );
}

#[test]
fn resolve_is_idempotent() {
    let registry = both_registry();
    let fs = MemoryFs::new().with_file(
        LIBRARY_VDF,
        library_folders(&[("/lib1", &[STEAM_APP_ID]), ("/lib2", &[STEAM_APP_ID])]),
    );
    let fs = with_installed(fs, "/lib1", None);
    let fs = with_installed(fs, "/lib2", Some("experimental"));

    for channel in Channel::ALL {
        let options = ResolutionOptions::new(channel, false, false);
        let first = resolve(&registry, &fs, options).unwrap();
        let second = resolve(&registry, &fs, options).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn unsupported_platform_reads_nothing() {
    let registry = both_registry();
    let fs = MemoryFs::new();

    let err = GameFinder::new(&registry, &fs, &FakePlatform::linux())
        .resolve(&ResolutionOptions::default())
        .unwrap_err();
    match err {
        ResolveError::UnsupportedPlatform { platform } => assert_eq!(platform, "linux"),
        other => panic!("expected UnsupportedPlatform, got {:?}", other),
    }
    assert_eq!(registry.reads(), 0);
    assert_eq!(fs.accesses(), 0);
}

#[test]
fn options_display_and_channel_text() {
    let options = ResolutionOptions::new(Channel::EarlyAccess, false, true);
    assert_eq!(
        options.to_string(),
        "{ channel: earlyaccess, onlySteam: false, onlyEpic: true }"
    );
    assert!(options.is_valid());
    assert!(!ResolutionOptions::new(Channel::EarlyAccess, true, true).is_valid());

    for channel in Channel::ALL {
        assert_eq!(channel.as_str().parse::<Channel>().unwrap(), channel);
    }
}
