//! Host installation metadata: the Windows registry and the platform gate.
//!
//! Steam and the Epic Games Launcher both publish their install roots under
//! `HKEY_LOCAL_MACHINE`. Other platforms have no equivalent, so lookups there
//! are rejected before any read is attempted.

/// Reads string values from the host's installation metadata store.
pub trait RegistryReader {
    /// Returns the string value `value_name` under `key_path`.
    ///
    /// The value name matches case-insensitively. A missing key, a missing
    /// value, or a non-string value all give `None`.
    fn read_string(&self, key_path: &str, value_name: &str) -> Option<String>;
}

/// Identifies the host platform for the lookup gate.
pub trait PlatformInfo {
    fn name(&self) -> &str;

    /// True where the storefronts publish install locations in the registry.
    fn supports_registry_lookup(&self) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HostPlatform;

impl PlatformInfo for HostPlatform {
    fn name(&self) -> &str {
        std::env::consts::OS
    }

    fn supports_registry_lookup(&self) -> bool {
        cfg!(windows)
    }
}

#[cfg(windows)]
pub type HostRegistry = windows::WindowsRegistry;

#[cfg(not(windows))]
pub type HostRegistry = NoRegistry;

/// Registry stand-in for platforms without one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRegistry;

impl RegistryReader for NoRegistry {
    fn read_string(&self, _key_path: &str, _value_name: &str) -> Option<String> {
        None
    }
}

#[cfg(windows)]
mod windows {
    use super::RegistryReader;
    use winreg::RegKey;
    use winreg::enums::{HKEY_LOCAL_MACHINE, RegType};
    use winreg::types::FromRegValue;

    /// `HKEY_LOCAL_MACHINE` via winreg.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct WindowsRegistry;

    impl RegistryReader for WindowsRegistry {
        fn read_string(&self, key_path: &str, value_name: &str) -> Option<String> {
            let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
            let key = hklm.open_subkey(key_path).ok()?;
            let wanted = value_name.to_uppercase();

            for (name, value) in key.enum_values().filter_map(Result::ok) {
                if name.to_uppercase() != wanted {
                    continue;
                }
                return match value.vtype {
                    RegType::REG_SZ | RegType::REG_EXPAND_SZ => String::from_reg_value(&value).ok(),
                    _ => None,
                };
            }
            None
        }
    }
}
