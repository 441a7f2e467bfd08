//! In-memory registry, filesystem and platform fakes for driving
//! [`crate::finder::GameFinder`] without a real storefront install.
//!
//! Every fake counts how often it is consulted so tests can assert that a
//! lookup never touched it.

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;

use crate::fs::FileSystem;
use crate::registry::{PlatformInfo, RegistryReader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryValue {
    String(String),
    Dword(u32),
}

#[derive(Debug, Default)]
pub struct MemoryRegistry {
    values: Vec<(String, String, RegistryValue)>,
    reads: Cell<usize>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_string(self, key_path: &str, value_name: &str, value: &str) -> Self {
        self.with_value(key_path, value_name, RegistryValue::String(value.to_string()))
    }

    pub fn with_dword(self, key_path: &str, value_name: &str, value: u32) -> Self {
        self.with_value(key_path, value_name, RegistryValue::Dword(value))
    }

    pub fn with_value(mut self, key_path: &str, value_name: &str, value: RegistryValue) -> Self {
        self.values
            .push((key_path.to_string(), value_name.to_string(), value));
        self
    }

    /// Number of `read_string` calls so far.
    pub fn reads(&self) -> usize {
        self.reads.get()
    }
}

impl RegistryReader for MemoryRegistry {
    fn read_string(&self, key_path: &str, value_name: &str) -> Option<String> {
        self.reads.set(self.reads.get() + 1);
        self.values
            .iter()
            .find(|(key, name, _)| {
                key.eq_ignore_ascii_case(key_path) && name.eq_ignore_ascii_case(value_name)
            })
            .and_then(|(_, _, value)| match value {
                RegistryValue::String(s) => Some(s.clone()),
                RegistryValue::Dword(_) => None,
            })
    }
}

/// Files and directories keyed by path. Adding a file or directory adds all
/// of its ancestors as directories.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: BTreeMap<PathBuf, Vec<u8>>,
    unreadable: BTreeSet<PathBuf>,
    dirs: BTreeSet<PathBuf>,
    accesses: Cell<usize>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> Self {
        let path = path.as_ref();
        self.add_ancestors(path);
        self.files.insert(path.to_path_buf(), contents.into());
        self
    }

    /// A file that exists but fails every read.
    pub fn with_unreadable_file(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        self.add_ancestors(path);
        self.files.insert(path.to_path_buf(), Vec::new());
        self.unreadable.insert(path.to_path_buf());
        self
    }

    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        self.add_ancestors(path);
        self.dirs.insert(path.to_path_buf());
        self
    }

    /// Number of filesystem calls so far.
    pub fn accesses(&self) -> usize {
        self.accesses.get()
    }

    fn add_ancestors(&mut self, path: &Path) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
    }

    fn touch(&self) {
        self.accesses.set(self.accesses.get() + 1);
    }
}

impl FileSystem for MemoryFs {
    fn is_file(&self, path: &Path) -> bool {
        self.touch();
        self.files.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.touch();
        self.dirs.contains(path)
    }

    fn read_text(&self, path: &Path, encoding: &'static Encoding) -> io::Result<String> {
        self.touch();
        if self.unreadable.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is not readable", path.display()),
            ));
        }
        let bytes = self.files.get(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })?;
        // decode() sniffs and drops a BOM
        let (text, _, _) = encoding.decode(bytes);
        Ok(text.into_owned())
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        self.touch();
        if !self.dirs.contains(dir) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", dir.display()),
            ));
        }
        Ok(self
            .files
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct FakePlatform {
    name: String,
    supports_registry_lookup: bool,
}

impl FakePlatform {
    pub fn new(name: &str, supports_registry_lookup: bool) -> Self {
        Self {
            name: name.to_string(),
            supports_registry_lookup,
        }
    }

    pub fn windows() -> Self {
        Self::new("windows", true)
    }

    pub fn linux() -> Self {
        Self::new("linux", false)
    }
}

impl PlatformInfo for FakePlatform {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_registry_lookup(&self) -> bool {
        self.supports_registry_lookup
    }
}
