//! Filesystem access used by the install finder.
//!
//! The finder only needs existence checks, whole-file text reads and a
//! one-level file listing, so those sit behind [`FileSystem`] and tests can
//! swap in [`crate::testing::MemoryFs`].

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8};
use encoding_rs_io::DecodeReaderBytesBuilder;
use walkdir::WalkDir;

pub trait FileSystem {
    fn is_file(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Reads a whole file decoded from `encoding`, without a leading BOM.
    fn read_text(&self, path: &Path, encoding: &'static Encoding) -> io::Result<String>;

    /// Lists the files directly inside `dir`, including symlinks to files.
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.read_text(path, UTF_8)
    }
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostFs;

impl FileSystem for HostFs {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_text(&self, path: &Path, encoding: &'static Encoding) -> io::Result<String> {
        read_text(path, encoding)
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(io::Error::from)?;
            // Follows symlinks; dangling links are dropped
            if entry.path().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

/// Reads `path` as `encoding`, letting a BOM override it, and strips the BOM.
pub fn read_text(path: &Path, encoding: &'static Encoding) -> io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(
        DecodeReaderBytesBuilder::new()
            .encoding(Some(encoding))
            .bom_override(true)
            .build(file),
    );
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    if let Some(stripped) = contents.strip_prefix('\u{feff}') {
        contents = stripped.to_string();
    }
    Ok(contents)
}
