//! Turns a resolved install into extracted game data: a UTF-8 copy of
//! `Docs.json` and PNG icons exported from the pak files by umodel.

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use encoding_rs::UTF_16LE;
use thiserror::Error;

use crate::finder::{GameFinder, ResolutionOptions, ResolveError};

/// Engine profile umodel needs for current game builds.
pub const UNREAL_ENGINE_VERSION: &str = "ue4.27";

const ICON_SIZES: [u32; 4] = [512, 256, 128, 64];

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to create {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read {}: {source}", .path.display())]
    ReadDocs {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is not valid JSON: {source}", .path.display())]
    ParseDocs {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to write {}: {source}", .path.display())]
    WriteDocs {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to run {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("export of {pattern} exited with {status}: {stderr}")]
    Failed {
        pattern: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("export of {pattern} failed: {reason}")]
    Other { pattern: String, reason: String },
}

/// Where the interesting files live inside an install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameLayout {
    pub install: PathBuf,
    pub docs_json: PathBuf,
    pub paks_dir: PathBuf,
}

impl GameLayout {
    pub fn new(install: impl Into<PathBuf>) -> Self {
        let install = install.into();
        Self {
            docs_json: install
                .join("CommunityResources")
                .join("Docs")
                .join("Docs.json"),
            paks_dir: install.join("FactoryGame").join("Content").join("Paks"),
            install,
        }
    }
}

/// umodel `-export` patterns, largest icons first.
pub fn icon_patterns() -> Vec<String> {
    let mut patterns: Vec<String> = ICON_SIZES
        .iter()
        .flat_map(|size| {
            [
                format!("*_{}.uasset", size),
                format!("*_{}_New.uasset", size),
                format!("*_{}_new.uasset", size),
            ]
        })
        .collect();
    patterns.push("*Icon*.uasset".to_string());
    patterns
}

/// Exports the assets matching one pattern out of a pak directory.
pub trait Exporter {
    fn export(&self, pak_dir: &Path, out_dir: &Path, pattern: &str) -> Result<(), ExportError>;
}

/// Runs the umodel viewer/exporter.
#[derive(Debug, Clone)]
pub struct Umodel {
    program: PathBuf,
}

impl Default for Umodel {
    fn default() -> Self {
        Self::new(Self::default_program())
    }
}

impl Umodel {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn default_program() -> &'static str {
        if cfg!(windows) {
            "umodel_64.exe"
        } else {
            "umodel"
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn arguments(pak_dir: &Path, out_dir: &Path, pattern: &str) -> Vec<String> {
        vec![
            format!("-path={}", pak_dir.display()),
            format!("-out={}", out_dir.display()),
            "-png".to_string(),
            "-export".to_string(),
            pattern.to_string(),
            format!("-game={}", UNREAL_ENGINE_VERSION),
        ]
    }
}

impl Exporter for Umodel {
    fn export(&self, pak_dir: &Path, out_dir: &Path, pattern: &str) -> Result<(), ExportError> {
        let args = Self::arguments(pak_dir, out_dir, pattern);
        log::info!("{} {}", self.program.display(), args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| ExportError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        log::debug!("{}", String::from_utf8_lossy(&output.stdout));

        if output.status.success() {
            Ok(())
        } else {
            Err(ExportError::Failed {
                pattern: pattern.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// Exporter that records requests instead of running anything.
#[derive(Debug, Default)]
pub struct DryRun {
    requests: RefCell<Vec<String>>,
}

impl DryRun {
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl Exporter for DryRun {
    fn export(&self, pak_dir: &Path, out_dir: &Path, pattern: &str) -> Result<(), ExportError> {
        let args = Umodel::arguments(pak_dir, out_dir, pattern);
        log::info!("(dry run) umodel {}", args.join(" "));
        self.requests.borrow_mut().push(pattern.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    pub docs_path: PathBuf,
    pub exported: usize,
    pub failed: usize,
}

/// Rewrites the UTF-16LE `Docs.json` at `source` as indented UTF-8 JSON in
/// `json_dir`, keeping key order.
pub fn convert_docs(source: &Path, json_dir: &Path) -> Result<PathBuf, PipelineError> {
    let text = crate::fs::read_text(source, UTF_16LE).map_err(|err| PipelineError::ReadDocs {
        path: source.to_path_buf(),
        source: err,
    })?;
    let docs: serde_json::Value =
        serde_json::from_str(&text).map_err(|err| PipelineError::ParseDocs {
            path: source.to_path_buf(),
            source: err,
        })?;

    let target = json_dir.join("Docs.json");
    log::info!("Writing Docs.json to '{}'", target.display());
    let pretty = serde_json::to_string_pretty(&docs).map_err(|err| PipelineError::ParseDocs {
        path: source.to_path_buf(),
        source: err,
    })?;
    fs::write(&target, pretty).map_err(|source| PipelineError::WriteDocs {
        path: target.clone(),
        source,
    })?;
    Ok(target)
}

fn create_dir(path: PathBuf) -> Result<PathBuf, PipelineError> {
    fs::create_dir_all(&path).map_err(|source| PipelineError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Converts the docs and exports icons from an install into `target`.
///
/// A failed docs conversion is fatal. Failed icon exports are logged and
/// counted; the remaining patterns still run.
pub fn extract_game_assets(
    install: &Path,
    target: &Path,
    exporter: &dyn Exporter,
) -> Result<ExtractSummary, PipelineError> {
    let layout = GameLayout::new(install);
    let icons_dir = create_dir(target.join("icons"))?;
    let json_dir = create_dir(target.join("json"))?;

    let docs_path = convert_docs(&layout.docs_json, &json_dir)?;

    log::info!("Exporting PAK content from {}", layout.paks_dir.display());
    let mut summary = ExtractSummary {
        docs_path,
        exported: 0,
        failed: 0,
    };
    for pattern in icon_patterns() {
        match exporter.export(&layout.paks_dir, &icons_dir, &pattern) {
            Ok(()) => summary.exported += 1,
            Err(err) => {
                log::warn!("{}", err);
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

/// Resolves the install for `options`, then extracts from it.
pub fn find_and_extract(
    finder: &GameFinder<'_>,
    options: &ResolutionOptions,
    target: &Path,
    exporter: &dyn Exporter,
) -> Result<ExtractSummary, PipelineError> {
    let install = finder.resolve(options)?;
    extract_game_assets(&install, target, exporter)
}
