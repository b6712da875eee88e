//! Map catalog validation.
//!
//! Every `.ron` file in a directory must parse as a [`MapCatalog`], every
//! map in it must build a path curve, and map names must be unique across
//! the directory.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use td_core::data::MapCatalog;
use td_core::error::GameError;
use thiserror::Error;

/// The directory itself could not be read.
#[derive(Debug, Error)]
pub enum ValidateError {
    /// Listing or reading failed.
    #[error("Cannot read '{path}': {source}")]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Something wrong with a catalog file.
#[derive(Debug)]
pub enum Problem {
    /// The file does not parse, or a map in it does not build.
    Invalid(GameError),
    /// The same map name appears more than once.
    DuplicateName {
        /// Map name.
        name: String,
        /// Files declaring it, in the order found.
        files: Vec<PathBuf>,
    },
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(e) => write!(f, "{e}"),
            Self::DuplicateName { name, files } => {
                let files: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
                write!(f, "Map '{name}' declared more than once: {}", files.join(", "))
            }
        }
    }
}

/// Outcome of validating a directory.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Catalog files checked.
    pub files: usize,
    /// Maps that parsed.
    pub maps: usize,
    /// Everything that failed.
    pub problems: Vec<Problem>,
}

impl ValidationReport {
    /// No problems found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ValidateError {
    let path = path.to_path_buf();
    move |source| ValidateError::Io { path, source }
}

/// Validate every RON map catalog in `path`.
///
/// # Errors
///
/// Returns an error only when the directory or a file cannot be read;
/// content problems are collected in the report.
pub fn validate_maps_directory(path: &Path) -> Result<ValidationReport, ValidateError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(path)
        .map_err(io_error(path))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    files.sort();

    let mut report = ValidationReport::default();
    let mut seen: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

    for file in files {
        let source = std::fs::read_to_string(&file).map_err(io_error(&file))?;
        report.files += 1;

        let catalog = match MapCatalog::from_ron_str_labeled(&file.display().to_string(), &source)
        {
            Ok(catalog) => catalog,
            Err(e) => {
                report.problems.push(Problem::Invalid(e));
                continue;
            }
        };

        tracing::debug!(file = %file.display(), maps = catalog.maps.len(), "Catalog parsed");
        report.maps += catalog.maps.len();
        report
            .problems
            .extend(catalog.invalid_maps().into_iter().map(Problem::Invalid));
        for name in catalog.names() {
            seen.entry(name.to_string()).or_default().push(file.clone());
        }
    }

    report.problems.extend(
        seen.into_iter()
            .filter(|(_, files)| files.len() > 1)
            .map(|(name, files)| Problem::DuplicateName { name, files }),
    );
    Ok(report)
}
