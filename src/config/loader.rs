use std::path::{Path, PathBuf};

use crate::domain::RowVars;
use crate::error::{AppError, AppResult, ConfigError};

use super::types::CollectionFile;

/// Default collection filenames, checked in order.
pub(crate) const DEFAULT_CONFIG_FILES: [&str; 2] = ["reqpilot.toml", "reqpilot.json"];

/// Loads the collection from the provided path or the default locations.
///
/// # Errors
///
/// Returns an error when no collection can be found, or the file cannot be
/// read or parsed.
pub fn load_config(path: Option<&Path>) -> AppResult<(PathBuf, CollectionFile)> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), load_config_file(path)?));
    }
    for candidate in DEFAULT_CONFIG_FILES {
        let candidate = PathBuf::from(candidate);
        if candidate.exists() {
            let collection = load_config_file(&candidate)?;
            return Ok((candidate, collection));
        }
    }
    Err(AppError::config(ConfigError::NotFound))
}

/// Loads one collection file; the format follows the extension.
///
/// # Errors
///
/// Returns an error when the file cannot be read, has an unsupported
/// extension, or does not parse.
pub fn load_config_file(path: &Path) -> AppResult<CollectionFile> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        AppError::config(ConfigError::ReadConfig {
            path: path.to_path_buf(),
            source: err,
        })
    })?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|err| {
            AppError::config(ConfigError::ParseToml {
                path: path.to_path_buf(),
                source: err,
            })
        }),
        Some("json") => serde_json::from_str(&content).map_err(|err| {
            AppError::config(ConfigError::ParseJson {
                path: path.to_path_buf(),
                source: err,
            })
        }),
        Some(ext) => Err(AppError::config(ConfigError::UnsupportedExtension {
            ext: ext.to_owned(),
        })),
        None => Err(AppError::config(ConfigError::MissingExtension)),
    }
}

/// Loads data rows from a JSON array of objects.
///
/// # Errors
///
/// Returns an error when the file cannot be read or is not an array of
/// objects.
pub fn load_data_rows(path: &Path) -> AppResult<Vec<RowVars>> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        AppError::config(ConfigError::ReadDataRows {
            path: path.to_path_buf(),
            source: err,
        })
    })?;
    serde_json::from_str(&content).map_err(|err| {
        AppError::config(ConfigError::ParseDataRows {
            path: path.to_path_buf(),
            source: err,
        })
    })
}
