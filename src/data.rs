//! Data File Helpers
//!
//! Shared directory scanning and parsing for the TOML/JSON game data loaders.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::DataError;

/// Collect files with the given extension directly inside `dir`, sorted by path
/// so that load order is stable across platforms.
pub fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, DataError> {
    let entries = std::fs::read_dir(dir).map_err(|source| DataError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DataError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

fn read(path: &Path) -> Result<String, DataError> {
    std::fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, DataError> {
    let content = read(path)?;
    toml::from_str(&content).map_err(|source| DataError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, DataError> {
    let content = read(path)?;
    serde_json::from_str(&content).map_err(|source| DataError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// File stem as an owned key (`dialogues/npcs/npc2.json` -> `npc2`)
pub fn file_key(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}
