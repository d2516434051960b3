//! Rotation document parsing and import resolution

use crate::error::RotationError;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk rotation document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RotationDocument {
    name: String,
    description: String,
    imports: Vec<String>,
    variables: BTreeMap<String, serde_yaml::Value>,
    rotation: Vec<serde_yaml::Value>,
}

/// A raw rotation entry and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedEntry {
    pub origin: PathBuf,
    pub index: usize,
    pub definition: serde_yaml::Value,
}

/// A document with all imports spliced in, not yet compiled.
#[derive(Debug, Clone, Default)]
pub struct LoadedRotation {
    pub name: String,
    pub description: String,
    pub variables: BTreeMap<String, serde_yaml::Value>,
    pub entries: Vec<LoadedEntry>,
}

/// Load `path`, resolving imports relative to each importing file.
///
/// Imported entries come before the importer's own; imported variables are
/// overridden by the importer's.
pub fn load(path: &Path) -> Result<LoadedRotation, RotationError> {
    let mut visiting = HashSet::new();
    load_recursive(path, &mut visiting)
}

fn load_recursive(
    path: &Path,
    visiting: &mut HashSet<PathBuf>,
) -> Result<LoadedRotation, RotationError> {
    let canonical = fs::canonicalize(path).map_err(|source| RotationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if !visiting.insert(canonical.clone()) {
        return Err(RotationError::ImportCycle(canonical));
    }

    let content = fs::read_to_string(&canonical).map_err(|source| RotationError::Io {
        path: canonical.clone(),
        source,
    })?;
    let document: RotationDocument =
        serde_yaml::from_str(&content).map_err(|e| RotationError::Parse {
            path: canonical.clone(),
            message: e.to_string(),
        })?;

    let base_dir = canonical.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut loaded = LoadedRotation {
        name: document.name,
        description: document.description,
        ..Default::default()
    };

    for import in &document.imports {
        let child = load_recursive(&base_dir.join(import), visiting)?;
        loaded.variables.extend(child.variables);
        loaded.entries.extend(child.entries);
    }

    loaded.variables.extend(document.variables);
    loaded
        .entries
        .extend(
            document
                .rotation
                .into_iter()
                .enumerate()
                .map(|(index, definition)| LoadedEntry {
                    origin: canonical.clone(),
                    index,
                    definition,
                }),
        );

    visiting.remove(&canonical);
    Ok(loaded)
}
