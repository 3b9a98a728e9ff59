//! Key-value stores of named snapshots.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::SnapshotError;
use crate::snapshot::ModelSnapshot;

const EXTENSION: &str = "json";

/// Persistence for named [`ModelSnapshot`]s.
///
/// Saving under an existing name replaces the stored snapshot.
pub trait SnapshotStore {
    /// Stores `snapshot` under `snapshot.name`.
    fn save(&mut self, snapshot: &ModelSnapshot) -> Result<(), SnapshotError>;

    /// Loads the snapshot stored under `name`.
    fn load(&self, name: &str) -> Result<ModelSnapshot, SnapshotError>;

    /// Returns the stored names in ascending order.
    fn names(&self) -> Result<Vec<String>, SnapshotError>;
}

fn check_name(name: &str) -> Result<(), SnapshotError> {
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if ok {
        Ok(())
    } else {
        Err(SnapshotError::InvalidName {
            name: name.to_string(),
        })
    }
}

/// In-process store keeping the encoded JSON of every snapshot.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&mut self, snapshot: &ModelSnapshot) -> Result<(), SnapshotError> {
        check_name(&snapshot.name)?;
        self.entries
            .insert(snapshot.name.clone(), snapshot.to_json()?);
        Ok(())
    }

    fn load(&self, name: &str) -> Result<ModelSnapshot, SnapshotError> {
        let text = self
            .entries
            .get(name)
            .ok_or_else(|| SnapshotError::NotFound {
                name: name.to_string(),
            })?;
        ModelSnapshot::from_json(text)
    }

    fn names(&self) -> Result<Vec<String>, SnapshotError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// Directory-backed store: one `<name>.json` file per snapshot.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Opens the store at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Io`] if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| SnapshotError::io(&root, &e))?;
        debug!(root = %root.display(), "opened snapshot directory");
        Ok(Self { root })
    }

    /// Returns the store directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{EXTENSION}"))
    }
}

impl SnapshotStore for DirStore {
    fn save(&mut self, snapshot: &ModelSnapshot) -> Result<(), SnapshotError> {
        check_name(&snapshot.name)?;
        let path = self.path_of(&snapshot.name);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, snapshot.to_json()?).map_err(|e| SnapshotError::io(&tmp, &e))?;
        fs::rename(&tmp, &path).map_err(|e| SnapshotError::io(&path, &e))?;
        info!(path = %path.display(), "saved snapshot");
        Ok(())
    }

    fn load(&self, name: &str) -> Result<ModelSnapshot, SnapshotError> {
        check_name(name)?;
        let path = self.path_of(name);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SnapshotError::NotFound {
                    name: name.to_string(),
                });
            }
            Err(e) => return Err(SnapshotError::io(&path, &e)),
        };
        ModelSnapshot::from_json(&text)
    }

    fn names(&self) -> Result<Vec<String>, SnapshotError> {
        let dir = fs::read_dir(&self.root).map_err(|e| SnapshotError::io(&self.root, &e))?;
        let mut names = Vec::new();
        for entry in dir {
            let path = entry.map_err(|e| SnapshotError::io(&self.root, &e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if check_name(stem).is_ok() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
