//! JSON file store

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::{decode_state, encode_state, StoreError, TimerStore, STORAGE_KEY};
use crate::state::TimerState;

/// Keeps the timer state in one JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store named after [`STORAGE_KEY`] inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(format!("{}.json", STORAGE_KEY)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn try_load(&self) -> Result<Option<TimerState>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        decode_state(&raw).map(Some)
    }

    /// Write to a uniquely named sibling and rename it over the target
    fn try_save(&self, state: &TimerState) -> Result<(), StoreError> {
        let encoded = encode_state(state)?;
        let parent = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                parent
            }
            None => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(encoded.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl TimerStore for JsonFileStore {
    fn load(&self) -> Option<TimerState> {
        match self.try_load() {
            Ok(state) => {
                debug!("Loaded timer state from {}: {:?}", self.path.display(), state);
                state
            }
            Err(e) => {
                warn!("Ignoring stored timer state at {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn save(&self, state: &TimerState) {
        if let Err(e) = self.try_save(state) {
            warn!("Failed to save timer state to {}: {}", self.path.display(), e);
        }
    }
}
