//! File-backed preferences.
//!
//! The whole store is one JSON [`PreferencesSnapshot`]. Reads and writes hit
//! memory; [`Preferences::flush`] writes a temporary file, syncs it to disk
//! and renames it over the old one, so a crash or power loss leaves either
//! the previous contents or the new ones.

use crate::error::Result;
use rover_engine::{MemoryPreferences, PrefValue, Preferences, PreferencesSnapshot};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Preferences persisted to a JSON file.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    values: MemoryPreferences,
}

impl FilePreferences {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let values = match fs::read_to_string(&path) {
            Ok(json) => MemoryPreferences::from_snapshot(PreferencesSnapshot::from_json(&json)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No preferences file yet");
                MemoryPreferences::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents, as they would be written on the next flush.
    pub fn snapshot(&self) -> PreferencesSnapshot {
        self.values.snapshot()
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn write_atomically(&self) -> io::Result<()> {
        let parent = self.parent_dir();
        fs::create_dir_all(parent)?;

        let json = self
            .values
            .snapshot()
            .to_json_pretty()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        {
            let mut file = File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        sync_dir(parent)
    }
}

/// Make a rename inside `dir` durable.
fn sync_dir(dir: &Path) -> io::Result<()> {
    #[cfg(unix)]
    File::open(dir)?.sync_all()?;
    #[cfg(not(unix))]
    let _ = dir;
    Ok(())
}

impl Preferences for FilePreferences {
    fn get(&self, key: &str) -> Option<&PrefValue> {
        self.values.get(key)
    }

    fn put(&mut self, key: &str, value: PrefValue) {
        self.values.put(key, value);
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    fn flush(&mut self) -> rover_engine::error::Result<()> {
        self.write_atomically().map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to write preferences");
            rover_engine::Error::Storage(e.to_string())
        })
    }
}
