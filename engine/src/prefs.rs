//! Key-value preferences: the durable storage seam.
//!
//! The engine never touches the disk. Anything it must persist goes through
//! the [`Preferences`] trait; the client supplies a file-backed
//! implementation, tests and the FFI layer use [`MemoryPreferences`].
//! Snapshots are the bridge between the two and serialize deterministically.

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the snapshot format for future compatibility.
pub const PREFS_FORMAT_VERSION: u32 = 1;

/// A single stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Int(u64),
    Str(String),
}

impl PrefValue {
    fn kind(&self) -> &'static str {
        match self {
            PrefValue::Int(_) => "Int",
            PrefValue::Str(_) => "String",
        }
    }
}

/// Durable key-value storage.
///
/// Writes may be buffered by an implementation until [`Preferences::flush`]
/// is called; callers that need durability flush explicitly.
pub trait Preferences {
    /// Read the raw value stored under `key`.
    fn get(&self, key: &str) -> Option<&PrefValue>;

    /// Store a value under `key`, replacing any previous one.
    fn put(&mut self, key: &str, value: PrefValue);

    /// Remove `key` if present.
    fn remove(&mut self, key: &str);

    /// Make every previous write durable.
    fn flush(&mut self) -> Result<()>;

    /// Read an integer. Absent keys read as `None`.
    fn get_int(&self, key: &str) -> Result<Option<u64>> {
        match self.get(key) {
            None => Ok(None),
            Some(PrefValue::Int(v)) => Ok(Some(*v)),
            Some(other) => Err(Error::PreferenceType {
                key: key.to_string(),
                expected: "Int".to_string(),
                got: other.kind().to_string(),
            }),
        }
    }

    /// Read a string. Absent keys read as `None`.
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(PrefValue::Str(v)) => Ok(Some(v.clone())),
            Some(other) => Err(Error::PreferenceType {
                key: key.to_string(),
                expected: "String".to_string(),
                got: other.kind().to_string(),
            }),
        }
    }

    fn put_int(&mut self, key: &str, value: u64) {
        self.put(key, PrefValue::Int(value));
    }

    fn put_string(&mut self, key: &str, value: &str) {
        self.put(key, PrefValue::Str(value.to_string()));
    }
}

/// A point-in-time copy of every stored preference.
///
/// Uses BTreeMap instead of HashMap for deterministic serialization order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// All stored values by key
    pub values: BTreeMap<String, PrefValue>,
}

impl Default for PreferencesSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferencesSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self {
            format_version: PREFS_FORMAT_VERSION,
            values: BTreeMap::new(),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Serialize to JSON with deterministic ordering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON with deterministic ordering.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Parse a snapshot, rejecting formats this build does not understand.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        if snapshot.format_version != PREFS_FORMAT_VERSION {
            return Err(Error::SnapshotFormatMismatch {
                expected: PREFS_FORMAT_VERSION,
                actual: snapshot.format_version,
            });
        }

        Ok(snapshot)
    }
}

/// In-memory preferences.
///
/// Flushing never fails; the number of flushes is recorded so callers can
/// verify write-through behaviour.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    values: BTreeMap<String, PrefValue>,
    flushes: usize,
}

impl MemoryPreferences {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a store from a snapshot.
    pub fn from_snapshot(snapshot: PreferencesSnapshot) -> Self {
        Self {
            values: snapshot.values,
            flushes: 0,
        }
    }

    /// Export the current contents.
    pub fn snapshot(&self) -> PreferencesSnapshot {
        PreferencesSnapshot {
            format_version: PREFS_FORMAT_VERSION,
            values: self.values.clone(),
        }
    }

    /// How many times [`Preferences::flush`] has been called.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }
}

impl Preferences for MemoryPreferences {
    fn get(&self, key: &str) -> Option<&PrefValue> {
        self.values.get(key)
    }

    fn put(&mut self, key: &str, value: PrefValue) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
