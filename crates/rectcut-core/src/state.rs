//! Persisted key/value store connecting pipeline stages.
//!
//! Stages communicate only through a [`PipelineState`] passed by reference. The
//! well-known keys are [`LOWER_KEY`] / [`UPPER_KEY`] (the current search range) and
//! `<id>_lower` / `<id>_upper` (the cuts of working point `id`). Entries are never
//! removed implicitly; a stage may skip work whose output key already exists.
//!
//! Snapshots are JSON documents. Limits are stored with [`limits_to_json`], so
//! infinite sides survive, and finite values reload bit-identically.

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    bounds::{BoundsVector, limits_from_json, limits_to_json},
    error::StateError,
};

/// Key of the current lower search limits.
pub const LOWER_KEY: &str = "lower";
/// Key of the current upper search limits.
pub const UPPER_KEY: &str = "upper";

/// Key of the lower cuts of working point `id`.
#[must_use]
pub fn lower_key(id: &str) -> String {
    format!("{id}_lower")
}

/// Key of the upper cuts of working point `id`.
#[must_use]
pub fn upper_key(id: &str) -> String {
    format!("{id}_upper")
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineState {
    entries: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateSnapshot {
    saved_at: DateTime<Utc>,
    entries: BTreeMap<String, Value>,
}

impl PipelineState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn require(&self, key: &str) -> Result<&Value, StateError> {
        self.entries.get(key).ok_or_else(|| StateError::Missing {
            key: key.to_owned(),
        })
    }

    /// Decodes the entry stored under `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, StateError> {
        T::deserialize(self.require(key)?).map_err(|e| StateError::Mistyped {
            key: key.to_owned(),
            message: e.to_string(),
        })
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StateError> {
        let value = serde_json::to_value(value).map_err(|e| StateError::Mistyped {
            key: key.to_owned(),
            message: e.to_string(),
        })?;
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }

    /// Decodes a limit table stored with [`Self::set_limits`].
    pub fn limits(&self, key: &str) -> Result<Vec<f64>, StateError> {
        limits_from_json(self.require(key)?).map_err(|message| StateError::Mistyped {
            key: key.to_owned(),
            message,
        })
    }

    pub fn set_limits(&mut self, key: &str, limits: &[f64]) {
        self.entries.insert(key.to_owned(), limits_to_json(limits));
    }

    /// Stores the lower and upper limits of `bounds` under two keys.
    pub fn set_bounds(&mut self, lower_key: &str, upper_key: &str, bounds: &BoundsVector) {
        self.set_limits(lower_key, &bounds.lower_limits());
        self.set_limits(upper_key, &bounds.upper_limits());
    }

    /// Reads a snapshot written by [`Self::save`].
    pub fn load(path: &Path) -> Result<Self, StateError> {
        let file = File::open(path).map_err(|source| StateError::Io {
            path: path.to_owned(),
            source,
        })?;
        let snapshot: StateSnapshot =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| StateError::Json {
                path: path.to_owned(),
                source,
            })?;
        tracing::debug!(
            path = %path.display(),
            saved_at = %snapshot.saved_at,
            keys = snapshot.entries.len(),
            "pipeline state loaded"
        );
        Ok(Self {
            entries: snapshot.entries,
        })
    }

    /// Like [`Self::load`], but a missing file yields an empty state.
    pub fn load_or_default(path: &Path) -> Result<Self, StateError> {
        match Self::load(path) {
            Err(StateError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            result => result,
        }
    }

    /// Writes a snapshot, replacing `path` atomically.
    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        let io_error = |source| StateError::Io {
            path: path.to_owned(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let tmp = temporary_path(path);
        let snapshot = StateSnapshot {
            saved_at: Utc::now(),
            entries: self.entries.clone(),
        };
        let mut writer = BufWriter::new(File::create(&tmp).map_err(io_error)?);
        serde_json::to_writer_pretty(&mut writer, &snapshot).map_err(|source| StateError::Json {
            path: tmp.clone(),
            source,
        })?;
        writeln!(writer).map_err(io_error)?;
        writer.flush().map_err(io_error)?;
        drop(writer);
        fs::rename(&tmp, path).map_err(io_error)?;
        Ok(())
    }
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
