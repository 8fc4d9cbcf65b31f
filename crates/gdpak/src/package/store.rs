// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Package storage backends

use crate::config::Config;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("nothing stored at {location}")]
    NotFound { location: String },

    #[error("'{0}' is not a valid package name")]
    InvalidName(String),

    #[error("I/O error on {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: io::Error,
    },
}

/// Byte storage for package images, keyed by package name.
pub trait PackageStore {
    fn read(&self, name: &str) -> Result<Vec<u8>, StoreError>;

    /// Replace the image stored under `name`.
    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<(), StoreError>;

    fn exists(&self, name: &str) -> bool;

    fn remove(&mut self, name: &str) -> Result<(), StoreError>;

    /// Human-readable location of `name`, for error messages.
    fn locate(&self, name: &str) -> String {
        name.to_string()
    }
}

/// Package files in one directory, `<root>/<name>.<extension>`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    extension: String,
    atomic: bool,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let defaults = Config::default();
        Self {
            root: root.into(),
            extension: defaults.extension,
            atomic: defaults.atomic_writes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            root: config.root_dir.clone(),
            extension: config.extension.clone(),
            atomic: config.atomic_writes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0']);
        if invalid {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(format!("{}.{}", name, self.extension)))
    }

    fn io_error(path: &Path, source: io::Error) -> StoreError {
        if source.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound {
                location: path.display().to_string(),
            }
        } else {
            StoreError::Io {
                location: path.display().to_string(),
                source,
            }
        }
    }
}

impl PackageStore for FileStore {
    fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(name)?;
        fs::read(&path).map_err(|e| Self::io_error(&path, e))
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.root).map_err(|e| Self::io_error(&self.root, e))?;

        if !self.atomic {
            return fs::write(&path, bytes).map_err(|e| Self::io_error(&path, e));
        }

        let temp = path.with_extension(format!("{}.tmp", self.extension));
        fs::write(&temp, bytes).map_err(|e| Self::io_error(&temp, e))?;
        if let Err(e) = fs::rename(&temp, &path) {
            // Best effort; the rename error is the one reported.
            let _ = fs::remove_file(&temp);
            return Err(Self::io_error(&path, e));
        }
        tracing::debug!("committed {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_ok_and(|path| path.is_file())
    }

    fn remove(&mut self, name: &str) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        fs::remove_file(&path).map_err(|e| Self::io_error(&path, e))
    }

    fn locate(&self, name: &str) -> String {
        match self.path_for(name) {
            Ok(path) => path.display().to_string(),
            Err(_) => name.to_string(),
        }
    }
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored image of `name`, for inspection and corruption in tests.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Vec<u8>> {
        self.files.get_mut(name)
    }

    /// Names of all stored packages, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl PackageStore for MemoryStore {
    fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                location: format!("memory:{}", name),
            })
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.files.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    fn remove(&mut self, name: &str) -> Result<(), StoreError> {
        self.files
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                location: format!("memory:{}", name),
            })
    }

    fn locate(&self, name: &str) -> String {
        format!("memory:{}", name)
    }
}
