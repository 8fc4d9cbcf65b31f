// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Package engine
//!
//! A package is an ownership root of class `Package`. Saving it writes every
//! object it transitively owns (the internal objects) to one image; objects
//! of other packages that those reference become external entries, named by
//! object and package, and the packages holding them become dependencies.
//! Loading reads the dependencies first, then rebuilds the internal objects
//! and rewires every reference.
//!
//! # State Machine
//!
//! ```text
//! Unloaded -> ResolvingDependencies -> ResolvingInternal -> ResolvingExternal
//!          -> StreamingPayload -> Loaded
//!
//! Unloaded | Loaded | Saved -> ScanningInternal -> DryRun -> ScanningExternal
//!          -> Writing -> Saved
//! ```

mod error;
pub mod format;
mod index;
mod load;
mod save;
mod store;

pub use error::PackageError;
pub use format::{
    inspect, ExternalEntry, FormatError, InternalEntry, PackageHeader, PackageSummary,
    FORMAT_VERSION, PACKAGE_TAG,
};
pub use index::IndexTable;
pub use store::{FileStore, MemoryStore, PackageStore, StoreError};

use crate::class::{default_factory, Class, Factory, PACKAGE_CLASS};
use crate::config::Config;
use crate::object::{Object, ObjectId, ObjectModel};
use std::collections::{BTreeMap, HashMap};

/// Object data of a package root.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Package;

impl Object for Package {}

impl Class for Package {
    const NAME: &'static str = PACKAGE_CLASS;

    fn factory() -> Option<Factory> {
        Some(default_factory::<Self>)
    }
}

/// Lifecycle state of a package in a [`PackageManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PackageState {
    #[default]
    Unloaded,
    ResolvingDependencies,
    ResolvingInternal,
    ResolvingExternal,
    StreamingPayload,
    Loaded,
    ScanningInternal,
    DryRun,
    ScanningExternal,
    Writing,
    Saved,
}

impl PackageState {
    /// Loaded or saved: the package's objects are in memory and current.
    pub fn is_resident(self) -> bool {
        matches!(self, Self::Loaded | Self::Saved)
    }
}

/// Outcome of a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub package: String,
    pub internal_count: usize,
    pub external_count: usize,
    pub dependencies: Vec<String>,
    pub bytes: usize,
}

/// Outcome of a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub package: ObjectId,
    pub name: String,
    /// Packages decoded by this call, dependencies first.
    pub loaded: Vec<String>,
    pub created: usize,
    pub bound: usize,
}

/// Undo log of one load call.
#[derive(Default)]
struct Rollback {
    created: Vec<ObjectId>,
    renamed: Vec<(ObjectId, String)>,
}

/// Package name table, backing store and configuration.
pub struct PackageManager<S: PackageStore> {
    config: Config,
    store: S,
    packages: BTreeMap<String, ObjectId>,
    states: HashMap<String, PackageState>,
}

impl PackageManager<FileStore> {
    /// Manager over package files under `config.root_dir`.
    pub fn with_file_store(config: Config) -> Self {
        let store = FileStore::from_config(&config);
        Self::new(config, store)
    }
}

impl<S: PackageStore> PackageManager<S> {
    pub fn new(config: Config, store: S) -> Self {
        Self {
            config,
            store,
            packages: BTreeMap::new(),
            states: HashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn set_state(states: &mut HashMap<String, PackageState>, name: &str, state: PackageState) {
        tracing::debug!("package '{}': {:?}", name, state);
        states.insert(name.to_string(), state);
    }

    /// Last recorded state of `name`.
    pub fn state(&self, name: &str) -> PackageState {
        self.states.get(name).copied().unwrap_or_default()
    }

    /// Live package object registered under `name`.
    ///
    /// Falls back to an unowned `Package` object of that name in `model`,
    /// which covers packages created without the manager.
    pub fn package(&self, model: &ObjectModel, name: &str) -> Option<ObjectId> {
        if let Some(&id) = self.packages.get(name) {
            if model.contains(id) && model.is_package(id) && model.name(id).is_ok_and(|n| n == name) {
                return Some(id);
            }
        }
        model
            .find_all_by_name(name)
            .find(|&id| model.is_package(id) && model.owner(id).is_ok_and(|o| o.is_none()))
    }

    /// Registered package names and objects, sorted by name.
    pub fn packages(&self) -> impl Iterator<Item = (&str, ObjectId)> {
        self.packages.iter().map(|(name, &id)| (name.as_str(), id))
    }

    /// Package named `name`, created if it does not exist yet.
    pub fn create_package(&mut self, model: &mut ObjectModel, name: &str) -> Result<ObjectId, PackageError> {
        if let Some(id) = self.package(model, name) {
            self.packages.insert(name.to_string(), id);
            return Ok(id);
        }
        let id = model.insert(Package, Some(name))?;
        self.packages.insert(name.to_string(), id);
        tracing::debug!("created package '{}'", name);
        Ok(id)
    }

    fn is_resident(&self, model: &ObjectModel, name: &str) -> bool {
        self.state(name).is_resident() && self.package(model, name).is_some()
    }

    /// Encode `package` and commit the image to the store.
    pub fn save(&mut self, model: &mut ObjectModel, package: ObjectId) -> Result<SaveReport, PackageError> {
        let name = model.name(package)?.to_string();
        if !model.is_package(package) {
            return Err(PackageError::NotAPackage(name));
        }
        self.packages.insert(name.clone(), package);

        let previous = self.state(&name);
        let states = &mut self.states;
        let encoded = save::encode_package(model, package, &self.config, &mut |state| {
            Self::set_state(states, &name, state)
        });

        let (bytes, summary) = match encoded {
            Ok(encoded) => encoded,
            Err(e) => {
                Self::set_state(&mut self.states, &name, previous);
                return Err(e);
            }
        };

        if let Err(e) = self.store.write(&name, &bytes) {
            Self::set_state(&mut self.states, &name, previous);
            return Err(PackageError::from_store(&name, e));
        }
        Self::set_state(&mut self.states, &name, PackageState::Saved);

        tracing::info!(
            "saved package '{}' ({} bytes, {} internal, {} external)",
            name,
            bytes.len(),
            summary.internal.len(),
            summary.external.len()
        );
        Ok(SaveReport {
            package: name,
            internal_count: summary.internal.len(),
            external_count: summary.external.len(),
            dependencies: summary.dependencies,
            bytes: bytes.len(),
        })
    }

    pub fn save_by_name(&mut self, model: &mut ObjectModel, name: &str) -> Result<SaveReport, PackageError> {
        let package = self
            .package(model, name)
            .ok_or_else(|| PackageError::PackageNotFound(name.to_string()))?;
        self.save(model, package)
    }

    /// Save every registered package, in name order, stopping at the first failure.
    pub fn save_all(&mut self, model: &mut ObjectModel) -> Result<Vec<SaveReport>, PackageError> {
        let packages: Vec<ObjectId> = self
            .packages
            .values()
            .copied()
            .filter(|&id| model.contains(id))
            .collect();
        packages
            .into_iter()
            .map(|package| self.save(model, package))
            .collect()
    }

    /// Load `name` and the packages it depends on.
    ///
    /// On failure every object created by this call is destroyed and the
    /// package table is restored.
    pub fn load(&mut self, model: &mut ObjectModel, name: &str) -> Result<LoadReport, PackageError> {
        let states = self.states.clone();
        let packages = self.packages.clone();
        let mut rollback = Rollback::default();

        let result = self.load_planned(model, name, &mut rollback);
        if result.is_err() {
            for (id, old) in rollback.renamed.iter().rev() {
                if model.contains(*id) {
                    if let Err(e) = model.rename(*id, old) {
                        tracing::warn!("rollback: cannot restore name '{}': {}", old, e);
                    }
                }
            }
            let mut destroyed = 0;
            for &id in rollback.created.iter().rev() {
                if model.contains(id) {
                    destroyed += model.destroy(id).unwrap_or(0);
                }
            }
            tracing::debug!("load of '{}' rolled back ({} objects destroyed)", name, destroyed);
            self.states = states;
            self.packages = packages;
        }
        result
    }

    fn load_planned(
        &mut self,
        model: &mut ObjectModel,
        name: &str,
        rollback: &mut Rollback,
    ) -> Result<LoadReport, PackageError> {
        Self::set_state(&mut self.states, name, PackageState::ResolvingDependencies);

        let reload = self.config.reload_resident_dependencies;
        let files = {
            let this = &*self;
            let model = &*model;
            load::plan(&self.store, name, |dependency| {
                !reload && this.is_resident(model, dependency)
            })?
        };

        let mut report = LoadReport {
            package: ObjectId::new(0, 0),
            name: name.to_string(),
            loaded: Vec::with_capacity(files.len()),
            created: 0,
            bound: 0,
        };

        for file in &files {
            let declared = file.summary.header.name.clone();
            let package = self.bind_package(model, &file.name, &declared, rollback)?;
            Self::set_state(&mut self.states, &declared, PackageState::ResolvingDependencies);

            let states = &mut self.states;
            let decoded = load::decode_package(model, package, file, &mut rollback.created, &mut |state| {
                Self::set_state(states, &declared, state)
            })?;
            Self::set_state(&mut self.states, &declared, PackageState::Loaded);

            tracing::info!(
                "loaded package '{}' ({} objects, {} dependencies)",
                declared,
                file.summary.internal.len(),
                file.summary.dependencies.len()
            );
            report.created += decoded.created;
            report.bound += decoded.bound;
            report.package = package;
            report.name = declared.clone();
            report.loaded.push(declared);
        }
        if report.name != name {
            self.states.remove(name);
        }
        Ok(report)
    }

    /// Package object for a file, created on first load and renamed to the
    /// name its header declares.
    fn bind_package(
        &mut self,
        model: &mut ObjectModel,
        file_name: &str,
        declared: &str,
        rollback: &mut Rollback,
    ) -> Result<ObjectId, PackageError> {
        let package = match self
            .package(model, file_name)
            .or_else(|| self.package(model, declared))
        {
            Some(id) => id,
            None => {
                let id = model.insert(Package, Some(file_name))?;
                rollback.created.push(id);
                id
            }
        };

        if model.name(package)? != declared {
            if self.package(model, declared).is_some_and(|other| other != package) {
                return Err(PackageError::NameConflict {
                    file: file_name.to_string(),
                    declared: declared.to_string(),
                });
            }
            rollback.renamed.push((package, model.name(package)?.to_string()));
            model.rename(package, declared)?;
            self.packages.remove(file_name);
        }
        self.packages.insert(declared.to_string(), package);
        Ok(package)
    }

    /// Destroy package `name` and everything it owns.
    pub fn unload(&mut self, model: &mut ObjectModel, name: &str) -> Result<usize, PackageError> {
        let package = self
            .package(model, name)
            .ok_or_else(|| PackageError::PackageNotFound(name.to_string()))?;
        let destroyed = model.destroy(package)?;
        self.packages.remove(name);
        Self::set_state(&mut self.states, name, PackageState::Unloaded);
        Ok(destroyed)
    }

    /// Decode the header and tables of the stored image of `name`.
    pub fn inspect(&self, name: &str) -> Result<PackageSummary, PackageError> {
        let bytes = self
            .store
            .read(name)
            .map_err(|e| PackageError::from_store(name, e))?;
        inspect(&bytes).map_err(|e| PackageError::malformed(name, e))
    }
}

impl<S: PackageStore + std::fmt::Debug> std::fmt::Debug for PackageManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageManager")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("packages", &self.packages)
            .finish()
    }
}

#[cfg(test)]
mod tests;
