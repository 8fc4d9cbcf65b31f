// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! gdpak: reflective object model and binary package engine
//!
//! A live graph of objects is described by runtime class metadata
//! ([`class`]), kept in a generation-checked arena with ownership trees
//! ([`object`]), and persisted one package at a time ([`package`]) through a
//! bidirectional byte boundary ([`stream`]).
//!
//! # Package layout
//!
//! ```text
//! +-----------------------------------------------------------+
//! | tag "GDPK" (4) | version (4) | name (string)              |
//! | dependency_count (4) | internal_count (4) | external (4)  |
//! +-----------------------------------------------------------+
//! | dependency names                                          |
//! | internal table { object, parent, class, byte_size }       |
//! | external table { object, package }                        |
//! +-----------------------------------------------------------+
//! | payloads, one slice per internal object, in table order   |
//! +-----------------------------------------------------------+
//! ```
//!
//! # Example
//!
//! ```rust
//! use gdpak::class::{default_factory, Class, ClassRegistry, Factory};
//! use gdpak::object::{Object, ObjectModel};
//! use gdpak::package::{MemoryStore, PackageManager};
//! use gdpak::stream::{Stream, StreamError};
//! use gdpak::Config;
//!
//! #[derive(Debug, Default)]
//! struct Counter {
//!     value: u32,
//! }
//!
//! impl Object for Counter {
//!     fn serialize(&mut self, stream: &mut dyn Stream) -> Result<(), StreamError> {
//!         stream.u32(&mut self.value)
//!     }
//! }
//!
//! impl Class for Counter {
//!     const NAME: &'static str = "Counter";
//!
//!     fn factory() -> Option<Factory> {
//!         Some(default_factory::<Self>)
//!     }
//! }
//!
//! let mut registry = ClassRegistry::new();
//! registry.register_type::<Counter>()?;
//! let mut model = ObjectModel::new(registry);
//! let mut packages = PackageManager::new(Config::default(), MemoryStore::new());
//!
//! let level = packages.create_package(&mut model, "Level")?;
//! let hits = model.insert(Counter { value: 7 }, Some("Hits"))?;
//! model.set_owner(hits, Some(level))?;
//!
//! let report = packages.save(&mut model, level)?;
//! assert_eq!(report.internal_count, 1);
//!
//! let summary = packages.inspect("Level")?;
//! assert_eq!(summary.internal[0].class_name, "Counter");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod class;
pub mod config;
pub mod object;
pub mod package;
pub mod stream;

pub use class::{Class, ClassError, ClassId, ClassRegistry, PropertyValue};
pub use config::{Config, ConfigBuilder, ConfigError};
pub use object::{Object, ObjectError, ObjectId, ObjectModel};
pub use package::{
    FileStore, LoadReport, MemoryStore, Package, PackageError, PackageManager, PackageState,
    PackageStore, SaveReport,
};
pub use stream::{Direction, Stream, StreamError};

#[cfg(test)]
pub(crate) mod testing;
