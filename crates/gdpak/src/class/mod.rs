// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime class metadata
//!
//! Every persistable type is described by a [`ClassDescriptor`]: its name,
//! its parent class, its instance size, whether it can be instantiated, a
//! factory and an ordered list of reflected properties. Descriptors live in
//! a [`ClassRegistry`] and are addressed by [`ClassId`].
//!
//! # Hierarchy
//!
//! ```text
//! Object (abstract root, registered by the registry)
//!  +-- Package
//!  +-- <user classes registered without a parent>
//!       +-- <their subclasses>
//! ```
//!
//! Registration is explicit and ordered: a parent must be registered before
//! any of its children, which keeps the super chain acyclic by construction.

mod property;
mod registry;
mod value;

pub use property::{NumberRange, PropertyDescriptor, PropertyError, PropertyKind};
pub use registry::{ClassRegistry, Subclasses};
pub use value::PropertyValue;

use crate::object::Object;
use std::any::TypeId;
use std::fmt;
use thiserror::Error;

/// Name of the abstract root class.
pub const ROOT_CLASS: &str = "Object";

/// Name of the built-in package class.
pub const PACKAGE_CLASS: &str = "Package";

/// Constructor stored in a descriptor.
pub type Factory = fn() -> Box<dyn Object>;

/// Factory for any default-constructible object type.
pub fn default_factory<T: Object + Default>() -> Box<dyn Object> {
    Box::new(T::default())
}

/// Handle to a registered class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Registration index of this class.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

/// Errors raised by class lookups, registration and casts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassError {
    #[error("class '{0}' is not registered")]
    ClassNotFound(String),

    #[error("class '{0}' is already registered")]
    DuplicateClass(String),

    #[error("class '{class}' names unknown parent '{parent}'")]
    UnknownSuper { class: String, parent: String },

    #[error("class '{0}' is abstract and cannot be instantiated")]
    AbstractClass(String),

    #[error("cannot cast an object of class '{object_class}' to '{wanted}'")]
    InvalidCast {
        object_class: String,
        wanted: String,
    },

    #[error("Rust type '{0}' has no registered class")]
    UnregisteredType(&'static str),
}

/// A Rust type with a class descriptor.
///
/// The implementing type is the object data. Subclasses embed their parent
/// type and expose it through [`Object::super_object`], so a cast to any
/// ancestor walks the embedded chain.
pub trait Class: Object + Sized {
    /// Unique class name.
    const NAME: &'static str;

    /// Parent class name; `None` attaches the class to the root.
    const PARENT: Option<&'static str> = None;

    /// Abstract classes are never instantiated by the registry.
    const ABSTRACT: bool = false;

    /// Constructor used when a package instantiates this class.
    fn factory() -> Option<Factory> {
        None
    }

    /// Properties declared by this class, excluding inherited ones.
    fn properties() -> Vec<PropertyDescriptor> {
        Vec::new()
    }
}

/// Registered metadata for one class.
pub struct ClassDescriptor {
    pub(crate) id: ClassId,
    pub(crate) name: String,
    pub(crate) super_class: Option<ClassId>,
    pub(crate) instance_size: usize,
    pub(crate) is_abstract: bool,
    pub(crate) factory: Option<Factory>,
    pub(crate) properties: Vec<PropertyDescriptor>,
    pub(crate) type_id: Option<TypeId>,
}

impl ClassDescriptor {
    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent class, `None` only for the root.
    pub fn super_class(&self) -> Option<ClassId> {
        self.super_class
    }

    pub fn instance_size(&self) -> usize {
        self.instance_size
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// True when the registry can construct instances of this class.
    pub fn is_instantiable(&self) -> bool {
        !self.is_abstract && self.factory.is_some()
    }

    /// Properties declared by this class (inherited ones excluded).
    pub fn own_properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("super_class", &self.super_class)
            .field("instance_size", &self.instance_size)
            .field("is_abstract", &self.is_abstract)
            .field("has_factory", &self.factory.is_some())
            .field("properties", &self.properties)
            .finish()
    }
}

/// Fluent builder for class descriptors.
///
/// ```rust
/// use gdpak::class::{ClassBuilder, ClassRegistry};
///
/// let mut registry = ClassRegistry::new();
/// let shape = registry
///     .register(ClassBuilder::new("Shape").abstract_class().instance_size(16))
///     .unwrap();
/// let circle = registry
///     .register(ClassBuilder::new("Circle").parent("Shape"))
///     .unwrap();
/// assert!(registry.is_derived_from(circle, shape));
/// ```
pub struct ClassBuilder {
    pub(crate) name: String,
    pub(crate) parent: Option<String>,
    pub(crate) instance_size: usize,
    pub(crate) is_abstract: bool,
    pub(crate) factory: Option<Factory>,
    pub(crate) properties: Vec<PropertyDescriptor>,
    pub(crate) type_id: Option<TypeId>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            instance_size: 0,
            is_abstract: false,
            factory: None,
            properties: Vec::new(),
            type_id: None,
        }
    }

    /// Builder filled from a Rust type's [`Class`] implementation.
    pub fn of<T: Class>() -> Self {
        Self {
            name: T::NAME.to_string(),
            parent: T::PARENT.map(str::to_string),
            instance_size: std::mem::size_of::<T>(),
            is_abstract: T::ABSTRACT,
            factory: T::factory(),
            properties: T::properties(),
            type_id: Some(TypeId::of::<T>()),
        }
    }

    pub fn parent(mut self, name: impl Into<String>) -> Self {
        self.parent = Some(name.into());
        self
    }

    pub fn instance_size(mut self, size: usize) -> Self {
        self.instance_size = size;
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn factory(mut self, factory: Factory) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }
}
