// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object identity, naming and ownership
//!
//! Objects live in an [`ObjectModel`] arena and are addressed by
//! generation-checked [`ObjectId`] handles. Each object has a class, a name
//! unique among its siblings and an optional owner; the owner relation
//! forms a forest whose roots decide which package an object belongs to.

mod iter;
mod model;

pub use iter::{ObjectIter, TypedIter};
pub use model::ObjectModel;

use crate::class::{ClassError, PropertyError};
use crate::stream::{Stream, StreamError};
use std::any::Any;
use std::fmt;
use thiserror::Error;

/// Handle to an object in an [`ObjectModel`].
///
/// A handle outlives its object: once the slot is reused the generation no
/// longer matches and every lookup reports [`ObjectError::StaleObject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ObjectError {
    #[error("stale object handle {0}")]
    StaleObject(ObjectId),

    #[error("owning '{object}' by '{owner}' would create an ownership cycle")]
    OwnershipCycle { object: String, owner: String },

    #[error("'{owner}' already owns an object named '{name}'")]
    DuplicateName { name: String, owner: String },

    #[error(transparent)]
    Class(#[from] ClassError),

    #[error(transparent)]
    Property(#[from] PropertyError),
}

/// Upcast to `Any`, implemented for every `'static` type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Object data stored in the model.
///
/// Subclasses embed their parent's data and return it from
/// [`super_object`](Object::super_object); [`downcast_ref`] follows that
/// chain to reach any ancestor type.
pub trait Object: AsAny {
    /// Read or write this object's fields, in a fixed order, through `stream`.
    fn serialize(&mut self, stream: &mut dyn Stream) -> Result<(), StreamError> {
        let _ = stream;
        Ok(())
    }

    /// Embedded parent-class data.
    fn super_object(&self) -> Option<&dyn Object> {
        None
    }

    fn super_object_mut(&mut self) -> Option<&mut dyn Object> {
        None
    }
}

/// View `object` as `T`, walking the embedded base chain.
pub fn downcast_ref<T: Any>(object: &dyn Object) -> Option<&T> {
    if let Some(value) = object.as_any().downcast_ref::<T>() {
        return Some(value);
    }
    object.super_object().and_then(|base| downcast_ref::<T>(base))
}

pub fn downcast_mut<T: Any>(object: &mut dyn Object) -> Option<&mut T> {
    if (*object).as_any().is::<T>() {
        return (*object).as_any_mut().downcast_mut::<T>();
    }
    object.super_object_mut().and_then(|base| downcast_mut::<T>(base))
}
