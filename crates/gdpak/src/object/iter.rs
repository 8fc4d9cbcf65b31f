// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Lazy iteration over live objects

use super::{ObjectId, ObjectModel};
use crate::class::ClassId;
use std::any::Any;
use std::collections::{btree_map, HashSet};
use std::marker::PhantomData;

/// Creation-ordered iterator, optionally restricted to a set of classes.
pub struct ObjectIter<'a> {
    model: &'a ObjectModel,
    inner: btree_map::Values<'a, u64, ObjectId>,
    classes: Option<HashSet<ClassId>>,
}

impl<'a> ObjectIter<'a> {
    pub(super) fn new(
        model: &'a ObjectModel,
        inner: btree_map::Values<'a, u64, ObjectId>,
        classes: Option<HashSet<ClassId>>,
    ) -> Self {
        Self {
            model,
            inner,
            classes,
        }
    }
}

impl Iterator for ObjectIter<'_> {
    type Item = ObjectId;

    fn next(&mut self) -> Option<ObjectId> {
        for &id in self.inner.by_ref() {
            let Some(classes) = &self.classes else {
                return Some(id);
            };
            if let Ok(class) = self.model.class_of(id) {
                if classes.contains(&class) {
                    return Some(id);
                }
            }
        }
        None
    }
}

/// Objects of one Rust type (or its subclasses) with typed access.
pub struct TypedIter<'a, T> {
    ids: ObjectIter<'a>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T> TypedIter<'a, T> {
    pub(super) fn new(ids: ObjectIter<'a>) -> Self {
        Self {
            ids,
            _marker: PhantomData,
        }
    }

    /// Drop the typed view and yield handles only.
    pub fn ids(self) -> ObjectIter<'a> {
        self.ids
    }
}

impl<'a, T: Any> Iterator for TypedIter<'a, T> {
    type Item = (ObjectId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let model = self.ids.model;
        for id in self.ids.by_ref() {
            if let Ok(value) = model.cast::<T>(id) {
                return Some((id, value));
            }
        }
        None
    }
}
