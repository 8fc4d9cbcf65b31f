// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reference index table
//!
//! `0` is the null reference, `1..=N` address the internal table and
//! `-1..=-M` the external table. A table lives for one save or load.

use crate::object::ObjectId;
use crate::stream::StreamError;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct IndexTable {
    indices: HashMap<ObjectId, i32>,
    internal: Vec<ObjectId>,
    external: Vec<ObjectId>,
}

impl IndexTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an internal object and return its index.
    pub fn push_internal(&mut self, id: ObjectId) -> i32 {
        self.internal.push(id);
        let index = self.internal.len() as i32;
        self.indices.insert(id, index);
        index
    }

    /// Append an external object and return its (negative) index.
    pub fn push_external(&mut self, id: ObjectId) -> i32 {
        self.external.push(id);
        let index = -(self.external.len() as i32);
        self.indices.insert(id, index);
        index
    }

    /// Index of a reference; `None` when the object is not in the table.
    pub fn index_of(&self, reference: Option<ObjectId>) -> Option<i32> {
        match reference {
            None => Some(0),
            Some(id) => self.indices.get(&id).copied(),
        }
    }

    pub fn resolve(&self, index: i32) -> Result<Option<ObjectId>, StreamError> {
        let slot = match index {
            0 => return Ok(None),
            i if i > 0 => self.internal.get(i as usize - 1),
            i => self.external.get(i.unsigned_abs() as usize - 1),
        };
        slot.copied()
            .map(Some)
            .ok_or(StreamError::InvalidReference(index))
    }

    pub fn is_internal(&self, id: ObjectId) -> bool {
        self.indices.get(&id).is_some_and(|&i| i > 0)
    }

    pub fn is_external(&self, id: ObjectId) -> bool {
        self.indices.get(&id).is_some_and(|&i| i < 0)
    }

    pub fn internal(&self) -> &[ObjectId] {
        &self.internal
    }

    pub fn external(&self) -> &[ObjectId] {
        &self.external
    }
}
