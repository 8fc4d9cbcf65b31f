// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared fixtures for package integration tests

#![allow(dead_code)]

use gdpak::class::{default_factory, Factory};
use gdpak::{Class, ClassRegistry, Object, ObjectId, Stream, StreamError};

/// Scene node: a value, a label and one outgoing reference.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Node {
    pub value: u32,
    pub label: String,
    pub link: Option<ObjectId>,
}

impl Node {
    pub fn new(value: u32, label: &str) -> Self {
        Self {
            value,
            label: label.to_string(),
            link: None,
        }
    }
}

impl Object for Node {
    fn serialize(&mut self, stream: &mut dyn Stream) -> Result<(), StreamError> {
        stream.u32(&mut self.value)?;
        stream.string(&mut self.label)?;
        stream.object(&mut self.link)
    }
}

impl Class for Node {
    const NAME: &'static str = "Node";

    fn factory() -> Option<Factory> {
        Some(default_factory::<Self>)
    }
}

pub fn registry() -> ClassRegistry {
    let mut registry = ClassRegistry::new();
    registry
        .register_type::<Node>()
        .expect("register Node");
    registry
}
