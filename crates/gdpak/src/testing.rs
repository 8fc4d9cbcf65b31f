// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared test classes

use crate::class::{default_factory, Class, ClassRegistry, Factory, PropertyDescriptor, PropertyKind, PropertyValue};
use crate::object::{Object, ObjectId};
use crate::stream::{Stream, StreamError};

/// Registry with `Shape`, `Entity` and `Actor` registered.
pub(crate) fn registry() -> ClassRegistry {
    let mut registry = ClassRegistry::new();
    registry.register_type::<Shape>().unwrap();
    registry.register_type::<Entity>().unwrap();
    registry.register_type::<Actor>().unwrap();
    registry
}

/// Abstract class with no data.
#[derive(Debug, Default)]
pub(crate) struct Shape;

impl Object for Shape {}

impl Class for Shape {
    const NAME: &'static str = "Shape";
    const ABSTRACT: bool = true;
}

#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct Entity {
    pub health: i32,
    pub target: Option<ObjectId>,
}

impl Object for Entity {
    fn serialize(&mut self, stream: &mut dyn Stream) -> Result<(), StreamError> {
        stream.i32(&mut self.health)?;
        stream.object(&mut self.target)
    }
}

impl Class for Entity {
    const NAME: &'static str = "Entity";

    fn factory() -> Option<Factory> {
        Some(default_factory::<Self>)
    }

    fn properties() -> Vec<PropertyDescriptor> {
        vec![
            PropertyDescriptor::read_write(
                "Health",
                "Hit points",
                PropertyKind::I32,
                |e: &Entity| PropertyValue::I32(e.health),
                |e: &mut Entity, v| {
                    if let Some(h) = v.as_i32() {
                        e.health = h;
                    }
                },
            )
            .with_range(0.0, 100.0),
            PropertyDescriptor::read_write(
                "Target",
                "Tracked object",
                PropertyKind::ObjectRef,
                |e: &Entity| PropertyValue::ObjectRef(e.target),
                |e: &mut Entity, v| {
                    if let Some(target) = v.as_object() {
                        e.target = target;
                    }
                },
            ),
        ]
    }
}

/// `Entity` subclass embedding its base.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct Actor {
    pub base: Entity,
    pub speed: f32,
    pub label: String,
}

impl Actor {
    pub fn sample() -> Self {
        Self {
            base: Entity {
                health: 10,
                target: None,
            },
            speed: 1.5,
            label: "hero".to_string(),
        }
    }
}

impl Object for Actor {
    fn serialize(&mut self, stream: &mut dyn Stream) -> Result<(), StreamError> {
        self.base.serialize(stream)?;
        stream.f32(&mut self.speed)?;
        stream.string(&mut self.label)
    }

    fn super_object(&self) -> Option<&dyn Object> {
        Some(&self.base)
    }

    fn super_object_mut(&mut self) -> Option<&mut dyn Object> {
        Some(&mut self.base)
    }
}

impl Class for Actor {
    const NAME: &'static str = "Actor";
    const PARENT: Option<&'static str> = Some("Entity");

    fn factory() -> Option<Factory> {
        Some(default_factory::<Self>)
    }

    fn properties() -> Vec<PropertyDescriptor> {
        vec![
            PropertyDescriptor::read_write(
                "Speed",
                "Units per second",
                PropertyKind::F32,
                |a: &Actor| PropertyValue::F32(a.speed),
                |a: &mut Actor, v| {
                    if let Some(s) = v.as_f32() {
                        a.speed = s;
                    }
                },
            ),
            PropertyDescriptor::read_write(
                "Label",
                "Display label",
                PropertyKind::String,
                |a: &Actor| PropertyValue::String(a.label.clone()),
                |a: &mut Actor, v| {
                    if let Some(s) = v.as_str() {
                        a.label = s.to_string();
                    }
                },
            ),
        ]
    }
}
