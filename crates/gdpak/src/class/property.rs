// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reflected properties

use super::PropertyValue;
use crate::object::{downcast_mut, downcast_ref, Object};
use std::any::Any;
use std::fmt;
use thiserror::Error;

/// Value kind of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    Vector3,
    Quaternion,
    Color3,
    Color4,
    ObjectRef,
}

impl PropertyKind {
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::String => "string",
            Self::Vector3 => "vector3",
            Self::Quaternion => "quaternion",
            Self::Color3 => "color3",
            Self::Color4 => "color4",
            Self::ObjectRef => "object",
        }
    }

    /// Number of float components of a compound kind, 0 for scalars.
    pub fn component_count(self) -> usize {
        match self {
            Self::Vector3 | Self::Color3 => 3,
            Self::Quaternion | Self::Color4 => 4,
            _ => 0,
        }
    }

    /// Display name of component `index`.
    pub fn component_name(self, index: usize) -> Option<&'static str> {
        const AXES: [&str; 4] = ["X", "Y", "Z", "W"];
        const CHANNELS: [&str; 4] = ["Red", "Green", "Blue", "Alpha"];

        if index >= self.component_count() {
            return None;
        }
        match self {
            Self::Vector3 | Self::Quaternion => Some(AXES[index]),
            Self::Color3 | Self::Color4 => Some(CHANNELS[index]),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::I8
                | Self::I16
                | Self::I32
                | Self::I64
                | Self::U8
                | Self::U16
                | Self::U32
                | Self::U64
                | Self::F32
                | Self::F64
        )
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Inclusive numeric bounds of a property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberRange {
    pub min: f64,
    pub max: f64,
}

impl NumberRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PropertyError {
    #[error("property '{0}' not found")]
    PropertyNotFound(String),

    #[error("property '{property}' holds {expected}, got {found}")]
    TypeMismatch {
        property: String,
        expected: PropertyKind,
        found: PropertyKind,
    },

    #[error("value {value} for property '{property}' is outside [{min}, {max}]")]
    OutOfRange {
        property: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("property '{0}' does not apply to this object")]
    NotApplicable(String),

    #[error("property '{0}' is read-only")]
    ReadOnly(String),
}

type Getter = Box<dyn Fn(&dyn Object) -> Option<PropertyValue> + Send + Sync>;
type Setter = Box<dyn Fn(&mut dyn Object, PropertyValue) -> bool + Send + Sync>;

/// A named, typed accessor on objects of one class.
///
/// Accessors are declared against the concrete type that owns the field;
/// objects of subclasses reach it through their embedded base chain.
///
/// ```rust
/// use gdpak::class::{PropertyDescriptor, PropertyKind, PropertyValue};
///
/// #[derive(Default)]
/// struct Lamp {
///     intensity: f32,
/// }
/// impl gdpak::object::Object for Lamp {}
///
/// let property = PropertyDescriptor::read_write(
///     "Intensity",
///     "Light output",
///     PropertyKind::F32,
///     |lamp: &Lamp| PropertyValue::F32(lamp.intensity),
///     |lamp: &mut Lamp, value| {
///         if let Some(v) = value.as_f32() {
///             lamp.intensity = v;
///         }
///     },
/// )
/// .with_range(0.0, 10.0);
///
/// let mut lamp = Lamp::default();
/// property.set(&mut lamp, PropertyValue::F32(2.5)).unwrap();
/// assert_eq!(property.value_string(&lamp).unwrap(), "2.5");
/// assert!(property.set(&mut lamp, PropertyValue::F32(11.0)).is_err());
/// ```
pub struct PropertyDescriptor {
    name: String,
    description: String,
    kind: PropertyKind,
    range: Option<NumberRange>,
    getter: Getter,
    setter: Option<Setter>,
}

impl PropertyDescriptor {
    pub fn read_only<T: Any>(
        name: impl Into<String>,
        description: impl Into<String>,
        kind: PropertyKind,
        get: fn(&T) -> PropertyValue,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            range: None,
            getter: Box::new(move |object: &dyn Object| downcast_ref::<T>(object).map(get)),
            setter: None,
        }
    }

    pub fn read_write<T: Any>(
        name: impl Into<String>,
        description: impl Into<String>,
        kind: PropertyKind,
        get: fn(&T) -> PropertyValue,
        set: fn(&mut T, PropertyValue),
    ) -> Self {
        let mut property = Self::read_only(name, description, kind, get);
        property.setter = Some(Box::new(move |object: &mut dyn Object, value: PropertyValue| {
            match downcast_mut::<T>(object) {
                Some(target) => {
                    set(target, value);
                    true
                }
                None => false,
            }
        }));
        property
    }

    /// Restrict numeric writes to `[min, max]`.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some(NumberRange::new(min, max));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn range(&self) -> Option<NumberRange> {
        self.range
    }

    pub fn is_read_only(&self) -> bool {
        self.setter.is_none()
    }

    pub fn get(&self, object: &dyn Object) -> Result<PropertyValue, PropertyError> {
        (self.getter)(object).ok_or_else(|| PropertyError::NotApplicable(self.name.clone()))
    }

    /// Write `value`, checking its kind and the declared range first.
    pub fn set(&self, object: &mut dyn Object, value: PropertyValue) -> Result<(), PropertyError> {
        let setter = self
            .setter
            .as_ref()
            .ok_or_else(|| PropertyError::ReadOnly(self.name.clone()))?;

        if value.kind() != self.kind {
            return Err(PropertyError::TypeMismatch {
                property: self.name.clone(),
                expected: self.kind,
                found: value.kind(),
            });
        }

        if let (Some(range), Some(number)) = (self.range, value.as_f64()) {
            if !range.contains(number) {
                return Err(PropertyError::OutOfRange {
                    property: self.name.clone(),
                    value: number,
                    min: range.min,
                    max: range.max,
                });
            }
        }

        if setter(object, value) {
            Ok(())
        } else {
            Err(PropertyError::NotApplicable(self.name.clone()))
        }
    }

    /// Current value rendered as text.
    pub fn value_string(&self, object: &dyn Object) -> Result<String, PropertyError> {
        self.get(object).map(|value| value.value_string())
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("range", &self.range)
            .field("read_only", &self.is_read_only())
            .finish()
    }
}
