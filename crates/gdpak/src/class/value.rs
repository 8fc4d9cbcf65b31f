// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Property values

use super::PropertyKind;
use crate::object::ObjectId;

/// Value read from or written to a property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Vector3([f32; 3]),
    Quaternion([f32; 4]),
    Color3([f32; 3]),
    Color4([f32; 4]),
    ObjectRef(Option<ObjectId>),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Bool(_) => PropertyKind::Bool,
            Self::I8(_) => PropertyKind::I8,
            Self::I16(_) => PropertyKind::I16,
            Self::I32(_) => PropertyKind::I32,
            Self::I64(_) => PropertyKind::I64,
            Self::U8(_) => PropertyKind::U8,
            Self::U16(_) => PropertyKind::U16,
            Self::U32(_) => PropertyKind::U32,
            Self::U64(_) => PropertyKind::U64,
            Self::F32(_) => PropertyKind::F32,
            Self::F64(_) => PropertyKind::F64,
            Self::String(_) => PropertyKind::String,
            Self::Vector3(_) => PropertyKind::Vector3,
            Self::Quaternion(_) => PropertyKind::Quaternion,
            Self::Color3(_) => PropertyKind::Color3,
            Self::Color4(_) => PropertyKind::Color4,
            Self::ObjectRef(_) => PropertyKind::ObjectRef,
        }
    }

    /// Numeric scalar widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::I8(v) => Some(v as f64),
            Self::I16(v) => Some(v as f64),
            Self::I32(v) => Some(v as f64),
            Self::I64(v) => Some(v as f64),
            Self::U8(v) => Some(v as f64),
            Self::U16(v) => Some(v as f64),
            Self::U32(v) => Some(v as f64),
            Self::U64(v) => Some(v as f64),
            Self::F32(v) => Some(v as f64),
            Self::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Self::I32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            Self::U32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Self::F32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<Option<ObjectId>> {
        match *self {
            Self::ObjectRef(v) => Some(v),
            _ => None,
        }
    }

    /// Float components of a compound value.
    pub fn components(&self) -> Option<&[f32]> {
        match self {
            Self::Vector3(v) | Self::Color3(v) => Some(v),
            Self::Quaternion(v) | Self::Color4(v) => Some(v),
            _ => None,
        }
    }

    /// Component `index` of a compound value.
    pub fn component(&self, index: usize) -> Option<f32> {
        self.components().and_then(|c| c.get(index).copied())
    }

    /// Component addressed by its display name (`X`, `Green`, ...).
    pub fn component_by_name(&self, name: &str) -> Option<f32> {
        let kind = self.kind();
        (0..kind.component_count())
            .find(|&i| kind.component_name(i) == Some(name))
            .and_then(|i| self.component(i))
    }

    /// Human-readable rendering.
    ///
    /// Booleans render as `True`/`False`; compound values as `{ a, b, c }`.
    pub fn value_string(&self) -> String {
        match self {
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
            Self::I8(v) => v.to_string(),
            Self::I16(v) => v.to_string(),
            Self::I32(v) => v.to_string(),
            Self::I64(v) => v.to_string(),
            Self::U8(v) => v.to_string(),
            Self::U16(v) => v.to_string(),
            Self::U32(v) => v.to_string(),
            Self::U64(v) => v.to_string(),
            Self::F32(v) => v.to_string(),
            Self::F64(v) => v.to_string(),
            Self::String(v) => v.clone(),
            Self::Vector3(v) | Self::Color3(v) => braced(v),
            Self::Quaternion(v) | Self::Color4(v) => braced(v),
            Self::ObjectRef(None) => "None".to_string(),
            Self::ObjectRef(Some(id)) => id.to_string(),
        }
    }
}

fn braced(components: &[f32]) -> String {
    let parts: Vec<String> = components.iter().map(|c| c.to_string()).collect();
    format!("{{ {} }}", parts.join(", "))
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for PropertyValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Option<ObjectId>> for PropertyValue {
    fn from(v: Option<ObjectId>) -> Self {
        Self::ObjectRef(v)
    }
}
