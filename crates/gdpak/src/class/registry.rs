// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Class registry

use super::{
    ClassBuilder, ClassDescriptor, ClassError, ClassId, PropertyDescriptor, ROOT_CLASS,
};
use crate::object::Object;
use crate::package::Package;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};

/// Registry of class descriptors.
///
/// A new registry already holds the abstract root `Object` and the
/// built-in `Package` class.
pub struct ClassRegistry {
    classes: Vec<ClassDescriptor>,
    by_name: HashMap<String, ClassId>,
    by_type: HashMap<TypeId, ClassId>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            classes: Vec::new(),
            by_name: HashMap::new(),
            by_type: HashMap::new(),
        };

        let root = ClassId::from_index(0);
        registry.by_name.insert(ROOT_CLASS.to_string(), root);
        registry.classes.push(ClassDescriptor {
            id: root,
            name: ROOT_CLASS.to_string(),
            super_class: None,
            instance_size: 0,
            is_abstract: true,
            factory: None,
            properties: Vec::new(),
            type_id: None,
        });

        // Fresh registry: the name cannot collide.
        if let Err(e) = registry.register_type::<Package>() {
            tracing::warn!("built-in package class not registered: {}", e);
        }
        registry
    }

    /// Register a class described by `builder`.
    pub fn register(&mut self, builder: ClassBuilder) -> Result<ClassId, ClassError> {
        if self.by_name.contains_key(&builder.name) {
            return Err(ClassError::DuplicateClass(builder.name));
        }

        let super_class = match &builder.parent {
            Some(parent) => match self.by_name.get(parent) {
                Some(id) => *id,
                None => {
                    return Err(ClassError::UnknownSuper {
                        class: builder.name,
                        parent: parent.clone(),
                    })
                }
            },
            None => self.root(),
        };

        let id = ClassId::from_index(self.classes.len());
        if let Some(type_id) = builder.type_id {
            self.by_type.insert(type_id, id);
        }
        self.by_name.insert(builder.name.clone(), id);

        tracing::debug!(
            "registered class '{}' as {} (parent {})",
            builder.name,
            id,
            self.classes[super_class.index()].name
        );

        self.classes.push(ClassDescriptor {
            id,
            name: builder.name,
            super_class: Some(super_class),
            instance_size: builder.instance_size,
            is_abstract: builder.is_abstract,
            factory: builder.factory,
            properties: builder.properties,
            type_id: builder.type_id,
        });
        Ok(id)
    }

    /// Register the class of a Rust type.
    ///
    /// Registering the same type twice returns the existing id.
    pub fn register_type<T: super::Class>(&mut self) -> Result<ClassId, ClassError> {
        if let Some(id) = self.by_type.get(&TypeId::of::<T>()) {
            return Ok(*id);
        }
        self.register(ClassBuilder::of::<T>())
    }

    /// The abstract root class.
    pub fn root(&self) -> ClassId {
        ClassId::from_index(0)
    }

    pub fn get_by_name(&self, name: &str) -> Result<ClassId, ClassError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| ClassError::ClassNotFound(name.to_string()))
    }

    /// Class registered for the Rust type `T`.
    pub fn class_of<T: 'static>(&self) -> Result<ClassId, ClassError> {
        self.by_type
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or(ClassError::UnregisteredType(std::any::type_name::<T>()))
    }

    /// Descriptor of `id`.
    ///
    /// Class ids are only minted by a registry; passing an id from a
    /// different registry is a logic error and panics.
    pub fn descriptor(&self, id: ClassId) -> &ClassDescriptor {
        &self.classes[id.index()]
    }

    pub fn name(&self, id: ClassId) -> &str {
        &self.descriptor(id).name
    }

    pub fn super_class(&self, id: ClassId) -> Option<ClassId> {
        self.descriptor(id).super_class
    }

    /// True when `class` is a strict descendant of `base`.
    pub fn is_derived_from(&self, class: ClassId, base: ClassId) -> bool {
        let mut current = self.super_class(class);
        while let Some(id) = current {
            if id == base {
                return true;
            }
            current = self.super_class(id);
        }
        false
    }

    /// True when `class` is `base` or one of its descendants.
    pub fn is_a(&self, class: ClassId, base: ClassId) -> bool {
        class == base || self.is_derived_from(class, base)
    }

    /// Construct a default instance of `id`.
    pub fn allocate(&self, id: ClassId) -> Result<Box<dyn Object>, ClassError> {
        let descriptor = self.descriptor(id);
        match descriptor.factory {
            Some(factory) if !descriptor.is_abstract => Ok(factory()),
            _ => Err(ClassError::AbstractClass(descriptor.name.clone())),
        }
    }

    /// Class chain from the root down to `id`, inclusive.
    pub fn lineage(&self, id: ClassId) -> Vec<ClassId> {
        let mut chain = vec![id];
        let mut current = self.super_class(id);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.super_class(parent);
        }
        chain.reverse();
        chain
    }

    /// All properties of `id`, base classes first.
    pub fn properties(&self, id: ClassId) -> impl Iterator<Item = &PropertyDescriptor> + '_ {
        self.lineage(id)
            .into_iter()
            .flat_map(move |class| self.classes[class.index()].properties.iter())
    }

    /// Property `name` of `id`, searched base first.
    pub fn property(&self, id: ClassId, name: &str) -> Option<&PropertyDescriptor> {
        self.properties(id).find(|p| p.name() == name)
    }

    pub fn property_count(&self, id: ClassId) -> usize {
        self.properties(id).count()
    }

    /// Strict descendants of `base`, in registration order.
    pub fn subclasses(&self, base: ClassId) -> Subclasses<'_> {
        Subclasses {
            registry: self,
            base,
            next: base.index() + 1,
        }
    }

    /// `base` and every class derived from it.
    pub fn descendants(&self, base: ClassId) -> HashSet<ClassId> {
        self.classes
            .iter()
            .map(|c| c.id)
            .filter(|id| self.is_a(*id, base))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.classes.iter().map(|c| c.name.as_str()))
            .finish()
    }
}

/// Iterator over the subclasses of a class.
///
/// A child is always registered after its parent, so the scan starts just
/// past `base`.
pub struct Subclasses<'a> {
    registry: &'a ClassRegistry,
    base: ClassId,
    next: usize,
}

impl<'a> Iterator for Subclasses<'a> {
    type Item = &'a ClassDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(class) = self.registry.classes.get(self.next) {
            self.next += 1;
            if self.registry.is_derived_from(class.id, self.base) {
                return Some(class);
            }
        }
        None
    }
}
