// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object arena

use super::iter::{ObjectIter, TypedIter};
use super::{downcast_mut, downcast_ref, Object, ObjectError, ObjectId};
use crate::class::{Class, ClassError, ClassId, ClassRegistry, PropertyError, PropertyValue};
use crate::package::Package;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};

struct Entry {
    class: ClassId,
    name: String,
    owner: Option<ObjectId>,
    serial: u64,
    /// Empty only while the object is lent out by `with_detached`.
    data: Option<Box<dyn Object>>,
}

struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

fn live_entry(slots: &[Slot], id: ObjectId) -> Result<&Entry, ObjectError> {
    slots
        .get(id.index() as usize)
        .filter(|slot| slot.generation == id.generation())
        .and_then(|slot| slot.entry.as_ref())
        .ok_or(ObjectError::StaleObject(id))
}

fn live_entry_mut(slots: &mut [Slot], id: ObjectId) -> Result<&mut Entry, ObjectError> {
    slots
        .get_mut(id.index() as usize)
        .filter(|slot| slot.generation == id.generation())
        .and_then(|slot| slot.entry.as_mut())
        .ok_or(ObjectError::StaleObject(id))
}

/// Arena of live objects.
///
/// Owns the [`ClassRegistry`] its objects are described by. Iteration
/// follows creation order; name lookups go through a per-name index.
pub struct ObjectModel {
    registry: ClassRegistry,
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: BTreeMap<u64, ObjectId>,
    names: HashMap<String, Vec<ObjectId>>,
    next_serial: u64,
}

impl ObjectModel {
    pub fn new(registry: ClassRegistry) -> Self {
        Self {
            registry,
            slots: Vec::new(),
            free: Vec::new(),
            live: BTreeMap::new(),
            names: HashMap::new(),
            next_serial: 0,
        }
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ClassRegistry {
        &mut self.registry
    }

    /// Instantiate `class` through its factory.
    ///
    /// An empty or missing name is replaced by `ClassName_NNN`.
    pub fn create(&mut self, class: ClassId, name: Option<&str>) -> Result<ObjectId, ObjectError> {
        let data = self.registry.allocate(class)?;
        Ok(self.link(class, data, name))
    }

    /// Add an explicitly constructed object.
    pub fn insert<T: Class>(&mut self, value: T, name: Option<&str>) -> Result<ObjectId, ObjectError> {
        let class = self.registry.class_of::<T>()?;
        Ok(self.link(class, Box::new(value), name))
    }

    fn link(&mut self, class: ClassId, data: Box<dyn Object>, name: Option<&str>) -> ObjectId {
        let name = match name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.auto_name(class),
        };

        let serial = self.next_serial;
        self.next_serial += 1;

        let entry = Entry {
            class,
            name: name.clone(),
            owner: None,
            serial,
            data: Some(data),
        };

        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                ObjectId::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                ObjectId::new(index, 0)
            }
        };

        self.live.insert(serial, id);
        self.names.entry(name).or_default().push(id);
        id
    }

    /// Lowest free `ClassName_NNN` for `class`.
    fn auto_name(&self, class: ClassId) -> String {
        let base = self.registry.name(class);
        let mut suffix: u64 = 0;
        loop {
            let candidate = format!("{}_{:03}", base, suffix);
            if !self.names.contains_key(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Destroy `id` and every object it owns, returning how many objects went away.
    pub fn destroy(&mut self, id: ObjectId) -> Result<usize, ObjectError> {
        live_entry(&self.slots, id)?;

        let doomed: Vec<ObjectId> = self
            .live
            .values()
            .copied()
            .filter(|&other| other == id || self.is_owned_by(other, id))
            .collect();

        for &victim in &doomed {
            self.unlink(victim);
        }
        tracing::debug!("destroyed {} ({} objects)", id, doomed.len());
        Ok(doomed.len())
    }

    fn unlink(&mut self, id: ObjectId) {
        let Some(slot) = self.slots.get_mut(id.index() as usize) else {
            return;
        };
        if slot.generation != id.generation() {
            return;
        }
        let Some(entry) = slot.entry.take() else {
            return;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        self.live.remove(&entry.serial);

        if let Some(ids) = self.names.get_mut(&entry.name) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.names.remove(&entry.name);
            }
        }
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        live_entry(&self.slots, id).is_ok()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn class_of(&self, id: ObjectId) -> Result<ClassId, ObjectError> {
        Ok(live_entry(&self.slots, id)?.class)
    }

    pub fn class_name(&self, id: ObjectId) -> Result<&str, ObjectError> {
        Ok(self.registry.name(self.class_of(id)?))
    }

    pub fn name(&self, id: ObjectId) -> Result<&str, ObjectError> {
        Ok(&live_entry(&self.slots, id)?.name)
    }

    pub fn owner(&self, id: ObjectId) -> Result<Option<ObjectId>, ObjectError> {
        Ok(live_entry(&self.slots, id)?.owner)
    }

    /// True when an object of the same name already sits under `owner`.
    fn sibling_named(&self, name: &str, owner: ObjectId, except: ObjectId) -> bool {
        self.names.get(name).is_some_and(|ids| {
            ids.iter().any(|&other| {
                other != except
                    && live_entry(&self.slots, other).is_ok_and(|e| e.owner == Some(owner))
            })
        })
    }

    /// Attach `id` under `owner`, or detach it with `None`.
    pub fn set_owner(&mut self, id: ObjectId, owner: Option<ObjectId>) -> Result<(), ObjectError> {
        let name = self.name(id)?.to_string();

        if let Some(owner) = owner {
            let owner_name = self.name(owner)?.to_string();
            if owner == id || self.is_owned_by(owner, id) {
                return Err(ObjectError::OwnershipCycle {
                    object: name,
                    owner: owner_name,
                });
            }
            if self.sibling_named(&name, owner, id) {
                return Err(ObjectError::DuplicateName {
                    name,
                    owner: owner_name,
                });
            }
        }

        live_entry_mut(&mut self.slots, id)?.owner = owner;
        Ok(())
    }

    /// Rename `id`; an empty name picks a fresh `ClassName_NNN`.
    pub fn rename(&mut self, id: ObjectId, name: &str) -> Result<(), ObjectError> {
        let entry = live_entry(&self.slots, id)?;
        let (class, owner, old) = (entry.class, entry.owner, entry.name.clone());

        let name = if name.is_empty() {
            self.auto_name(class)
        } else {
            name.to_string()
        };
        if name == old {
            return Ok(());
        }

        if let Some(owner) = owner {
            if self.sibling_named(&name, owner, id) {
                return Err(ObjectError::DuplicateName {
                    name,
                    owner: self.name(owner)?.to_string(),
                });
            }
        }

        if let Some(ids) = self.names.get_mut(&old) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.names.remove(&old);
            }
        }
        self.names.entry(name.clone()).or_default().push(id);
        live_entry_mut(&mut self.slots, id)?.name = name;
        Ok(())
    }

    /// True when `candidate` appears on the owner chain of `id`.
    ///
    /// An object is never owned by itself.
    pub fn is_owned_by(&self, id: ObjectId, candidate: ObjectId) -> bool {
        let mut current = match live_entry(&self.slots, id) {
            Ok(entry) => entry.owner,
            Err(_) => return false,
        };
        while let Some(owner) = current {
            if owner == candidate {
                return true;
            }
            current = live_entry(&self.slots, owner).ok().and_then(|e| e.owner);
        }
        false
    }

    /// Topmost owner of `id`, or `id` itself when it has no owner.
    pub fn root_owner(&self, id: ObjectId) -> Result<ObjectId, ObjectError> {
        let mut current = id;
        while let Some(owner) = self.owner(current)? {
            current = owner;
        }
        Ok(current)
    }

    pub fn is_package(&self, id: ObjectId) -> bool {
        match (self.class_of(id), self.registry.class_of::<Package>()) {
            (Ok(class), Ok(package)) => self.registry.is_a(class, package),
            _ => false,
        }
    }

    /// Package that `id` belongs to: its root owner, when that is a package.
    pub fn package_of(&self, id: ObjectId) -> Option<ObjectId> {
        let root = self.root_owner(id).ok()?;
        self.is_package(root).then_some(root)
    }

    /// Objects named `name`, in creation order of their naming.
    pub fn find_all_by_name<'a>(&'a self, name: &str) -> impl Iterator<Item = ObjectId> + 'a {
        self.names
            .get(name)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
            .iter()
            .copied()
    }

    /// First object named `name` whose direct owner is named `owner_name`.
    ///
    /// An empty `owner_name` matches any owner, including none.
    pub fn find_by_name_and_owner_name(&self, name: &str, owner_name: &str) -> Option<ObjectId> {
        self.find_all_by_name(name).find(|&id| {
            if owner_name.is_empty() {
                return true;
            }
            match self.owner(id) {
                Ok(Some(owner)) => self.name(owner).is_ok_and(|n| n == owner_name),
                _ => false,
            }
        })
    }

    /// Objects directly owned by `owner`, in creation order.
    pub fn children(&self, owner: ObjectId) -> impl Iterator<Item = ObjectId> + '_ {
        self.iter()
            .filter(move |&id| self.owner(id).is_ok_and(|o| o == Some(owner)))
    }

    /// Every live object in creation order.
    pub fn iter(&self) -> ObjectIter<'_> {
        ObjectIter::new(self, self.live.values(), None)
    }

    /// Live objects of `class` or any of its subclasses.
    pub fn iter_class(&self, class: ClassId) -> ObjectIter<'_> {
        ObjectIter::new(self, self.live.values(), Some(self.registry.descendants(class)))
    }

    /// Live objects whose class is the one registered for `T`, or derived from it.
    pub fn iter_of<T: Any>(&self) -> Result<TypedIter<'_, T>, ObjectError> {
        let class = self.registry.class_of::<T>()?;
        Ok(TypedIter::new(self.iter_class(class)))
    }

    pub fn object(&self, id: ObjectId) -> Result<&dyn Object, ObjectError> {
        live_entry(&self.slots, id)?
            .data
            .as_deref()
            .ok_or(ObjectError::StaleObject(id))
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Result<&mut dyn Object, ObjectError> {
        match live_entry_mut(&mut self.slots, id)?.data.as_deref_mut() {
            Some(object) => Ok(object),
            None => Err(ObjectError::StaleObject(id)),
        }
    }

    fn cast_error<T: Any>(&self, class: ClassId) -> ObjectError {
        let wanted = match self.registry.class_of::<T>() {
            Ok(wanted) => self.registry.name(wanted).to_string(),
            Err(_) => std::any::type_name::<T>().to_string(),
        };
        ObjectError::Class(ClassError::InvalidCast {
            object_class: self.registry.name(class).to_string(),
            wanted,
        })
    }

    /// View `id` as `T`.
    ///
    /// Succeeds when the object's class is `T`'s class or derives from it.
    pub fn cast<T: Any>(&self, id: ObjectId) -> Result<&T, ObjectError> {
        let class = self.class_of(id)?;
        let wanted = self.registry.class_of::<T>()?;
        if !self.registry.is_a(class, wanted) {
            return Err(self.cast_error::<T>(class));
        }
        match downcast_ref::<T>(self.object(id)?) {
            Some(value) => Ok(value),
            None => Err(self.cast_error::<T>(class)),
        }
    }

    pub fn cast_mut<T: Any>(&mut self, id: ObjectId) -> Result<&mut T, ObjectError> {
        let class = self.class_of(id)?;
        let wanted = self.registry.class_of::<T>()?;
        if !self.registry.is_a(class, wanted) {
            return Err(self.cast_error::<T>(class));
        }
        let error = self.cast_error::<T>(class);
        downcast_mut::<T>(self.object_mut(id)?).ok_or(error)
    }

    pub fn get<T: Any>(&self, id: ObjectId) -> Result<&T, ObjectError> {
        self.cast(id)
    }

    pub fn get_mut<T: Any>(&mut self, id: ObjectId) -> Result<&mut T, ObjectError> {
        self.cast_mut(id)
    }

    /// Read property `name` of `id`.
    pub fn property(&self, id: ObjectId, name: &str) -> Result<PropertyValue, ObjectError> {
        let class = self.class_of(id)?;
        let property = self
            .registry
            .property(class, name)
            .ok_or_else(|| PropertyError::PropertyNotFound(name.to_string()))?;
        Ok(property.get(self.object(id)?)?)
    }

    /// Write property `name` of `id`.
    pub fn set_property(
        &mut self,
        id: ObjectId,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), ObjectError> {
        let entry = live_entry_mut(&mut self.slots, id)?;
        let property = self
            .registry
            .property(entry.class, name)
            .ok_or_else(|| PropertyError::PropertyNotFound(name.to_string()))?;
        let object = entry
            .data
            .as_deref_mut()
            .ok_or(ObjectError::StaleObject(id))?;
        Ok(property.set(object, value)?)
    }

    /// Lend the data of `id` to `f` together with a shared view of the model.
    pub(crate) fn with_detached<R>(
        &mut self,
        id: ObjectId,
        f: impl FnOnce(&mut dyn Object, &ObjectModel) -> R,
    ) -> Result<R, ObjectError> {
        let mut data = live_entry_mut(&mut self.slots, id)?
            .data
            .take()
            .ok_or(ObjectError::StaleObject(id))?;

        let result = f(&mut *data, self);

        if let Ok(entry) = live_entry_mut(&mut self.slots, id) {
            entry.data = Some(data);
        }
        Ok(result)
    }
}

impl std::fmt::Debug for ObjectModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectModel")
            .field("classes", &self.registry.len())
            .field("objects", &self.live.len())
            .finish()
    }
}
