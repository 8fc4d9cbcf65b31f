// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Package decoding and dependency planning

use super::format::{ExternalEntry, FormatError, PackageSummary};
use super::index::IndexTable;
use super::store::PackageStore;
use super::{PackageError, PackageState};
use crate::object::{ObjectId, ObjectModel};
use crate::stream::{Direction, ReadStream, Stream, StreamError};
use std::collections::{HashMap, HashSet};

/// A package image read from the store, tables already decoded.
pub(super) struct PackageFile {
    /// Name the file was requested under.
    pub name: String,
    pub bytes: Vec<u8>,
    pub summary: PackageSummary,
}

struct Planner<'a, S: ?Sized, F> {
    store: &'a S,
    skip_resident: F,
    done: HashSet<String>,
    stack: Vec<String>,
    order: Vec<PackageFile>,
}

impl<S, F> Planner<'_, S, F>
where
    S: PackageStore + ?Sized,
    F: Fn(&str) -> bool,
{
    fn visit(&mut self, name: &str) -> Result<(), PackageError> {
        if self.done.contains(name) {
            return Ok(());
        }
        if let Some(start) = self.stack.iter().position(|n| n == name) {
            let mut chain = self.stack[start..].to_vec();
            chain.push(name.to_string());
            return Err(PackageError::CyclicDependency { chain });
        }
        if !self.stack.is_empty() && (self.skip_resident)(name) {
            tracing::debug!("dependency '{}' already resident, not reloaded", name);
            self.done.insert(name.to_string());
            return Ok(());
        }

        let bytes = self
            .store
            .read(name)
            .map_err(|e| PackageError::from_store(name, e))?;
        let summary =
            PackageSummary::decode(&bytes).map_err(|e| PackageError::malformed(name, e))?;

        self.stack.push(name.to_string());
        for dependency in &summary.dependencies {
            self.visit(dependency)?;
        }
        self.stack.pop();

        self.done.insert(name.to_string());
        self.order.push(PackageFile {
            name: name.to_string(),
            bytes,
            summary,
        });
        Ok(())
    }
}

/// Read `root` and its dependencies, dependencies first.
///
/// `skip_resident` is asked about every dependency (never about `root`);
/// skipped packages are neither read nor returned.
pub(super) fn plan<S, F>(store: &S, root: &str, skip_resident: F) -> Result<Vec<PackageFile>, PackageError>
where
    S: PackageStore + ?Sized,
    F: Fn(&str) -> bool,
{
    let mut planner = Planner {
        store,
        skip_resident,
        done: HashSet::new(),
        stack: Vec::new(),
        order: Vec::new(),
    };
    planner.visit(root)?;
    Ok(planner.order)
}

/// Input stream over one object's payload slice.
struct PayloadReader<'a> {
    inner: ReadStream<&'a [u8]>,
    table: &'a IndexTable,
    fixups: &'a mut Vec<(ObjectId, Option<ObjectId>)>,
}

impl Stream for PayloadReader<'_> {
    fn direction(&self) -> Direction {
        Direction::Input
    }

    fn serialize(&mut self, data: &mut [u8]) -> Result<(), StreamError> {
        self.inner.serialize(data)
    }

    fn position(&self) -> u64 {
        self.inner.position()
    }

    fn remaining(&self) -> Option<u64> {
        self.inner.remaining()
    }

    fn object(&mut self, reference: &mut Option<ObjectId>) -> Result<(), StreamError> {
        let mut index = 0i32;
        self.inner.i32(&mut index)?;
        let resolved = self.table.resolve(index)?;
        *reference = resolved;

        let Some(mut current) = resolved else {
            return Ok(());
        };
        loop {
            let mut owner_index = 0i32;
            self.inner.i32(&mut owner_index)?;
            let owner = self.table.resolve(owner_index)?;
            self.fixups.push((current, owner));
            match owner {
                Some(owner) => current = owner,
                None => return Ok(()),
            }
        }
    }
}

/// Counts of one decoded package.
pub(super) struct Decoded {
    pub created: usize,
    pub bound: usize,
}

/// Row of each entry's parent; `None` is the package itself.
///
/// A parent name must designate exactly one candidate among the package
/// and the internal entries.
fn parent_rows(summary: &PackageSummary) -> Result<Vec<Option<usize>>, FormatError> {
    let package = summary.header.name.as_str();
    let mut rows: HashMap<&str, Vec<usize>> = HashMap::new();
    for (row, entry) in summary.internal.iter().enumerate() {
        rows.entry(entry.object_name.as_str()).or_default().push(row);
    }

    summary
        .internal
        .iter()
        .map(|entry| {
            let parent = entry.parent_name.as_str();
            match (parent == package, rows.get(parent).map(Vec::as_slice)) {
                (true, None) => Ok(None),
                (false, Some(&[row])) => Ok(Some(row)),
                (false, None) => Err(FormatError::Inconsistent(format!(
                    "'{}' names unknown parent '{}'",
                    entry.object_name, parent
                ))),
                _ => Err(FormatError::Inconsistent(format!(
                    "'{}' names ambiguous parent '{}'",
                    entry.object_name, parent
                ))),
            }
        })
        .collect()
}

/// Rows ordered so that every parent precedes its children.
fn parents_first(parents: &[Option<usize>]) -> Result<Vec<usize>, FormatError> {
    let mut depths = Vec::with_capacity(parents.len());
    for (row, &start) in parents.iter().enumerate() {
        let mut depth = 0usize;
        let mut current = start;
        while let Some(parent) = current {
            depth += 1;
            if depth > parents.len() {
                return Err(FormatError::Inconsistent(format!(
                    "row {} has a cyclic parent chain",
                    row + 1
                )));
            }
            current = parents[parent];
        }
        depths.push(depth);
    }

    let mut order: Vec<usize> = (0..parents.len()).collect();
    order.sort_by_key(|&row| depths[row]);
    Ok(order)
}

/// Object named by an external entry: a direct child of the package first,
/// then any object the package owns.
fn resolve_external(model: &ObjectModel, entry: &ExternalEntry) -> Option<ObjectId> {
    let is_named_package =
        |id: ObjectId| model.is_package(id) && model.name(id).is_ok_and(|n| n == entry.package_name);

    model
        .find_all_by_name(&entry.object_name)
        .find(|&id| matches!(model.owner(id), Ok(Some(owner)) if is_named_package(owner)))
        .or_else(|| {
            model.find_all_by_name(&entry.object_name).find(|&id| {
                model
                    .package_of(id)
                    .is_some_and(|p| p != id && is_named_package(p))
            })
        })
}

/// Decode `file` into `package`, pushing every object it creates onto `created`.
pub(super) fn decode_package(
    model: &mut ObjectModel,
    package: ObjectId,
    file: &PackageFile,
    created: &mut Vec<ObjectId>,
    on_state: &mut dyn FnMut(PackageState),
) -> Result<Decoded, PackageError> {
    let summary = &file.summary;
    let name = summary.header.name.as_str();
    let mut table = IndexTable::new();
    let mut fresh = 0;
    let mut bound = 0;

    on_state(PackageState::ResolvingInternal);
    let parents = parent_rows(summary).map_err(|e| PackageError::malformed(name, e))?;
    let order = parents_first(&parents).map_err(|e| PackageError::malformed(name, e))?;

    // Each row binds to the same-named child of its parent's object, which
    // sibling-name uniqueness makes exact; otherwise it is created there.
    let mut rows: Vec<Option<ObjectId>> = vec![None; summary.internal.len()];
    for row in order {
        let entry = &summary.internal[row];
        let class = model
            .registry()
            .get_by_name(&entry.class_name)
            .map_err(|_| PackageError::ClassNotFound {
                package: name.to_string(),
                class: entry.class_name.clone(),
            })?;

        let owner = match parents[row] {
            None => package,
            Some(parent) => rows[parent].ok_or_else(|| {
                PackageError::malformed(
                    name,
                    FormatError::Inconsistent(format!("parent of '{}' unresolved", entry.object_name)),
                )
            })?,
        };
        let existing = model
            .children(owner)
            .find(|&id| model.name(id).is_ok_and(|n| n == entry.object_name));

        let id = match existing {
            Some(id) => {
                let found = model.class_of(id)?;
                if found != class {
                    return Err(PackageError::ClassMismatch {
                        package: name.to_string(),
                        object: entry.object_name.clone(),
                        expected: entry.class_name.clone(),
                        found: model.registry().name(found).to_string(),
                    });
                }
                bound += 1;
                id
            }
            None => {
                let id = model.create(class, Some(&entry.object_name))?;
                created.push(id);
                model.set_owner(id, Some(owner))?;
                fresh += 1;
                id
            }
        };
        rows[row] = Some(id);
    }
    for id in rows.into_iter().flatten() {
        table.push_internal(id);
    }

    on_state(PackageState::ResolvingExternal);
    for entry in &summary.external {
        let id = resolve_external(model, entry).ok_or_else(|| PackageError::MissingExternalObject {
            package: name.to_string(),
            object: entry.object_name.clone(),
            owner: entry.package_name.clone(),
        })?;
        table.push_external(id);
    }

    on_state(PackageState::StreamingPayload);
    let mut fixups = Vec::new();
    let slices = summary.payload_slices(&file.bytes);
    for ((entry, slice), &id) in summary.internal.iter().zip(slices).zip(table.internal()) {
        let consumed = model
            .with_detached(id, |object, _| {
                let mut reader = PayloadReader {
                    inner: ReadStream::with_limit(slice, slice.len() as u64),
                    table: &table,
                    fixups: &mut fixups,
                };
                object.serialize(&mut reader).map(|()| reader.position())
            })?
            .map_err(|e| PackageError::from_load_stream(name, e))?;

        if consumed != slice.len() as u64 {
            return Err(PackageError::malformed(
                name,
                FormatError::Inconsistent(format!(
                    "'{}' read {} of {} payload bytes",
                    entry.object_name,
                    consumed,
                    slice.len()
                )),
            ));
        }
    }

    // A chain ending in 0 means the package itself owns the object.
    // External objects keep the owners their own package gave them.
    for (object, owner) in fixups {
        if !table.is_internal(object) {
            continue;
        }
        let owner = owner.unwrap_or(package);
        if model.owner(object)? != Some(owner) {
            model.set_owner(object, Some(owner))?;
        }
    }

    tracing::debug!(
        "package '{}': {} created, {} bound, {} external",
        name,
        fresh,
        bound,
        summary.external.len()
    );
    Ok(Decoded {
        created: fresh,
        bound,
    })
}
