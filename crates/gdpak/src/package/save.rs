// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Package encoding
//!
//! A save runs in two passes over the internal objects. The dry run counts
//! each object's payload size and discovers the external objects it
//! references; the write pass emits the image. Both passes walk the same
//! `Object::serialize` routine.

use super::format::{ExternalEntry, InternalEntry, PackageHeader, PackageSummary};
use super::index::IndexTable;
use super::{PackageError, PackageState};
use crate::config::Config;
use crate::object::{ObjectId, ObjectModel};
use crate::stream::{CountingStream, Direction, Stream, StreamError, WriteStream};
use std::collections::{HashMap, HashSet};

/// Rows name their parent by name only, so an owner's name must be unique
/// among the package and its internal objects.
fn check_parent_names(model: &ObjectModel, package: &str, internal: &[ObjectId]) -> Result<(), PackageError> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    *counts.entry(package).or_default() += 1;
    for &id in internal {
        *counts.entry(model.name(id)?).or_default() += 1;
    }

    for &id in internal {
        let Some(owner) = model.owner(id)? else {
            continue;
        };
        let parent = model.name(owner)?;
        if counts.get(parent).copied().unwrap_or(0) > 1 {
            return Err(PackageError::AmbiguousParent {
                package: package.to_string(),
                parent: parent.to_string(),
            });
        }
    }
    Ok(())
}

/// External objects in discovery order.
#[derive(Default)]
struct Discovery {
    order: Vec<ObjectId>,
    seen: HashSet<ObjectId>,
}

fn unresolvable(model: &ObjectModel, id: ObjectId, reason: &str) -> StreamError {
    StreamError::UnresolvableReference {
        object: model.name(id).unwrap_or("?").to_string(),
        reason: reason.to_string(),
    }
}

/// Next link of a reference's owner chain; package owners end the chain.
fn chain_owner(model: &ObjectModel, id: ObjectId) -> Result<Option<ObjectId>, StreamError> {
    match model.owner(id) {
        Ok(Some(owner)) if !model.is_package(owner) => Ok(Some(owner)),
        Ok(_) => Ok(None),
        Err(_) => Err(StreamError::StaleReference(id)),
    }
}

/// Dry-run stream: counts bytes and collects external references.
struct ScanStream<'a> {
    counter: CountingStream,
    model: &'a ObjectModel,
    table: &'a IndexTable,
    found: &'a mut Discovery,
}

impl ScanStream<'_> {
    fn visit(&mut self, id: ObjectId) -> Result<(), StreamError> {
        if !self.model.contains(id) {
            return Err(StreamError::StaleReference(id));
        }
        if self.table.is_internal(id) || self.found.seen.contains(&id) {
            return Ok(());
        }
        if self.model.is_package(id) {
            return Err(unresolvable(self.model, id, "package objects cannot be referenced"));
        }
        if self.model.package_of(id).is_none() {
            return Err(unresolvable(self.model, id, "object belongs to no package"));
        }
        self.found.seen.insert(id);
        self.found.order.push(id);
        Ok(())
    }
}

impl Stream for ScanStream<'_> {
    fn direction(&self) -> Direction {
        Direction::Output
    }

    fn serialize(&mut self, data: &mut [u8]) -> Result<(), StreamError> {
        self.counter.serialize(data)
    }

    fn position(&self) -> u64 {
        self.counter.position()
    }

    fn object(&mut self, reference: &mut Option<ObjectId>) -> Result<(), StreamError> {
        self.counter.i32(&mut 0)?;
        let Some(id) = *reference else {
            return Ok(());
        };
        self.visit(id)?;

        let mut current = id;
        loop {
            self.counter.i32(&mut 0)?;
            match chain_owner(self.model, current)? {
                Some(owner) => {
                    self.visit(owner)?;
                    current = owner;
                }
                None => return Ok(()),
            }
        }
    }
}

/// Write-pass stream: emits references as table indices.
struct PayloadWriter<'a> {
    inner: WriteStream<&'a mut Vec<u8>>,
    model: &'a ObjectModel,
    table: &'a IndexTable,
}

impl PayloadWriter<'_> {
    fn write_index(&mut self, id: ObjectId) -> Result<(), StreamError> {
        let mut index = self
            .table
            .index_of(Some(id))
            .ok_or_else(|| unresolvable(self.model, id, "not seen by the dry run"))?;
        self.inner.i32(&mut index)
    }
}

impl Stream for PayloadWriter<'_> {
    fn direction(&self) -> Direction {
        Direction::Output
    }

    fn serialize(&mut self, data: &mut [u8]) -> Result<(), StreamError> {
        self.inner.serialize(data)
    }

    fn position(&self) -> u64 {
        self.inner.position()
    }

    fn object(&mut self, reference: &mut Option<ObjectId>) -> Result<(), StreamError> {
        let Some(id) = *reference else {
            return self.inner.i32(&mut 0);
        };
        self.write_index(id)?;

        let mut current = id;
        while let Some(owner) = chain_owner(self.model, current)? {
            self.write_index(owner)?;
            current = owner;
        }
        self.inner.i32(&mut 0)
    }
}

/// Build the complete image of `package`.
pub(super) fn encode_package(
    model: &mut ObjectModel,
    package: ObjectId,
    config: &Config,
    on_state: &mut dyn FnMut(PackageState),
) -> Result<(Vec<u8>, PackageSummary), PackageError> {
    let name = model.name(package)?.to_string();
    let stream_error = |e: StreamError| PackageError::from_save_stream(&name, e);

    on_state(PackageState::ScanningInternal);
    let internal: Vec<ObjectId> = model
        .iter()
        .filter(|&id| model.is_owned_by(id, package))
        .collect();
    check_parent_names(model, &name, &internal)?;
    let mut table = IndexTable::new();
    for &id in &internal {
        table.push_internal(id);
    }

    on_state(PackageState::DryRun);
    let mut found = Discovery::default();
    let mut measured = Vec::with_capacity(internal.len());
    for &id in &internal {
        let size = model
            .with_detached(id, |object, model| {
                let mut scan = ScanStream {
                    counter: CountingStream::new(),
                    model,
                    table: &table,
                    found: &mut found,
                };
                object.serialize(&mut scan).map(|()| scan.position())
            })?
            .map_err(stream_error)?;
        measured.push(size);
    }

    on_state(PackageState::ScanningExternal);
    let mut dependencies: Vec<String> = Vec::new();
    let mut external = Vec::with_capacity(found.order.len());
    for &id in &found.order {
        table.push_external(id);
        let owner = model
            .package_of(id)
            .ok_or_else(|| stream_error(unresolvable(model, id, "object belongs to no package")))?;
        let package_name = model.name(owner)?.to_string();
        if !dependencies.contains(&package_name) {
            dependencies.push(package_name.clone());
        }
        external.push(ExternalEntry {
            object_name: model.name(id)?.to_string(),
            package_name,
            object: Some(id),
        });
    }
    tracing::debug!(
        "package '{}': {} internal, {} external, {} dependencies",
        name,
        internal.len(),
        external.len(),
        dependencies.len()
    );

    on_state(PackageState::Writing);
    let mut payload = Vec::new();
    let mut entries = Vec::with_capacity(internal.len());
    for (&id, &dry_run) in internal.iter().zip(&measured) {
        let start = payload.len();
        model
            .with_detached(id, |object, model| {
                let mut writer = PayloadWriter {
                    inner: WriteStream::new(&mut payload),
                    model,
                    table: &table,
                };
                object.serialize(&mut writer)
            })?
            .map_err(stream_error)?;

        let written = (payload.len() - start) as u64;
        if config.verify_sizes && written != dry_run {
            return Err(PackageError::SizeMismatch {
                package: name.clone(),
                object: model.name(id)?.to_string(),
                measured: dry_run,
                written,
            });
        }

        let parent_name = match model.owner(id)? {
            Some(owner) => model.name(owner)?.to_string(),
            None => name.clone(),
        };
        entries.push(InternalEntry {
            object_name: model.name(id)?.to_string(),
            parent_name,
            class_name: model.class_name(id)?.to_string(),
            byte_size: u32::try_from(written)
                .map_err(|_| stream_error(StreamError::TooLong(written as usize)))?,
            object: Some(id),
        });
    }

    let mut summary = PackageSummary {
        header: PackageHeader {
            dependency_count: dependencies.len() as u32,
            internal_count: entries.len() as u32,
            external_count: external.len() as u32,
            ..PackageHeader::new(name.as_str())
        },
        dependencies,
        internal: entries,
        external,
        payload_offset: 0,
        payload_size: payload.len() as u64,
    };

    let mut bytes = Vec::new();
    summary
        .encode(&mut bytes)
        .map_err(|e| stream_error(StreamError::Io(e)))?;
    summary.payload_offset = bytes.len() as u64;
    bytes.extend_from_slice(&payload);

    Ok((bytes, summary))
}
