// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use crate::class::{default_factory, ClassRegistry, Factory};
use crate::object::ObjectError;
use crate::stream::{Stream, StreamError};
use crate::testing::{registry, Actor, Entity};

/// P1 holds X (owning Y); X targets Z, which lives in P2.
struct World {
    model: ObjectModel,
    packages: PackageManager<MemoryStore>,
    p1: ObjectId,
    p2: ObjectId,
    x: ObjectId,
    z: ObjectId,
}

fn entity(health: i32) -> Entity {
    Entity {
        health,
        target: None,
    }
}

fn world() -> World {
    let mut model = ObjectModel::new(registry());
    let mut packages = PackageManager::new(Config::default(), MemoryStore::new());

    let p1 = packages.create_package(&mut model, "P1").unwrap();
    let p2 = packages.create_package(&mut model, "P2").unwrap();
    let x = model.insert(entity(7), Some("X")).unwrap();
    let y = model.insert(entity(8), Some("Y")).unwrap();
    let z = model.insert(entity(9), Some("Z")).unwrap();
    model.set_owner(x, Some(p1)).unwrap();
    model.set_owner(y, Some(x)).unwrap();
    model.set_owner(z, Some(p2)).unwrap();
    model.get_mut::<Entity>(x).unwrap().target = Some(z);

    World {
        model,
        packages,
        p1,
        p2,
        x,
        z,
    }
}

fn saved_world() -> World {
    let mut w = world();
    w.packages.save(&mut w.model, w.p2).unwrap();
    w.packages.save(&mut w.model, w.p1).unwrap();
    w
}

fn fresh(store: MemoryStore) -> (ObjectModel, PackageManager<MemoryStore>) {
    (
        ObjectModel::new(registry()),
        PackageManager::new(Config::default(), store),
    )
}

fn slice_i32s(slice: &[u8]) -> Vec<i32> {
    slice
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[test]
fn test_save_report() {
    let mut w = world();
    let report = w.packages.save(&mut w.model, w.p1).unwrap();

    assert_eq!(report.package, "P1");
    assert_eq!(report.internal_count, 2);
    assert_eq!(report.external_count, 1);
    assert_eq!(report.dependencies, vec!["P2"]);
    assert_eq!(report.bytes, w.packages.store().read("P1").unwrap().len());
    assert_eq!(w.packages.state("P1"), PackageState::Saved);
}

#[test]
fn test_saved_tables_and_payload() {
    let w = saved_world();
    let bytes = w.packages.store().read("P1").unwrap();
    let summary = inspect(&bytes).unwrap();

    assert_eq!(summary.header.name, "P1");
    let rows: Vec<(&str, &str, &str)> = summary
        .internal
        .iter()
        .map(|e| (e.object_name.as_str(), e.parent_name.as_str(), e.class_name.as_str()))
        .collect();
    assert_eq!(rows, vec![("X", "P1", "Entity"), ("Y", "X", "Entity")]);
    assert_eq!(summary.external[0].object_name, "Z");
    assert_eq!(summary.external[0].package_name, "P2");

    let slices: Vec<&[u8]> = summary.payload_slices(&bytes).collect();
    assert_eq!(slice_i32s(slices[0]), vec![7, -1, 0]);
    assert_eq!(slice_i32s(slices[1]), vec![8, 0]);
}

#[test]
fn test_round_trip_into_fresh_model() {
    let w = saved_world();
    let (mut model, mut packages) = fresh(w.packages.store().clone());

    let report = packages.load(&mut model, "P1").unwrap();
    assert_eq!(report.loaded, vec!["P2", "P1"]);
    assert_eq!(report.name, "P1");
    assert_eq!(report.created, 3);
    assert_eq!(report.bound, 0);
    assert_eq!(model.len(), 5);

    let p1 = packages.package(&model, "P1").unwrap();
    assert_eq!(report.package, p1);
    let x = model.find_by_name_and_owner_name("X", "P1").unwrap();
    let y = model.find_by_name_and_owner_name("Y", "X").unwrap();
    let z = model.find_by_name_and_owner_name("Z", "P2").unwrap();

    assert_eq!(model.owner(x).unwrap(), Some(p1));
    assert_eq!(model.owner(y).unwrap(), Some(x));
    assert_eq!(model.get::<Entity>(x).unwrap(), &Entity { health: 7, target: Some(z) });
    assert_eq!(model.get::<Entity>(y).unwrap().health, 8);
    assert_eq!(model.get::<Entity>(z).unwrap().health, 9);
    assert_eq!(packages.state("P1"), PackageState::Loaded);
    assert_eq!(packages.state("P2"), PackageState::Loaded);
}

/// Package "Tree" holding A and B, each owning an object named C.
fn same_named_children() -> (ObjectModel, PackageManager<MemoryStore>, ObjectId) {
    let mut model = ObjectModel::new(registry());
    let mut packages = PackageManager::new(Config::default(), MemoryStore::new());
    let tree = packages.create_package(&mut model, "Tree").unwrap();
    for (parent, health) in [("A", 1), ("B", 2)] {
        let parent_id = model.insert(entity(health), Some(parent)).unwrap();
        let child = model.insert(entity(health * 10), Some("C")).unwrap();
        model.set_owner(parent_id, Some(tree)).unwrap();
        model.set_owner(child, Some(parent_id)).unwrap();
    }
    (model, packages, tree)
}

#[test]
fn test_same_named_parents_fail_save() {
    let (mut model, mut packages, tree) = same_named_children();
    for owner in ["A", "B"] {
        let c = model.find_by_name_and_owner_name("C", owner).unwrap();
        let d = model.insert(entity(0), Some("D")).unwrap();
        model.set_owner(d, Some(c)).unwrap();
    }

    match packages.save(&mut model, tree) {
        Err(PackageError::AmbiguousParent { package, parent }) => {
            assert_eq!(package, "Tree");
            assert_eq!(parent, "C");
        }
        other => panic!("unexpected result: {:?}", other.map(|r| r.package)),
    }
    assert!(packages.store().is_empty());
    assert_eq!(packages.state("Tree"), PackageState::Unloaded);
}

#[test]
fn test_same_named_leaves_round_trip() {
    let (mut model, mut packages, tree) = same_named_children();
    packages.save(&mut model, tree).unwrap();

    let (mut model, mut packages) = fresh(packages.store().clone());
    let report = packages.load(&mut model, "Tree").unwrap();
    assert_eq!(report.created, 4);

    let a = model.find_by_name_and_owner_name("A", "Tree").unwrap();
    let b = model.find_by_name_and_owner_name("B", "Tree").unwrap();
    let under_a = model.find_by_name_and_owner_name("C", "A").unwrap();
    let under_b = model.find_by_name_and_owner_name("C", "B").unwrap();
    assert_ne!(under_a, under_b);
    assert_eq!(model.owner(under_a).unwrap(), Some(a));
    assert_eq!(model.owner(under_b).unwrap(), Some(b));
    assert_eq!(model.get::<Entity>(under_a).unwrap().health, 10);
    assert_eq!(model.get::<Entity>(under_b).unwrap().health, 20);
}

#[test]
fn test_resident_reload_binds_same_named_leaves_by_owner() {
    let (mut model, mut packages, tree) = same_named_children();
    packages.save(&mut model, tree).unwrap();
    let under_a = model.find_by_name_and_owner_name("C", "A").unwrap();
    let under_b = model.find_by_name_and_owner_name("C", "B").unwrap();
    model.get_mut::<Entity>(under_a).unwrap().health = -1;
    model.get_mut::<Entity>(under_b).unwrap().health = -2;

    let report = packages.load(&mut model, "Tree").unwrap();
    assert_eq!(report.created, 0);
    assert_eq!(report.bound, 4);
    assert_eq!(model.get::<Entity>(under_a).unwrap().health, 10);
    assert_eq!(model.get::<Entity>(under_b).unwrap().health, 20);
}

/// Image of package "Crafted" with empty payloads and the given
/// `(object, parent)` rows.
fn crafted(rows: &[(&str, &str)]) -> MemoryStore {
    let internal = rows
        .iter()
        .map(|(object, parent)| InternalEntry {
            object_name: object.to_string(),
            parent_name: parent.to_string(),
            class_name: "Entity".to_string(),
            byte_size: 0,
            object: None,
        })
        .collect();
    let summary = PackageSummary {
        header: PackageHeader::new("Crafted"),
        dependencies: Vec::new(),
        internal,
        external: Vec::new(),
        payload_offset: 0,
        payload_size: 0,
    };
    let mut bytes = Vec::new();
    summary.encode(&mut bytes).unwrap();
    let mut store = MemoryStore::new();
    store.write("Crafted", &bytes).unwrap();
    store
}

#[test]
fn test_unresolvable_parent_rows_are_malformed() {
    let ambiguous = crafted(&[
        ("A", "Crafted"),
        ("B", "Crafted"),
        ("C", "A"),
        ("C", "B"),
        ("D", "C"),
    ]);
    let cyclic = crafted(&[("A", "B"), ("B", "A")]);
    let unknown = crafted(&[("A", "Nowhere")]);

    for (store, reason) in [
        (ambiguous, "ambiguous parent"),
        (cyclic, "cyclic parent chain"),
        (unknown, "unknown parent"),
    ] {
        let (mut model, mut packages) = fresh(store);
        let err = packages.load(&mut model, "Crafted").unwrap_err();
        assert!(
            matches!(err, PackageError::MalformedPackage { ref package, .. } if package == "Crafted"),
            "unexpected error: {}",
            err
        );
        assert!(err.to_string().contains(reason), "error: {}", err);
        assert!(model.is_empty());
    }
}

#[test]
fn test_resave_is_byte_identical() {
    let w = saved_world();
    let original = w.packages.store().read("P1").unwrap();
    let (mut model, mut packages) = fresh(w.packages.store().clone());

    packages.load(&mut model, "P1").unwrap();
    packages.save_by_name(&mut model, "P1").unwrap();
    assert_eq!(packages.store().read("P1").unwrap(), original);
}

#[test]
fn test_subclass_round_trip() {
    let mut model = ObjectModel::new(registry());
    let mut packages = PackageManager::new(Config::default(), MemoryStore::new());
    let level = packages.create_package(&mut model, "Level").unwrap();
    let hero = model.insert(Actor::sample(), Some("Hero")).unwrap();
    let rock = model.insert(entity(50), Some("Rock")).unwrap();
    model.set_owner(hero, Some(level)).unwrap();
    model.set_owner(rock, Some(level)).unwrap();
    model.get_mut::<Actor>(hero).unwrap().base.target = Some(rock);
    packages.save(&mut model, level).unwrap();

    let (mut model, mut packages) = fresh(packages.store().clone());
    packages.load(&mut model, "Level").unwrap();

    let hero = model.find_by_name_and_owner_name("Hero", "Level").unwrap();
    let rock = model.find_by_name_and_owner_name("Rock", "Level").unwrap();
    let actor = model.get::<Actor>(hero).unwrap();
    assert_eq!(actor.label, "hero");
    assert_eq!(actor.speed, 1.5);
    assert_eq!(actor.base.target, Some(rock));
    assert_eq!(model.class_name(hero).unwrap(), "Actor");
}

#[test]
fn test_missing_dependency_file() {
    let w = saved_world();
    let mut store = w.packages.store().clone();
    store.remove("P2").unwrap();
    let (mut model, mut packages) = fresh(store);

    match packages.load(&mut model, "P1") {
        Err(PackageError::FileNotFound { package, location }) => {
            assert_eq!(package, "P2");
            assert_eq!(location, "memory:P2");
        }
        other => panic!("unexpected result: {:?}", other.map(|r| r.name)),
    }
    assert!(model.is_empty());
}

#[test]
fn test_cyclic_dependency() {
    let mut w = world();
    w.model.get_mut::<Entity>(w.z).unwrap().target = Some(w.x);
    w.packages.save(&mut w.model, w.p1).unwrap();
    w.packages.save(&mut w.model, w.p2).unwrap();

    let (mut model, mut packages) = fresh(w.packages.store().clone());
    match packages.load(&mut model, "P1") {
        Err(PackageError::CyclicDependency { chain }) => {
            assert_eq!(chain, vec!["P1", "P2", "P1"]);
        }
        other => panic!("unexpected result: {:?}", other.map(|r| r.name)),
    }
    assert!(model.is_empty());
}

#[test]
fn test_truncated_file_is_malformed() {
    let w = saved_world();
    let mut store = w.packages.store().clone();
    let bytes = store.get_mut("P1").unwrap();
    bytes.truncate(bytes.len() - 2);
    let (mut model, mut packages) = fresh(store);

    let err = packages.load(&mut model, "P1").unwrap_err();
    assert!(matches!(
        err,
        PackageError::MalformedPackage { ref package, .. } if package == "P1"
    ));
    assert!(model.is_empty());
    assert_eq!(packages.state("P1"), PackageState::Unloaded);
}

#[test]
fn test_unknown_class_rolls_back() {
    let mut model = ObjectModel::new(registry());
    let mut packages = PackageManager::new(Config::default(), MemoryStore::new());
    let level = packages.create_package(&mut model, "Level").unwrap();
    let rock = model.insert(entity(1), Some("Rock")).unwrap();
    let hero = model.insert(Actor::sample(), Some("Hero")).unwrap();
    model.set_owner(rock, Some(level)).unwrap();
    model.set_owner(hero, Some(level)).unwrap();
    packages.save(&mut model, level).unwrap();

    let mut registry = ClassRegistry::new();
    registry.register_type::<Entity>().unwrap();
    let mut model = ObjectModel::new(registry);
    let mut packages = PackageManager::new(Config::default(), packages.store().clone());

    match packages.load(&mut model, "Level") {
        Err(PackageError::ClassNotFound { package, class }) => {
            assert_eq!(package, "Level");
            assert_eq!(class, "Actor");
        }
        other => panic!("unexpected result: {:?}", other.map(|r| r.name)),
    }
    assert!(model.is_empty());
    assert!(packages.package(&model, "Level").is_none());
    assert_eq!(packages.packages().count(), 0);
}

#[test]
fn test_class_mismatch_with_resident_object() {
    let mut w = saved_world();
    w.model.destroy(w.x).unwrap();
    let impostor = w.model.insert(Actor::default(), Some("X")).unwrap();
    w.model.set_owner(impostor, Some(w.p1)).unwrap();
    let live = w.model.len();

    match w.packages.load(&mut w.model, "P1") {
        Err(PackageError::ClassMismatch {
            object,
            expected,
            found,
            ..
        }) => {
            assert_eq!(object, "X");
            assert_eq!(expected, "Entity");
            assert_eq!(found, "Actor");
        }
        other => panic!("unexpected result: {:?}", other.map(|r| r.name)),
    }
    assert_eq!(w.model.len(), live);
    assert_eq!(w.packages.state("P1"), PackageState::Saved);
}

#[test]
fn test_reference_to_orphan_is_unresolvable() {
    let mut w = world();
    let orphan = w.model.insert(entity(0), Some("Orphan")).unwrap();
    w.model.get_mut::<Entity>(w.x).unwrap().target = Some(orphan);

    let err = w.packages.save(&mut w.model, w.p1).unwrap_err();
    assert!(matches!(
        err,
        PackageError::UnresolvableReference {
            source: StreamError::UnresolvableReference { ref object, .. },
            ..
        } if object == "Orphan"
    ));
    assert!(!w.packages.store().exists("P1"));
    assert_eq!(w.packages.state("P1"), PackageState::Unloaded);
}

#[test]
fn test_reference_to_package_is_unresolvable() {
    let mut w = world();
    w.model.get_mut::<Entity>(w.x).unwrap().target = Some(w.p2);

    let err = w.packages.save(&mut w.model, w.p1).unwrap_err();
    assert!(matches!(err, PackageError::UnresolvableReference { .. }));
}

#[test]
fn test_stale_reference_fails_save() {
    let mut w = world();
    let doomed = w.model.insert(entity(0), Some("Doomed")).unwrap();
    w.model.set_owner(doomed, Some(w.p2)).unwrap();
    w.model.get_mut::<Entity>(w.x).unwrap().target = Some(doomed);
    w.model.destroy(doomed).unwrap();

    let err = w.packages.save(&mut w.model, w.p1).unwrap_err();
    assert!(matches!(
        err,
        PackageError::Object(ObjectError::StaleObject(id)) if id == doomed
    ));
}

#[test]
fn test_save_rejects_non_package() {
    let mut w = world();
    let err = w.packages.save(&mut w.model, w.x).unwrap_err();
    assert!(matches!(err, PackageError::NotAPackage(ref name) if name == "X"));
}

/// Writes one more byte on every pass.
#[derive(Debug, Default)]
struct Flaky {
    passes: u8,
}

impl Object for Flaky {
    fn serialize(&mut self, stream: &mut dyn Stream) -> Result<(), StreamError> {
        self.passes += 1;
        for _ in 0..self.passes {
            stream.u8(&mut 0)?;
        }
        Ok(())
    }
}

impl Class for Flaky {
    const NAME: &'static str = "Flaky";

    fn factory() -> Option<Factory> {
        Some(default_factory::<Self>)
    }
}

fn flaky_world(config: Config) -> (ObjectModel, PackageManager<MemoryStore>, ObjectId) {
    let mut registry = registry();
    registry.register_type::<Flaky>().unwrap();
    let mut model = ObjectModel::new(registry);
    let mut packages = PackageManager::new(config, MemoryStore::new());
    let package = packages.create_package(&mut model, "Flaky").unwrap();
    let flaky = model.insert(Flaky::default(), Some("F")).unwrap();
    model.set_owner(flaky, Some(package)).unwrap();
    (model, packages, package)
}

#[test]
fn test_size_mismatch_detected() {
    let (mut model, mut packages, package) = flaky_world(Config::default());

    match packages.save(&mut model, package) {
        Err(PackageError::SizeMismatch {
            object,
            measured,
            written,
            ..
        }) => {
            assert_eq!(object, "F");
            assert_eq!(measured, 1);
            assert_eq!(written, 2);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(packages.store().is_empty());
}

#[test]
fn test_size_check_can_be_disabled() {
    let config = Config::builder().verify_sizes(false).build();
    let (mut model, mut packages, package) = flaky_world(config);

    packages.save(&mut model, package).unwrap();
    let summary = packages.inspect("Flaky").unwrap();
    assert_eq!(summary.internal[0].byte_size, 2);
    assert_eq!(summary.payload_size, 2);
}

#[test]
fn test_resident_dependency_is_reused() {
    let mut w = saved_world();
    let report = w.packages.load(&mut w.model, "P1").unwrap();

    assert_eq!(report.loaded, vec!["P1"]);
    assert_eq!(report.created, 0);
    assert_eq!(report.bound, 2);
    assert_eq!(report.package, w.p1);
    assert_eq!(w.model.get::<Entity>(w.x).unwrap().target, Some(w.z));
    assert_eq!(w.model.len(), 5);
}

#[test]
fn test_resident_dependency_reloaded_on_request() {
    let w = saved_world();
    let config = Config::builder().reload_resident_dependencies(true).build();
    let mut model = w.model;
    let mut packages = PackageManager::new(config, w.packages.store().clone());
    packages.load(&mut model, "P1").unwrap();

    let report = packages.load(&mut model, "P1").unwrap();
    assert_eq!(report.loaded, vec!["P2", "P1"]);
    assert_eq!(report.created, 0);
    assert_eq!(report.bound, 3);
    assert_eq!(packages.package(&model, "P2"), Some(w.p2));
}

#[test]
fn test_bound_objects_take_stored_values() {
    let mut w = saved_world();
    w.model.get_mut::<Entity>(w.x).unwrap().health = 99;
    w.model.get_mut::<Entity>(w.x).unwrap().target = None;

    w.packages.load(&mut w.model, "P1").unwrap();
    assert_eq!(
        w.model.get::<Entity>(w.x).unwrap(),
        &Entity { health: 7, target: Some(w.z) }
    );
}

#[test]
fn test_load_renames_to_declared_name() {
    let w = saved_world();
    let bytes = w.packages.store().read("P2").unwrap();
    let mut store = MemoryStore::new();
    store.write("Alias", &bytes).unwrap();
    let (mut model, mut packages) = fresh(store);

    let report = packages.load(&mut model, "Alias").unwrap();
    assert_eq!(report.name, "P2");
    assert_eq!(model.name(report.package).unwrap(), "P2");
    assert_eq!(packages.package(&model, "P2"), Some(report.package));
    assert!(packages.package(&model, "Alias").is_none());
    assert_eq!(packages.packages().map(|(name, _)| name).collect::<Vec<_>>(), vec!["P2"]);
    assert_eq!(packages.state("P2"), PackageState::Loaded);
    assert_eq!(packages.state("Alias"), PackageState::Unloaded);
}

#[test]
fn test_external_found_below_direct_children() {
    let mut w = world();
    let holder = w.model.insert(entity(1), Some("W")).unwrap();
    w.model.set_owner(holder, Some(w.p2)).unwrap();
    w.model.set_owner(w.z, Some(holder)).unwrap();

    w.packages.save(&mut w.model, w.p2).unwrap();
    let report = w.packages.save(&mut w.model, w.p1).unwrap();
    assert_eq!(report.external_count, 2);

    let summary = w.packages.inspect("P1").unwrap();
    let bytes = w.packages.store().read("P1").unwrap();
    let first = summary.payload_slices(&bytes).next().unwrap();
    assert_eq!(slice_i32s(first), vec![7, -1, -2, 0]);

    let (mut model, mut packages) = fresh(w.packages.store().clone());
    packages.load(&mut model, "P1").unwrap();
    let x = model.find_by_name_and_owner_name("X", "P1").unwrap();
    let z = model.find_by_name_and_owner_name("Z", "W").unwrap();
    assert_eq!(model.get::<Entity>(x).unwrap().target, Some(z));
}

#[test]
fn test_missing_external_object() {
    let mut w = saved_world();
    // P2 on disk no longer holds Z.
    w.model.destroy(w.z).unwrap();
    w.model.get_mut::<Entity>(w.x).unwrap().target = None;
    w.packages.save(&mut w.model, w.p2).unwrap();

    let (mut model, mut packages) = fresh(w.packages.store().clone());
    match packages.load(&mut model, "P1") {
        Err(PackageError::MissingExternalObject { object, owner, .. }) => {
            assert_eq!(object, "Z");
            assert_eq!(owner, "P2");
        }
        other => panic!("unexpected result: {:?}", other.map(|r| r.name)),
    }
    assert!(model.is_empty());
}

#[test]
fn test_state_transitions() {
    let mut w = world();
    assert_eq!(w.packages.state("P1"), PackageState::Unloaded);

    w.packages.save_all(&mut w.model).unwrap();
    assert_eq!(w.packages.state("P1"), PackageState::Saved);
    assert_eq!(w.packages.state("P2"), PackageState::Saved);
    assert!(PackageState::Saved.is_resident());

    let destroyed = w.packages.unload(&mut w.model, "P1").unwrap();
    assert_eq!(destroyed, 3);
    assert_eq!(w.packages.state("P1"), PackageState::Unloaded);
    assert!(!w.model.contains(w.x));
    assert!(matches!(
        w.packages.unload(&mut w.model, "P1"),
        Err(PackageError::PackageNotFound(_))
    ));
}

#[test]
fn test_save_all_in_name_order() {
    let mut w = world();
    let reports = w.packages.save_all(&mut w.model).unwrap();
    let names: Vec<&str> = reports.iter().map(|r| r.package.as_str()).collect();
    assert_eq!(names, vec!["P1", "P2"]);
    assert_eq!(w.packages.store().names().collect::<Vec<_>>(), vec!["P1", "P2"]);
}

#[test]
fn test_inspect_and_unknown_package() {
    let w = saved_world();
    let summary = w.packages.inspect("P2").unwrap();
    assert_eq!(summary.header.tag, PACKAGE_TAG);
    assert_eq!(summary.header.version, FORMAT_VERSION);
    assert_eq!(summary.internal.len(), 1);
    assert!(summary.dependencies.is_empty());

    assert!(matches!(
        w.packages.inspect("Nope"),
        Err(PackageError::FileNotFound { .. })
    ));
}

#[test]
fn test_create_package_is_idempotent() {
    let mut w = world();
    assert_eq!(w.packages.create_package(&mut w.model, "P1").unwrap(), w.p1);
    assert!(w.model.is_package(w.p1));
    assert!(!w.model.is_package(w.x));
}
