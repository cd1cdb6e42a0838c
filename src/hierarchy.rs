//! Super- and subclass linking.
//!
//! Super-linking turns superclass and interface names into class ids. Sub-linking fills the
//! subclass back references: `add_subclass_links` appends for a single class, while
//! `link_subclasses` rebuilds whole pools and can run any number of times.

use std::collections::BTreeMap;

use tracing::debug;

use crate::classpath::Universe;
use crate::ir::{ClassId, PoolKind};
use crate::warning::{WarningKind, WarningSink, emit};

/// Resolves superclass and interface names for every class in `kind`.
pub fn link_supers(universe: &mut Universe, kind: PoolKind, sink: Option<&dyn WarningSink>) {
    for id in universe.class_ids(kind) {
        link_super(universe, id, sink);
    }
}

/// Resolves superclass and interface names of one class through the program pool, then the
/// library pool.
pub fn link_super(universe: &mut Universe, id: ClassId, sink: Option<&dyn WarningSink>) {
    let class = universe.class(id);
    let is_library = !class.is_program();
    let name = class.name.clone();
    let super_name = class.super_name.clone();
    let interface_names = class.interface_names.clone();

    let resolve = |target: &str, relation: &str| -> Option<ClassId> {
        let Some(found) = universe.lookup(target) else {
            emit(
                sink,
                WarningKind::MissingSuperclass,
                &name,
                Some(target),
                format!("can't find {relation} {target} of class {name}"),
            );
            return None;
        };
        if is_library && universe.class(found).is_program() {
            emit(
                sink,
                WarningKind::LibraryDependsOnProgram,
                &name,
                Some(target),
                format!("library class {name} extends or implements program class {target}"),
            );
        }
        Some(found)
    };

    let super_class = super_name
        .as_deref()
        .and_then(|target| resolve(target, "superclass"));
    let interface_classes: Vec<Option<ClassId>> = interface_names
        .iter()
        .map(|target| resolve(target, "interface"))
        .collect();

    let class = universe.class_mut(id);
    class.super_class = super_class;
    class.interface_classes = interface_classes;
}

/// Appends `id` to the subclass lists of its direct supertypes.
///
/// Running it twice for the same class records the class twice; use `link_subclasses` to
/// rebuild links from scratch.
pub fn add_subclass_links(universe: &mut Universe, id: ClassId) {
    for target in direct_supertypes(universe, id) {
        universe.class_mut(target).subclasses.push(id);
    }
}

/// Rebuilds the subclass lists of every class in `pools`.
///
/// Edges are collected first and assigned afterwards: classes in the listed pools get exactly
/// their collected subclasses (or none), supertypes outside them get the new edges appended
/// once. List the pool holding subclasses first, usually program before library.
pub fn link_subclasses(universe: &mut Universe, pools: &[PoolKind]) {
    let mut collected: BTreeMap<ClassId, Vec<ClassId>> = BTreeMap::new();
    let mut members = Vec::new();
    for kind in pools {
        for id in universe.class_ids(*kind) {
            members.push(id);
            for target in direct_supertypes(universe, id) {
                let subclasses = collected.entry(target).or_default();
                if !subclasses.contains(&id) {
                    subclasses.push(id);
                }
            }
        }
    }

    for id in &members {
        universe.class_mut(*id).subclasses = collected.remove(id).unwrap_or_default();
    }
    for (target, subclasses) in collected {
        let existing = &mut universe.class_mut(target).subclasses;
        for subclass in subclasses {
            if !existing.contains(&subclass) {
                existing.push(subclass);
            }
        }
    }
    debug!("linked subclasses for {} classes", members.len());
}

fn direct_supertypes(universe: &Universe, id: ClassId) -> Vec<ClassId> {
    let class = universe.class(id);
    class
        .super_class
        .into_iter()
        .chain(class.interface_classes.iter().flatten().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_harness::{library_class, program_class};
    use crate::warning::WarningCollector;

    fn sample_universe() -> (Universe, ClassId, ClassId, ClassId) {
        let mut universe = Universe::new();
        let object = universe.add_library(library_class("java/lang/Object", None, &[]));
        let runnable = universe.add_library(library_class(
            "java/lang/Runnable",
            Some("java/lang/Object"),
            &[],
        ));
        let task = universe
            .add_program(program_class(
                "com/example/Task",
                Some("java/lang/Object"),
                &["java/lang/Runnable"],
            ))
            .expect("add task");
        (universe, object, runnable, task)
    }

    #[test]
    fn link_supers_resolves_names() {
        let (mut universe, object, runnable, task) = sample_universe();
        link_supers(&mut universe, PoolKind::Program, None);

        let class = universe.class(task);
        assert_eq!(class.super_class, Some(object));
        assert_eq!(class.interface_classes, vec![Some(runnable)]);
    }

    #[test]
    fn link_supers_reports_missing_and_reverse_dependencies() {
        let mut universe = Universe::new();
        universe
            .add_program(program_class("com/example/Base", Some("com/example/Gone"), &[]))
            .expect("add base");
        universe.add_library(library_class(
            "org/lib/Child",
            Some("com/example/Base"),
            &[],
        ));
        let collector = WarningCollector::new();

        link_supers(&mut universe, PoolKind::Program, Some(&collector));
        link_supers(&mut universe, PoolKind::Library, Some(&collector));

        assert_eq!(collector.count(WarningKind::MissingSuperclass), 1);
        assert_eq!(collector.count(WarningKind::LibraryDependsOnProgram), 1);
    }

    #[test]
    fn link_subclasses_is_idempotent() {
        let (mut universe, object, runnable, task) = sample_universe();
        link_supers(&mut universe, PoolKind::Program, None);
        link_supers(&mut universe, PoolKind::Library, None);

        link_subclasses(&mut universe, &[PoolKind::Program, PoolKind::Library]);
        let first: Vec<Vec<ClassId>> = [object, runnable, task]
            .iter()
            .map(|id| universe.class(*id).subclasses.clone())
            .collect();
        link_subclasses(&mut universe, &[PoolKind::Program, PoolKind::Library]);
        let second: Vec<Vec<ClassId>> = [object, runnable, task]
            .iter()
            .map(|id| universe.class(*id).subclasses.clone())
            .collect();

        assert_eq!(first, second);
        assert_eq!(universe.class(object).subclasses, vec![task, runnable]);
        assert_eq!(universe.class(runnable).subclasses, vec![task]);
        assert!(universe.class(task).subclasses.is_empty());
    }

    #[test]
    fn link_subclasses_extends_targets_outside_listed_pools() {
        let (mut universe, object, _, task) = sample_universe();
        link_supers(&mut universe, PoolKind::Program, None);

        link_subclasses(&mut universe, &[PoolKind::Program]);
        link_subclasses(&mut universe, &[PoolKind::Program]);

        assert_eq!(universe.class(object).subclasses, vec![task]);
    }

    #[test]
    fn add_subclass_links_appends_each_time() {
        let (mut universe, object, _, task) = sample_universe();
        link_supers(&mut universe, PoolKind::Program, None);

        add_subclass_links(&mut universe, task);
        add_subclass_links(&mut universe, task);

        assert_eq!(universe.class(object).subclasses, vec![task, task]);
    }
}
