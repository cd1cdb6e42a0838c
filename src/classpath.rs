use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use tracing::debug;

use crate::attribute::nest_host_index;
use crate::constant::{ClassConstant, Constant, ConstantPool};
use crate::filter::ClassNameFilter;
use crate::ir::{Class, ClassBody, ClassId, Member, MemberId, PoolKind};

/// Name to class mapping for one pool.
#[derive(Clone, Debug, Default)]
pub struct ClassPool {
    classes: BTreeMap<String, ClassId>,
}

impl ClassPool {
    pub fn get(&self, name: &str) -> Option<ClassId> {
        self.classes.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Registers `id` under `name`, returning the class previously registered there.
    pub fn insert(&mut self, name: &str, id: ClassId) -> Option<ClassId> {
        self.classes.insert(name.to_string(), id)
    }

    pub fn remove(&mut self, name: &str) -> Option<ClassId> {
        self.classes.remove(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Class ids ordered by class name.
    pub fn ids(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.classes.values().copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.classes.keys().map(String::as_str)
    }

    /// Class ids whose names match `filter`, ordered by class name.
    pub fn matching<'a>(
        &'a self,
        filter: &'a ClassNameFilter,
    ) -> impl Iterator<Item = ClassId> + 'a {
        self.classes
            .iter()
            .filter(|(name, _)| filter.matches(name))
            .map(|(_, id)| *id)
    }
}

/// Which relatives a hierarchy walk visits.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HierarchyWalk {
    pub this: bool,
    pub super_classes: bool,
    pub interfaces: bool,
    pub subclasses: bool,
}

impl HierarchyWalk {
    /// The class, its superclass chain, then interfaces.
    pub const ANCESTORS: Self = Self {
        this: true,
        super_classes: true,
        interfaces: true,
        subclasses: false,
    };
    /// All transitive subclasses, excluding the class itself.
    pub const SUBCLASSES: Self = Self {
        this: false,
        super_classes: false,
        interfaces: false,
        subclasses: true,
    };
    pub const ALL: Self = Self {
        this: true,
        super_classes: true,
        interfaces: true,
        subclasses: true,
    };
}

/// Arena owning every class plus the program and library pools that name them.
///
/// Removing a class unregisters its name; its arena slot stays so that ids held elsewhere
/// never dangle.
#[derive(Clone, Debug, Default)]
pub struct Universe {
    classes: Vec<Class>,
    program: ClassPool,
    library: ClassPool,
}

impl Universe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a program class; a second program class with the same name is an error.
    pub fn add_program(&mut self, class: Class) -> Result<ClassId> {
        if !class.is_program() {
            anyhow::bail!("{} is not a program class", class.name);
        }
        if self.program.contains(&class.name) {
            anyhow::bail!("duplicate class found: {}", class.name);
        }
        Ok(self.push(PoolKind::Program, class))
    }

    /// Adds a library class; duplicates are skipped and the existing class is returned.
    pub fn add_library(&mut self, class: Class) -> ClassId {
        if let Some(existing) = self.library.get(&class.name) {
            debug!("skipping duplicate library class {}", class.name);
            return existing;
        }
        self.push(PoolKind::Library, class)
    }

    fn push(&mut self, kind: PoolKind, class: Class) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        self.pool_mut(kind).insert(&class.name, id);
        self.classes.push(class);
        id
    }

    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.index()]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut Class {
        &mut self.classes[id.index()]
    }

    pub(crate) fn replace_class(&mut self, id: ClassId, class: Class) {
        self.classes[id.index()] = class;
    }

    pub fn member(&self, id: MemberId) -> &Member {
        &self.class(id.class).members(id.kind)[id.index as usize]
    }

    pub fn pool(&self, kind: PoolKind) -> &ClassPool {
        match kind {
            PoolKind::Program => &self.program,
            PoolKind::Library => &self.library,
        }
    }

    fn pool_mut(&mut self, kind: PoolKind) -> &mut ClassPool {
        match kind {
            PoolKind::Program => &mut self.program,
            PoolKind::Library => &mut self.library,
        }
    }

    /// Looks a class up in the program pool, then in the library pool.
    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.program.get(name).or_else(|| self.library.get(name))
    }

    /// Pool currently registering `id`, if it has not been removed.
    pub fn pool_of(&self, id: ClassId) -> Option<PoolKind> {
        let name = &self.class(id).name;
        if self.program.get(name) == Some(id) {
            Some(PoolKind::Program)
        } else if self.library.get(name) == Some(id) {
            Some(PoolKind::Library)
        } else {
            None
        }
    }

    pub fn class_ids(&self, kind: PoolKind) -> Vec<ClassId> {
        self.pool(kind).ids().collect()
    }

    pub fn matching_class_ids(&self, kind: PoolKind, filter: &ClassNameFilter) -> Vec<ClassId> {
        self.pool(kind).matching(filter).collect()
    }

    pub fn remove(&mut self, kind: PoolKind, name: &str) -> Option<ClassId> {
        self.pool_mut(kind).remove(name)
    }

    /// Renames a class and rewrites the symbolic names that link to it.
    ///
    /// Superclass and interface names of linked classes and class constants resolved to the
    /// renamed class are updated, so that the hierarchy can be initialized again.
    pub fn rename_class(&mut self, id: ClassId, new_name: &str) -> Result<()> {
        let kind = self
            .pool_of(id)
            .with_context(|| format!("class {} is not registered", self.class(id).name))?;
        if self.pool(kind).contains(new_name) {
            anyhow::bail!("cannot rename {} to existing class {new_name}", self.class(id).name);
        }
        let old_name = std::mem::replace(&mut self.class_mut(id).name, new_name.to_string());
        let pool = self.pool_mut(kind);
        pool.remove(&old_name);
        pool.insert(new_name, id);
        debug!("renamed {old_name} to {new_name}");

        for class in &mut self.classes {
            if class.super_class == Some(id) {
                class.super_name = Some(new_name.to_string());
            }
            for index in 0..class.interface_classes.len() {
                if class.interface_classes[index] == Some(id) {
                    if let Some(name) = class.interface_names.get_mut(index) {
                        *name = new_name.to_string();
                    }
                }
            }
            if let ClassBody::Program(body) = &mut class.body {
                rename_class_constants(&mut body.constant_pool, id, new_name);
            }
        }
        Ok(())
    }

    /// First `Some` returned by `visit` over the classes reached by `walk` from `start`.
    ///
    /// With `ANCESTORS` the order is the class, its superclasses bottom-up, then the
    /// interfaces of the topmost superclass down to those of the class itself; subclasses
    /// come last. Each class is visited at most once and cycles are cut.
    pub fn find_in_hierarchy<T>(
        &self,
        start: ClassId,
        walk: HierarchyWalk,
        mut visit: impl FnMut(ClassId) -> Option<T>,
    ) -> Option<T> {
        let mut walker = Walker {
            universe: self,
            path: Vec::new(),
            visited: BTreeSet::new(),
            visit: &mut visit,
        };
        walker.walk(start, walk)
    }

    /// Whether `id` is `target` or inherits from it.
    pub fn extends_or_implements(&self, id: ClassId, target: ClassId) -> bool {
        self.find_in_hierarchy(id, HierarchyWalk::ANCESTORS, |candidate| {
            (candidate == target).then_some(())
        })
        .is_some()
    }

    /// Name of the nest host of a class; a class without a nest host attribute hosts itself.
    pub fn nest_host_name(&self, id: ClassId) -> &str {
        let class = self.class(id);
        if let ClassBody::Program(body) = &class.body {
            if let Some(index) = nest_host_index(&body.attributes) {
                if let Some(name) = body.constant_pool.class_name(index) {
                    return name;
                }
            }
        }
        &class.name
    }
}

struct Walker<'u, 'v, T> {
    universe: &'u Universe,
    path: Vec<ClassId>,
    visited: BTreeSet<ClassId>,
    visit: &'v mut dyn FnMut(ClassId) -> Option<T>,
}

impl<T> Walker<'_, '_, T> {
    fn walk(&mut self, id: ClassId, walk: HierarchyWalk) -> Option<T> {
        if self.path.contains(&id) {
            return None;
        }
        self.path.push(id);
        let found = self.walk_class(id, walk);
        self.path.pop();
        found
    }

    fn walk_class(&mut self, id: ClassId, walk: HierarchyWalk) -> Option<T> {
        let universe = self.universe;
        let class = universe.class(id);
        if walk.this && self.visited.insert(id) {
            if let Some(found) = (self.visit)(id) {
                return Some(found);
            }
        }
        if walk.super_classes {
            if let Some(super_class) = class.super_class {
                let next = HierarchyWalk {
                    this: true,
                    super_classes: true,
                    interfaces: walk.interfaces,
                    subclasses: false,
                };
                if let Some(found) = self.walk(super_class, next) {
                    return Some(found);
                }
            }
        }
        if walk.interfaces {
            if !walk.super_classes {
                if let Some(super_class) = class.super_class {
                    let next = HierarchyWalk {
                        this: false,
                        super_classes: false,
                        interfaces: true,
                        subclasses: false,
                    };
                    if let Some(found) = self.walk(super_class, next) {
                        return Some(found);
                    }
                }
            }
            for interface in class.interface_classes.iter().flatten() {
                let next = HierarchyWalk {
                    this: true,
                    super_classes: false,
                    interfaces: true,
                    subclasses: false,
                };
                if let Some(found) = self.walk(*interface, next) {
                    return Some(found);
                }
            }
        }
        if walk.subclasses {
            for subclass in &class.subclasses {
                let next = HierarchyWalk {
                    this: true,
                    super_classes: false,
                    interfaces: false,
                    subclasses: true,
                };
                if let Some(found) = self.walk(*subclass, next) {
                    return Some(found);
                }
            }
        }
        None
    }
}

fn rename_class_constants(pool: &mut ConstantPool, id: ClassId, new_name: &str) {
    let targets: Vec<(u16, String)> = pool
        .iter()
        .filter_map(|(index, constant)| match constant {
            Constant::Class(ClassConstant {
                name_index,
                referenced_class: Some(referenced),
                ..
            }) if *referenced == id => {
                let old = pool.utf8(*name_index)?;
                Some((index, renamed_class_reference(old, new_name)))
            }
            _ => None,
        })
        .collect();
    for (index, name) in targets {
        let name_index = pool.add_utf8(&name);
        if let Some(Constant::Class(class)) = pool.get_mut(index) {
            class.name_index = name_index;
        }
    }
}

/// Keeps the array dimensions of a class constant name while swapping its element class.
fn renamed_class_reference(old: &str, new_name: &str) -> String {
    let dimensions = old.len() - old.trim_start_matches('[').len();
    if dimensions == 0 {
        new_name.to_string()
    } else {
        format!("{}L{new_name};", "[".repeat(dimensions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{link_subclasses, link_supers};
    use crate::test_harness::{library_class, program_class};

    fn visit_order(universe: &Universe, start: ClassId, walk: HierarchyWalk) -> Vec<String> {
        let mut names = Vec::new();
        universe.find_in_hierarchy(start, walk, |id| {
            names.push(universe.class(id).name.clone());
            None::<()>
        });
        names
    }

    #[test]
    fn lookup_prefers_program_pool() {
        let mut universe = Universe::new();
        let library = universe.add_library(library_class("com/example/Foo", None, &[]));
        let program = universe
            .add_program(program_class("com/example/Foo", None, &[]))
            .expect("add program");

        assert_ne!(library, program);
        assert_eq!(universe.lookup("com/example/Foo"), Some(program));
        assert_eq!(universe.pool_of(library), Some(PoolKind::Library));
        assert_eq!(universe.lookup("com/example/Missing"), None);
    }

    #[test]
    fn add_program_rejects_duplicates() {
        let mut universe = Universe::new();
        universe
            .add_program(program_class("com/example/Foo", None, &[]))
            .expect("first add");

        let result = universe.add_program(program_class("com/example/Foo", None, &[]));

        let error = result.err().expect("duplicate class error");
        assert!(format!("{error:#}").contains("duplicate class"));
    }

    #[test]
    fn add_library_skips_duplicates() {
        let mut universe = Universe::new();
        let first = universe.add_library(library_class("java/lang/Object", None, &[]));
        let second = universe.add_library(library_class("java/lang/Object", None, &[]));

        assert_eq!(first, second);
        assert_eq!(universe.pool(PoolKind::Library).len(), 1);
    }

    #[test]
    fn remove_unregisters_name_but_keeps_slot() {
        let mut universe = Universe::new();
        let id = universe
            .add_program(program_class("com/example/Foo", None, &[]))
            .expect("add program");

        assert_eq!(universe.remove(PoolKind::Program, "com/example/Foo"), Some(id));
        assert_eq!(universe.lookup("com/example/Foo"), None);
        assert_eq!(universe.pool_of(id), None);
        assert_eq!(universe.class(id).name, "com/example/Foo");
    }

    #[test]
    fn matching_class_ids_apply_filter_in_name_order() {
        let mut universe = Universe::new();
        for name in ["com/example/b/B", "com/example/A", "org/other/C"] {
            universe
                .add_program(program_class(name, None, &[]))
                .expect("add program");
        }
        let filter = ClassNameFilter::parse("com/example/**");

        let names: Vec<&str> = universe
            .matching_class_ids(PoolKind::Program, &filter)
            .into_iter()
            .map(|id| universe.class(id).name.as_str())
            .collect();

        assert_eq!(names, vec!["com/example/A", "com/example/b/B"]);
    }

    #[test]
    fn ancestors_walk_visits_supers_before_interfaces() {
        let mut universe = Universe::new();
        universe.add_library(library_class("java/lang/Object", None, &[]));
        universe.add_library(library_class("com/example/I", Some("java/lang/Object"), &[]));
        universe.add_library(library_class("com/example/J", Some("java/lang/Object"), &[]));
        universe
            .add_program(program_class(
                "com/example/Base",
                Some("java/lang/Object"),
                &["com/example/I"],
            ))
            .expect("add base");
        let leaf = universe
            .add_program(program_class(
                "com/example/Leaf",
                Some("com/example/Base"),
                &["com/example/J"],
            ))
            .expect("add leaf");
        link_supers(&mut universe, PoolKind::Program, None);
        link_supers(&mut universe, PoolKind::Library, None);

        assert_eq!(
            visit_order(&universe, leaf, HierarchyWalk::ANCESTORS),
            vec![
                "com/example/Leaf",
                "com/example/Base",
                "java/lang/Object",
                "com/example/I",
                "com/example/J"
            ]
        );
    }

    #[test]
    fn subclass_walk_terminates_on_cycles() {
        let mut universe = Universe::new();
        let a = universe
            .add_program(program_class("com/example/A", Some("com/example/B"), &[]))
            .expect("add a");
        universe
            .add_program(program_class("com/example/B", Some("com/example/A"), &[]))
            .expect("add b");
        link_supers(&mut universe, PoolKind::Program, None);
        link_subclasses(&mut universe, &[PoolKind::Program]);

        assert_eq!(
            visit_order(&universe, a, HierarchyWalk::ALL),
            vec!["com/example/A", "com/example/B"]
        );
        assert!(universe.extends_or_implements(a, a));
    }

    #[test]
    fn rename_class_rewrites_linked_names() {
        let mut universe = Universe::new();
        let base = universe
            .add_program(program_class("com/example/Base", None, &[]))
            .expect("add base");
        let leaf = universe
            .add_program(program_class("com/example/Leaf", Some("com/example/Base"), &[]))
            .expect("add leaf");
        link_supers(&mut universe, PoolKind::Program, None);
        let array_index = {
            let pool = &mut universe.class_mut(leaf).program_body_mut().constant_pool;
            let index = pool.add_class("[[Lcom/example/Base;");
            if let Some(Constant::Class(class)) = pool.get_mut(index) {
                class.referenced_class = Some(base);
            }
            index
        };

        universe
            .rename_class(base, "com/example/Renamed")
            .expect("rename");

        assert_eq!(universe.lookup("com/example/Renamed"), Some(base));
        assert_eq!(universe.lookup("com/example/Base"), None);
        assert_eq!(
            universe.class(leaf).super_name.as_deref(),
            Some("com/example/Renamed")
        );
        assert_eq!(
            universe.class(leaf).constant_pool().class_name(array_index),
            Some("[[Lcom/example/Renamed;")
        );
        assert!(universe.rename_class(leaf, "com/example/Renamed").is_err());
    }
}
