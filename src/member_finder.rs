use crate::access::AccessLevel;
use crate::classpath::{HierarchyWalk, Universe};
use crate::descriptor::package_name;
use crate::filter::{has_wildcards, matches_member_pattern};
use crate::ir::{ClassId, MemberId, MemberKind};

/// Looks up fields and methods by name and descriptor.
///
/// Names and descriptors may contain `*` and `?` wildcards. A referencing class that is
/// present and not synthetic restricts candidates to members it can access.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MemberFinder {
    search_hierarchy: bool,
    search_subclasses: bool,
}

impl Default for MemberFinder {
    fn default() -> Self {
        Self::new(true)
    }
}

impl MemberFinder {
    pub fn new(search_hierarchy: bool) -> Self {
        Self {
            search_hierarchy,
            search_subclasses: false,
        }
    }

    /// Also searches subclasses after the ancestors.
    pub fn with_subclasses(mut self) -> Self {
        self.search_subclasses = true;
        self
    }

    pub fn find_field(
        &self,
        universe: &Universe,
        referencing: Option<ClassId>,
        class: ClassId,
        name: &str,
        descriptor: &str,
    ) -> Option<MemberId> {
        self.find_member(universe, MemberKind::Field, referencing, class, name, descriptor)
    }

    pub fn find_method(
        &self,
        universe: &Universe,
        referencing: Option<ClassId>,
        class: ClassId,
        name: &str,
        descriptor: &str,
    ) -> Option<MemberId> {
        self.find_member(universe, MemberKind::Method, referencing, class, name, descriptor)
    }

    /// First accessible match of the walk: the class, its ancestors if enabled, then its
    /// subclasses if enabled. `MemberId::class` is the class that declares the match.
    pub fn find_member(
        &self,
        universe: &Universe,
        kind: MemberKind,
        referencing: Option<ClassId>,
        class: ClassId,
        name: &str,
        descriptor: &str,
    ) -> Option<MemberId> {
        let referencing =
            referencing.filter(|id| !universe.class(*id).access.is_synthetic());
        let walk = HierarchyWalk {
            this: true,
            super_classes: self.search_hierarchy,
            interfaces: self.search_hierarchy,
            subclasses: self.search_subclasses,
        };
        universe.find_in_hierarchy(class, walk, |owner| {
            find_declared(universe, kind, owner, name, descriptor)
                .into_iter()
                .find(|member| {
                    referencing
                        .map(|referencing| is_accessible(universe, referencing, *member))
                        .unwrap_or(true)
                })
        })
    }

    /// Whether a subclass of `class` declares a non-private method overriding `method`.
    pub fn is_overridden(&self, universe: &Universe, class: ClassId, method: MemberId) -> bool {
        self.is_redeclared(universe, class, method)
    }

    /// Whether a subclass of `class` declares a non-private field shadowing `field`.
    pub fn is_shadowed(&self, universe: &Universe, class: ClassId, field: MemberId) -> bool {
        self.is_redeclared(universe, class, field)
    }

    fn is_redeclared(&self, universe: &Universe, class: ClassId, member: MemberId) -> bool {
        let target = universe.member(member);
        universe
            .find_in_hierarchy(class, HierarchyWalk::SUBCLASSES, |subclass| {
                universe
                    .class(subclass)
                    .members(member.kind)
                    .iter()
                    .find(|candidate| {
                        !candidate.access.is_private()
                            && candidate.name == target.name
                            && candidate.descriptor == target.descriptor
                    })
                    .map(|_| ())
            })
            .is_some()
    }
}

/// Members declared directly by `owner` that match, in declaration order.
fn find_declared(
    universe: &Universe,
    kind: MemberKind,
    owner: ClassId,
    name: &str,
    descriptor: &str,
) -> Vec<MemberId> {
    let exact = !has_wildcards(name) && !has_wildcards(descriptor);
    universe
        .class(owner)
        .members(kind)
        .iter()
        .enumerate()
        .filter(|(_, member)| {
            if exact {
                member.name == name && member.descriptor == descriptor
            } else {
                matches_member_pattern(name, &member.name)
                    && matches_member_pattern(descriptor, &member.descriptor)
            }
        })
        .map(|(index, _)| MemberId {
            class: owner,
            kind,
            index: index as u32,
        })
        .collect()
}

fn is_accessible(universe: &Universe, referencing: ClassId, member: MemberId) -> bool {
    let owner = member.class;
    match universe.member(member).access.level() {
        AccessLevel::Public => true,
        AccessLevel::Private => {
            referencing == owner
                || universe.nest_host_name(referencing) == universe.nest_host_name(owner)
        }
        AccessLevel::PackageVisible => same_package(universe, referencing, owner),
        AccessLevel::Protected => {
            same_package(universe, referencing, owner)
                || universe.extends_or_implements(referencing, owner)
        }
    }
}

fn same_package(universe: &Universe, first: ClassId, second: ClassId) -> bool {
    package_name(&universe.class(first).name) == package_name(&universe.class(second).name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessFlags;
    use crate::hierarchy::{link_subclasses, link_supers};
    use crate::ir::PoolKind;
    use crate::test_harness::{library_class, member, program_class};

    struct Fixture {
        universe: Universe,
        base: ClassId,
        child: ClassId,
        other: ClassId,
    }

    fn fixture() -> Fixture {
        let mut universe = Universe::new();
        universe.add_library(library_class("java/lang/Object", None, &[]).with_method(member(
            "toString",
            "()Ljava/lang/String;",
            AccessFlags::PUBLIC,
        )));
        let base = universe
            .add_program(
                program_class("com/example/Base", Some("java/lang/Object"), &[])
                    .with_method(member("run", "()V", AccessFlags::PUBLIC))
                    .with_method(member("secret", "()V", AccessFlags::PRIVATE))
                    .with_method(member("hook", "(I)V", AccessFlags::PROTECTED))
                    .with_field(member("count", "I", AccessFlags::empty()))
                    .with_field(member("label", "Ljava/lang/String;", AccessFlags::empty())),
            )
            .expect("add base");
        let child = universe
            .add_program(
                program_class("com/example/Child", Some("com/example/Base"), &[])
                    .with_method(member("run", "()V", AccessFlags::PUBLIC))
                    .with_method(member("extra", "()V", AccessFlags::PUBLIC))
                    .with_field(member("count", "I", AccessFlags::PRIVATE))
                    .with_field(member("label", "Ljava/lang/String;", AccessFlags::PUBLIC)),
            )
            .expect("add child");
        let other = universe
            .add_program(program_class("org/other/Other", Some("java/lang/Object"), &[]))
            .expect("add other");
        link_supers(&mut universe, PoolKind::Program, None);
        link_supers(&mut universe, PoolKind::Library, None);
        link_subclasses(&mut universe, &[PoolKind::Program, PoolKind::Library]);
        Fixture {
            universe,
            base,
            child,
            other,
        }
    }

    #[test]
    fn find_method_prefers_self_over_inherited() {
        let f = fixture();
        let finder = MemberFinder::new(true);

        let found = finder
            .find_method(&f.universe, None, f.child, "run", "()V")
            .expect("run");
        assert_eq!(found.class, f.child);

        let inherited = finder
            .find_method(&f.universe, None, f.child, "toString", "()Ljava/lang/String;")
            .expect("toString");
        assert_eq!(f.universe.class(inherited.class).name, "java/lang/Object");
    }

    #[test]
    fn find_method_without_hierarchy_stays_in_class() {
        let f = fixture();
        let finder = MemberFinder::new(false);
        assert!(
            finder
                .find_method(&f.universe, None, f.child, "hook", "(I)V")
                .is_none()
        );
    }

    #[test]
    fn find_member_is_deterministic() {
        let f = fixture();
        let finder = MemberFinder::new(true);
        let first = finder.find_method(&f.universe, None, f.child, "*", "()V");
        for _ in 0..3 {
            assert_eq!(finder.find_method(&f.universe, None, f.child, "*", "()V"), first);
        }
        assert_eq!(first.map(|id| id.class), Some(f.child));
    }

    #[test]
    fn wildcard_results_include_exact_results() {
        let f = fixture();
        let finder = MemberFinder::new(true);
        for (name, descriptor) in [("run", "()V"), ("hook", "(I)V"), ("count", "I")] {
            let kind = if descriptor.starts_with('(') {
                MemberKind::Method
            } else {
                MemberKind::Field
            };
            let exact = finder.find_member(&f.universe, kind, None, f.base, name, descriptor);
            assert!(exact.is_some());
            let pattern_name = format!("{}*", &name[..1]);
            let wildcard =
                finder.find_member(&f.universe, kind, None, f.base, &pattern_name, "*");
            assert!(wildcard.is_some(), "pattern {pattern_name} found nothing");
        }
    }

    #[test]
    fn access_filter_applies_to_referencing_class() {
        let f = fixture();
        let finder = MemberFinder::new(true);

        assert!(
            finder
                .find_method(&f.universe, Some(f.other), f.base, "secret", "()V")
                .is_none()
        );
        assert!(
            finder
                .find_method(&f.universe, Some(f.other), f.base, "hook", "(I)V")
                .is_none()
        );
        assert!(
            finder
                .find_method(&f.universe, Some(f.child), f.base, "hook", "(I)V")
                .is_some()
        );
        assert!(
            finder
                .find_method(&f.universe, None, f.base, "secret", "()V")
                .is_some()
        );
        assert!(
            finder
                .find_field(&f.universe, Some(f.other), f.base, "count", "I")
                .is_none()
        );
    }

    #[test]
    fn overridden_and_shadowed_skip_private_members() {
        let f = fixture();
        let finder = MemberFinder::new(true);
        let run = finder
            .find_method(&f.universe, None, f.base, "run", "()V")
            .expect("run");
        let hook = finder
            .find_method(&f.universe, None, f.base, "hook", "(I)V")
            .expect("hook");
        let count = finder
            .find_field(&f.universe, None, f.base, "count", "I")
            .expect("count");

        assert!(finder.is_overridden(&f.universe, f.base, run));
        assert!(!finder.is_overridden(&f.universe, f.base, hook));
        assert!(!finder.is_shadowed(&f.universe, f.base, count));
    }

    #[test]
    fn subclass_members_are_found_only_when_subclasses_are_searched() {
        let f = fixture();

        let found = MemberFinder::new(true)
            .with_subclasses()
            .find_method(&f.universe, None, f.base, "extra", "()V")
            .expect("extra");
        assert_eq!(found.class, f.child);

        assert!(
            MemberFinder::new(true)
                .find_method(&f.universe, None, f.base, "extra", "()V")
                .is_none()
        );
    }

    #[test]
    fn field_redeclared_in_subclass_is_shadowed() {
        let f = fixture();
        let finder = MemberFinder::new(true);
        let label = finder
            .find_field(&f.universe, None, f.base, "label", "Ljava/lang/String;")
            .expect("label");
        assert_eq!(label.class, f.base);
        assert!(finder.is_shadowed(&f.universe, f.base, label));
    }
}
