//! Method linking: groups methods that override each other into chains with one terminal
//! member per group.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::attribute::code_attribute;
use crate::classpath::{HierarchyWalk, Universe};
use crate::constant::Constant;
use crate::instruction::decode_all;
use crate::ir::{ClassId, MemberId, PoolKind};
use crate::kotlin::KotlinMetadata;
use crate::opcodes;

/// Side table of method chains. Each linked method points to the next member of its chain;
/// following the links ends at the chain's terminal.
#[derive(Clone, Debug, Default)]
pub struct MethodChains {
    next: BTreeMap<MemberId, MemberId>,
}

impl MethodChains {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last member of the chain holding `method`; an unlinked method is its own terminal.
    pub fn terminal(&self, method: MemberId) -> MemberId {
        let mut current = method;
        let mut steps = 0;
        while let Some(next) = self.next.get(&current) {
            current = *next;
            steps += 1;
            if steps > self.next.len() {
                break;
            }
        }
        current
    }

    pub fn are_linked(&self, first: MemberId, second: MemberId) -> bool {
        self.terminal(first) == self.terminal(second)
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }

    pub fn len(&self) -> usize {
        self.next.len()
    }

    /// Members grouped by terminal, for groups of two or more.
    pub fn groups(&self) -> BTreeMap<MemberId, BTreeSet<MemberId>> {
        let mut groups: BTreeMap<MemberId, BTreeSet<MemberId>> = BTreeMap::new();
        for member in self.next.keys() {
            let terminal = self.terminal(*member);
            let group = groups.entry(terminal).or_default();
            group.insert(*member);
            group.insert(terminal);
        }
        groups
    }

    /// Merges the chains of `member` and `other`. A library terminal stays terminal; otherwise
    /// the terminal of `other` is appended to the chain of `member`.
    fn link(&mut self, universe: &Universe, member: MemberId, other: MemberId) {
        let last = self.terminal(member);
        let other_last = self.terminal(other);
        if last == other_last {
            return;
        }
        if universe.class(other_last.class).is_program() {
            self.next.insert(other_last, last);
        } else {
            self.next.insert(last, other_last);
        }
    }
}

/// Builds method chains over a universe whose hierarchy is linked.
#[derive(Clone, Copy, Debug, Default)]
pub struct MethodLinker;

impl MethodLinker {
    pub fn new() -> Self {
        Self
    }

    pub fn link(&self, universe: &Universe) -> MethodChains {
        let mut chains = MethodChains::new();
        let mut classes = 0;
        for kind in [PoolKind::Program, PoolKind::Library] {
            for id in universe.class_ids(kind) {
                self.link_hierarchy(universe, id, &mut chains);
                classes += 1;
            }
        }
        let facades = self.link_facade_delegates(universe, &mut chains);
        debug!(
            "linked {} methods across {} classes, {} facade delegates",
            chains.len(),
            classes,
            facades
        );
        chains
    }

    /// Links the methods of `id` and its ancestors that share a name and descriptor.
    fn link_hierarchy(&self, universe: &Universe, id: ClassId, chains: &mut MethodChains) {
        let mut heads: BTreeMap<String, MemberId> = BTreeMap::new();
        universe.find_in_hierarchy(id, HierarchyWalk::ANCESTORS, |class| {
            for (index, method) in universe.class(class).methods.iter().enumerate() {
                if method.access.is_private()
                    || method.access.is_static()
                    || method.is_initializer()
                {
                    continue;
                }
                let member = MemberId::method(class, index);
                let key = format!("{} {}", method.name, method.descriptor);
                match heads.get(&key) {
                    Some(head) => chains.link(universe, member, *head),
                    None => {
                        heads.insert(key, chains.terminal(member));
                    }
                }
            }
            None::<()>
        });
    }

    /// Links the static delegates of Kotlin multi-file facades to the part methods they call.
    fn link_facade_delegates(&self, universe: &Universe, chains: &mut MethodChains) -> usize {
        let mut linked = 0;
        for id in universe.class_ids(PoolKind::Program) {
            let class = universe.class(id);
            let Some(KotlinMetadata::MultiFileFacade(facade)) = &class.kotlin_metadata else {
                continue;
            };
            let parts: BTreeSet<ClassId> =
                facade.referenced_part_classes.iter().flatten().copied().collect();
            for (index, method) in class.methods.iter().enumerate() {
                if !method.access.is_static() || method.is_initializer() {
                    continue;
                }
                let Some(code) = code_attribute(&method.attributes) else {
                    continue;
                };
                let Ok(instructions) = decode_all(&code.code) else {
                    continue;
                };
                let target = instructions
                    .iter()
                    .filter(|instruction| instruction.opcode == opcodes::INVOKESTATIC)
                    .filter_map(|instruction| {
                        match class.constant_pool().get(instruction.constant_index()?)? {
                            Constant::MethodRef(reference)
                            | Constant::InterfaceMethodRef(reference) => reference.referenced_member,
                            _ => None,
                        }
                    })
                    .find(|target| {
                        let callee = universe.member(*target);
                        parts.contains(&target.class)
                            && callee.access.is_static()
                            && callee.name == method.name
                            && callee.descriptor == method.descriptor
                    });
                if let Some(target) = target {
                    chains.link(universe, MemberId::method(id, index), target);
                    linked += 1;
                }
            }
        }
        linked
    }
}
