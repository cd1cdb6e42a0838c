//! Reference initialization: turns the symbolic names inside classes into class and member ids.
//!
//! Program classes get every constant, member descriptor, attribute, and their Kotlin metadata
//! resolved. Library classes only get member descriptors and Kotlin metadata. Each class is
//! resolved on a copy against the unchanged universe and written back afterwards.

mod attributes;
mod clear;
mod kotlin;
mod kotlin_conventions;

pub use clear::clear_references;
pub use kotlin::TypeAliasIndex;

use tracing::debug;

use crate::classpath::Universe;
use crate::constant::{Constant, ConstantPool, RefConstant};
use crate::descriptor::{
    JAVA_LANG_CLASS, JAVA_LANG_INVOKE_METHOD_HANDLE, JAVA_LANG_INVOKE_METHOD_TYPE,
    JAVA_LANG_OBJECT, JAVA_LANG_STRING, array_element_class, descriptor_class_names,
    is_array_name,
};
use crate::ir::{Class, ClassId, MemberId, MemberKind, PoolKind};
use crate::member_finder::MemberFinder;
use crate::warning::{WarningKind, WarningSink, emit};

const JAVA_LANG_INVOKE_VAR_HANDLE: &str = "java/lang/invoke/VarHandle";
const POLYMORPHIC_SIGNATURE: &str = "([Ljava/lang/Object;)Ljava/lang/Object;";

/// Resolves the symbolic references of classes in a universe.
pub struct ReferenceInitializer<'s> {
    finder: MemberFinder,
    sink: Option<&'s dyn WarningSink>,
    type_aliases: TypeAliasIndex,
}

impl<'s> ReferenceInitializer<'s> {
    /// Snapshots the Kotlin type aliases declared in `universe`. Aliases added later are not
    /// seen by this initializer.
    pub fn new(universe: &Universe, sink: Option<&'s dyn WarningSink>) -> Self {
        Self {
            finder: MemberFinder::new(true),
            sink,
            type_aliases: TypeAliasIndex::build(universe),
        }
    }

    /// Member lookups of constant pool references search the declaring class only.
    pub fn without_hierarchy_search(mut self) -> Self {
        self.finder = MemberFinder::new(false);
        self
    }

    pub fn type_aliases(&self) -> &TypeAliasIndex {
        &self.type_aliases
    }

    pub fn initialize_pool(&self, universe: &mut Universe, kind: PoolKind) {
        let ids = universe.class_ids(kind);
        for id in &ids {
            self.initialize_class(universe, *id);
        }
        debug!("initialized references of {} {:?} classes", ids.len(), kind);
    }

    pub fn initialize_class(&self, universe: &mut Universe, id: ClassId) {
        let mut class = universe.class(id).clone();
        Resolver::new(self, universe, id).initialize(&mut class);
        universe.replace_class(id, class);
    }
}

/// Per-class resolution state borrowed from the initializer and the universe.
pub(crate) struct Resolver<'a> {
    universe: &'a Universe,
    finder: MemberFinder,
    sink: Option<&'a dyn WarningSink>,
    type_aliases: &'a TypeAliasIndex,
    referencing: ClassId,
    referencing_name: &'a str,
    from_library: bool,
}

impl<'a> Resolver<'a> {
    fn new(
        initializer: &'a ReferenceInitializer<'_>,
        universe: &'a Universe,
        referencing: ClassId,
    ) -> Self {
        let class = universe.class(referencing);
        Self {
            universe,
            finder: initializer.finder,
            sink: initializer.sink,
            type_aliases: &initializer.type_aliases,
            referencing,
            referencing_name: &class.name,
            from_library: !class.is_program(),
        }
    }

    fn initialize(&self, class: &mut Class) {
        for kind in [MemberKind::Field, MemberKind::Method] {
            for member in class.members_mut(kind) {
                member.referenced_classes = self.resolve_descriptor(&member.descriptor);
            }
        }

        if class.is_program() {
            let super_name = class.super_name.clone();
            let interface_names = class.interface_names.clone();
            let body = class.program_body_mut();
            let source = body.constant_pool.clone();
            for (_, constant) in body.constant_pool.iter_mut() {
                self.initialize_constant(&source, constant);
            }
            self.initialize_class_attributes(
                &source,
                super_name.as_deref(),
                &interface_names,
                &mut body.attributes,
            );
            for kind in [MemberKind::Field, MemberKind::Method] {
                for member in class.members_mut(kind) {
                    self.initialize_member_attributes(&source, kind, &mut member.attributes);
                }
            }
        }

        if let Some(metadata) = class.kotlin_metadata.as_mut() {
            self.initialize_kotlin(metadata);
        }
    }

    fn initialize_constant(&self, pool: &ConstantPool, constant: &mut Constant) {
        match constant {
            Constant::String(string) => {
                string.java_lang_string = self.find_class(JAVA_LANG_STRING, false);
            }
            Constant::Class(class) => {
                class.referenced_class = pool
                    .utf8(class.name_index)
                    .and_then(|name| self.find_class(name, !self.from_library));
                class.java_lang_class = self.find_class(JAVA_LANG_CLASS, false);
            }
            Constant::FieldRef(reference) => {
                self.initialize_ref(pool, MemberKind::Field, reference);
            }
            Constant::MethodRef(reference) | Constant::InterfaceMethodRef(reference) => {
                self.initialize_ref(pool, MemberKind::Method, reference);
            }
            Constant::MethodHandle(handle) => {
                handle.java_lang_invoke_method_handle =
                    self.find_class(JAVA_LANG_INVOKE_METHOD_HANDLE, false);
            }
            Constant::MethodType(method_type) => {
                method_type.referenced_classes = pool
                    .utf8(method_type.descriptor_index)
                    .map(|descriptor| self.resolve_descriptor(descriptor))
                    .unwrap_or_default();
                method_type.java_lang_invoke_method_type =
                    self.find_class(JAVA_LANG_INVOKE_METHOD_TYPE, false);
            }
            Constant::Dynamic(dynamic) | Constant::InvokeDynamic(dynamic) => {
                dynamic.referenced_classes = pool
                    .name_and_type(dynamic.name_and_type_index)
                    .map(|(_, descriptor)| self.resolve_descriptor(descriptor))
                    .unwrap_or_default();
            }
            _ => {}
        }
    }

    /// The class constant at `class_index` reports a missing owner, so the reference itself
    /// only reports missing members.
    fn initialize_ref(&self, pool: &ConstantPool, kind: MemberKind, reference: &mut RefConstant) {
        let Some(class_name) = pool.class_name(reference.class_index) else {
            return;
        };
        let Some((name, descriptor)) = pool.name_and_type(reference.name_and_type_index) else {
            return;
        };
        let (class, member) = self.resolve_member_ref(kind, class_name, name, descriptor);
        reference.referenced_class = member.map(|member| member.class).or(class);
        reference.referenced_member = member;
    }

    /// Resolves a member reference on `class_name`. Returns the resolved owner and the member;
    /// the member's own class is where it was found in the hierarchy.
    pub(crate) fn resolve_member_ref(
        &self,
        kind: MemberKind,
        class_name: &str,
        name: &str,
        descriptor: &str,
    ) -> (Option<ClassId>, Option<MemberId>) {
        let owner_name = if is_array_name(class_name) {
            JAVA_LANG_OBJECT
        } else {
            class_name
        };
        let Some(class) = self.find_class(owner_name, false) else {
            return (None, None);
        };
        let member = self
            .finder
            .find_member(
                self.universe,
                kind,
                Some(self.referencing),
                class,
                name,
                descriptor,
            )
            .or_else(|| {
                let polymorphic = kind == MemberKind::Method
                    && (owner_name == JAVA_LANG_INVOKE_METHOD_HANDLE
                        || owner_name == JAVA_LANG_INVOKE_VAR_HANDLE);
                polymorphic
                    .then(|| {
                        self.finder.find_method(
                            self.universe,
                            Some(self.referencing),
                            class,
                            name,
                            POLYMORPHIC_SIGNATURE,
                        )
                    })
                    .flatten()
            });
        if member.is_none() {
            let (warning, pool) = if self.universe.class(class).is_program() {
                (WarningKind::MissingProgramMember, "program")
            } else {
                (WarningKind::MissingLibraryMember, "library")
            };
            let what = match kind {
                MemberKind::Field => "field",
                MemberKind::Method => "method",
            };
            emit(
                self.sink,
                warning,
                self.referencing_name,
                Some(owner_name),
                format!(
                    "class {} can't find referenced {what} {name}{descriptor} in {pool} class {owner_name}",
                    self.referencing_name
                ),
            );
        }
        (Some(class), member)
    }

    /// Looks a class up in the program pool, then the library pool. Array names resolve to
    /// their element class; primitive arrays resolve to nothing.
    pub(crate) fn find_class(&self, name: &str, warn_missing: bool) -> Option<ClassId> {
        let name = if is_array_name(name) {
            array_element_class(name)?
        } else {
            name
        };
        let Some(found) = self.universe.lookup(name) else {
            if warn_missing {
                emit(
                    self.sink,
                    WarningKind::MissingClass,
                    self.referencing_name,
                    Some(name),
                    format!(
                        "class {} can't find referenced class {name}",
                        self.referencing_name
                    ),
                );
            }
            return None;
        };
        if self.from_library && self.universe.class(found).is_program() {
            emit(
                self.sink,
                WarningKind::LibraryDependsOnProgram,
                self.referencing_name,
                Some(name),
                format!(
                    "library class {} depends on program class {name}",
                    self.referencing_name
                ),
            );
        }
        Some(found)
    }

    pub(crate) fn find_classes(&self, names: &[String]) -> Vec<Option<ClassId>> {
        names
            .iter()
            .map(|name| self.find_class(name, !self.from_library))
            .collect()
    }

    /// One slot per class named in a field or method descriptor, in order. Library classes
    /// resolve silently.
    pub(crate) fn resolve_descriptor(&self, descriptor: &str) -> Vec<Option<ClassId>> {
        match descriptor_class_names(descriptor) {
            Ok(names) => self.find_classes(&names),
            Err(_) => Vec::new(),
        }
    }

    /// Member declared by `class` itself, without access checks.
    pub(crate) fn find_local_member(
        &self,
        kind: MemberKind,
        class: ClassId,
        name: &str,
        descriptor: &str,
    ) -> Option<MemberId> {
        MemberFinder::new(false).find_member(self.universe, kind, None, class, name, descriptor)
    }
}
