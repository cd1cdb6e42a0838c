use std::collections::BTreeMap;

use crate::access::AccessFlags;
use crate::classpath::Universe;
use crate::ir::{ClassId, MemberId, MemberKind, PoolKind};
use crate::kotlin::{
    JvmSignature, KotlinAnnotation, KotlinClassMetadata, KotlinClassifier,
    KotlinDeclarationContainer, KotlinFunction, KotlinMetadata, KotlinProperty, KotlinType,
    KotlinTypeAlias, KotlinTypeParameter, KotlinValueParameter, SyntheticClassKind, TypeAliasRef,
};

use super::Resolver;
use super::kotlin_conventions::{
    default_impls_class_name, default_impls_descriptor, default_method_descriptor,
    default_method_name, jvm_class_name, lambda_method_name, type_alias_key,
};

/// Type aliases declared anywhere in a universe, keyed by their Kotlin name.
#[derive(Clone, Debug, Default)]
pub struct TypeAliasIndex {
    aliases: BTreeMap<String, TypeAliasRef>,
}

impl TypeAliasIndex {
    /// Program declarations win over library declarations with the same name.
    pub fn build(universe: &Universe) -> Self {
        let mut aliases = BTreeMap::new();
        for kind in [PoolKind::Program, PoolKind::Library] {
            for id in universe.class_ids(kind) {
                let class = universe.class(id);
                let Some(declarations) = class
                    .kotlin_metadata
                    .as_ref()
                    .and_then(KotlinMetadata::declarations)
                else {
                    continue;
                };
                for (index, alias) in declarations.type_aliases.iter().enumerate() {
                    aliases
                        .entry(type_alias_key(&class.name, &alias.name))
                        .or_insert(TypeAliasRef {
                            class: id,
                            index: index as u32,
                        });
                }
            }
        }
        Self { aliases }
    }

    pub fn get(&self, name: &str) -> Option<TypeAliasRef> {
        self.aliases.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Where the JVM members of a declaration container live.
#[derive(Clone, Copy)]
struct Container<'n> {
    class: ClassId,
    name: &'n str,
    default_impls: Option<ClassId>,
    top_level: bool,
}

impl Resolver<'_> {
    pub(super) fn initialize_kotlin(&self, metadata: &mut KotlinMetadata) {
        let container = Container {
            class: self.referencing,
            name: self.referencing_name,
            default_impls: None,
            top_level: true,
        };
        match metadata {
            KotlinMetadata::Class(class) => self.initialize_kotlin_class(class),
            KotlinMetadata::File(file) => {
                self.initialize_declarations(container, &mut file.declarations);
            }
            KotlinMetadata::SyntheticClass(synthetic) => {
                let lambda = synthetic.kind == SyntheticClassKind::Lambda;
                let container = Container {
                    top_level: false,
                    ..container
                };
                for function in &mut synthetic.functions {
                    self.initialize_function(container, function, lambda);
                }
            }
            KotlinMetadata::MultiFileFacade(facade) => {
                facade.referenced_part_classes = facade
                    .part_class_names
                    .iter()
                    .map(|name| self.find_kotlin_class(name))
                    .collect();
            }
            KotlinMetadata::MultiFilePart(part) => {
                part.referenced_facade_class = self.find_kotlin_class(&part.facade_name);
                self.initialize_declarations(container, &mut part.declarations);
            }
        }
    }

    fn initialize_kotlin_class(&self, metadata: &mut KotlinClassMetadata) {
        let own = self.referencing_name;
        metadata.referenced_class = self.find_kotlin_class(&metadata.class_name);
        metadata.referenced_default_impls_class = if metadata.is_interface {
            self.find_class(&default_impls_class_name(own), false)
        } else {
            None
        };

        for parameter in &mut metadata.type_parameters {
            self.initialize_type_parameter(parameter);
        }
        for supertype in &mut metadata.supertypes {
            self.initialize_type(supertype);
        }
        for constructor in &mut metadata.constructors {
            constructor.referenced_method =
                constructor.jvm_signature.as_ref().and_then(|signature| {
                    self.find_local_member(
                        MemberKind::Method,
                        self.referencing,
                        &signature.name,
                        &signature.descriptor,
                    )
                });
            self.initialize_value_parameters(&mut constructor.value_parameters);
        }

        if let Some(companion) = &metadata.companion_object_name {
            metadata.referenced_companion_class =
                self.find_class(&format!("{own}${companion}"), false);
            metadata.referenced_companion_field = self.find_local_member(
                MemberKind::Field,
                self.referencing,
                companion,
                &format!("L{own}${companion};"),
            );
        }
        metadata.referenced_nested_classes = metadata
            .nested_class_names
            .iter()
            .map(|name| self.find_class(&format!("{own}${name}"), false))
            .collect();
        let entry_descriptor = format!("L{own};");
        metadata.referenced_enum_entries = metadata
            .enum_entry_names
            .iter()
            .map(|name| {
                self.find_local_member(MemberKind::Field, self.referencing, name, &entry_descriptor)
            })
            .collect();
        metadata.referenced_sealed_subclasses = metadata
            .sealed_subclass_names
            .iter()
            .map(|name| self.find_kotlin_class(name))
            .collect();

        let container = Container {
            class: self.referencing,
            name: own,
            default_impls: metadata.referenced_default_impls_class,
            top_level: false,
        };
        self.initialize_declarations(container, &mut metadata.declarations);
    }

    fn initialize_declarations(
        &self,
        container: Container,
        declarations: &mut KotlinDeclarationContainer,
    ) {
        for function in &mut declarations.functions {
            self.initialize_function(container, function, false);
        }
        for property in &mut declarations.properties {
            self.initialize_property(container, property);
        }
        for alias in &mut declarations.type_aliases {
            self.initialize_type_alias(container, alias);
        }
    }

    fn initialize_function(
        &self,
        container: Container,
        function: &mut KotlinFunction,
        lambda: bool,
    ) {
        if let Some(signature) = &function.jvm_signature {
            let name = if lambda {
                lambda_method_name(&signature.name)
            } else {
                signature.name.as_str()
            };
            let descriptor = signature.descriptor.as_str();
            function.referenced_method =
                self.find_local_member(MemberKind::Method, container.class, name, descriptor);

            let impls_descriptor = container
                .default_impls
                .and_then(|_| default_impls_descriptor(container.name, descriptor).ok());
            if let (Some(impls), Some(impls_descriptor)) =
                (container.default_impls, &impls_descriptor)
            {
                function.referenced_default_impls_method =
                    self.find_local_member(MemberKind::Method, impls, name, impls_descriptor);
            }

            if function
                .value_parameters
                .iter()
                .any(|parameter| parameter.declares_default_value)
            {
                function.referenced_default_method =
                    self.find_default_method(container, function, name, descriptor);
            }
        }

        if let Some(receiver) = &mut function.receiver_type {
            self.initialize_type(receiver);
        }
        for parameter in &mut function.type_parameters {
            self.initialize_type_parameter(parameter);
        }
        self.initialize_value_parameters(&mut function.value_parameters);
        self.initialize_type(&mut function.return_type);
        function.referenced_lambda_class_origin = function
            .lambda_class_origin_name
            .as_deref()
            .and_then(|name| self.find_kotlin_class(name));
    }

    /// Finds the `$default` bridge of a function: in `$DefaultImpls` for interface functions,
    /// next to the function otherwise.
    fn find_default_method(
        &self,
        container: Container,
        function: &KotlinFunction,
        name: &str,
        descriptor: &str,
    ) -> Option<MemberId> {
        let default_name = default_method_name(name);
        let value_parameters = function.value_parameters.len();
        if function.referenced_default_impls_method.is_some() {
            let impls = container.default_impls?;
            let bridge =
                default_method_descriptor(Some(container.name), descriptor, value_parameters)
                    .ok()?;
            return self.find_local_member(MemberKind::Method, impls, &default_name, &bridge);
        }
        let is_static = container.top_level
            || function
                .referenced_method
                .map(|method| {
                    self.universe
                        .member(method)
                        .access
                        .contains(AccessFlags::STATIC)
                })
                .unwrap_or(false);
        let receiver = (!is_static).then_some(container.name);
        let bridge = default_method_descriptor(receiver, descriptor, value_parameters).ok()?;
        self.find_local_member(MemberKind::Method, container.class, &default_name, &bridge)
    }

    fn initialize_property(&self, container: Container, property: &mut KotlinProperty) {
        let find = |kind, signature: &Option<JvmSignature>| {
            signature.as_ref().and_then(|signature| {
                self.find_local_member(
                    kind,
                    container.class,
                    &signature.name,
                    &signature.descriptor,
                )
            })
        };
        property.referenced_backing_field =
            find(MemberKind::Field, &property.backing_field_signature);
        property.referenced_getter = find(MemberKind::Method, &property.getter_signature);
        property.referenced_setter = find(MemberKind::Method, &property.setter_signature);
        property.referenced_synthetic_annotations_method = property
            .synthetic_method_for_annotations
            .as_ref()
            .and_then(|signature| {
                [Some(container.class), container.default_impls]
                    .into_iter()
                    .flatten()
                    .find_map(|class| {
                        self.find_local_member(
                            MemberKind::Method,
                            class,
                            &signature.name,
                            &signature.descriptor,
                        )
                    })
            });

        for parameter in &mut property.type_parameters {
            self.initialize_type_parameter(parameter);
        }
        if let Some(receiver) = &mut property.receiver_type {
            self.initialize_type(receiver);
        }
        self.initialize_type(&mut property.property_type);
        self.initialize_value_parameters(&mut property.setter_parameters);
    }

    fn initialize_type_alias(&self, container: Container, alias: &mut KotlinTypeAlias) {
        alias.referenced_declaration_container = Some(container.class);
        for parameter in &mut alias.type_parameters {
            self.initialize_type_parameter(parameter);
        }
        self.initialize_type(&mut alias.underlying_type);
        self.initialize_type(&mut alias.expanded_type);
        for annotation in &mut alias.annotations {
            self.initialize_kotlin_annotation(annotation);
        }
    }

    fn initialize_value_parameters(&self, parameters: &mut [KotlinValueParameter]) {
        for parameter in parameters {
            self.initialize_type(&mut parameter.parameter_type);
            if let Some(element) = &mut parameter.vararg_element_type {
                self.initialize_type(element);
            }
        }
    }

    fn initialize_type_parameter(&self, parameter: &mut KotlinTypeParameter) {
        for bound in &mut parameter.upper_bounds {
            self.initialize_type(bound);
        }
        for annotation in &mut parameter.annotations {
            self.initialize_kotlin_annotation(annotation);
        }
    }

    fn initialize_type(&self, kotlin_type: &mut KotlinType) {
        match &kotlin_type.classifier {
            KotlinClassifier::Class(name) => {
                kotlin_type.referenced_class = self.find_kotlin_class(name);
            }
            KotlinClassifier::TypeAlias(name) => {
                kotlin_type.referenced_type_alias = self.type_aliases.get(name);
            }
            KotlinClassifier::TypeParameter(_) => {}
        }
        for argument in kotlin_type.arguments.iter_mut().flatten() {
            self.initialize_type(argument);
        }
        if let Some(outer) = &mut kotlin_type.outer_type {
            self.initialize_type(outer);
        }
        if let Some(abbreviation) = &mut kotlin_type.abbreviation {
            self.initialize_type(abbreviation);
        }
        for annotation in &mut kotlin_type.annotations {
            self.initialize_kotlin_annotation(annotation);
        }
    }

    fn initialize_kotlin_annotation(&self, annotation: &mut KotlinAnnotation) {
        annotation.referenced_class = self.find_kotlin_class(&annotation.class_name);
        annotation.referenced_argument_methods = annotation
            .argument_names
            .iter()
            .map(|name| {
                annotation.referenced_class.and_then(|class| {
                    self.find_local_member(MemberKind::Method, class, name, "()*")
                })
            })
            .collect();
    }

    /// Kotlin classes resolve silently; metadata often names classes stripped from the input.
    fn find_kotlin_class(&self, kotlin_name: &str) -> Option<ClassId> {
        self.find_class(&jvm_class_name(kotlin_name), false)
    }
}
