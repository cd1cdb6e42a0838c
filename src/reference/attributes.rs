use std::collections::BTreeSet;

use crate::attribute::{
    Annotation, Attribute, ElementValue, EnclosingMethodAttribute, LocalVariableType,
    RecordComponent, SignatureAttribute,
};
use crate::constant::ConstantPool;
use crate::descriptor::{
    JAVA_LANG_OBJECT, SignatureKind, parse_class_signature, signature_class_names,
};
use crate::ir::{ClassId, MemberKind};
use crate::warning::{WarningKind, emit};

use super::Resolver;

/// Descriptor pattern matching any annotation element method.
const ELEMENT_METHOD_DESCRIPTOR: &str = "()*";

/// What an attribute list is attached to; decides how `Signature` attributes are read.
#[derive(Clone, Copy)]
enum Owner<'c> {
    Class {
        super_name: Option<&'c str>,
        interface_names: &'c [String],
    },
    Field,
    Method,
    RecordComponent,
    Code,
}

impl Resolver<'_> {
    pub(super) fn initialize_class_attributes(
        &self,
        pool: &ConstantPool,
        super_name: Option<&str>,
        interface_names: &[String],
        attributes: &mut Vec<Attribute>,
    ) {
        let owner = Owner::Class {
            super_name,
            interface_names,
        };
        self.initialize_attributes(pool, owner, attributes);
    }

    pub(super) fn initialize_member_attributes(
        &self,
        pool: &ConstantPool,
        kind: MemberKind,
        attributes: &mut Vec<Attribute>,
    ) {
        let owner = match kind {
            MemberKind::Field => Owner::Field,
            MemberKind::Method => Owner::Method,
        };
        self.initialize_attributes(pool, owner, attributes);
    }

    /// Resolves each attribute; attributes found corrupt are removed from the list.
    fn initialize_attributes(
        &self,
        pool: &ConstantPool,
        owner: Owner,
        attributes: &mut Vec<Attribute>,
    ) {
        attributes.retain_mut(|attribute| self.initialize_attribute(pool, owner, attribute));
    }

    fn initialize_attribute(
        &self,
        pool: &ConstantPool,
        owner: Owner,
        attribute: &mut Attribute,
    ) -> bool {
        match attribute {
            Attribute::Code(code) => {
                self.initialize_attributes(pool, Owner::Code, &mut code.attributes);
            }
            Attribute::Signature(signature) => {
                return self.initialize_signature(pool, owner, signature);
            }
            Attribute::EnclosingMethod(enclosing) => {
                self.initialize_enclosing_method(pool, enclosing);
            }
            Attribute::Record(record) => {
                for component in &mut record.components {
                    self.initialize_record_component(pool, component);
                }
            }
            Attribute::LocalVariableTable(variables) => {
                for variable in variables {
                    variable.referenced_class = pool
                        .utf8(variable.descriptor_index)
                        .and_then(|descriptor| {
                            self.resolve_descriptor(descriptor).into_iter().next()
                        })
                        .flatten();
                }
            }
            Attribute::LocalVariableTypeTable(types) => {
                types.retain_mut(|variable| self.initialize_local_variable_type(pool, variable));
            }
            Attribute::Annotations { annotations, .. } => {
                for annotation in annotations {
                    self.initialize_annotation(pool, annotation);
                }
            }
            Attribute::ParameterAnnotations { parameters, .. } => {
                for annotation in parameters.iter_mut().flatten() {
                    self.initialize_annotation(pool, annotation);
                }
            }
            Attribute::TypeAnnotations { annotations, .. } => {
                for type_annotation in annotations {
                    self.initialize_annotation(pool, &mut type_annotation.annotation);
                }
            }
            Attribute::AnnotationDefault(value) => {
                self.initialize_element_value(pool, value);
            }
            Attribute::NestHost { .. }
            | Attribute::NestMembers { .. }
            | Attribute::Exceptions { .. }
            | Attribute::Unknown { .. } => {}
        }
        true
    }

    /// Resolves a `Signature` attribute, or returns `false` when it must be dropped: it does
    /// not parse, or, on a class, its erased supertypes disagree with the class file.
    fn initialize_signature(
        &self,
        pool: &ConstantPool,
        owner: Owner,
        attribute: &mut SignatureAttribute,
    ) -> bool {
        let Some(signature) = pool.utf8(attribute.signature_index) else {
            self.report_invalid_signature("<missing>");
            return false;
        };
        let kind = match owner {
            Owner::Class {
                super_name,
                interface_names,
            } => {
                let consistent = parse_class_signature(signature)
                    .map(|parsed| {
                        parsed.super_name == super_name.unwrap_or(JAVA_LANG_OBJECT)
                            && same_names(&parsed.interface_names, interface_names)
                    })
                    .unwrap_or(false);
                if !consistent {
                    self.report_invalid_signature(signature);
                    return false;
                }
                SignatureKind::Class
            }
            Owner::Method => SignatureKind::Method,
            Owner::Field | Owner::RecordComponent | Owner::Code => SignatureKind::Field,
        };
        match signature_class_names(kind, signature) {
            Ok(names) => {
                attribute.referenced_classes = self.find_classes(&names);
                true
            }
            Err(_) => {
                self.report_invalid_signature(signature);
                false
            }
        }
    }

    fn initialize_local_variable_type(
        &self,
        pool: &ConstantPool,
        variable: &mut LocalVariableType,
    ) -> bool {
        let names = pool
            .utf8(variable.signature_index)
            .map(|signature| (signature, signature_class_names(SignatureKind::Field, signature)));
        match names {
            Some((_, Ok(names))) => {
                variable.referenced_classes = self.find_classes(&names);
                true
            }
            Some((signature, Err(_))) => {
                self.report_invalid_signature(signature);
                false
            }
            None => {
                self.report_invalid_signature("<missing>");
                false
            }
        }
    }

    fn report_invalid_signature(&self, signature: &str) {
        emit(
            self.sink,
            WarningKind::InvalidSignature,
            self.referencing_name,
            None,
            format!(
                "class {} has an invalid signature {signature}; removing it",
                self.referencing_name
            ),
        );
    }

    /// The class constant of the attribute reports a class that is missing outright; the
    /// innermost `$` segments are stripped to find an enclosing class that does exist.
    fn initialize_enclosing_method(
        &self,
        pool: &ConstantPool,
        enclosing: &mut EnclosingMethodAttribute,
    ) {
        let Some(class_name) = pool.class_name(enclosing.class_index) else {
            return;
        };
        enclosing.referenced_class = self.find_enclosing_class(class_name);
        if enclosing.method_index == 0 {
            return;
        }
        let (Some(class), Some((name, descriptor))) = (
            enclosing.referenced_class,
            pool.name_and_type(enclosing.method_index),
        ) else {
            return;
        };
        enclosing.referenced_method =
            self.find_local_member(MemberKind::Method, class, name, descriptor);
        if enclosing.referenced_method.is_none() {
            let enclosing_name = self.universe.class(class).name.as_str();
            emit(
                self.sink,
                WarningKind::MissingEnclosingMethod,
                self.referencing_name,
                Some(enclosing_name),
                format!(
                    "class {} can't find enclosing method {name}{descriptor} in class {enclosing_name}",
                    self.referencing_name
                ),
            );
        }
    }

    fn find_enclosing_class(&self, class_name: &str) -> Option<ClassId> {
        let mut candidate = class_name;
        loop {
            if let Some(found) = self.find_class(candidate, false) {
                return Some(found);
            }
            candidate = &candidate[..candidate.rfind('$')?];
        }
    }

    fn initialize_record_component(&self, pool: &ConstantPool, component: &mut RecordComponent) {
        if let (Some(name), Some(descriptor)) = (
            pool.utf8(component.name_index),
            pool.utf8(component.descriptor_index),
        ) {
            component.referenced_field =
                self.find_local_member(MemberKind::Field, self.referencing, name, descriptor);
        }
        self.initialize_attributes(pool, Owner::RecordComponent, &mut component.attributes);
    }

    fn initialize_annotation(&self, pool: &ConstantPool, annotation: &mut Annotation) {
        annotation.referenced_classes = pool
            .utf8(annotation.type_index)
            .map(|descriptor| self.resolve_descriptor(descriptor))
            .unwrap_or_default();
        let annotation_class = annotation.referenced_classes.first().copied().flatten();
        for element in &mut annotation.elements {
            element.referenced_method = annotation_class.and_then(|class| {
                let name = pool.utf8(element.name_index)?;
                self.find_local_member(MemberKind::Method, class, name, ELEMENT_METHOD_DESCRIPTOR)
            });
            self.initialize_element_value(pool, &mut element.value);
        }
    }

    fn initialize_element_value(&self, pool: &ConstantPool, value: &mut ElementValue) {
        match value {
            ElementValue::Const { .. } => {}
            ElementValue::Enum {
                type_name_index,
                const_name_index,
                referenced_classes,
                referenced_field,
            } => {
                let type_name = pool.utf8(*type_name_index);
                *referenced_classes = type_name
                    .map(|descriptor| self.resolve_descriptor(descriptor))
                    .unwrap_or_default();
                *referenced_field = match (
                    referenced_classes.first().copied().flatten(),
                    type_name,
                    pool.utf8(*const_name_index),
                ) {
                    (Some(class), Some(descriptor), Some(name)) => {
                        self.find_local_member(MemberKind::Field, class, name, descriptor)
                    }
                    _ => None,
                };
            }
            ElementValue::Class {
                class_info_index,
                referenced_classes,
            } => {
                *referenced_classes = pool
                    .utf8(*class_info_index)
                    .map(|descriptor| self.resolve_descriptor(descriptor))
                    .unwrap_or_default();
            }
            ElementValue::Annotation(annotation) => self.initialize_annotation(pool, annotation),
            ElementValue::Array(values) => {
                for value in values {
                    self.initialize_element_value(pool, value);
                }
            }
        }
    }
}

/// Interface lists agree when they name the same classes, in any order.
fn same_names(left: &[String], right: &[String]) -> bool {
    let left_set: BTreeSet<&str> = left.iter().map(String::as_str).collect();
    let right_set: BTreeSet<&str> = right.iter().map(String::as_str).collect();
    left.len() == right.len() && left_set == right_set
}

#[cfg(test)]
mod tests {
    use crate::access::AccessFlags;
    use crate::attribute::{
        Annotation, Attribute, ElementValue, ElementValuePair, EnclosingMethodAttribute,
        LocalVariableType, RecordAttribute, RecordComponent, SignatureAttribute,
    };
    use crate::classpath::Universe;
    use crate::ir::ClassId;
    use crate::reference::ReferenceInitializer;
    use crate::test_harness::{
        library_class, link_hierarchy, member, program_class, universe_with_platform,
    };
    use crate::warning::{WarningCollector, WarningKind};

    fn initialize(universe: &mut Universe, id: ClassId) -> WarningCollector {
        link_hierarchy(universe);
        let collector = WarningCollector::new();
        ReferenceInitializer::new(universe, Some(&collector)).initialize_class(universe, id);
        collector
    }

    #[test]
    fn class_signature_disagreeing_with_supertypes_is_removed() {
        let mut universe = universe_with_platform();
        let mut class = program_class("com/example/Box", Some("java/lang/Object"), &[]);
        let signature = class
            .program_body_mut()
            .constant_pool
            .add_utf8("<T:Ljava/lang/Object;>Ljava/util/AbstractList<TT;>;");
        let class = class.with_attribute(Attribute::Signature(SignatureAttribute {
            signature_index: signature,
            referenced_classes: Vec::new(),
        }));
        let id = universe.add_program(class).expect("add box");

        let collector = initialize(&mut universe, id);

        assert!(universe.class(id).attributes().is_empty());
        assert_eq!(collector.count(WarningKind::InvalidSignature), 1);
    }

    #[test]
    fn consistent_class_signature_is_resolved() {
        let mut universe = universe_with_platform();
        let mut class = program_class("com/example/Box", Some("java/lang/Object"), &[]);
        let signature = class
            .program_body_mut()
            .constant_pool
            .add_utf8("<T:Ljava/lang/String;>Ljava/lang/Object;");
        let class = class.with_attribute(Attribute::Signature(SignatureAttribute {
            signature_index: signature,
            referenced_classes: Vec::new(),
        }));
        let id = universe.add_program(class).expect("add box");

        let collector = initialize(&mut universe, id);

        let Attribute::Signature(resolved) = &universe.class(id).attributes()[0] else {
            panic!("signature kept");
        };
        assert_eq!(
            resolved.referenced_classes,
            vec![
                universe.lookup("java/lang/String"),
                universe.lookup("java/lang/Object")
            ]
        );
        assert!(collector.is_empty());
    }

    #[test]
    fn class_signature_may_list_interfaces_in_another_order() {
        let mut universe = universe_with_platform();
        universe.add_library(library_class("a/I", Some("java/lang/Object"), &[]));
        universe.add_library(library_class("a/J", Some("java/lang/Object"), &[]));
        let mut class = program_class("com/example/Both", Some("java/lang/Object"), &["a/I", "a/J"]);
        let signature = class
            .program_body_mut()
            .constant_pool
            .add_utf8("Ljava/lang/Object;La/J;La/I;");
        let class = class.with_attribute(Attribute::Signature(SignatureAttribute {
            signature_index: signature,
            referenced_classes: Vec::new(),
        }));
        let id = universe.add_program(class).expect("add both");

        let collector = initialize(&mut universe, id);

        assert_eq!(universe.class(id).attributes().len(), 1);
        assert_eq!(collector.count(WarningKind::InvalidSignature), 0);
    }

    #[test]
    fn class_signature_with_extra_interface_is_removed() {
        let mut universe = universe_with_platform();
        universe.add_library(library_class("a/I", Some("java/lang/Object"), &[]));
        let mut class = program_class("com/example/One", Some("java/lang/Object"), &["a/I"]);
        let signature = class
            .program_body_mut()
            .constant_pool
            .add_utf8("Ljava/lang/Object;La/I;La/I;");
        let class = class.with_attribute(Attribute::Signature(SignatureAttribute {
            signature_index: signature,
            referenced_classes: Vec::new(),
        }));
        let id = universe.add_program(class).expect("add one");

        let collector = initialize(&mut universe, id);

        assert!(universe.class(id).attributes().is_empty());
        assert_eq!(collector.count(WarningKind::InvalidSignature), 1);
    }

    #[test]
    fn corrupt_local_variable_types_are_dropped() {
        let mut universe = universe_with_platform();
        let mut class = program_class("com/example/App", Some("java/lang/Object"), &[]);
        let pool = &mut class.program_body_mut().constant_pool;
        let good = pool.add_utf8("Ljava/util/List<Ljava/lang/String;>;");
        let bad = pool.add_utf8("Ljava/util/List<");
        let name = pool.add_utf8("items");
        let entry = |signature_index| LocalVariableType {
            start_pc: 0,
            length: 4,
            name_index: name,
            signature_index,
            index: 1,
            referenced_classes: Vec::new(),
        };
        let method = member("run", "()V", AccessFlags::PUBLIC)
            .with_attribute(Attribute::LocalVariableTypeTable(vec![entry(good), entry(bad)]));
        let id = universe
            .add_program(class.with_method(method))
            .expect("add app");

        let collector = initialize(&mut universe, id);

        let Attribute::LocalVariableTypeTable(types) = &universe.class(id).methods[0].attributes[0]
        else {
            panic!("table kept");
        };
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].referenced_classes[1], universe.lookup("java/lang/String"));
        assert_eq!(collector.count(WarningKind::InvalidSignature), 1);
        // java/util/List is not on the classpath.
        assert_eq!(collector.count(WarningKind::MissingClass), 1);
    }

    #[test]
    fn enclosing_method_recovers_outer_class() {
        let mut universe = universe_with_platform();
        let outer = universe
            .add_program(
                program_class("com/example/Outer", Some("java/lang/Object"), &[])
                    .with_method(member("build", "()V", AccessFlags::PRIVATE)),
            )
            .expect("add outer");
        let mut class = program_class("com/example/Outer$1$Local", Some("java/lang/Object"), &[]);
        let pool = &mut class.program_body_mut().constant_pool;
        let class_index = pool.add_class("com/example/Outer$1");
        let found = pool.add_name_and_type("build", "()V");
        let missing = pool.add_name_and_type("gone", "()V");
        let enclosing = |method_index| {
            Attribute::EnclosingMethod(EnclosingMethodAttribute {
                class_index,
                method_index,
                referenced_class: None,
                referenced_method: None,
            })
        };
        let class = class.with_attribute(enclosing(found)).with_attribute(enclosing(missing));
        let id = universe.add_program(class).expect("add local");

        let collector = initialize(&mut universe, id);

        let attributes = universe.class(id).attributes();
        let Attribute::EnclosingMethod(first) = &attributes[0] else {
            panic!("enclosing method");
        };
        assert_eq!(first.referenced_class, Some(outer));
        assert!(first.referenced_method.is_some());
        let Attribute::EnclosingMethod(second) = &attributes[1] else {
            panic!("enclosing method");
        };
        assert_eq!(second.referenced_method, None);
        assert_eq!(collector.count(WarningKind::MissingEnclosingMethod), 1);
        // The class constant itself still names a class that does not exist.
        assert_eq!(collector.count(WarningKind::MissingClass), 1);
    }

    #[test]
    fn annotations_link_elements_and_enum_constants() {
        let mut universe = universe_with_platform();
        universe.add_library(
            library_class("org/lib/Mode", Some("java/lang/Enum"), &[]).with_field(member(
                "FAST",
                "Lorg/lib/Mode;",
                AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::ENUM,
            )),
        );
        universe.add_library(
            library_class("org/lib/Config", Some("java/lang/Object"), &[])
                .with_method(member("mode", "()Lorg/lib/Mode;", AccessFlags::PUBLIC)),
        );
        let mut class = program_class("com/example/App", Some("java/lang/Object"), &[]);
        let pool = &mut class.program_body_mut().constant_pool;
        let mut annotation = Annotation::new(pool.add_utf8("Lorg/lib/Config;"));
        annotation.elements.push(ElementValuePair {
            name_index: pool.add_utf8("mode"),
            value: ElementValue::Enum {
                type_name_index: pool.add_utf8("Lorg/lib/Mode;"),
                const_name_index: pool.add_utf8("FAST"),
                referenced_classes: Vec::new(),
                referenced_field: None,
            },
            referenced_method: None,
        });
        let name = pool.add_utf8("x");
        let descriptor = pool.add_utf8("I");
        let record = Attribute::Record(RecordAttribute {
            components: vec![RecordComponent {
                name_index: name,
                descriptor_index: descriptor,
                attributes: Vec::new(),
                referenced_field: None,
            }],
        });
        let class = class
            .with_field(member("x", "I", AccessFlags::PRIVATE | AccessFlags::FINAL))
            .with_attribute(Attribute::Annotations {
                visible: true,
                annotations: vec![annotation],
            })
            .with_attribute(record);
        let id = universe.add_program(class).expect("add app");

        initialize(&mut universe, id);

        let attributes = universe.class(id).attributes();
        let Attribute::Annotations { annotations, .. } = &attributes[0] else {
            panic!("annotations");
        };
        let element = &annotations[0].elements[0];
        assert!(element.referenced_method.is_some());
        let ElementValue::Enum {
            referenced_field, ..
        } = &element.value
        else {
            panic!("enum value");
        };
        assert!(referenced_field.is_some());
        let Attribute::Record(record) = &attributes[1] else {
            panic!("record");
        };
        assert_eq!(
            record.components[0].referenced_field.map(|field| field.class),
            Some(id)
        );
    }
}
