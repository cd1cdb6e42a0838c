use crate::attribute::{Annotation, Attribute, ElementValue};
use crate::constant::Constant;
use crate::ir::{Class, ClassBody};
use crate::kotlin::{
    KotlinAnnotation, KotlinDeclarationContainer, KotlinFunction, KotlinMetadata, KotlinType,
    KotlinTypeParameter, KotlinValueParameter,
};

/// Resets every reference slot filled by reference initialization.
///
/// Hierarchy links are left alone; they belong to the hierarchy initializer.
pub fn clear_references(class: &mut Class) {
    for member in class.fields.iter_mut().chain(class.methods.iter_mut()) {
        member.referenced_classes.clear();
        clear_attributes(&mut member.attributes);
    }
    if let ClassBody::Program(body) = &mut class.body {
        for (_, constant) in body.constant_pool.iter_mut() {
            clear_constant(constant);
        }
        clear_attributes(&mut body.attributes);
    }
    if let Some(metadata) = &mut class.kotlin_metadata {
        clear_kotlin(metadata);
    }
}

fn clear_constant(constant: &mut Constant) {
    match constant {
        Constant::String(string) => string.java_lang_string = None,
        Constant::Class(class) => {
            class.referenced_class = None;
            class.java_lang_class = None;
        }
        Constant::FieldRef(reference)
        | Constant::MethodRef(reference)
        | Constant::InterfaceMethodRef(reference) => {
            reference.referenced_class = None;
            reference.referenced_member = None;
        }
        Constant::MethodHandle(handle) => handle.java_lang_invoke_method_handle = None,
        Constant::MethodType(method_type) => {
            method_type.referenced_classes.clear();
            method_type.java_lang_invoke_method_type = None;
        }
        Constant::Dynamic(dynamic) | Constant::InvokeDynamic(dynamic) => {
            dynamic.referenced_classes.clear();
        }
        _ => {}
    }
}

fn clear_attributes(attributes: &mut [Attribute]) {
    for attribute in attributes {
        match attribute {
            Attribute::Code(code) => clear_attributes(&mut code.attributes),
            Attribute::Signature(signature) => signature.referenced_classes.clear(),
            Attribute::EnclosingMethod(enclosing) => {
                enclosing.referenced_class = None;
                enclosing.referenced_method = None;
            }
            Attribute::Record(record) => {
                for component in &mut record.components {
                    component.referenced_field = None;
                    clear_attributes(&mut component.attributes);
                }
            }
            Attribute::LocalVariableTable(variables) => {
                for variable in variables {
                    variable.referenced_class = None;
                }
            }
            Attribute::LocalVariableTypeTable(types) => {
                for variable in types {
                    variable.referenced_classes.clear();
                }
            }
            Attribute::Annotations { annotations, .. } => {
                annotations.iter_mut().for_each(clear_annotation);
            }
            Attribute::ParameterAnnotations { parameters, .. } => {
                parameters.iter_mut().flatten().for_each(clear_annotation);
            }
            Attribute::TypeAnnotations { annotations, .. } => {
                for type_annotation in annotations {
                    clear_annotation(&mut type_annotation.annotation);
                }
            }
            Attribute::AnnotationDefault(value) => clear_element_value(value),
            Attribute::NestHost { .. }
            | Attribute::NestMembers { .. }
            | Attribute::Exceptions { .. }
            | Attribute::Unknown { .. } => {}
        }
    }
}

fn clear_annotation(annotation: &mut Annotation) {
    annotation.referenced_classes.clear();
    for element in &mut annotation.elements {
        element.referenced_method = None;
        clear_element_value(&mut element.value);
    }
}

fn clear_element_value(value: &mut ElementValue) {
    match value {
        ElementValue::Const { .. } => {}
        ElementValue::Enum {
            referenced_classes,
            referenced_field,
            ..
        } => {
            referenced_classes.clear();
            *referenced_field = None;
        }
        ElementValue::Class {
            referenced_classes, ..
        } => referenced_classes.clear(),
        ElementValue::Annotation(annotation) => clear_annotation(annotation),
        ElementValue::Array(values) => values.iter_mut().for_each(clear_element_value),
    }
}

fn clear_kotlin(metadata: &mut KotlinMetadata) {
    match metadata {
        KotlinMetadata::Class(class) => {
            class.referenced_class = None;
            class.referenced_companion_class = None;
            class.referenced_companion_field = None;
            class.referenced_nested_classes.clear();
            class.referenced_enum_entries.clear();
            class.referenced_sealed_subclasses.clear();
            class.referenced_default_impls_class = None;
            class.type_parameters.iter_mut().for_each(clear_type_parameter);
            class.supertypes.iter_mut().for_each(clear_type);
            for constructor in &mut class.constructors {
                constructor.referenced_method = None;
                constructor.value_parameters.iter_mut().for_each(clear_value_parameter);
            }
            clear_declarations(&mut class.declarations);
        }
        KotlinMetadata::File(file) => clear_declarations(&mut file.declarations),
        KotlinMetadata::SyntheticClass(synthetic) => {
            synthetic.functions.iter_mut().for_each(clear_function);
        }
        KotlinMetadata::MultiFileFacade(facade) => facade.referenced_part_classes.clear(),
        KotlinMetadata::MultiFilePart(part) => {
            part.referenced_facade_class = None;
            clear_declarations(&mut part.declarations);
        }
    }
}

fn clear_declarations(declarations: &mut KotlinDeclarationContainer) {
    declarations.functions.iter_mut().for_each(clear_function);
    for property in &mut declarations.properties {
        property.referenced_backing_field = None;
        property.referenced_getter = None;
        property.referenced_setter = None;
        property.referenced_synthetic_annotations_method = None;
        property.type_parameters.iter_mut().for_each(clear_type_parameter);
        property.receiver_type.iter_mut().for_each(clear_type);
        clear_type(&mut property.property_type);
        property.setter_parameters.iter_mut().for_each(clear_value_parameter);
    }
    for alias in &mut declarations.type_aliases {
        alias.referenced_declaration_container = None;
        alias.type_parameters.iter_mut().for_each(clear_type_parameter);
        clear_type(&mut alias.underlying_type);
        clear_type(&mut alias.expanded_type);
        alias.annotations.iter_mut().for_each(clear_kotlin_annotation);
    }
}

fn clear_function(function: &mut KotlinFunction) {
    function.referenced_method = None;
    function.referenced_default_method = None;
    function.referenced_default_impls_method = None;
    function.referenced_lambda_class_origin = None;
    function.type_parameters.iter_mut().for_each(clear_type_parameter);
    function.receiver_type.iter_mut().for_each(clear_type);
    function.value_parameters.iter_mut().for_each(clear_value_parameter);
    clear_type(&mut function.return_type);
}

fn clear_value_parameter(parameter: &mut KotlinValueParameter) {
    clear_type(&mut parameter.parameter_type);
    parameter.vararg_element_type.iter_mut().for_each(clear_type);
}

fn clear_type_parameter(parameter: &mut KotlinTypeParameter) {
    parameter.upper_bounds.iter_mut().for_each(clear_type);
    parameter.annotations.iter_mut().for_each(clear_kotlin_annotation);
}

fn clear_type(kotlin_type: &mut KotlinType) {
    kotlin_type.referenced_class = None;
    kotlin_type.referenced_type_alias = None;
    kotlin_type.arguments.iter_mut().flatten().for_each(clear_type);
    if let Some(outer) = &mut kotlin_type.outer_type {
        clear_type(outer);
    }
    if let Some(abbreviation) = &mut kotlin_type.abbreviation {
        clear_type(abbreviation);
    }
    kotlin_type.annotations.iter_mut().for_each(clear_kotlin_annotation);
}

fn clear_kotlin_annotation(annotation: &mut KotlinAnnotation) {
    annotation.referenced_class = None;
    annotation.referenced_argument_methods.clear();
}
