use crate::ir::{ClassId, MemberId};

/// Attribute of a program class, member, record component, or code attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum Attribute {
    Code(CodeAttribute),
    Signature(SignatureAttribute),
    EnclosingMethod(EnclosingMethodAttribute),
    NestHost {
        host_class_index: u16,
    },
    NestMembers {
        class_indices: Vec<u16>,
    },
    Record(RecordAttribute),
    LocalVariableTable(Vec<LocalVariable>),
    LocalVariableTypeTable(Vec<LocalVariableType>),
    Annotations {
        visible: bool,
        annotations: Vec<Annotation>,
    },
    ParameterAnnotations {
        visible: bool,
        parameters: Vec<Vec<Annotation>>,
    },
    TypeAnnotations {
        visible: bool,
        annotations: Vec<TypeAnnotation>,
    },
    AnnotationDefault(ElementValue),
    Exceptions {
        class_indices: Vec<u16>,
    },
    Unknown {
        name: String,
        info: Vec<u8>,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionHandler>,
    pub attributes: Vec<Attribute>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExceptionHandler {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// Class constant index, 0 for catch-all handlers.
    pub catch_type: u16,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SignatureAttribute {
    pub signature_index: u16,
    pub referenced_classes: Vec<Option<ClassId>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnclosingMethodAttribute {
    pub class_index: u16,
    /// Name-and-type index, 0 when the class is not enclosed by a method.
    pub method_index: u16,
    pub referenced_class: Option<ClassId>,
    pub referenced_method: Option<MemberId>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordAttribute {
    pub components: Vec<RecordComponent>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordComponent {
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<Attribute>,
    pub referenced_field: Option<MemberId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LocalVariable {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub index: u16,
    pub referenced_class: Option<ClassId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LocalVariableType {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub signature_index: u16,
    pub index: u16,
    pub referenced_classes: Vec<Option<ClassId>>,
}

/// Annotation whose type is a field descriptor in the constant pool.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub type_index: u16,
    pub elements: Vec<ElementValuePair>,
    pub referenced_classes: Vec<Option<ClassId>>,
}

impl Annotation {
    pub fn new(type_index: u16) -> Self {
        Self {
            type_index,
            elements: Vec::new(),
            referenced_classes: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeAnnotation {
    pub target_type: u8,
    pub annotation: Annotation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ElementValuePair {
    pub name_index: u16,
    pub value: ElementValue,
    /// Annotation interface method named by the element.
    pub referenced_method: Option<MemberId>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ElementValue {
    Const {
        tag: u8,
        const_value_index: u16,
    },
    Enum {
        type_name_index: u16,
        const_name_index: u16,
        referenced_classes: Vec<Option<ClassId>>,
        referenced_field: Option<MemberId>,
    },
    Class {
        class_info_index: u16,
        referenced_classes: Vec<Option<ClassId>>,
    },
    Annotation(Box<Annotation>),
    Array(Vec<ElementValue>),
}

/// Finds the code attribute in a member's attribute list.
pub fn code_attribute(attributes: &[Attribute]) -> Option<&CodeAttribute> {
    attributes.iter().find_map(|attribute| match attribute {
        Attribute::Code(code) => Some(code),
        _ => None,
    })
}

/// Finds the nest host class index in a class's attribute list.
pub fn nest_host_index(attributes: &[Attribute]) -> Option<u16> {
    attributes.iter().find_map(|attribute| match attribute {
        Attribute::NestHost { host_class_index } => Some(*host_class_index),
        _ => None,
    })
}
