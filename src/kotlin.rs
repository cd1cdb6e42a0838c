//! Kotlin metadata tree attached to classes compiled by kotlinc.
//!
//! The tree arrives already decoded. Names use Kotlin's notation (`com/example/Outer.Inner`,
//! `kotlin/Any`); the reference initializer maps them onto JVM classes and members and stores
//! the results in the `referenced_*` slots.

use crate::ir::{ClassId, MemberId};

#[derive(Clone, Debug, PartialEq)]
pub enum KotlinMetadata {
    Class(KotlinClassMetadata),
    File(KotlinFileMetadata),
    SyntheticClass(KotlinSyntheticClassMetadata),
    MultiFileFacade(KotlinMultiFileFacadeMetadata),
    MultiFilePart(KotlinMultiFilePartMetadata),
}

impl KotlinMetadata {
    /// Functions, properties, and type aliases declared by this metadata, if it has any.
    pub fn declarations(&self) -> Option<&KotlinDeclarationContainer> {
        match self {
            KotlinMetadata::Class(metadata) => Some(&metadata.declarations),
            KotlinMetadata::File(metadata) => Some(&metadata.declarations),
            KotlinMetadata::MultiFilePart(metadata) => Some(&metadata.declarations),
            KotlinMetadata::SyntheticClass(_) | KotlinMetadata::MultiFileFacade(_) => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KotlinDeclarationContainer {
    pub functions: Vec<KotlinFunction>,
    pub properties: Vec<KotlinProperty>,
    pub type_aliases: Vec<KotlinTypeAlias>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KotlinClassMetadata {
    pub class_name: String,
    pub is_interface: bool,
    pub type_parameters: Vec<KotlinTypeParameter>,
    pub supertypes: Vec<KotlinType>,
    pub constructors: Vec<KotlinConstructor>,
    pub companion_object_name: Option<String>,
    pub nested_class_names: Vec<String>,
    pub enum_entry_names: Vec<String>,
    pub sealed_subclass_names: Vec<String>,
    pub declarations: KotlinDeclarationContainer,

    pub referenced_class: Option<ClassId>,
    pub referenced_companion_class: Option<ClassId>,
    pub referenced_companion_field: Option<MemberId>,
    pub referenced_nested_classes: Vec<Option<ClassId>>,
    pub referenced_enum_entries: Vec<Option<MemberId>>,
    pub referenced_sealed_subclasses: Vec<Option<ClassId>>,
    pub referenced_default_impls_class: Option<ClassId>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KotlinFileMetadata {
    pub declarations: KotlinDeclarationContainer,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SyntheticClassKind {
    #[default]
    Regular,
    Lambda,
    WhenMappings,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KotlinSyntheticClassMetadata {
    pub kind: SyntheticClassKind,
    pub functions: Vec<KotlinFunction>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KotlinMultiFileFacadeMetadata {
    pub part_class_names: Vec<String>,
    pub referenced_part_classes: Vec<Option<ClassId>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KotlinMultiFilePartMetadata {
    pub facade_name: String,
    pub declarations: KotlinDeclarationContainer,
    pub referenced_facade_class: Option<ClassId>,
}

/// JVM name and descriptor recorded for a Kotlin declaration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JvmSignature {
    pub name: String,
    pub descriptor: String,
}

impl JvmSignature {
    pub fn new(name: &str, descriptor: &str) -> Self {
        Self {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KotlinFunction {
    pub name: String,
    pub jvm_signature: Option<JvmSignature>,
    pub type_parameters: Vec<KotlinTypeParameter>,
    pub receiver_type: Option<KotlinType>,
    pub value_parameters: Vec<KotlinValueParameter>,
    pub return_type: KotlinType,
    pub lambda_class_origin_name: Option<String>,

    pub referenced_method: Option<MemberId>,
    pub referenced_default_method: Option<MemberId>,
    pub referenced_default_impls_method: Option<MemberId>,
    pub referenced_lambda_class_origin: Option<ClassId>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KotlinProperty {
    pub name: String,
    pub type_parameters: Vec<KotlinTypeParameter>,
    pub receiver_type: Option<KotlinType>,
    pub property_type: KotlinType,
    pub setter_parameters: Vec<KotlinValueParameter>,
    pub backing_field_signature: Option<JvmSignature>,
    pub getter_signature: Option<JvmSignature>,
    pub setter_signature: Option<JvmSignature>,
    pub synthetic_method_for_annotations: Option<JvmSignature>,

    pub referenced_backing_field: Option<MemberId>,
    pub referenced_getter: Option<MemberId>,
    pub referenced_setter: Option<MemberId>,
    pub referenced_synthetic_annotations_method: Option<MemberId>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KotlinConstructor {
    pub jvm_signature: Option<JvmSignature>,
    pub value_parameters: Vec<KotlinValueParameter>,
    pub referenced_method: Option<MemberId>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KotlinValueParameter {
    pub name: String,
    pub declares_default_value: bool,
    pub parameter_type: KotlinType,
    pub vararg_element_type: Option<KotlinType>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum KotlinClassifier {
    Class(String),
    TypeParameter(u32),
    TypeAlias(String),
}

impl Default for KotlinClassifier {
    fn default() -> Self {
        KotlinClassifier::Class("kotlin/Any".to_string())
    }
}

/// Location of a type alias: the class whose metadata declares it and its position there.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct TypeAliasRef {
    pub class: ClassId,
    pub index: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KotlinType {
    pub classifier: KotlinClassifier,
    pub is_nullable: bool,
    /// Type arguments; `None` is a star projection.
    pub arguments: Vec<Option<KotlinType>>,
    pub outer_type: Option<Box<KotlinType>>,
    pub abbreviation: Option<Box<KotlinType>>,
    pub annotations: Vec<KotlinAnnotation>,

    pub referenced_class: Option<ClassId>,
    pub referenced_type_alias: Option<TypeAliasRef>,
}

impl KotlinType {
    pub fn class(name: &str) -> Self {
        Self {
            classifier: KotlinClassifier::Class(name.to_string()),
            ..Self::default()
        }
    }

    pub fn type_alias(name: &str) -> Self {
        Self {
            classifier: KotlinClassifier::TypeAlias(name.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KotlinTypeParameter {
    pub name: String,
    pub id: u32,
    pub upper_bounds: Vec<KotlinType>,
    pub annotations: Vec<KotlinAnnotation>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KotlinTypeAlias {
    pub name: String,
    pub type_parameters: Vec<KotlinTypeParameter>,
    pub underlying_type: KotlinType,
    pub expanded_type: KotlinType,
    pub annotations: Vec<KotlinAnnotation>,
    pub referenced_declaration_container: Option<ClassId>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KotlinAnnotation {
    pub class_name: String,
    pub argument_names: Vec<String>,
    pub referenced_class: Option<ClassId>,
    pub referenced_argument_methods: Vec<Option<MemberId>>,
}
