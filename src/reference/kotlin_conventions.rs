//! Naming conventions kotlinc uses when it lowers declarations onto the JVM.

use anyhow::Result;

use crate::descriptor::{JAVA_LANG_OBJECT, package_name, split_method_descriptor};

/// Kotlin builtin classes that exist on the JVM under a platform name.
const BUILTIN_CLASSES: &[(&str, &str)] = &[
    ("kotlin/Any", "java/lang/Object"),
    ("kotlin/Nothing", "java/lang/Void"),
    ("kotlin/String", "java/lang/String"),
    ("kotlin/CharSequence", "java/lang/CharSequence"),
    ("kotlin/Throwable", "java/lang/Throwable"),
    ("kotlin/Cloneable", "java/lang/Cloneable"),
    ("kotlin/Number", "java/lang/Number"),
    ("kotlin/Comparable", "java/lang/Comparable"),
    ("kotlin/Enum", "java/lang/Enum"),
    ("kotlin/Annotation", "java/lang/annotation/Annotation"),
    ("kotlin/Boolean", "java/lang/Boolean"),
    ("kotlin/Char", "java/lang/Character"),
    ("kotlin/Byte", "java/lang/Byte"),
    ("kotlin/Short", "java/lang/Short"),
    ("kotlin/Int", "java/lang/Integer"),
    ("kotlin/Long", "java/lang/Long"),
    ("kotlin/Float", "java/lang/Float"),
    ("kotlin/Double", "java/lang/Double"),
    ("kotlin/collections/Iterable", "java/lang/Iterable"),
    ("kotlin/collections/MutableIterable", "java/lang/Iterable"),
    ("kotlin/collections/Iterator", "java/util/Iterator"),
    ("kotlin/collections/MutableIterator", "java/util/Iterator"),
    ("kotlin/collections/Collection", "java/util/Collection"),
    ("kotlin/collections/MutableCollection", "java/util/Collection"),
    ("kotlin/collections/List", "java/util/List"),
    ("kotlin/collections/MutableList", "java/util/List"),
    ("kotlin/collections/ListIterator", "java/util/ListIterator"),
    ("kotlin/collections/MutableListIterator", "java/util/ListIterator"),
    ("kotlin/collections/Set", "java/util/Set"),
    ("kotlin/collections/MutableSet", "java/util/Set"),
    ("kotlin/collections/Map", "java/util/Map"),
    ("kotlin/collections/MutableMap", "java/util/Map"),
    ("kotlin/collections/Map.Entry", "java/util/Map$Entry"),
    ("kotlin/collections/MutableMap.MutableEntry", "java/util/Map$Entry"),
];

pub(crate) const DEFAULT_IMPLS_SUFFIX: &str = "$DefaultImpls";
pub(crate) const DEFAULT_METHOD_SUFFIX: &str = "$default";
pub(crate) const LAMBDA_FUNCTION_NAME: &str = "<anonymous>";
pub(crate) const LAMBDA_INVOKE_METHOD: &str = "invoke";

/// JVM internal name for a Kotlin class name.
///
/// Builtins map to their platform classes. Nested classes use `.` in Kotlin and `$` on the
/// JVM; local classes carry a leading `.` that has no JVM counterpart.
pub(crate) fn jvm_class_name(kotlin_name: &str) -> String {
    if let Some((_, jvm)) = BUILTIN_CLASSES
        .iter()
        .find(|(kotlin, _)| *kotlin == kotlin_name)
    {
        return jvm.to_string();
    }
    kotlin_name.trim_start_matches('.').replace('.', "$")
}

pub(crate) fn default_impls_class_name(interface_name: &str) -> String {
    format!("{interface_name}{DEFAULT_IMPLS_SUFFIX}")
}

pub(crate) fn default_method_name(name: &str) -> String {
    format!("{name}{DEFAULT_METHOD_SUFFIX}")
}

/// Descriptor of the static `$default` bridge for a function with default arguments.
///
/// The bridge takes the dispatch receiver first when there is one, then the original
/// parameters, one `int` mask per 32 value parameters, and a trailing marker object. An
/// extension receiver is part of `descriptor` but not a value parameter, so it never adds a
/// mask.
pub(crate) fn default_method_descriptor(
    receiver: Option<&str>,
    descriptor: &str,
    value_parameters: usize,
) -> Result<String> {
    let (parameters, return_type) = split_method_descriptor(descriptor)?;
    let masks = value_parameters.div_ceil(32).max(1);
    let mut result = String::from("(");
    if let Some(receiver) = receiver {
        result.push_str(&format!("L{receiver};"));
    }
    for parameter in &parameters {
        result.push_str(parameter);
    }
    result.push_str(&"I".repeat(masks));
    result.push_str(&format!("L{JAVA_LANG_OBJECT};)"));
    result.push_str(return_type);
    Ok(result)
}

/// Descriptor of the static `$DefaultImpls` body for an interface method.
pub(crate) fn default_impls_descriptor(interface_name: &str, descriptor: &str) -> Result<String> {
    let (parameters, return_type) = split_method_descriptor(descriptor)?;
    Ok(format!(
        "(L{interface_name};{}){return_type}",
        parameters.concat()
    ))
}

/// Name of the JVM method implementing a function of a synthetic lambda class.
pub(crate) fn lambda_method_name(name: &str) -> &str {
    if name == LAMBDA_FUNCTION_NAME {
        LAMBDA_INVOKE_METHOD
    } else {
        name
    }
}

/// Kotlin name under which a top-level type alias declared in `container_class` is used.
pub(crate) fn type_alias_key(container_class: &str, alias_name: &str) -> String {
    let package = package_name(container_class);
    if package.is_empty() {
        alias_name.to_string()
    } else {
        format!("{package}/{alias_name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jvm_class_name_maps_builtins_and_nesting() {
        assert_eq!(jvm_class_name("kotlin/Any"), "java/lang/Object");
        assert_eq!(jvm_class_name("kotlin/collections/Map.Entry"), "java/util/Map$Entry");
        assert_eq!(jvm_class_name("com/example/Outer.Inner"), "com/example/Outer$Inner");
        assert_eq!(jvm_class_name(".com/example/Local"), "com/example/Local");
    }

    #[test]
    fn default_method_descriptor_adds_receiver_masks_and_marker() {
        assert_eq!(
            default_method_descriptor(Some("com/example/Foo"), "(ILjava/lang/String;)V", 2)
                .expect("descriptor"),
            "(Lcom/example/Foo;ILjava/lang/String;ILjava/lang/Object;)V"
        );
        assert_eq!(
            default_method_descriptor(None, "(J)I", 1).expect("descriptor"),
            "(JILjava/lang/Object;)I"
        );
        let many = format!("({})V", "I".repeat(33));
        let expected = format!("({}IILjava/lang/Object;)V", "I".repeat(33));
        assert_eq!(
            default_method_descriptor(None, &many, 33).expect("descriptor"),
            expected
        );
    }

    #[test]
    fn default_method_masks_count_value_parameters_only() {
        // Extension receiver plus 32 value parameters still fits one mask.
        let extension = format!("(Ljava/lang/String;{})V", "I".repeat(32));
        let expected = format!("(Ljava/lang/String;{}ILjava/lang/Object;)V", "I".repeat(32));
        assert_eq!(
            default_method_descriptor(None, &extension, 32).expect("descriptor"),
            expected
        );

        let interface = format!("({})V", "I".repeat(32));
        let expected = format!("(Lcom/example/Api;{}ILjava/lang/Object;)V", "I".repeat(32));
        assert_eq!(
            default_method_descriptor(Some("com/example/Api"), &interface, 32)
                .expect("descriptor"),
            expected
        );
    }

    #[test]
    fn default_impls_descriptor_prepends_interface() {
        assert_eq!(
            default_impls_descriptor("com/example/Api", "(I)Ljava/lang/String;")
                .expect("descriptor"),
            "(Lcom/example/Api;I)Ljava/lang/String;"
        );
        assert_eq!(default_impls_class_name("com/example/Api"), "com/example/Api$DefaultImpls");
    }

    #[test]
    fn type_alias_key_uses_container_package() {
        assert_eq!(type_alias_key("com/example/AliasesKt", "Name"), "com/example/Name");
        assert_eq!(type_alias_key("AliasesKt", "Name"), "Name");
        assert_eq!(lambda_method_name("<anonymous>"), "invoke");
    }
}
