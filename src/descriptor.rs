use std::str::FromStr;

use anyhow::{Context, Result};
use jdescriptor::{MethodDescriptor, TypeDescriptor};

pub const JAVA_LANG_OBJECT: &str = "java/lang/Object";
pub const JAVA_LANG_STRING: &str = "java/lang/String";
pub const JAVA_LANG_CLASS: &str = "java/lang/Class";
pub const JAVA_LANG_INVOKE_METHOD_HANDLE: &str = "java/lang/invoke/MethodHandle";
pub const JAVA_LANG_INVOKE_METHOD_TYPE: &str = "java/lang/invoke/MethodType";

pub const METHOD_NAME_INIT: &str = "<init>";
pub const METHOD_NAME_CLINIT: &str = "<clinit>";

/// Count parameters in a JVM method descriptor.
pub fn method_param_count(descriptor: &str) -> Result<usize> {
    let descriptor =
        MethodDescriptor::from_str(descriptor).context("parse method descriptor")?;
    Ok(descriptor.parameter_types().len())
}

/// Return kind of a JVM method descriptor.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReturnKind {
    Void,
    Primitive,
    Reference,
}

/// Determine the return kind from a JVM method descriptor.
pub fn method_return_kind(descriptor: &str) -> Result<ReturnKind> {
    let descriptor =
        MethodDescriptor::from_str(descriptor).context("parse method descriptor")?;
    let kind = match descriptor.return_type() {
        TypeDescriptor::Void => ReturnKind::Void,
        TypeDescriptor::Object(_) | TypeDescriptor::Array(_, _) => ReturnKind::Reference,
        _ => ReturnKind::Primitive,
    };
    Ok(kind)
}

/// Text of each parameter type and of the return type, for rebuilding descriptors.
pub fn split_method_descriptor(descriptor: &str) -> Result<(Vec<&str>, &str)> {
    MethodDescriptor::from_str(descriptor).context("parse method descriptor")?;
    let body = descriptor
        .strip_prefix('(')
        .context("method descriptor must start with '('")?;
    let close = body.find(')').context("method descriptor has no ')'")?;
    let (params, return_type) = (&body[..close], &body[close + 1..]);
    let mut types = Vec::new();
    let mut rest = params;
    while !rest.is_empty() {
        let length = field_type_length(rest)?;
        types.push(&rest[..length]);
        rest = &rest[length..];
    }
    Ok((types, return_type))
}

fn field_type_length(descriptor: &str) -> Result<usize> {
    let dimensions = descriptor.len() - descriptor.trim_start_matches('[').len();
    match descriptor.as_bytes().get(dimensions) {
        Some(b'L') => {
            let end = descriptor[dimensions..]
                .find(';')
                .context("unterminated class type")?;
            Ok(dimensions + end + 1)
        }
        Some(_) => Ok(dimensions + 1),
        None => anyhow::bail!("missing element type in {descriptor}"),
    }
}

/// Class names referenced by a field or method descriptor, in order of appearance.
pub fn descriptor_class_names(descriptor: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    if descriptor.starts_with('(') {
        let parsed =
            MethodDescriptor::from_str(descriptor).context("parse method descriptor")?;
        for parameter in parsed.parameter_types().iter() {
            collect_class_names(parameter, &mut names);
        }
        match parsed.return_type() {
            TypeDescriptor::Object(class) => names.push(class.as_str().to_string()),
            TypeDescriptor::Array(element, _) => collect_class_names(&element, &mut names),
            _ => {}
        }
    } else {
        // A field type parses as the single parameter of a void method.
        let parsed = MethodDescriptor::from_str(&format!("({descriptor})V"))
            .with_context(|| format!("parse field descriptor {descriptor}"))?;
        if parsed.parameter_types().len() != 1 {
            anyhow::bail!("field descriptor {descriptor} names more than one type");
        }
        for parameter in parsed.parameter_types().iter() {
            collect_class_names(parameter, &mut names);
        }
    }
    Ok(names)
}

fn collect_class_names(descriptor: &TypeDescriptor, names: &mut Vec<String>) {
    match descriptor {
        TypeDescriptor::Object(class) => names.push(class.as_str().to_string()),
        TypeDescriptor::Array(element, _) => collect_class_names(element, names),
        _ => {}
    }
}

/// Shape of a generic signature string.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignatureKind {
    Class,
    Method,
    Field,
}

/// Class names referenced by a generic signature, in order of appearance.
pub fn signature_class_names(kind: SignatureKind, signature: &str) -> Result<Vec<String>> {
    let mut parser = SignatureParser::new(signature);
    match kind {
        SignatureKind::Class => {
            parser.class_signature()?;
        }
        SignatureKind::Method => parser.method_signature()?,
        SignatureKind::Field => parser.field_signature()?,
    }
    Ok(parser.names)
}

/// Erased supertypes encoded in a class signature.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClassSignature {
    pub super_name: String,
    pub interface_names: Vec<String>,
}

pub fn parse_class_signature(signature: &str) -> Result<ClassSignature> {
    let mut parser = SignatureParser::new(signature);
    parser
        .class_signature()
        .with_context(|| format!("parse class signature {signature}"))
}

struct SignatureParser<'a> {
    input: &'a str,
    pos: usize,
    names: Vec<String>,
}

impl<'a> SignatureParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            names: Vec::new(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn expect(&mut self, expected: u8) -> Result<()> {
        match self.peek() {
            Some(actual) if actual == expected => {
                self.pos += 1;
                Ok(())
            }
            _ => anyhow::bail!(
                "expected '{}' at {} in {}",
                expected as char,
                self.pos,
                self.input
            ),
        }
    }

    fn finish(&self) -> Result<()> {
        if self.pos != self.input.len() {
            anyhow::bail!("trailing characters at {} in {}", self.pos, self.input);
        }
        Ok(())
    }

    fn identifier(&mut self, delimiters: &[u8]) -> Result<&'a str> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if delimiters.contains(&byte) {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos {
            anyhow::bail!("empty identifier at {} in {}", start, self.input);
        }
        Ok(&self.input[start..self.pos])
    }

    fn class_signature(&mut self) -> Result<ClassSignature> {
        self.type_parameters()?;
        let super_name = self.class_type()?;
        let mut interface_names = Vec::new();
        while self.peek().is_some() {
            interface_names.push(self.class_type()?);
        }
        Ok(ClassSignature {
            super_name,
            interface_names,
        })
    }

    fn method_signature(&mut self) -> Result<()> {
        self.type_parameters()?;
        self.expect(b'(')?;
        while self.peek() != Some(b')') {
            self.java_type()?;
        }
        self.expect(b')')?;
        if self.peek() == Some(b'V') {
            self.pos += 1;
        } else {
            self.java_type()?;
        }
        while self.peek() == Some(b'^') {
            self.pos += 1;
            if self.peek() == Some(b'T') {
                self.type_variable()?;
            } else {
                self.class_type()?;
            }
        }
        self.finish()
    }

    fn field_signature(&mut self) -> Result<()> {
        self.java_type()?;
        self.finish()
    }

    fn type_parameters(&mut self) -> Result<()> {
        if self.peek() != Some(b'<') {
            return Ok(());
        }
        self.pos += 1;
        loop {
            self.identifier(b":")?;
            self.expect(b':')?;
            if matches!(self.peek(), Some(b'L' | b'T' | b'[')) {
                self.reference_type()?;
            }
            while self.peek() == Some(b':') {
                self.pos += 1;
                self.reference_type()?;
            }
            if self.peek() == Some(b'>') {
                break;
            }
        }
        self.expect(b'>')
    }

    fn java_type(&mut self) -> Result<()> {
        match self.peek() {
            Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z') => {
                self.pos += 1;
                Ok(())
            }
            Some(b'L' | b'T' | b'[') => self.reference_type(),
            _ => anyhow::bail!("invalid type at {} in {}", self.pos, self.input),
        }
    }

    fn reference_type(&mut self) -> Result<()> {
        match self.peek() {
            Some(b'L') => self.class_type().map(|_| ()),
            Some(b'T') => self.type_variable(),
            Some(b'[') => {
                self.pos += 1;
                self.java_type()
            }
            _ => anyhow::bail!("invalid reference type at {} in {}", self.pos, self.input),
        }
    }

    fn type_variable(&mut self) -> Result<()> {
        self.expect(b'T')?;
        self.identifier(b";")?;
        self.expect(b';')
    }

    /// Parses `Lpkg/Outer<..>.Inner<..>;` and returns the erased name `pkg/Outer$Inner`.
    fn class_type(&mut self) -> Result<String> {
        self.expect(b'L')?;
        let mut name = self.identifier(b"<.;")?.to_string();
        self.names.push(name.clone());
        if self.peek() == Some(b'<') {
            self.type_arguments()?;
        }
        while self.peek() == Some(b'.') {
            self.pos += 1;
            let inner = self.identifier(b"<.;")?;
            name = format!("{name}${inner}");
            self.names.push(name.clone());
            if self.peek() == Some(b'<') {
                self.type_arguments()?;
            }
        }
        self.expect(b';')?;
        Ok(name)
    }

    fn type_arguments(&mut self) -> Result<()> {
        self.expect(b'<')?;
        while self.peek() != Some(b'>') {
            match self.peek() {
                Some(b'*') => self.pos += 1,
                Some(b'+' | b'-') => {
                    self.pos += 1;
                    self.reference_type()?;
                }
                Some(_) => self.reference_type()?,
                None => anyhow::bail!("unterminated type arguments in {}", self.input),
            }
        }
        self.expect(b'>')
    }
}

pub fn is_array_name(name: &str) -> bool {
    name.starts_with('[')
}

/// Element class of an array type name, or `None` for primitive element types.
pub fn array_element_class(name: &str) -> Option<&str> {
    let element = name.trim_start_matches('[');
    element.strip_prefix('L').and_then(|rest| rest.strip_suffix(';'))
}

pub fn package_name(class_name: &str) -> &str {
    class_name
        .rfind('/')
        .map(|index| &class_name[..index])
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_class_names_keeps_positional_order() {
        let names = descriptor_class_names("(ILjava/lang/String;[Lcom/example/Foo;[J)Ljava/util/List;")
            .expect("names");
        assert_eq!(
            names,
            vec!["java/lang/String", "com/example/Foo", "java/util/List"]
        );
        assert!(descriptor_class_names("[I").expect("names").is_empty());
        assert!(descriptor_class_names("(IJ)V").expect("names").is_empty());
    }

    #[test]
    fn signature_class_names_include_type_arguments() {
        let names = signature_class_names(
            SignatureKind::Field,
            "Ljava/util/Map<Ljava/lang/String;Ljava/util/List<+Lcom/example/Foo;>;>;",
        )
        .expect("names");
        assert_eq!(
            names,
            vec![
                "java/util/Map",
                "java/lang/String",
                "java/util/List",
                "com/example/Foo"
            ]
        );
    }

    #[test]
    fn class_signature_reports_erased_supertypes() {
        let signature = parse_class_signature(
            "<T:Ljava/lang/Object;>Lcom/example/Base<TT;>;Ljava/lang/Comparable<TT;>;",
        )
        .expect("signature");
        assert_eq!(signature.super_name, "com/example/Base");
        assert_eq!(signature.interface_names, vec!["java/lang/Comparable"]);
    }

    #[test]
    fn inner_class_types_are_joined_with_dollar() {
        let names =
            signature_class_names(SignatureKind::Field, "Lcom/example/Outer<TT;>.Inner;")
                .expect("names");
        assert_eq!(names, vec!["com/example/Outer", "com/example/Outer$Inner"]);
    }

    #[test]
    fn method_signature_rejects_garbage() {
        assert!(signature_class_names(SignatureKind::Method, "(Ljava/lang/String").is_err());
        assert!(signature_class_names(SignatureKind::Method, "<T:>(TT;)V").is_ok());
        assert!(signature_class_names(SignatureKind::Field, "Q").is_err());
    }

    #[test]
    fn split_method_descriptor_returns_each_parameter() {
        let (params, return_type) =
            split_method_descriptor("(I[JLjava/lang/String;)[Ljava/lang/Object;").expect("split");
        assert_eq!(params, vec!["I", "[J", "Ljava/lang/String;"]);
        assert_eq!(return_type, "[Ljava/lang/Object;");
        assert_eq!(method_param_count("(I[JLjava/lang/String;)V").expect("count"), 3);
        assert!(split_method_descriptor("(I").is_err());
    }

    #[test]
    fn method_return_kind_distinguishes_references() {
        assert_eq!(method_return_kind("()V").expect("kind"), ReturnKind::Void);
        assert_eq!(method_return_kind("(I)J").expect("kind"), ReturnKind::Primitive);
        assert_eq!(
            method_return_kind("()[Ljava/lang/String;").expect("kind"),
            ReturnKind::Reference
        );
    }

    #[test]
    fn descriptor_class_names_rejects_malformed_field_types() {
        assert!(descriptor_class_names("Ljava/lang/String").is_err());
        assert!(descriptor_class_names("II").is_err());
        assert_eq!(
            descriptor_class_names("[[Lcom/example/Foo;").expect("names"),
            vec!["com/example/Foo"]
        );
    }

    #[test]
    fn array_element_class_skips_primitives() {
        assert_eq!(array_element_class("[[Lcom/example/Foo;"), Some("com/example/Foo"));
        assert_eq!(array_element_class("[I"), None);
        assert_eq!(package_name("com/example/Foo"), "com/example");
        assert_eq!(package_name("Foo"), "");
    }
}
