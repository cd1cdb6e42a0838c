//! Byte-level class file reader for program classes: keeps the constant pool and every
//! attribute with its pool indices so references can be initialized in place.

use anyhow::{Context, Result};
use jclassfile::class_file;
use jclassfile::constant_pool::ConstantPool as RawConstant;
use jclassfile::fields::FieldFlags;
use jclassfile::methods::MethodFlags;

use crate::access::AccessFlags;
use crate::attribute::{
    Annotation, Attribute, CodeAttribute, ElementValue, ElementValuePair,
    EnclosingMethodAttribute, ExceptionHandler, LocalVariable, LocalVariableType,
    RecordAttribute, RecordComponent, SignatureAttribute, TypeAnnotation,
};
use crate::constant::{
    ClassConstant, Constant, ConstantPool, DynamicConstant, MethodHandleConstant,
    MethodTypeConstant, RefConstant, StringConstant,
};
use crate::ir::{Class, Member};

const MAGIC: u32 = 0xCAFE_BABE;

/// Parses class file bytes into a program class.
pub fn read_program_class(data: &[u8]) -> Result<Class> {
    let mut offset = 0usize;
    let magic = read_u32_class(data, &mut offset)?;
    if magic != MAGIC {
        anyhow::bail!("invalid class file magic");
    }
    let _minor = read_u16_class(data, &mut offset)?;
    let _major = read_u16_class(data, &mut offset)?;
    let pool = read_constant_pool(data, &mut offset).context("read constant pool")?;
    let access = AccessFlags::from_bits_retain(read_u16_class(data, &mut offset)?);
    let this_class = read_u16_class(data, &mut offset)?;
    let super_class = read_u16_class(data, &mut offset)?;

    let name = pool
        .class_name(this_class)
        .context("resolve class name")?
        .to_string();
    let super_name = match super_class {
        0 => None,
        index => Some(
            pool.class_name(index)
                .context("resolve super class name")?
                .to_string(),
        ),
    };
    let interface_count = read_u16_class(data, &mut offset)?;
    let mut interface_names = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        let index = read_u16_class(data, &mut offset)?;
        interface_names.push(pool.class_name(index).context("resolve interface name")?);
    }
    let interface_names: Vec<String> = interface_names.into_iter().map(str::to_string).collect();
    let fields = read_members(data, &mut offset, &pool).context("read fields")?;
    let methods = read_members(data, &mut offset, &pool).context("read methods")?;
    let attributes = read_attributes(data, &mut offset, &pool).context("read class attributes")?;

    let interfaces: Vec<&str> = interface_names.iter().map(String::as_str).collect();
    let mut class = Class::program(&name, access, super_name.as_deref(), &interfaces, pool);
    class.fields = fields;
    class.methods = methods;
    class.program_body_mut().attributes = attributes;
    Ok(class)
}

/// Parses class file bytes into a library class: names, flags, and members only.
///
/// Library classes go through `jclassfile`; classes it rejects for an attribute it does not
/// know are read by the byte-level reader instead.
pub fn read_library_class(data: &[u8]) -> Result<Class> {
    let class_file = match class_file::parse(data) {
        Ok(parsed) => parsed,
        Err(err) => {
            let message = format!("{err}");
            if message.contains("unmatched attribute") {
                return read_program_class(data)
                    .map(|program| to_library(&program))
                    .context("failed to parse library class bytes");
            }
            return Err(err).context("failed to parse library class bytes");
        }
    };
    let constant_pool = class_file.constant_pool();
    let name = resolve_class_name(constant_pool, class_file.this_class())
        .context("resolve class name")?;
    let super_name = match class_file.super_class() {
        0 => None,
        index => Some(
            resolve_class_name(constant_pool, index).context("resolve super class name")?,
        ),
    };
    let mut interface_names = Vec::new();
    for interface in class_file.interfaces() {
        interface_names
            .push(resolve_class_name(constant_pool, *interface).context("resolve interface name")?);
    }
    let access = read_class_access(data).context("read class access flags")?;

    let interfaces: Vec<&str> = interface_names.iter().map(String::as_str).collect();
    let mut class = Class::library(&name, access, super_name.as_deref(), &interfaces);
    for field in class_file.fields() {
        let name = resolve_utf8(constant_pool, field.name_index()).context("resolve field name")?;
        let descriptor = resolve_utf8(constant_pool, field.descriptor_index())
            .context("resolve field descriptor")?;
        class
            .fields
            .push(Member::new(name, descriptor, field_access(field.access_flags())));
    }
    for method in class_file.methods() {
        let name =
            resolve_utf8(constant_pool, method.name_index()).context("resolve method name")?;
        let descriptor = resolve_utf8(constant_pool, method.descriptor_index())
            .context("resolve method descriptor")?;
        class
            .methods
            .push(Member::new(name, descriptor, method_access(method.access_flags())));
    }
    Ok(class)
}

fn to_library(program: &Class) -> Class {
    let interfaces: Vec<&str> = program.interface_names.iter().map(String::as_str).collect();
    let mut class = Class::library(
        &program.name,
        program.access,
        program.super_name.as_deref(),
        &interfaces,
    );
    class.fields = strip_members(&program.fields);
    class.methods = strip_members(&program.methods);
    class
}

fn strip_members(members: &[Member]) -> Vec<Member> {
    members
        .iter()
        .map(|member| Member::new(&member.name, &member.descriptor, member.access))
        .collect()
}

fn field_access(flags: FieldFlags) -> AccessFlags {
    [
        (FieldFlags::ACC_PUBLIC, AccessFlags::PUBLIC),
        (FieldFlags::ACC_PRIVATE, AccessFlags::PRIVATE),
        (FieldFlags::ACC_PROTECTED, AccessFlags::PROTECTED),
        (FieldFlags::ACC_STATIC, AccessFlags::STATIC),
        (FieldFlags::ACC_FINAL, AccessFlags::FINAL),
    ]
    .into_iter()
    .filter(|(flag, _)| flags.contains(*flag))
    .fold(AccessFlags::empty(), |access, (_, bit)| access | bit)
}

fn method_access(flags: MethodFlags) -> AccessFlags {
    [
        (MethodFlags::ACC_PUBLIC, AccessFlags::PUBLIC),
        (MethodFlags::ACC_PRIVATE, AccessFlags::PRIVATE),
        (MethodFlags::ACC_PROTECTED, AccessFlags::PROTECTED),
        (MethodFlags::ACC_STATIC, AccessFlags::STATIC),
        (MethodFlags::ACC_FINAL, AccessFlags::FINAL),
        (MethodFlags::ACC_ABSTRACT, AccessFlags::ABSTRACT),
    ]
    .into_iter()
    .filter(|(flag, _)| flags.contains(*flag))
    .fold(AccessFlags::empty(), |access, (_, bit)| access | bit)
}

fn resolve_class_name(constant_pool: &[RawConstant], class_index: u16) -> Result<&str> {
    match constant_pool
        .get(class_index as usize)
        .context("missing class entry")?
    {
        RawConstant::Class { name_index } => resolve_utf8(constant_pool, *name_index),
        _ => anyhow::bail!("unexpected class entry"),
    }
}

fn resolve_utf8(constant_pool: &[RawConstant], index: u16) -> Result<&str> {
    match constant_pool.get(index as usize).context("missing utf8 entry")? {
        RawConstant::Utf8 { value } => Ok(value.as_str()),
        _ => anyhow::bail!("unexpected utf8 entry"),
    }
}

/// Class access flags, found by skipping the constant pool.
fn read_class_access(data: &[u8]) -> Result<AccessFlags> {
    let mut offset = 8usize;
    let count = read_u16_class(data, &mut offset)?;
    let mut index = 1u16;
    while index < count {
        let tag = read_u8_class(data, &mut offset)?;
        let len = match tag {
            1 => read_u16_class(data, &mut offset)? as usize,
            7 | 8 | 16 | 19 | 20 => 2,
            15 => 3,
            3 | 4 | 9..=12 | 17 | 18 => 4,
            5 | 6 => {
                index += 1;
                8
            }
            _ => anyhow::bail!("unsupported constant pool tag: {}", tag),
        };
        skip_class_bytes(data, &mut offset, len)?;
        index += 1;
    }
    Ok(AccessFlags::from_bits_retain(read_u16_class(data, &mut offset)?))
}

fn read_constant_pool(data: &[u8], offset: &mut usize) -> Result<ConstantPool> {
    let count = read_u16_class(data, offset)?;
    let mut entries = Vec::with_capacity(count as usize);
    entries.push(Constant::Unusable);
    let mut index = 1u16;
    while index < count {
        let tag = read_u8_class(data, offset)?;
        let constant = match tag {
            1 => {
                let len = read_u16_class(data, offset)? as usize;
                let bytes = read_bytes_class(data, offset, len)?;
                Constant::Utf8(decode_modified_utf8(bytes)?)
            }
            3 => Constant::Integer(read_u32_class(data, offset)? as i32),
            4 => Constant::Float(f32::from_bits(read_u32_class(data, offset)?)),
            5 => Constant::Long(read_u64_class(data, offset)? as i64),
            6 => Constant::Double(f64::from_bits(read_u64_class(data, offset)?)),
            7 => Constant::Class(ClassConstant {
                name_index: read_u16_class(data, offset)?,
                referenced_class: None,
                java_lang_class: None,
            }),
            8 => Constant::String(StringConstant {
                string_index: read_u16_class(data, offset)?,
                java_lang_string: None,
            }),
            9..=11 => {
                let class_index = read_u16_class(data, offset)?;
                let name_and_type_index = read_u16_class(data, offset)?;
                let reference = RefConstant::new(class_index, name_and_type_index);
                match tag {
                    9 => Constant::FieldRef(reference),
                    10 => Constant::MethodRef(reference),
                    _ => Constant::InterfaceMethodRef(reference),
                }
            }
            12 => Constant::NameAndType {
                name_index: read_u16_class(data, offset)?,
                descriptor_index: read_u16_class(data, offset)?,
            },
            15 => Constant::MethodHandle(MethodHandleConstant {
                reference_kind: read_u8_class(data, offset)?,
                reference_index: read_u16_class(data, offset)?,
                java_lang_invoke_method_handle: None,
            }),
            16 => Constant::MethodType(MethodTypeConstant {
                descriptor_index: read_u16_class(data, offset)?,
                referenced_classes: Vec::new(),
                java_lang_invoke_method_type: None,
            }),
            17 | 18 => {
                let dynamic = DynamicConstant {
                    bootstrap_method_attr_index: read_u16_class(data, offset)?,
                    name_and_type_index: read_u16_class(data, offset)?,
                    referenced_classes: Vec::new(),
                };
                if tag == 17 {
                    Constant::Dynamic(dynamic)
                } else {
                    Constant::InvokeDynamic(dynamic)
                }
            }
            19 => Constant::Module {
                name_index: read_u16_class(data, offset)?,
            },
            20 => Constant::Package {
                name_index: read_u16_class(data, offset)?,
            },
            _ => anyhow::bail!("unsupported constant pool tag: {}", tag),
        };
        let wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
        entries.push(constant);
        if wide {
            entries.push(Constant::Unusable);
            index += 1;
        }
        index += 1;
    }
    Ok(ConstantPool::from_entries(entries))
}

fn read_members(data: &[u8], offset: &mut usize, pool: &ConstantPool) -> Result<Vec<Member>> {
    let count = read_u16_class(data, offset)?;
    let mut members = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let access = AccessFlags::from_bits_retain(read_u16_class(data, offset)?);
        let name_index = read_u16_class(data, offset)?;
        let descriptor_index = read_u16_class(data, offset)?;
        let name = pool.utf8(name_index).context("resolve member name")?;
        let descriptor = pool
            .utf8(descriptor_index)
            .context("resolve member descriptor")?;
        let mut member = Member::new(name, descriptor, access);
        member.attributes = read_attributes(data, offset, pool)
            .with_context(|| format!("read attributes of {name}"))?;
        members.push(member);
    }
    Ok(members)
}

fn read_attributes(data: &[u8], offset: &mut usize, pool: &ConstantPool) -> Result<Vec<Attribute>> {
    let count = read_u16_class(data, offset)?;
    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name_index = read_u16_class(data, offset)?;
        let length = read_u32_class(data, offset)? as usize;
        let info = read_bytes_class(data, offset, length)?;
        let name = pool.utf8(name_index).context("resolve attribute name")?;
        let attribute =
            read_attribute(name, info, pool).with_context(|| format!("read {name} attribute"))?;
        attributes.push(attribute);
    }
    Ok(attributes)
}

fn read_attribute(name: &str, info: &[u8], pool: &ConstantPool) -> Result<Attribute> {
    let mut offset = 0usize;
    let offset = &mut offset;
    let attribute = match name {
        "Code" => {
            let max_stack = read_u16_class(info, offset)?;
            let max_locals = read_u16_class(info, offset)?;
            let code_length = read_u32_class(info, offset)? as usize;
            let code = read_bytes_class(info, offset, code_length)?.to_vec();
            let handler_count = read_u16_class(info, offset)?;
            let mut exception_table = Vec::with_capacity(handler_count as usize);
            for _ in 0..handler_count {
                exception_table.push(ExceptionHandler {
                    start_pc: read_u16_class(info, offset)?,
                    end_pc: read_u16_class(info, offset)?,
                    handler_pc: read_u16_class(info, offset)?,
                    catch_type: read_u16_class(info, offset)?,
                });
            }
            let attributes = read_attributes(info, offset, pool)?;
            Attribute::Code(CodeAttribute {
                max_stack,
                max_locals,
                code,
                exception_table,
                attributes,
            })
        }
        "Signature" => Attribute::Signature(SignatureAttribute {
            signature_index: read_u16_class(info, offset)?,
            referenced_classes: Vec::new(),
        }),
        "EnclosingMethod" => Attribute::EnclosingMethod(EnclosingMethodAttribute {
            class_index: read_u16_class(info, offset)?,
            method_index: read_u16_class(info, offset)?,
            referenced_class: None,
            referenced_method: None,
        }),
        "NestHost" => Attribute::NestHost {
            host_class_index: read_u16_class(info, offset)?,
        },
        "NestMembers" => Attribute::NestMembers {
            class_indices: read_u16_list(info, offset)?,
        },
        "Exceptions" => Attribute::Exceptions {
            class_indices: read_u16_list(info, offset)?,
        },
        "Record" => {
            let count = read_u16_class(info, offset)?;
            let mut components = Vec::with_capacity(count as usize);
            for _ in 0..count {
                components.push(RecordComponent {
                    name_index: read_u16_class(info, offset)?,
                    descriptor_index: read_u16_class(info, offset)?,
                    attributes: read_attributes(info, offset, pool)?,
                    referenced_field: None,
                });
            }
            Attribute::Record(RecordAttribute { components })
        }
        "LocalVariableTable" => {
            let count = read_u16_class(info, offset)?;
            let mut variables = Vec::with_capacity(count as usize);
            for _ in 0..count {
                variables.push(LocalVariable {
                    start_pc: read_u16_class(info, offset)?,
                    length: read_u16_class(info, offset)?,
                    name_index: read_u16_class(info, offset)?,
                    descriptor_index: read_u16_class(info, offset)?,
                    index: read_u16_class(info, offset)?,
                    referenced_class: None,
                });
            }
            Attribute::LocalVariableTable(variables)
        }
        "LocalVariableTypeTable" => {
            let count = read_u16_class(info, offset)?;
            let mut types = Vec::with_capacity(count as usize);
            for _ in 0..count {
                types.push(LocalVariableType {
                    start_pc: read_u16_class(info, offset)?,
                    length: read_u16_class(info, offset)?,
                    name_index: read_u16_class(info, offset)?,
                    signature_index: read_u16_class(info, offset)?,
                    index: read_u16_class(info, offset)?,
                    referenced_classes: Vec::new(),
                });
            }
            Attribute::LocalVariableTypeTable(types)
        }
        "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
            let count = read_u16_class(info, offset)?;
            let mut annotations = Vec::with_capacity(count as usize);
            for _ in 0..count {
                annotations.push(read_annotation(info, offset)?);
            }
            Attribute::Annotations {
                visible: name == "RuntimeVisibleAnnotations",
                annotations,
            }
        }
        "RuntimeVisibleParameterAnnotations" | "RuntimeInvisibleParameterAnnotations" => {
            let count = read_u8_class(info, offset)?;
            let mut parameters = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let annotation_count = read_u16_class(info, offset)?;
                let mut annotations = Vec::with_capacity(annotation_count as usize);
                for _ in 0..annotation_count {
                    annotations.push(read_annotation(info, offset)?);
                }
                parameters.push(annotations);
            }
            Attribute::ParameterAnnotations {
                visible: name == "RuntimeVisibleParameterAnnotations",
                parameters,
            }
        }
        "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
            let count = read_u16_class(info, offset)?;
            let mut annotations = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let target_type = read_u8_class(info, offset)?;
                skip_type_annotation_target(info, offset, target_type)?;
                let path_length = read_u8_class(info, offset)? as usize;
                skip_class_bytes(info, offset, path_length * 2)?;
                annotations.push(TypeAnnotation {
                    target_type,
                    annotation: read_annotation(info, offset)?,
                });
            }
            Attribute::TypeAnnotations {
                visible: name == "RuntimeVisibleTypeAnnotations",
                annotations,
            }
        }
        "AnnotationDefault" => Attribute::AnnotationDefault(read_element_value(info, offset)?),
        _ => Attribute::Unknown {
            name: name.to_string(),
            info: info.to_vec(),
        },
    };
    Ok(attribute)
}

fn read_annotation(data: &[u8], offset: &mut usize) -> Result<Annotation> {
    let mut annotation = Annotation::new(read_u16_class(data, offset)?);
    let count = read_u16_class(data, offset)?;
    for _ in 0..count {
        let name_index = read_u16_class(data, offset)?;
        annotation.elements.push(ElementValuePair {
            name_index,
            value: read_element_value(data, offset)?,
            referenced_method: None,
        });
    }
    Ok(annotation)
}

fn read_element_value(data: &[u8], offset: &mut usize) -> Result<ElementValue> {
    let tag = read_u8_class(data, offset)?;
    let value = match tag {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => ElementValue::Const {
            tag,
            const_value_index: read_u16_class(data, offset)?,
        },
        b'e' => ElementValue::Enum {
            type_name_index: read_u16_class(data, offset)?,
            const_name_index: read_u16_class(data, offset)?,
            referenced_classes: Vec::new(),
            referenced_field: None,
        },
        b'c' => ElementValue::Class {
            class_info_index: read_u16_class(data, offset)?,
            referenced_classes: Vec::new(),
        },
        b'@' => ElementValue::Annotation(Box::new(read_annotation(data, offset)?)),
        b'[' => {
            let count = read_u16_class(data, offset)?;
            let mut values = Vec::with_capacity(count as usize);
            for _ in 0..count {
                values.push(read_element_value(data, offset)?);
            }
            ElementValue::Array(values)
        }
        _ => anyhow::bail!("unsupported element value tag: {}", tag as char),
    };
    Ok(value)
}

fn skip_type_annotation_target(data: &[u8], offset: &mut usize, target_type: u8) -> Result<()> {
    let length = match target_type {
        0x00 | 0x01 | 0x16 => 1,
        0x10 | 0x17 | 0x42 | 0x43..=0x46 => 2,
        0x11 | 0x12 => 2,
        0x13..=0x15 => 0,
        0x47..=0x4b => 3,
        0x40 | 0x41 => {
            let table_length = read_u16_class(data, offset)? as usize;
            table_length * 6
        }
        _ => anyhow::bail!("unsupported type annotation target: 0x{:02x}", target_type),
    };
    skip_class_bytes(data, offset, length)
}

fn read_u16_list(data: &[u8], offset: &mut usize) -> Result<Vec<u16>> {
    let count = read_u16_class(data, offset)?;
    (0..count).map(|_| read_u16_class(data, offset)).collect()
}

fn read_u8_class(data: &[u8], offset: &mut usize) -> Result<u8> {
    let byte = *data.get(*offset).context("class file out of bounds")?;
    *offset += 1;
    Ok(byte)
}

fn read_u16_class(data: &[u8], offset: &mut usize) -> Result<u16> {
    let bytes = read_bytes_class(data, offset, 2)?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn read_u32_class(data: &[u8], offset: &mut usize) -> Result<u32> {
    let bytes = read_bytes_class(data, offset, 4)?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_u64_class(data: &[u8], offset: &mut usize) -> Result<u64> {
    let high = read_u32_class(data, offset)? as u64;
    let low = read_u32_class(data, offset)? as u64;
    Ok(high << 32 | low)
}

fn read_bytes_class<'a>(data: &'a [u8], offset: &mut usize, len: usize) -> Result<&'a [u8]> {
    let start = *offset;
    let end = start.checked_add(len).context("class file out of bounds")?;
    let slice = data.get(start..end).context("class file out of bounds")?;
    *offset = end;
    Ok(slice)
}

/// Decodes the modified UTF-8 of a class file: NUL is `C0 80` and supplementary characters
/// are surrogate pairs of three-byte sequences.
fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        if !text.contains('\u{0}') {
            return Ok(text.to_string());
        }
    }
    let mut units = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        let first = u16::from(bytes[index]);
        let continuation = |at: usize| -> Result<u16> {
            match bytes.get(at) {
                Some(&byte) if byte & 0xC0 == 0x80 => Ok(u16::from(byte & 0x3F)),
                _ => anyhow::bail!("malformed modified UTF-8 at byte {at}"),
            }
        };
        let (unit, width) = match first {
            0x01..=0x7F => (first, 1),
            0xC0..=0xDF => (((first & 0x1F) << 6) | continuation(index + 1)?, 2),
            0xE0..=0xEF => (
                ((first & 0x0F) << 12)
                    | (continuation(index + 1)? << 6)
                    | continuation(index + 2)?,
                3,
            ),
            _ => anyhow::bail!("malformed modified UTF-8 at byte {index}"),
        };
        units.push(unit);
        index += width;
    }
    String::from_utf16(&units).context("unpaired surrogate in modified UTF-8")
}

fn skip_class_bytes(data: &[u8], offset: &mut usize, len: usize) -> Result<()> {
    read_bytes_class(data, offset, len)?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::code_attribute;
    use crate::opcodes;

    #[test]
    fn program_class_keeps_pool_and_code() {
        let code = [opcodes::ICONST_1, opcodes::IRETURN];
        let bytes = writer::class_bytes(
            "com/example/Answer",
            "java/lang/Object",
            &[("one", "()I", &code)],
        );

        let class = read_program_class(&bytes).expect("read class");

        assert_eq!(class.name, "com/example/Answer");
        assert_eq!(class.super_name.as_deref(), Some("java/lang/Object"));
        assert!(class.access.contains(AccessFlags::PUBLIC));
        assert_eq!(class.methods.len(), 1);
        let method = &class.methods[0];
        assert_eq!((method.name.as_str(), method.descriptor.as_str()), ("one", "()I"));
        assert!(method.access.is_static());
        let attribute = code_attribute(&method.attributes).expect("code attribute");
        assert_eq!(attribute.code, code);
        assert_eq!(class.constant_pool().class_name(2), Some("com/example/Answer"));
    }

    #[test]
    fn library_class_drops_attributes() {
        let bytes = writer::class_bytes(
            "com/example/Lib",
            "java/lang/Object",
            &[("run", "()V", &[opcodes::RETURN])],
        );

        let class = read_library_class(&bytes).expect("read class");

        assert!(!class.is_program());
        assert_eq!(class.super_name.as_deref(), Some("java/lang/Object"));
        assert!(class.access.contains(AccessFlags::PUBLIC));
        assert_eq!(class.methods.len(), 1);
        assert_eq!(class.methods[0].name, "run");
        assert!(class.methods[0].access.is_static());
        assert!(class.methods[0].attributes.is_empty());
    }

    #[test]
    fn utf8_constants_decode_modified_encoding() {
        assert_eq!(decode_modified_utf8(b"plain").expect("ascii"), "plain");
        assert_eq!(
            decode_modified_utf8(&[0x61, 0xC0, 0x80, 0x62]).expect("nul"),
            "a\u{0}b"
        );
        assert_eq!(
            decode_modified_utf8(&[0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80]).expect("pair"),
            "\u{1F600}"
        );
        assert_eq!(decode_modified_utf8("é€".as_bytes()).expect("bmp"), "é€");
        assert!(decode_modified_utf8(&[0xED, 0xA0, 0xBD]).is_err());
        assert!(decode_modified_utf8(&[0xE2, 0x82]).is_err());
        assert!(decode_modified_utf8(&[0x00]).is_err());
    }

    #[test]
    fn truncated_bytes_fail() {
        let bytes = writer::class_bytes("com/example/Cut", "java/lang/Object", &[]);
        assert!(read_program_class(&bytes[..bytes.len() - 4]).is_err());
        assert!(read_program_class(b"nope").is_err());
    }
}
