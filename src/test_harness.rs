use crate::access::AccessFlags;
use crate::attribute::{Attribute, CodeAttribute};
use crate::classpath::Universe;
use crate::constant::ConstantPool;
use crate::hierarchy::{link_subclasses, link_supers};
use crate::ir::{Class, Member, PoolKind};
use crate::opcodes;

/// Public program class whose constant pool already names the class itself.
pub(crate) fn program_class(name: &str, super_name: Option<&str>, interfaces: &[&str]) -> Class {
    let mut pool = ConstantPool::new();
    pool.add_class(name);
    if let Some(super_name) = super_name {
        pool.add_class(super_name);
    }
    for interface in interfaces {
        pool.add_class(interface);
    }
    Class::program(name, AccessFlags::PUBLIC, super_name, interfaces, pool)
}

pub(crate) fn library_class(name: &str, super_name: Option<&str>, interfaces: &[&str]) -> Class {
    Class::library(name, AccessFlags::PUBLIC, super_name, interfaces)
}

pub(crate) fn member(name: &str, descriptor: &str, access: AccessFlags) -> Member {
    Member::new(name, descriptor, access)
}

/// Method carrying a code attribute with the given bytes.
pub(crate) fn method_with_code(
    name: &str,
    descriptor: &str,
    access: AccessFlags,
    code: Vec<u8>,
) -> Member {
    Member::new(name, descriptor, access).with_attribute(Attribute::Code(CodeAttribute {
        max_stack: 8,
        max_locals: 8,
        code,
        ..CodeAttribute::default()
    }))
}

/// Runs super-linking and two-pass sub-linking over both pools.
pub(crate) fn link_hierarchy(universe: &mut Universe) {
    link_supers(universe, PoolKind::Program, None);
    link_supers(universe, PoolKind::Library, None);
    link_subclasses(universe, &[PoolKind::Program, PoolKind::Library]);
}

/// Universe holding `java/lang/Object` and `java/lang/String` as library classes.
pub(crate) fn universe_with_platform() -> Universe {
    let mut universe = Universe::new();
    universe.add_library(
        library_class("java/lang/Object", None, &[])
            .with_method(member("<init>", "()V", AccessFlags::PUBLIC))
            .with_method(member("hashCode", "()I", AccessFlags::PUBLIC))
            .with_method(member(
                "toString",
                "()Ljava/lang/String;",
                AccessFlags::PUBLIC,
            )),
    );
    universe.add_library(library_class(
        "java/lang/String",
        Some("java/lang/Object"),
        &[],
    ));
    universe
}

/// Small bytecode assembler for test method bodies.
#[derive(Default)]
pub(crate) struct CodeBuilder {
    code: Vec<u8>,
}

impl CodeBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn op(mut self, opcode: u8) -> Self {
        self.code.push(opcode);
        self
    }

    /// Shortest push of an int constant: `iconst_<n>`, `bipush`, or `sipush`.
    pub(crate) fn iconst(mut self, value: i32) -> Self {
        match value {
            -1..=5 => self.code.push((opcodes::ICONST_0 as i32 + value) as u8),
            -128..=127 => {
                self.code.push(opcodes::BIPUSH);
                self.code.push(value as i8 as u8);
            }
            _ => {
                self.code.push(opcodes::SIPUSH);
                self.code.extend_from_slice(&(value as i16).to_be_bytes());
            }
        }
        self
    }

    pub(crate) fn newarray(mut self, array_type: i32) -> Self {
        self.code.push(opcodes::NEWARRAY);
        self.code.push(array_type as u8);
        self
    }

    pub(crate) fn astore(mut self, index: u8) -> Self {
        if index <= 3 {
            self.code.push(opcodes::ASTORE_0 + index);
        } else {
            self.code.push(opcodes::ASTORE);
            self.code.push(index);
        }
        self
    }

    pub(crate) fn aload(mut self, index: u8) -> Self {
        if index <= 3 {
            self.code.push(opcodes::ALOAD_0 + index);
        } else {
            self.code.push(opcodes::ALOAD);
            self.code.push(index);
        }
        self
    }

    pub(crate) fn ldc(mut self, index: u8) -> Self {
        self.code.push(opcodes::LDC);
        self.code.push(index);
        self
    }

    /// Any opcode followed by a two byte constant pool index.
    pub(crate) fn with_index(mut self, opcode: u8, index: u16) -> Self {
        self.code.push(opcode);
        self.code.extend_from_slice(&index.to_be_bytes());
        self
    }

    pub(crate) fn branch(mut self, opcode: u8, relative: i16) -> Self {
        self.code.push(opcode);
        self.code.extend_from_slice(&relative.to_be_bytes());
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        self.code
    }
}
