//! Typed decoding of method bytecode.

use anyhow::{Context, Result};

use crate::opcodes;

/// One decoded instruction. `opcode` is the opcode as written; wide forms report the widened
/// opcode.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Instruction {
    pub offset: u32,
    pub opcode: u8,
    pub length: u32,
    pub kind: InstructionKind,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InstructionKind {
    /// No operand, or an immediate: the pushed value of `iconst_<n>`, `bipush`, `sipush`, the
    /// element type of `newarray`.
    Simple { constant: i32 },
    /// Local variable access; `constant` is the increment of `iinc`.
    Variable { index: u32, constant: i32 },
    /// Constant pool reference; `constant` is the count of `invokeinterface` or the dimensions
    /// of `multianewarray`.
    Constant { index: u16, constant: i32 },
    /// Branch offset relative to the instruction.
    Branch { offset: i32 },
    TableSwitch {
        default: i32,
        low: i32,
        high: i32,
        offsets: Vec<i32>,
    },
    LookupSwitch {
        default: i32,
        pairs: Vec<(i32, i32)>,
    },
}

impl Instruction {
    /// Opcode with the shorthand and wide-index variants folded into one form: every int push
    /// is `iconst_0`, `aload_2` is `aload`, `ldc_w` is `ldc`, `goto_w` is `goto`.
    pub fn canonical_opcode(&self) -> u8 {
        canonical_opcode(self.opcode)
    }

    /// Absolute target of a branch instruction.
    pub fn branch_target(&self) -> Option<u32> {
        match self.kind {
            InstructionKind::Branch { offset } => {
                u32::try_from(self.offset as i64 + offset as i64).ok()
            }
            _ => None,
        }
    }

    pub fn constant_index(&self) -> Option<u16> {
        match self.kind {
            InstructionKind::Constant { index, .. } => Some(index),
            _ => None,
        }
    }

    pub fn variable_index(&self) -> Option<u32> {
        match self.kind {
            InstructionKind::Variable { index, .. } => Some(index),
            _ => None,
        }
    }

    /// Immediate value of a simple instruction.
    pub fn simple_constant(&self) -> Option<i32> {
        match self.kind {
            InstructionKind::Simple { constant } => Some(constant),
            _ => None,
        }
    }
}

pub fn canonical_opcode(opcode: u8) -> u8 {
    match opcode {
        opcodes::ICONST_M1..=opcodes::ICONST_5 | opcodes::BIPUSH | opcodes::SIPUSH => {
            opcodes::ICONST_0
        }
        opcodes::LCONST_0 | opcodes::LCONST_1 => opcodes::LCONST_0,
        opcodes::FCONST_0..=opcodes::FCONST_2 => opcodes::FCONST_0,
        opcodes::DCONST_0 | opcodes::DCONST_1 => opcodes::DCONST_0,
        opcodes::LDC_W => opcodes::LDC,
        opcodes::ILOAD_0..=opcodes::ALOAD_3 => opcodes::ILOAD + (opcode - opcodes::ILOAD_0) / 4,
        opcodes::ISTORE_0..=opcodes::ASTORE_3 => {
            opcodes::ISTORE + (opcode - opcodes::ISTORE_0) / 4
        }
        opcodes::GOTO_W => opcodes::GOTO,
        opcodes::JSR_W => opcodes::JSR,
        _ => opcode,
    }
}

/// Decodes a whole code array.
pub fn decode_all(code: &[u8]) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();
    let mut offset = 0usize;
    while offset < code.len() {
        let instruction = decode(code, offset)?;
        offset += instruction.length as usize;
        instructions.push(instruction);
    }
    Ok(instructions)
}

/// Decodes the instruction starting at `offset`.
pub fn decode(code: &[u8], offset: usize) -> Result<Instruction> {
    let opcode = *code
        .get(offset)
        .with_context(|| format!("no instruction at offset {offset}"))?;
    let (opcode, length, kind) = match opcode {
        opcodes::NOP | opcodes::ACONST_NULL => (opcode, 1, simple(0)),
        opcodes::ICONST_M1..=opcodes::ICONST_5 => {
            (opcode, 1, simple(opcode as i32 - opcodes::ICONST_0 as i32))
        }
        opcodes::LCONST_0..=opcodes::LCONST_1 => {
            (opcode, 1, simple((opcode - opcodes::LCONST_0) as i32))
        }
        opcodes::FCONST_0..=opcodes::FCONST_2 => {
            (opcode, 1, simple((opcode - opcodes::FCONST_0) as i32))
        }
        opcodes::DCONST_0..=opcodes::DCONST_1 => {
            (opcode, 1, simple((opcode - opcodes::DCONST_0) as i32))
        }
        opcodes::BIPUSH => (opcode, 2, simple(read_u8(code, offset + 1)? as i8 as i32)),
        opcodes::SIPUSH => (opcode, 3, simple(read_u16(code, offset + 1)? as i16 as i32)),
        opcodes::LDC => (opcode, 2, constant(read_u8(code, offset + 1)? as u16, 0)),
        opcodes::LDC_W | opcodes::LDC2_W => (opcode, 3, constant(read_u16(code, offset + 1)?, 0)),
        opcodes::ILOAD..=opcodes::ALOAD | opcodes::ISTORE..=opcodes::ASTORE | opcodes::RET => {
            (opcode, 2, variable(read_u8(code, offset + 1)? as u32, 0))
        }
        opcodes::ILOAD_0..=opcodes::ALOAD_3 => {
            (opcode, 1, variable(((opcode - opcodes::ILOAD_0) % 4) as u32, 0))
        }
        opcodes::ISTORE_0..=opcodes::ASTORE_3 => {
            (opcode, 1, variable(((opcode - opcodes::ISTORE_0) % 4) as u32, 0))
        }
        opcodes::IINC => (
            opcode,
            3,
            variable(
                read_u8(code, offset + 1)? as u32,
                read_u8(code, offset + 2)? as i8 as i32,
            ),
        ),
        opcodes::IFEQ..=opcodes::JSR | opcodes::IFNULL | opcodes::IFNONNULL => (
            opcode,
            3,
            InstructionKind::Branch {
                offset: read_u16(code, offset + 1)? as i16 as i32,
            },
        ),
        opcodes::GOTO_W | opcodes::JSR_W => (
            opcode,
            5,
            InstructionKind::Branch {
                offset: read_i32(code, offset + 1)?,
            },
        ),
        opcodes::TABLESWITCH => table_switch(code, offset)?,
        opcodes::LOOKUPSWITCH => lookup_switch(code, offset)?,
        opcodes::GETSTATIC..=opcodes::INVOKESTATIC
        | opcodes::NEW
        | opcodes::ANEWARRAY
        | opcodes::CHECKCAST
        | opcodes::INSTANCEOF => (opcode, 3, constant(read_u16(code, offset + 1)?, 0)),
        opcodes::INVOKEINTERFACE => (
            opcode,
            5,
            constant(
                read_u16(code, offset + 1)?,
                read_u8(code, offset + 3)? as i32,
            ),
        ),
        opcodes::INVOKEDYNAMIC => (opcode, 5, constant(read_u16(code, offset + 1)?, 0)),
        opcodes::NEWARRAY => (opcode, 2, simple(read_u8(code, offset + 1)? as i32)),
        opcodes::MULTIANEWARRAY => (
            opcode,
            4,
            constant(
                read_u16(code, offset + 1)?,
                read_u8(code, offset + 3)? as i32,
            ),
        ),
        opcodes::WIDE => wide(code, offset)?,
        0x2e..=0x35 | 0x4f..=0x83 | 0x85..=0x98 | 0xac..=0xb1 | 0xbe | 0xbf | 0xc2 | 0xc3
        | 0xca | 0xfe | 0xff => (opcode, 1, simple(0)),
        _ => anyhow::bail!("unsupported opcode 0x{:02x} at offset {}", opcode, offset),
    };
    if offset + length > code.len() {
        anyhow::bail!("truncated instruction at offset {}", offset);
    }
    Ok(Instruction {
        offset: offset as u32,
        opcode,
        length: length as u32,
        kind,
    })
}

fn simple(constant: i32) -> InstructionKind {
    InstructionKind::Simple { constant }
}

fn variable(index: u32, constant: i32) -> InstructionKind {
    InstructionKind::Variable { index, constant }
}

fn constant(index: u16, constant: i32) -> InstructionKind {
    InstructionKind::Constant { index, constant }
}

fn wide(code: &[u8], offset: usize) -> Result<(u8, usize, InstructionKind)> {
    let opcode = read_u8(code, offset + 1).context("missing wide opcode")?;
    let index = read_u16(code, offset + 2)? as u32;
    match opcode {
        opcodes::IINC => {
            let increment = read_u16(code, offset + 4)? as i16 as i32;
            Ok((opcode, 6, variable(index, increment)))
        }
        opcodes::ILOAD..=opcodes::ALOAD | opcodes::ISTORE..=opcodes::ASTORE | opcodes::RET => {
            Ok((opcode, 4, variable(index, 0)))
        }
        _ => anyhow::bail!("invalid wide opcode 0x{:02x} at offset {}", opcode, offset),
    }
}

fn table_switch(code: &[u8], offset: usize) -> Result<(u8, usize, InstructionKind)> {
    let base = offset + 1 + padding(offset);
    let default = read_i32(code, base)?;
    let low = read_i32(code, base + 4)?;
    let high = read_i32(code, base + 8)?;
    let count = high
        .checked_sub(low)
        .and_then(|v| v.checked_add(1))
        .filter(|count| *count >= 0)
        .context("invalid tableswitch range")? as usize;
    let offsets = (0..count)
        .map(|index| read_i32(code, base + 12 + index * 4))
        .collect::<Result<Vec<_>>>()?;
    let length = base + 12 + count * 4 - offset;
    Ok((
        opcodes::TABLESWITCH,
        length,
        InstructionKind::TableSwitch {
            default,
            low,
            high,
            offsets,
        },
    ))
}

fn lookup_switch(code: &[u8], offset: usize) -> Result<(u8, usize, InstructionKind)> {
    let base = offset + 1 + padding(offset);
    let default = read_i32(code, base)?;
    let npairs = read_i32(code, base + 4)?;
    if npairs < 0 {
        anyhow::bail!("invalid lookupswitch pairs");
    }
    let pairs = (0..npairs as usize)
        .map(|index| {
            let entry = base + 8 + index * 8;
            Ok((read_i32(code, entry)?, read_i32(code, entry + 4)?))
        })
        .collect::<Result<Vec<_>>>()?;
    let length = base + 8 + pairs.len() * 8 - offset;
    Ok((
        opcodes::LOOKUPSWITCH,
        length,
        InstructionKind::LookupSwitch { default, pairs },
    ))
}

fn padding(offset: usize) -> usize {
    (4 - ((offset + 1) % 4)) % 4
}

fn read_u8(code: &[u8], offset: usize) -> Result<u8> {
    code.get(offset).copied().context("bytecode u8 out of bounds")
}

fn read_u16(code: &[u8], offset: usize) -> Result<u16> {
    let slice = code
        .get(offset..offset + 2)
        .context("bytecode u16 out of bounds")?;
    Ok(u16::from_be_bytes([slice[0], slice[1]]))
}

fn read_i32(code: &[u8], offset: usize) -> Result<i32> {
    let slice = code
        .get(offset..offset + 4)
        .context("bytecode i32 out of bounds")?;
    Ok(i32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
}
