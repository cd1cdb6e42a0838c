use crate::instruction::canonical_opcode;
use crate::opcodes;

/// Named wildcard slot of a pattern. Operand wildcards and constant wildcards share the slot
/// numbering but bind independently.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Wildcard(pub u8);

impl Wildcard {
    pub const A: Self = Self(0);
    pub const B: Self = Self(1);
    pub const C: Self = Self(2);
    pub const D: Self = Self(3);
    pub const E: Self = Self(4);
    pub const F: Self = Self(5);
    pub const G: Self = Self(6);
    pub const H: Self = Self(7);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Numeric operand slot: a literal, or a wildcard bound on first use.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operand {
    Value(i32),
    Wildcard(Wildcard),
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Operand::Value(value)
    }
}

impl From<Wildcard> for Operand {
    fn from(wildcard: Wildcard) -> Self {
        Operand::Wildcard(wildcard)
    }
}

/// Constant slot: an entry of the pattern's own constant list, compared by content, or a
/// wildcard bound to the first constant pool index it meets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConstantOperand {
    Pattern(usize),
    Wildcard(Wildcard),
}

impl From<Wildcard> for ConstantOperand {
    fn from(wildcard: Wildcard) -> Self {
        ConstantOperand::Wildcard(wildcard)
    }
}

/// Pattern-side constant. Nested entries refer to other pattern constants or wildcards.
#[derive(Clone, Debug, PartialEq)]
pub enum PatternConstant {
    Integer(Operand),
    Long(i64),
    Float(f32),
    Double(f64),
    Utf8(String),
    String(ConstantOperand),
    Class(ConstantOperand),
    FieldRef {
        class: ConstantOperand,
        name_and_type: ConstantOperand,
    },
    MethodRef {
        class: ConstantOperand,
        name_and_type: ConstantOperand,
    },
    InterfaceMethodRef {
        class: ConstantOperand,
        name_and_type: ConstantOperand,
    },
    NameAndType {
        name: ConstantOperand,
        descriptor: ConstantOperand,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PatternKind {
    Simple {
        constant: Operand,
    },
    Variable {
        index: Operand,
        constant: Operand,
    },
    Constant {
        constant: ConstantOperand,
    },
    /// Literal offsets are relative; wildcards bind the absolute target.
    Branch {
        offset: Operand,
    },
    TableSwitch {
        default: Operand,
        low: Operand,
        high: Operand,
        offsets: Vec<Operand>,
    },
    LookupSwitch {
        default: Operand,
        pairs: Vec<(Operand, Operand)>,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PatternInstruction {
    /// Always in canonical form.
    pub opcode: u8,
    pub kind: PatternKind,
}

/// A fixed instruction sequence with wildcard slots.
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    pub instructions: Vec<PatternInstruction>,
    pub constants: Vec<PatternConstant>,
    pub wildcard_count: usize,
}

impl Pattern {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Fluent construction of [`Pattern`]s.
///
/// ```ignore
/// let pattern = PatternBuilder::new()
///     .iconst(Wildcard::A)
///     .iconst(Wildcard::B)
///     .op(opcodes::IADD)
///     .build();
/// ```
#[derive(Clone, Debug, Default)]
pub struct PatternBuilder {
    instructions: Vec<PatternInstruction>,
    constants: Vec<PatternConstant>,
}

impl PatternBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// An operand-free instruction, or a shorthand whose operand is implied by the opcode
    /// (`iconst_2`, `aload_1`, `fconst_1`).
    pub fn op(self, opcode: u8) -> Self {
        match opcode {
            opcodes::ILOAD_0..=opcodes::ALOAD_3 => {
                let index = ((opcode - opcodes::ILOAD_0) % 4) as i32;
                self.variable(opcode, index, 0)
            }
            opcodes::ISTORE_0..=opcodes::ASTORE_3 => {
                let index = ((opcode - opcodes::ISTORE_0) % 4) as i32;
                self.variable(opcode, index, 0)
            }
            _ => self.simple(opcode, implied_constant(opcode)),
        }
    }

    /// Any int push; `iconst_<n>`, `bipush`, and `sipush` all match it.
    pub fn iconst(self, value: impl Into<Operand>) -> Self {
        self.simple(opcodes::ICONST_0, value)
    }

    pub fn newarray(self, element_type: impl Into<Operand>) -> Self {
        self.simple(opcodes::NEWARRAY, element_type)
    }

    pub fn simple(mut self, opcode: u8, constant: impl Into<Operand>) -> Self {
        self.push(
            opcode,
            PatternKind::Simple {
                constant: constant.into(),
            },
        );
        self
    }

    /// Local variable load or store; short forms are folded into the long form.
    pub fn variable(
        mut self,
        opcode: u8,
        index: impl Into<Operand>,
        constant: impl Into<Operand>,
    ) -> Self {
        self.push(
            opcode,
            PatternKind::Variable {
                index: index.into(),
                constant: constant.into(),
            },
        );
        self
    }

    pub fn load(self, opcode: u8, index: impl Into<Operand>) -> Self {
        self.variable(opcode, index, 0)
    }

    pub fn store(self, opcode: u8, index: impl Into<Operand>) -> Self {
        self.variable(opcode, index, 0)
    }

    pub fn iinc(self, index: impl Into<Operand>, delta: impl Into<Operand>) -> Self {
        self.variable(opcodes::IINC, index, delta)
    }

    pub fn constant_instruction(mut self, opcode: u8, constant: ConstantOperand) -> Self {
        self.push(opcode, PatternKind::Constant { constant });
        self
    }

    pub fn ldc_int(mut self, value: impl Into<Operand>) -> Self {
        let constant = self.intern(PatternConstant::Integer(value.into()));
        self.constant_instruction(opcodes::LDC, constant)
    }

    pub fn ldc_string(mut self, value: &str) -> Self {
        let utf8 = self.utf8(value);
        let constant = self.intern(PatternConstant::String(utf8));
        self.constant_instruction(opcodes::LDC, constant)
    }

    pub fn ldc_class(mut self, class_name: &str) -> Self {
        let constant = self.class(class_name);
        self.constant_instruction(opcodes::LDC, constant)
    }

    /// `ldc` of any constant, binding its pool index to `wildcard`.
    pub fn ldc_any(self, wildcard: Wildcard) -> Self {
        self.constant_instruction(opcodes::LDC, ConstantOperand::Wildcard(wildcard))
    }

    /// `getstatic`, `putstatic`, `getfield`, or `putfield` of the named field.
    pub fn field(mut self, opcode: u8, class_name: &str, name: &str, descriptor: &str) -> Self {
        let class = self.class(class_name);
        let name_and_type = self.name_and_type(name, descriptor);
        let constant = self.intern(PatternConstant::FieldRef {
            class,
            name_and_type,
        });
        self.constant_instruction(opcode, constant)
    }

    /// Invocation of the named method. `invokeinterface` refers to an interface method
    /// constant; the other invoke opcodes refer to a method constant.
    pub fn invoke(mut self, opcode: u8, class_name: &str, name: &str, descriptor: &str) -> Self {
        let class = self.class(class_name);
        let name_and_type = self.name_and_type(name, descriptor);
        let reference = if opcode == opcodes::INVOKEINTERFACE {
            PatternConstant::InterfaceMethodRef {
                class,
                name_and_type,
            }
        } else {
            PatternConstant::MethodRef {
                class,
                name_and_type,
            }
        };
        let constant = self.intern(reference);
        self.constant_instruction(opcode, constant)
    }

    pub fn branch(mut self, opcode: u8, offset: impl Into<Operand>) -> Self {
        self.push(
            opcode,
            PatternKind::Branch {
                offset: offset.into(),
            },
        );
        self
    }

    pub fn table_switch(
        mut self,
        default: impl Into<Operand>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
        offsets: Vec<Operand>,
    ) -> Self {
        self.push(
            opcodes::TABLESWITCH,
            PatternKind::TableSwitch {
                default: default.into(),
                low: low.into(),
                high: high.into(),
                offsets,
            },
        );
        self
    }

    pub fn lookup_switch(
        mut self,
        default: impl Into<Operand>,
        pairs: Vec<(Operand, Operand)>,
    ) -> Self {
        self.push(
            opcodes::LOOKUPSWITCH,
            PatternKind::LookupSwitch {
                default: default.into(),
                pairs,
            },
        );
        self
    }

    /// Interns a UTF-8 pattern constant.
    pub fn utf8(&mut self, value: &str) -> ConstantOperand {
        self.intern(PatternConstant::Utf8(value.to_string()))
    }

    /// Interns a class pattern constant.
    pub fn class(&mut self, class_name: &str) -> ConstantOperand {
        let name = self.utf8(class_name);
        self.intern(PatternConstant::Class(name))
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> ConstantOperand {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.intern(PatternConstant::NameAndType { name, descriptor })
    }

    /// Adds `constant` unless an equal entry exists.
    pub fn intern(&mut self, constant: PatternConstant) -> ConstantOperand {
        let index = match self.constants.iter().position(|known| *known == constant) {
            Some(index) => index,
            None => {
                self.constants.push(constant);
                self.constants.len() - 1
            }
        };
        ConstantOperand::Pattern(index)
    }

    pub fn build(self) -> Pattern {
        let mut highest: Option<usize> = None;
        let mut note = |operand: &Operand| {
            if let Operand::Wildcard(wildcard) = operand {
                highest = highest.max(Some(wildcard.index()));
            }
        };
        for instruction in &self.instructions {
            match &instruction.kind {
                PatternKind::Simple { constant } => note(constant),
                PatternKind::Variable { index, constant } => {
                    note(index);
                    note(constant);
                }
                PatternKind::Constant { .. } => {}
                PatternKind::Branch { offset } => note(offset),
                PatternKind::TableSwitch {
                    default,
                    low,
                    high,
                    offsets,
                } => {
                    [default, low, high].into_iter().for_each(&mut note);
                    offsets.iter().for_each(&mut note);
                }
                PatternKind::LookupSwitch { default, pairs } => {
                    note(default);
                    for (key, offset) in pairs {
                        note(key);
                        note(offset);
                    }
                }
            }
        }
        let constant_slots = self
            .instructions
            .iter()
            .filter_map(|instruction| match instruction.kind {
                PatternKind::Constant {
                    constant: ConstantOperand::Wildcard(wildcard),
                } => Some(wildcard.index()),
                _ => None,
            })
            .chain(self.constants.iter().flat_map(constant_wildcards));
        let highest = constant_slots.fold(highest, |acc, index| acc.max(Some(index)));
        Pattern {
            instructions: self.instructions,
            constants: self.constants,
            wildcard_count: highest.map_or(0, |index| index + 1),
        }
    }

    fn push(&mut self, opcode: u8, kind: PatternKind) {
        self.instructions.push(PatternInstruction {
            opcode: canonical_opcode(opcode),
            kind,
        });
    }
}

fn constant_wildcards(constant: &PatternConstant) -> Vec<usize> {
    let operands: Vec<&ConstantOperand> = match constant {
        PatternConstant::Integer(Operand::Wildcard(wildcard)) => return vec![wildcard.index()],
        PatternConstant::Integer(_)
        | PatternConstant::Long(_)
        | PatternConstant::Float(_)
        | PatternConstant::Double(_)
        | PatternConstant::Utf8(_) => Vec::new(),
        PatternConstant::String(operand) | PatternConstant::Class(operand) => vec![operand],
        PatternConstant::FieldRef {
            class,
            name_and_type,
        }
        | PatternConstant::MethodRef {
            class,
            name_and_type,
        }
        | PatternConstant::InterfaceMethodRef {
            class,
            name_and_type,
        } => vec![class, name_and_type],
        PatternConstant::NameAndType { name, descriptor } => vec![name, descriptor],
    };
    operands
        .into_iter()
        .filter_map(|operand| match operand {
            ConstantOperand::Wildcard(wildcard) => Some(wildcard.index()),
            ConstantOperand::Pattern(_) => None,
        })
        .collect()
}

/// Immediate the decoder reports for a one-byte instruction.
fn implied_constant(opcode: u8) -> i32 {
    match opcode {
        opcodes::ICONST_M1..=opcodes::ICONST_5 => opcode as i32 - opcodes::ICONST_0 as i32,
        opcodes::LCONST_0..=opcodes::LCONST_1 => (opcode - opcodes::LCONST_0) as i32,
        opcodes::FCONST_0..=opcodes::FCONST_2 => (opcode - opcodes::FCONST_0) as i32,
        opcodes::DCONST_0..=opcodes::DCONST_1 => (opcode - opcodes::DCONST_0) as i32,
        _ => 0,
    }
}
