//! Operand stack values and the oracle interface the array initialization matcher queries.

mod opcode_semantics;
mod stack_machine;
mod tracer;

use std::collections::BTreeSet;

pub use tracer::{LinearStackTracer, StackTrace};

/// Abstract value of an operand stack entry or local variable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// Some object or array reference, including `null`.
    Reference,
    /// Anything the tracer could not pin down.
    Unknown,
}

impl Value {
    /// Whether the value is a known primitive constant.
    pub fn is_particular(&self) -> bool {
        matches!(
            self,
            Value::Int(_) | Value::Long(_) | Value::Float(_) | Value::Double(_)
        )
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Long and double values take two slots on the JVM stack.
    pub fn is_category2(&self) -> bool {
        matches!(self, Value::Long(_) | Value::Double(_))
    }
}

/// A stack value with the offsets of the instructions that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct TracedValue {
    pub value: Value,
    pub producers: BTreeSet<u32>,
}

impl TracedValue {
    pub fn produced_by(value: Value, offset: u32) -> Self {
        Self {
            value,
            producers: BTreeSet::from([offset]),
        }
    }

    pub fn unknown() -> Self {
        Self {
            value: Value::Unknown,
            producers: BTreeSet::new(),
        }
    }
}

/// Operand stack states around instruction offsets. The top of the stack is the last entry;
/// `None` means the offset was not traced.
pub trait StackOracle {
    fn stack_before(&self, offset: u32) -> Option<&[TracedValue]>;

    fn stack_after(&self, offset: u32) -> Option<&[TracedValue]>;

    fn top_before(&self, offset: u32) -> Option<&TracedValue> {
        self.stack_before(offset)?.last()
    }

    fn top_after(&self, offset: u32) -> Option<&TracedValue> {
        self.stack_after(offset)?.last()
    }
}
