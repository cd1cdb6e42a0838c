use crate::constant::{Constant, ConstantPool};
use crate::dataflow::stack_machine::StackMachine;
use crate::dataflow::{TracedValue, Value};
use crate::descriptor::{ReturnKind, method_param_count, method_return_kind};
use crate::instruction::{Instruction, InstructionKind};
use crate::opcodes;

/// Result of attempting table-driven opcode execution.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub(crate) enum ApplyOutcome {
    Applied,
    /// The opcode has no straight-line semantics here, or the stack underflowed.
    NotHandled,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Effect {
    Noop,
    Push(PushKind),
    LoadLocal,
    StoreLocal,
    IncrementLocal,
    Pop(usize),
    Pop2,
    Dup,
    DupX1,
    Dup2,
    Swap,
    PopAndPush { pop_count: usize, push: PushKind },
    MultiANewArray,
    Invoke { receiver: bool },
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum PushKind {
    Unknown,
    Reference,
    /// Value of the instruction's immediate or of its constant pool entry.
    Constant,
}

/// Applies the stack effect of `instruction` to `machine`.
pub(crate) fn apply(
    machine: &mut StackMachine,
    pool: &ConstantPool,
    instruction: &Instruction,
) -> ApplyOutcome {
    let Some(effect) = decode(instruction.canonical_opcode()) else {
        return ApplyOutcome::NotHandled;
    };
    match apply_effect(machine, pool, instruction, effect) {
        Some(()) => ApplyOutcome::Applied,
        None => ApplyOutcome::NotHandled,
    }
}

fn apply_effect(
    machine: &mut StackMachine,
    pool: &ConstantPool,
    instruction: &Instruction,
    effect: Effect,
) -> Option<()> {
    let offset = instruction.offset;
    match effect {
        Effect::Noop => {}
        Effect::Push(kind) => machine.push(pushed_value(pool, instruction, kind)),
        Effect::LoadLocal => {
            let value = machine.load_local(instruction.variable_index()?);
            machine.push(value);
        }
        Effect::StoreLocal => {
            let value = machine.pop()?;
            machine.store_local(instruction.variable_index()?, value);
        }
        Effect::IncrementLocal => {
            let index = instruction.variable_index()?;
            machine.store_local(index, TracedValue::produced_by(Value::Unknown, offset));
        }
        Effect::Pop(count) => {
            machine.pop_n(count)?;
        }
        Effect::Pop2 => {
            let top = machine.pop()?;
            if !top.value.is_category2() {
                machine.pop()?;
            }
        }
        Effect::Dup => {
            let value = machine.peek()?.clone();
            machine.push(value);
        }
        Effect::DupX1 => {
            let right = machine.pop()?;
            let left = machine.pop()?;
            machine.push(right.clone());
            machine.push(left);
            machine.push(right);
        }
        Effect::Dup2 => {
            let top = machine.peek()?.clone();
            if top.value.is_category2() {
                machine.push(top);
            } else {
                let pair = machine.pop_n(2)?;
                for value in pair.iter().chain(pair.iter()) {
                    machine.push(value.clone());
                }
            }
        }
        Effect::Swap => {
            let right = machine.pop()?;
            let left = machine.pop()?;
            machine.push(right);
            machine.push(left);
        }
        Effect::PopAndPush { pop_count, push } => {
            machine.pop_n(pop_count)?;
            machine.push(pushed_value(pool, instruction, push));
        }
        Effect::MultiANewArray => {
            let dimensions = match instruction.kind {
                InstructionKind::Constant { constant, .. } => {
                    usize::try_from(constant).ok()?
                }
                _ => return None,
            };
            machine.pop_n(dimensions)?;
            machine.push(TracedValue::produced_by(Value::Reference, offset));
        }
        Effect::Invoke { receiver } => {
            let index = instruction.constant_index()?;
            let descriptor = match pool.ref_parts(index) {
                Some((_, _, descriptor)) => descriptor,
                None => pool.dynamic_descriptor(index)?,
            };
            let parameters = method_param_count(descriptor).ok()?;
            let return_kind = method_return_kind(descriptor).ok()?;
            machine.pop_n(parameters + usize::from(receiver))?;
            match return_kind {
                ReturnKind::Void => {}
                ReturnKind::Reference => {
                    machine.push(TracedValue::produced_by(Value::Reference, offset));
                }
                ReturnKind::Primitive => {
                    machine.push(TracedValue::produced_by(Value::Unknown, offset))
                }
            }
        }
    }
    Some(())
}

fn pushed_value(pool: &ConstantPool, instruction: &Instruction, kind: PushKind) -> TracedValue {
    let value = match kind {
        PushKind::Unknown => Value::Unknown,
        PushKind::Reference => Value::Reference,
        PushKind::Constant => match instruction.simple_constant() {
            Some(constant) => match instruction.canonical_opcode() {
                opcodes::LCONST_0 => Value::Long(i64::from(constant)),
                opcodes::FCONST_0 => Value::Float(constant as f32),
                opcodes::DCONST_0 => Value::Double(f64::from(constant)),
                _ => Value::Int(constant),
            },
            None => instruction
                .constant_index()
                .and_then(|index| pool.get(index))
                .map(loaded_value)
                .unwrap_or(Value::Unknown),
        },
    };
    TracedValue::produced_by(value, instruction.offset)
}

fn loaded_value(constant: &Constant) -> Value {
    match constant {
        Constant::Integer(value) => Value::Int(*value),
        Constant::Long(value) => Value::Long(*value),
        Constant::Float(value) => Value::Float(*value),
        Constant::Double(value) => Value::Double(*value),
        Constant::String(_)
        | Constant::Class(_)
        | Constant::MethodHandle(_)
        | Constant::MethodType(_) => Value::Reference,
        _ => Value::Unknown,
    }
}

/// Stack effect of a canonical opcode; `None` for control flow and anything not modeled.
fn decode(opcode: u8) -> Option<Effect> {
    let effect = match opcode {
        opcodes::NOP | opcodes::CHECKCAST => Effect::Noop,
        opcodes::ACONST_NULL => Effect::Push(PushKind::Reference),
        opcodes::ICONST_0
        | opcodes::LCONST_0
        | opcodes::FCONST_0
        | opcodes::DCONST_0
        | opcodes::LDC
        | opcodes::LDC2_W => Effect::Push(PushKind::Constant),
        opcodes::ILOAD | opcodes::LLOAD | opcodes::FLOAD | opcodes::DLOAD | opcodes::ALOAD => {
            Effect::LoadLocal
        }
        opcodes::ISTORE | opcodes::LSTORE | opcodes::FSTORE | opcodes::DSTORE | opcodes::ASTORE => {
            Effect::StoreLocal
        }
        opcodes::IINC => Effect::IncrementLocal,
        opcodes::IALOAD..=opcodes::SALOAD => Effect::PopAndPush {
            pop_count: 2,
            push: PushKind::Unknown,
        },
        opcodes::IASTORE..=opcodes::SASTORE => Effect::Pop(3),
        opcodes::POP | opcodes::MONITORENTER | opcodes::MONITOREXIT | opcodes::PUTSTATIC => {
            Effect::Pop(1)
        }
        opcodes::PUTFIELD => Effect::Pop(2),
        opcodes::POP2 => Effect::Pop2,
        opcodes::DUP => Effect::Dup,
        opcodes::DUP_X1 => Effect::DupX1,
        opcodes::DUP2 => Effect::Dup2,
        opcodes::SWAP => Effect::Swap,
        // Binary arithmetic, shifts, bitwise, and compares.
        0x60..=0x73 | 0x78..=0x83 | 0x94..=0x98 => Effect::PopAndPush {
            pop_count: 2,
            push: PushKind::Unknown,
        },
        // Negation and conversions.
        0x74..=0x77 | 0x85..=0x93 => Effect::PopAndPush {
            pop_count: 1,
            push: PushKind::Unknown,
        },
        opcodes::GETSTATIC => Effect::Push(PushKind::Unknown),
        opcodes::GETFIELD | opcodes::ARRAYLENGTH | opcodes::INSTANCEOF => Effect::PopAndPush {
            pop_count: 1,
            push: PushKind::Unknown,
        },
        opcodes::NEW => Effect::Push(PushKind::Reference),
        opcodes::NEWARRAY | opcodes::ANEWARRAY => Effect::PopAndPush {
            pop_count: 1,
            push: PushKind::Reference,
        },
        opcodes::MULTIANEWARRAY => Effect::MultiANewArray,
        opcodes::INVOKEVIRTUAL | opcodes::INVOKESPECIAL | opcodes::INVOKEINTERFACE => {
            Effect::Invoke { receiver: true }
        }
        opcodes::INVOKESTATIC | opcodes::INVOKEDYNAMIC => Effect::Invoke { receiver: false },
        _ => return None,
    };
    Some(effect)
}
