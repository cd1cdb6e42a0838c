use std::collections::BTreeMap;

use tracing::trace;

use crate::constant::ConstantPool;
use crate::dataflow::opcode_semantics::{ApplyOutcome, apply};
use crate::dataflow::stack_machine::StackMachine;
use crate::dataflow::{StackOracle, TracedValue};
use crate::instruction::Instruction;

/// Stack snapshots recorded by [`LinearStackTracer`].
#[derive(Clone, Debug, Default)]
pub struct StackTrace {
    before: BTreeMap<u32, Vec<TracedValue>>,
    after: BTreeMap<u32, Vec<TracedValue>>,
}

impl StackTrace {
    /// Number of instructions whose effect was traced.
    pub fn traced_len(&self) -> usize {
        self.after.len()
    }
}

impl StackOracle for StackTrace {
    fn stack_before(&self, offset: u32) -> Option<&[TracedValue]> {
        self.before.get(&offset).map(Vec::as_slice)
    }

    fn stack_after(&self, offset: u32) -> Option<&[TracedValue]> {
        self.after.get(&offset).map(Vec::as_slice)
    }
}

/// Traces operand stack contents through straight-line code from an empty stack.
///
/// Tracing stops at the first branch, return, throw, or any instruction whose stack effect is
/// not modeled; later offsets have no snapshots. The stopping instruction keeps its `before`
/// snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinearStackTracer;

impl LinearStackTracer {
    pub fn trace(pool: &ConstantPool, instructions: &[Instruction]) -> StackTrace {
        let mut machine = StackMachine::new();
        let mut stack_trace = StackTrace::default();
        for instruction in instructions {
            stack_trace
                .before
                .insert(instruction.offset, machine.stack_values().to_vec());
            if apply(&mut machine, pool, instruction) == ApplyOutcome::NotHandled {
                trace!(
                    "stack trace stops at offset {} opcode=0x{:02x}",
                    instruction.offset, instruction.opcode
                );
                break;
            }
            stack_trace
                .after
                .insert(instruction.offset, machine.stack_values().to_vec());
        }
        stack_trace
    }
}
