use tracing::trace;

use crate::constant::ConstantPool;
use crate::dataflow::{LinearStackTracer, StackOracle, Value};
use crate::instruction::Instruction;
use crate::matcher::{InstructionSequenceMatcher, MatchContext, Pattern, PatternBuilder, Wildcard};
use crate::opcodes;

/// Literal contents of a primitive array.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayValues {
    Boolean(Vec<bool>),
    Byte(Vec<i8>),
    Char(Vec<u16>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl ArrayValues {
    /// Empty values for a `newarray` element type code.
    pub fn for_element_type(element_type: i32, capacity: usize) -> Option<Self> {
        let values = match element_type {
            opcodes::T_BOOLEAN => ArrayValues::Boolean(Vec::with_capacity(capacity)),
            opcodes::T_BYTE => ArrayValues::Byte(Vec::with_capacity(capacity)),
            opcodes::T_CHAR => ArrayValues::Char(Vec::with_capacity(capacity)),
            opcodes::T_SHORT => ArrayValues::Short(Vec::with_capacity(capacity)),
            opcodes::T_INT => ArrayValues::Int(Vec::with_capacity(capacity)),
            opcodes::T_LONG => ArrayValues::Long(Vec::with_capacity(capacity)),
            opcodes::T_FLOAT => ArrayValues::Float(Vec::with_capacity(capacity)),
            opcodes::T_DOUBLE => ArrayValues::Double(Vec::with_capacity(capacity)),
            _ => return None,
        };
        Some(values)
    }

    pub fn len(&self) -> usize {
        match self {
            ArrayValues::Boolean(values) => values.len(),
            ArrayValues::Byte(values) => values.len(),
            ArrayValues::Char(values) => values.len(),
            ArrayValues::Short(values) => values.len(),
            ArrayValues::Int(values) => values.len(),
            ArrayValues::Long(values) => values.len(),
            ArrayValues::Float(values) => values.len(),
            ArrayValues::Double(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends `value` narrowed to the element type; `false` when the kinds disagree.
    fn push(&mut self, value: Value) -> bool {
        match (self, value) {
            (ArrayValues::Boolean(values), Value::Int(value)) => values.push(value != 0),
            (ArrayValues::Byte(values), Value::Int(value)) => values.push(value as i8),
            (ArrayValues::Char(values), Value::Int(value)) => values.push(value as u16),
            (ArrayValues::Short(values), Value::Int(value)) => values.push(value as i16),
            (ArrayValues::Int(values), Value::Int(value)) => values.push(value),
            (ArrayValues::Long(values), Value::Long(value)) => values.push(value),
            (ArrayValues::Float(values), Value::Float(value)) => values.push(value),
            (ArrayValues::Double(values), Value::Double(value)) => values.push(value),
            _ => return false,
        }
        true
    }
}

/// A recognized primitive array initializer. `start` is the first instruction after the
/// `newarray` (and after a skipped store/load pair); `end` is the last array store.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayInitialization {
    pub values: ArrayValues,
    pub start: u32,
    pub end: u32,
}

/// Recognizes `newarray` followed by one `ref, index, value, store` group per element.
#[derive(Clone, Debug)]
pub struct ArrayInitializationMatcher {
    store_load: Pattern,
}

impl Default for ArrayInitializationMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrayInitializationMatcher {
    pub fn new() -> Self {
        let store_load = PatternBuilder::new()
            .store(opcodes::ASTORE, Wildcard::A)
            .load(opcodes::ALOAD, Wildcard::A)
            .build();
        Self { store_load }
    }

    /// Tries the `newarray` at `instructions[position]`; the array length must be particular
    /// in `oracle`.
    pub fn match_at(
        &self,
        pool: &ConstantPool,
        oracle: &impl StackOracle,
        instructions: &[Instruction],
        position: usize,
    ) -> Option<ArrayInitialization> {
        let newarray = instructions.get(position)?;
        if newarray.opcode != opcodes::NEWARRAY {
            return None;
        }
        let element_type = newarray.simple_constant()?;
        let store_opcode = opcodes::array_store_opcode(element_type)?;
        let length = oracle.top_before(newarray.offset)?.value.as_int()?;
        let length = usize::try_from(length).ok().filter(|length| *length > 0)?;

        let mut rest = instructions.get(position + 1..)?;
        let context = MatchContext::new(pool);
        if InstructionSequenceMatcher::new(&self.store_load)
            .match_prefix(context, rest)
            .is_some()
        {
            trace!("skipping store/load pair after newarray at {}", newarray.offset);
            rest = &rest[self.store_load.len()..];
        }
        let groups = rest.get(..length.checked_mul(4)?)?;

        let mut values = ArrayValues::for_element_type(element_type, length)?;
        for (index, group) in groups.chunks_exact(4).enumerate() {
            let [reference, index_push, value_push, store] = group else {
                return None;
            };
            if !matches!(reference.canonical_opcode(), opcodes::DUP | opcodes::ALOAD) {
                return None;
            }
            let traced = oracle.top_after(reference.offset)?;
            if traced.value != Value::Reference
                || traced.producers.len() != 1
                || !traced.producers.contains(&newarray.offset)
            {
                return None;
            }
            if index_push.canonical_opcode() != opcodes::ICONST_0
                || index_push.simple_constant() != i32::try_from(index).ok()
            {
                return None;
            }
            let value = oracle.top_after(value_push.offset)?.value;
            if !value.is_particular() || store.opcode != store_opcode || !values.push(value) {
                return None;
            }
        }

        let start = groups.first()?.offset;
        let end = groups.last()?.offset;
        Some(ArrayInitialization { values, start, end })
    }

    /// Every primitive array initializer in straight-line code traced from the method start.
    pub fn find_all(
        &self,
        pool: &ConstantPool,
        instructions: &[Instruction],
    ) -> Vec<ArrayInitialization> {
        let stack_trace = LinearStackTracer::trace(pool, instructions);
        (0..instructions.len())
            .filter(|position| instructions[*position].opcode == opcodes::NEWARRAY)
            .filter_map(|position| self.match_at(pool, &stack_trace, instructions, position))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::decode_all;
    use crate::test_harness::CodeBuilder;

    fn run(code: Vec<u8>) -> Vec<ArrayInitialization> {
        let instructions = decode_all(&code).expect("decode");
        ArrayInitializationMatcher::new().find_all(&ConstantPool::new(), &instructions)
    }

    fn element(builder: CodeBuilder, index: i32, value: i32, store: u8) -> CodeBuilder {
        builder.op(opcodes::DUP).iconst(index).iconst(value).op(store)
    }

    #[test]
    fn int_array_initializer_is_recognized() {
        let mut builder = CodeBuilder::new().iconst(3).newarray(opcodes::T_INT);
        for (index, value) in [10, 20, 30].into_iter().enumerate() {
            builder = element(builder, index as i32, value, opcodes::IASTORE);
        }
        let code = builder.astore(0).op(opcodes::RETURN).build();

        let found = run(code);

        assert_eq!(
            found,
            vec![ArrayInitialization {
                values: ArrayValues::Int(vec![10, 20, 30]),
                start: 3,
                end: 17,
            }]
        );
    }

    #[test]
    fn store_load_pair_after_newarray_is_skipped() {
        let code = CodeBuilder::new()
            .iconst(2)
            .newarray(opcodes::T_BYTE)
            .astore(1)
            .aload(1)
            .aload(1)
            .iconst(0)
            .iconst(5)
            .op(opcodes::BASTORE)
            .aload(1)
            .iconst(1)
            .iconst(-1)
            .op(opcodes::BASTORE)
            .op(opcodes::POP)
            .op(opcodes::RETURN)
            .build();

        let found = run(code);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].values, ArrayValues::Byte(vec![5, -1]));
        assert_eq!((found[0].start, found[0].end), (5, 12));
    }

    #[test]
    fn out_of_order_indices_do_not_match() {
        let builder = CodeBuilder::new().iconst(2).newarray(opcodes::T_INT);
        let builder = element(builder, 1, 20, opcodes::IASTORE);
        let builder = element(builder, 0, 10, opcodes::IASTORE);

        assert!(run(builder.op(opcodes::RETURN).build()).is_empty());
    }

    #[test]
    fn element_group_must_reload_the_array() {
        let code = CodeBuilder::new()
            .iconst(1)
            .newarray(opcodes::T_INT)
            .op(opcodes::NOP)
            .iconst(0)
            .iconst(7)
            .op(opcodes::IASTORE)
            .op(opcodes::RETURN)
            .build();

        assert!(run(code).is_empty());
    }

    #[test]
    fn non_particular_values_do_not_match() {
        let code = CodeBuilder::new()
            .iconst(1)
            .newarray(opcodes::T_INT)
            .op(opcodes::DUP)
            .iconst(0)
            .op(opcodes::ILOAD_0)
            .op(opcodes::IASTORE)
            .op(opcodes::RETURN)
            .build();

        assert!(run(code).is_empty());
    }

    #[test]
    fn short_or_mistyped_initializers_do_not_match() {
        let too_short = element(
            CodeBuilder::new().iconst(2).newarray(opcodes::T_INT),
            0,
            1,
            opcodes::IASTORE,
        );
        assert!(run(too_short.op(opcodes::RETURN).build()).is_empty());

        let wrong_store = element(
            CodeBuilder::new().iconst(1).newarray(opcodes::T_SHORT),
            0,
            1,
            opcodes::IASTORE,
        );
        assert!(run(wrong_store.op(opcodes::RETURN).build()).is_empty());
    }

    #[test]
    fn long_array_needs_long_values() {
        let code = CodeBuilder::new()
            .iconst(1)
            .newarray(opcodes::T_LONG)
            .op(opcodes::DUP)
            .iconst(0)
            .op(opcodes::LCONST_1)
            .op(opcodes::LASTORE)
            .op(opcodes::RETURN)
            .build();

        let found = run(code);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].values, ArrayValues::Long(vec![1]));
    }
}
