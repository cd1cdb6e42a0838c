//! Instruction sequence matching: recognizes a fixed pattern with wildcard operands and
//! constants inside a method's decoded instruction stream.

mod array_init;
mod pattern;

use crate::classpath::Universe;
use crate::constant::{ClassConstant, Constant, ConstantPool};
use crate::instruction::{Instruction, InstructionKind};

pub use array_init::{ArrayInitialization, ArrayInitializationMatcher, ArrayValues};
pub use pattern::{
    ConstantOperand, Operand, Pattern, PatternBuilder, PatternConstant, PatternInstruction,
    PatternKind, Wildcard,
};

/// What the matcher compares constants against.
#[derive(Clone, Copy)]
pub struct MatchContext<'a> {
    pub pool: &'a ConstantPool,
    /// Needed only to accept subclasses of pattern classes.
    pub universe: Option<&'a Universe>,
}

impl<'a> MatchContext<'a> {
    pub fn new(pool: &'a ConstantPool) -> Self {
        Self {
            pool,
            universe: None,
        }
    }

    pub fn with_universe(mut self, universe: &'a Universe) -> Self {
        self.universe = Some(universe);
        self
    }
}

/// Progress of one matching attempt. Create one per instruction stream with
/// [`InstructionSequenceMatcher::start`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MatchState {
    index: usize,
    offsets: Vec<u32>,
    wildcards: Vec<Option<i32>>,
    constants: Vec<Option<u16>>,
}

impl MatchState {
    fn reset(&mut self) {
        self.index = 0;
        self.offsets.clear();
        self.wildcards.iter_mut().for_each(|slot| *slot = None);
        self.constants.iter_mut().for_each(|slot| *slot = None);
    }
}

/// A completed match.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Match {
    offsets: Vec<u32>,
    wildcards: Vec<Option<i32>>,
    constants: Vec<Option<u16>>,
}

impl Match {
    /// Offset of the instruction matched by each pattern instruction.
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    pub fn start(&self) -> u32 {
        self.offsets.first().copied().unwrap_or_default()
    }

    /// Offset of the last matched instruction.
    pub fn end(&self) -> u32 {
        self.offsets.last().copied().unwrap_or_default()
    }

    /// Value bound to an operand wildcard; branch wildcards hold absolute targets.
    pub fn wildcard(&self, wildcard: Wildcard) -> Option<i32> {
        self.wildcards.get(wildcard.index()).copied().flatten()
    }

    /// Constant pool index bound to a constant wildcard.
    pub fn constant(&self, wildcard: Wildcard) -> Option<u16> {
        self.constants.get(wildcard.index()).copied().flatten()
    }
}

/// Final say over a completed match.
pub trait MatchHook {
    fn accept(&mut self, _matched: &Match) -> bool {
        true
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptAll;

impl MatchHook for AcceptAll {}

/// Single-pass matcher. A mismatch resets the attempt; when it happens at the second pattern
/// instruction, the current instruction is retried as a new first instruction.
#[derive(Clone, Copy, Debug)]
pub struct InstructionSequenceMatcher<'p> {
    pattern: &'p Pattern,
    match_subclasses: bool,
}

impl<'p> InstructionSequenceMatcher<'p> {
    pub fn new(pattern: &'p Pattern) -> Self {
        Self {
            pattern,
            match_subclasses: false,
        }
    }

    /// Class constants also match classes that extend or implement the pattern class.
    pub fn matching_subclasses(mut self) -> Self {
        self.match_subclasses = true;
        self
    }

    pub fn start(&self) -> MatchState {
        MatchState {
            index: 0,
            offsets: Vec::with_capacity(self.pattern.len()),
            wildcards: vec![None; self.pattern.wildcard_count],
            constants: vec![None; self.pattern.wildcard_count],
        }
    }

    pub fn step(
        &self,
        state: &mut MatchState,
        context: MatchContext<'_>,
        instruction: &Instruction,
    ) -> Option<Match> {
        self.step_with(state, context, instruction, &mut AcceptAll)
    }

    /// Feeds the next instruction; returns the match it completes, if the hook accepts it.
    pub fn step_with<H: MatchHook + ?Sized>(
        &self,
        state: &mut MatchState,
        context: MatchContext<'_>,
        instruction: &Instruction,
        hook: &mut H,
    ) -> Option<Match> {
        if self.pattern.is_empty() {
            return None;
        }
        if self.matches_instruction(state, context, instruction) {
            return self.advance(state, instruction, hook);
        }
        let retry = state.index == 1;
        state.reset();
        if retry && self.matches_instruction(state, context, instruction) {
            return self.advance(state, instruction, hook);
        }
        None
    }

    /// Every match in `instructions`, in order.
    pub fn find_all(&self, context: MatchContext<'_>, instructions: &[Instruction]) -> Vec<Match> {
        let mut state = self.start();
        instructions
            .iter()
            .filter_map(|instruction| self.step(&mut state, context, instruction))
            .collect()
    }

    /// Matches the pattern against the leading instructions of `instructions` only.
    pub fn match_prefix(
        &self,
        context: MatchContext<'_>,
        instructions: &[Instruction],
    ) -> Option<Match> {
        if instructions.len() < self.pattern.len() {
            return None;
        }
        let mut state = self.start();
        for instruction in &instructions[..self.pattern.len()] {
            if !self.matches_instruction(&mut state, context, instruction) {
                return None;
            }
            if let Some(matched) = self.advance(&mut state, instruction, &mut AcceptAll) {
                return Some(matched);
            }
        }
        None
    }

    fn advance<H: MatchHook + ?Sized>(
        &self,
        state: &mut MatchState,
        instruction: &Instruction,
        hook: &mut H,
    ) -> Option<Match> {
        state.offsets.push(instruction.offset);
        state.index += 1;
        if state.index < self.pattern.len() {
            return None;
        }
        let matched = Match {
            offsets: std::mem::take(&mut state.offsets),
            wildcards: state.wildcards.clone(),
            constants: state.constants.clone(),
        };
        state.reset();
        hook.accept(&matched).then_some(matched)
    }

    fn matches_instruction(
        &self,
        state: &mut MatchState,
        context: MatchContext<'_>,
        instruction: &Instruction,
    ) -> bool {
        let Some(expected) = self.pattern.instructions.get(state.index) else {
            return false;
        };
        if instruction.canonical_opcode() != expected.opcode {
            return false;
        }
        let offset = instruction.offset;
        match (&expected.kind, &instruction.kind) {
            (PatternKind::Simple { constant: pattern }, InstructionKind::Simple { constant }) => {
                bind_operand(&mut state.wildcards, *pattern, *constant)
            }
            (
                PatternKind::Variable {
                    index: pattern_index,
                    constant: pattern_constant,
                },
                InstructionKind::Variable { index, constant },
            ) => {
                i32::try_from(*index)
                    .is_ok_and(|index| bind_operand(&mut state.wildcards, *pattern_index, index))
                    && bind_operand(&mut state.wildcards, *pattern_constant, *constant)
            }
            (PatternKind::Constant { constant }, InstructionKind::Constant { index, .. }) => {
                self.matches_constant(state, context, *constant, *index)
            }
            (PatternKind::Branch { offset: pattern }, InstructionKind::Branch { offset: jump }) => {
                bind_branch(&mut state.wildcards, offset, *pattern, *jump)
            }
            (
                PatternKind::TableSwitch {
                    default: pattern_default,
                    low: pattern_low,
                    high: pattern_high,
                    offsets: pattern_offsets,
                },
                InstructionKind::TableSwitch {
                    default,
                    low,
                    high,
                    offsets,
                },
            ) => {
                pattern_offsets.len() == offsets.len()
                    && bind_branch(&mut state.wildcards, offset, *pattern_default, *default)
                    && bind_operand(&mut state.wildcards, *pattern_low, *low)
                    && bind_operand(&mut state.wildcards, *pattern_high, *high)
                    && pattern_offsets
                        .iter()
                        .zip(offsets)
                        .all(|(pattern, jump)| {
                            bind_branch(&mut state.wildcards, offset, *pattern, *jump)
                        })
            }
            (
                PatternKind::LookupSwitch {
                    default: pattern_default,
                    pairs: pattern_pairs,
                },
                InstructionKind::LookupSwitch { default, pairs },
            ) => {
                pattern_pairs.len() == pairs.len()
                    && bind_branch(&mut state.wildcards, offset, *pattern_default, *default)
                    && pattern_pairs.iter().zip(pairs).all(
                        |((pattern_key, pattern_jump), (key, jump))| {
                            bind_operand(&mut state.wildcards, *pattern_key, *key)
                                && bind_branch(&mut state.wildcards, offset, *pattern_jump, *jump)
                        },
                    )
            }
            _ => false,
        }
    }

    fn matches_constant(
        &self,
        state: &mut MatchState,
        context: MatchContext<'_>,
        pattern: ConstantOperand,
        index: u16,
    ) -> bool {
        match pattern {
            ConstantOperand::Wildcard(wildcard) => {
                let Some(slot) = state.constants.get_mut(wildcard.index()) else {
                    return false;
                };
                match *slot {
                    Some(bound) => bound == index,
                    None => {
                        *slot = Some(index);
                        true
                    }
                }
            }
            ConstantOperand::Pattern(pattern_index) => {
                match self.pattern.constants.get(pattern_index) {
                    Some(constant) => self.matches_content(state, context, constant, index),
                    None => false,
                }
            }
        }
    }

    /// Compares a pattern constant with a pool entry by content, tag by tag.
    fn matches_content(
        &self,
        state: &mut MatchState,
        context: MatchContext<'_>,
        pattern: &PatternConstant,
        index: u16,
    ) -> bool {
        let Some(actual) = context.pool.get(index) else {
            return false;
        };
        match (pattern, actual) {
            (PatternConstant::Integer(operand), Constant::Integer(value)) => {
                bind_operand(&mut state.wildcards, *operand, *value)
            }
            (PatternConstant::Long(expected), Constant::Long(value)) => expected == value,
            (PatternConstant::Float(expected), Constant::Float(value)) => {
                expected.to_bits() == value.to_bits()
            }
            (PatternConstant::Double(expected), Constant::Double(value)) => {
                expected.to_bits() == value.to_bits()
            }
            (PatternConstant::Utf8(expected), Constant::Utf8(value)) => expected == value,
            (PatternConstant::String(operand), Constant::String(string)) => {
                self.matches_constant(state, context, *operand, string.string_index)
            }
            (PatternConstant::Class(operand), Constant::Class(class)) => {
                self.matches_constant(state, context, *operand, class.name_index)
                    || self.matches_subclass(context, *operand, class)
            }
            (
                PatternConstant::FieldRef {
                    class,
                    name_and_type,
                },
                Constant::FieldRef(reference),
            )
            | (
                PatternConstant::MethodRef {
                    class,
                    name_and_type,
                },
                Constant::MethodRef(reference),
            )
            | (
                PatternConstant::InterfaceMethodRef {
                    class,
                    name_and_type,
                },
                Constant::InterfaceMethodRef(reference),
            ) => {
                self.matches_constant(state, context, *class, reference.class_index)
                    && self.matches_constant(
                        state,
                        context,
                        *name_and_type,
                        reference.name_and_type_index,
                    )
            }
            (
                PatternConstant::NameAndType { name, descriptor },
                Constant::NameAndType {
                    name_index,
                    descriptor_index,
                },
            ) => {
                self.matches_constant(state, context, *name, *name_index)
                    && self.matches_constant(state, context, *descriptor, *descriptor_index)
            }
            _ => false,
        }
    }

    fn matches_subclass(
        &self,
        context: MatchContext<'_>,
        operand: ConstantOperand,
        class: &ClassConstant,
    ) -> bool {
        if !self.match_subclasses {
            return false;
        }
        let Some(universe) = context.universe else {
            return false;
        };
        let ConstantOperand::Pattern(pattern_index) = operand else {
            return false;
        };
        let Some(PatternConstant::Utf8(expected)) = self.pattern.constants.get(pattern_index)
        else {
            return false;
        };
        let Some(target) = universe.lookup(expected) else {
            return false;
        };
        let actual = class.referenced_class.or_else(|| {
            context
                .pool
                .utf8(class.name_index)
                .and_then(|name| universe.lookup(name))
        });
        actual.is_some_and(|actual| universe.extends_or_implements(actual, target))
    }
}

fn bind_operand(wildcards: &mut [Option<i32>], pattern: Operand, actual: i32) -> bool {
    match pattern {
        Operand::Value(expected) => expected == actual,
        Operand::Wildcard(wildcard) => {
            let Some(slot) = wildcards.get_mut(wildcard.index()) else {
                return false;
            };
            match *slot {
                Some(bound) => bound == actual,
                None => {
                    *slot = Some(actual);
                    true
                }
            }
        }
    }
}

/// Literal branch operands compare the relative offset; wildcards bind the absolute target.
fn bind_branch(wildcards: &mut [Option<i32>], offset: u32, pattern: Operand, jump: i32) -> bool {
    match pattern {
        Operand::Value(expected) => expected == jump,
        Operand::Wildcard(_) => match i32::try_from(offset as i64 + jump as i64) {
            Ok(target) => bind_operand(wildcards, pattern, target),
            Err(_) => false,
        },
    }
}
