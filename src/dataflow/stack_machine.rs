use std::collections::BTreeMap;

use crate::dataflow::TracedValue;

/// Operand stack and local variables of one straight-line trace.
#[derive(Clone, Debug, Default)]
pub(crate) struct StackMachine {
    stack: Vec<TracedValue>,
    locals: BTreeMap<u32, TracedValue>,
}

impl StackMachine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, value: TracedValue) {
        self.stack.push(value);
    }

    pub(crate) fn pop(&mut self) -> Option<TracedValue> {
        self.stack.pop()
    }

    /// Pops `count` entries; `None` on underflow, leaving the stack untouched.
    pub(crate) fn pop_n(&mut self, count: usize) -> Option<Vec<TracedValue>> {
        if count > self.stack.len() {
            return None;
        }
        Some(self.stack.split_off(self.stack.len() - count))
    }

    pub(crate) fn peek(&self) -> Option<&TracedValue> {
        self.stack.last()
    }

    /// A local that was never stored in this trace is unknown.
    pub(crate) fn load_local(&self, index: u32) -> TracedValue {
        self.locals
            .get(&index)
            .cloned()
            .unwrap_or_else(TracedValue::unknown)
    }

    pub(crate) fn store_local(&mut self, index: u32, value: TracedValue) {
        self.locals.insert(index, value);
    }

    pub(crate) fn stack_values(&self) -> &[TracedValue] {
        &self.stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::Value;

    #[test]
    fn pop_n_underflow_keeps_stack() {
        let mut machine = StackMachine::new();
        machine.push(TracedValue::produced_by(Value::Int(1), 0));
        assert!(machine.pop_n(2).is_none());
        assert_eq!(machine.stack_values().len(), 1);
        assert_eq!(machine.pop_n(1).map(|values| values.len()), Some(1));
    }

    #[test]
    fn locals_default_to_unknown() {
        let mut machine = StackMachine::new();
        assert_eq!(machine.load_local(3).value, Value::Unknown);
        machine.store_local(3, TracedValue::produced_by(Value::Reference, 7));
        assert_eq!(machine.load_local(3).producers.into_iter().collect::<Vec<_>>(), vec![7]);
        assert!(machine.peek().is_none());
    }
}
