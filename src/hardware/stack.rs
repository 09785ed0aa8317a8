//! Fixed-capacity ring stack.
//!
//! Pushing onto a full stack overwrites the oldest entry; popping an empty
//! stack yields a cleared value. Neither is an error.

use crate::hardware::value::DataValue;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingStack {
    slots: Vec<DataValue>,
    /// Index of the top entry.
    sp: usize,
}

impl RingStack {
    /// Creates a stack holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![DataValue::default(); capacity.max(1)],
            sp: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn push(&mut self, value: DataValue) {
        self.sp = if self.sp == 0 {
            self.slots.len() - 1
        } else {
            self.sp - 1
        };
        self.slots[self.sp] = value;
    }

    pub fn pop(&mut self) -> DataValue {
        let value = std::mem::take(&mut self.slots[self.sp]);
        self.sp = (self.sp + 1) % self.slots.len();
        value
    }

    /// Top entry without removing it.
    pub fn peek(&self) -> DataValue {
        self.slots[self.sp]
    }

    /// Entry `depth` positions below the top (0 is the top).
    pub fn get(&self, depth: usize) -> &DataValue {
        &self.slots[(self.sp + depth) % self.slots.len()]
    }

    /// Reverses the order of all entries.
    pub fn flip(&mut self) {
        let len = self.slots.len();
        let ordered: Vec<DataValue> = (0..len).map(|d| *self.get(d)).collect();
        for (depth, value) in ordered.into_iter().rev().enumerate() {
            self.slots[(self.sp + depth) % len] = value;
        }
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(DataValue::clear);
        self.sp = 0;
    }

    /// Entries from the top down.
    pub fn iter(&self) -> impl Iterator<Item = &DataValue> {
        (0..self.slots.len()).map(|d| self.get(d))
    }
}

/// Which of the two stacks a thread currently operates on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StackSelector {
    /// The thread's own stack.
    #[default]
    Local,
    /// The stack shared by every thread of the organism.
    Global,
}

impl StackSelector {
    pub fn toggled(self) -> Self {
        match self {
            StackSelector::Local => StackSelector::Global,
            StackSelector::Global => StackSelector::Local,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            StackSelector::Local => "local",
            StackSelector::Global => "global",
        }
    }
}
