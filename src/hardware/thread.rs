//! Cooperative execution contexts.

use crate::hardware::label::Label;
use crate::hardware::stack::{RingStack, StackSelector};
use crate::hardware::tape::{Head, HeadId, NUM_HEADS};
use crate::hardware::value::DataValue;

/// Registers per thread.
pub const NUM_REGISTERS: usize = 8;

pub const AX: usize = 0;
pub const BX: usize = 1;
pub const CX: usize = 2;
pub const DX: usize = 3;

pub const REGISTER_NAMES: [&str; NUM_REGISTERS] = ["AX", "BX", "CX", "DX", "EX", "FX", "GX", "HX"];

/// Comparison a sleeping thread waits for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitKind {
    Equal,
    Less,
    Greater,
}

impl WaitKind {
    /// Whether a write of `check` satisfies a wait on `value`.
    pub fn holds(self, check: i32, value: i32) -> bool {
        match self {
            WaitKind::Equal => check == value,
            WaitKind::Less => check < value,
            WaitKind::Greater => check > value,
        }
    }
}

/// Why a thread is asleep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitCondition {
    pub kind: WaitKind,
    /// Register whose writes (by other threads) are checked.
    pub register: usize,
    /// Value captured when the thread went to sleep.
    pub value: i32,
    /// Register that receives the satisfying value on wake.
    pub dst: usize,
}

#[derive(Clone, Debug)]
pub struct ThreadContext {
    id: u32,
    pub(crate) registers: [DataValue; NUM_REGISTERS],
    pub(crate) heads: [Head; NUM_HEADS],
    pub(crate) stack: RingStack,
    pub(crate) active_stack: StackSelector,
    /// Label read by the instruction currently executing.
    pub(crate) label: Label,
    /// Nops copied right after the last `label` instruction.
    pub(crate) read_label: Label,
    /// Last run of nops copied.
    pub(crate) read_seq: Label,
    pub(crate) reading_label: bool,
    pub(crate) reading_seq: bool,
    pub(crate) wait: Option<WaitCondition>,
}

impl ThreadContext {
    pub fn new(id: u32, stack_size: usize) -> Self {
        Self {
            id,
            registers: [DataValue::default(); NUM_REGISTERS],
            heads: [Head::default(); NUM_HEADS],
            stack: RingStack::new(stack_size),
            active_stack: StackSelector::Local,
            label: Label::new(),
            read_label: Label::new(),
            read_seq: Label::new(),
            reading_label: false,
            reading_seq: false,
            wait: None,
        }
    }

    /// A new thread with this one's registers and heads and fresh everything else.
    pub fn spawn(&self, id: u32) -> Self {
        Self {
            registers: self.registers,
            heads: self.heads,
            ..Self::new(id, self.stack.capacity())
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new(self.id, self.stack.capacity());
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn register(&self, reg: usize) -> &DataValue {
        &self.registers[reg % NUM_REGISTERS]
    }

    pub fn registers(&self) -> &[DataValue; NUM_REGISTERS] {
        &self.registers
    }

    pub fn head(&self, head: HeadId) -> Head {
        self.heads[head as usize]
    }

    pub fn stack(&self) -> &RingStack {
        &self.stack
    }

    pub fn active_stack(&self) -> StackSelector {
        self.active_stack
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn read_label(&self) -> &Label {
        &self.read_label
    }

    pub fn read_seq(&self) -> &Label {
        &self.read_seq
    }

    pub fn wait_condition(&self) -> Option<&WaitCondition> {
        self.wait.as_ref()
    }

    pub fn is_waiting(&self) -> bool {
        self.wait.is_some()
    }

    /// Feeds a copied instruction into the read-label and read-sequence trackers.
    pub(crate) fn track_copied(&mut self, nop: Option<u8>, is_label: bool, max_label: usize) {
        if is_label {
            self.read_label.clear();
            self.reading_label = true;
        } else if let (true, Some(n)) = (self.reading_label, nop) {
            self.read_label.push_bounded(n, max_label);
        } else {
            self.reading_label = false;
        }

        match (self.reading_seq, nop) {
            (false, Some(n)) => {
                self.read_seq.clear();
                self.read_seq.push_bounded(n, max_label);
                self.reading_seq = true;
            }
            (true, Some(n)) => {
                self.read_seq.push_bounded(n, max_label);
            }
            (_, None) => self.reading_seq = false,
        }
    }
}
