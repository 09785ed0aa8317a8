//! Nop sequences used as labels and search keys.

use std::fmt;

/// Number of distinct nop instructions, and so of nop modifier values.
pub const NUM_NOPS: usize = 8;

/// Letters used to print nop modifiers.
const NOP_LETTERS: [char; NUM_NOPS] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];

/// An ordered run of nop modifiers (`0..NUM_NOPS`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Label {
    nops: Vec<u8>,
}

impl Label {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nops(nops: &[u8]) -> Self {
        Self {
            nops: nops.iter().map(|n| n % NUM_NOPS as u8).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.nops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nops.is_empty()
    }

    pub fn nops(&self) -> &[u8] {
        &self.nops
    }

    pub fn clear(&mut self) {
        self.nops.clear();
    }

    /// Appends `nop` unless the label already holds `max` modifiers.
    pub fn push_bounded(&mut self, nop: u8, max: usize) -> bool {
        if self.nops.len() >= max {
            return false;
        }
        self.nops.push(nop % NUM_NOPS as u8);
        true
    }

    /// Each modifier rotated by one: A becomes B, ..., H becomes A.
    pub fn complement(&self) -> Label {
        Label {
            nops: self
                .nops
                .iter()
                .map(|n| (n + 1) % NUM_NOPS as u8)
                .collect(),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nops.is_empty() {
            return write!(f, "(none)");
        }
        for (i, n) in self.nops.iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{}", NOP_LETTERS[*n as usize])?;
        }
        Ok(())
    }
}
