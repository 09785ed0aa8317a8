//! The mutable instruction tape and the heads that index it.
//!
//! Every head position is kept modulo the current tape length; the engine
//! re-wraps all heads whenever the length changes.

use crate::hardware::genome::Genome;
use crate::hardware::inst_set::{Inst, InstSet};
use crate::hardware::label::Label;

/// Number of heads per thread.
pub const NUM_HEADS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum HeadId {
    Ip = 0,
    Read = 1,
    Write = 2,
    Flow = 3,
}

impl HeadId {
    pub const ALL: [HeadId; NUM_HEADS] = [HeadId::Ip, HeadId::Read, HeadId::Write, HeadId::Flow];

    /// Head named by a nop modifier; modifiers past FLOW wrap around.
    pub fn from_modifier(modifier: u8) -> Self {
        Self::ALL[modifier as usize % NUM_HEADS]
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            HeadId::Ip => "IP",
            HeadId::Read => "READ",
            HeadId::Write => "WRITE",
            HeadId::Flow => "FLOW",
        }
    }
}

/// A position on the tape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Head(usize);

impl Head {
    pub fn position(self) -> usize {
        self.0
    }

    /// Moves to `pos` modulo `len`; negative positions count from the end.
    pub fn set(&mut self, pos: i64, len: usize) {
        self.0 = wrap(pos, len);
    }

    pub fn advance(&mut self, by: i64, len: usize) {
        self.0 = wrap(self.0 as i64 + by, len);
    }

    /// Re-wraps after the tape length changed.
    pub fn adjust(&mut self, len: usize) {
        self.0 = if len == 0 { 0 } else { self.0 % len };
    }
}

fn wrap(pos: i64, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        pos.rem_euclid(len as i64) as usize
    }
}

/// One tape cell: an opcode plus the bookkeeping flags used by replication.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    pub inst: Inst,
    /// Written by a copy since the last divide.
    pub copied: bool,
    /// Executed (or consumed as a modifier) since the last divide.
    pub executed: bool,
    /// Altered by a mutation.
    pub mutated: bool,
}

impl Cell {
    pub fn new(inst: Inst) -> Self {
        Self {
            inst,
            ..Self::default()
        }
    }
}

/// What a search looks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchKind {
    /// A `label` instruction followed by the pattern.
    Label,
    /// The pattern at the start of a nop run.
    Sequence,
}

/// Where a search starts and which way it walks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// From position 0 up to the searching instruction.
    Start,
    /// From just past the searching instruction, wrapping around.
    Forward,
    /// From just before the searching instruction, wrapping around.
    Backward,
}

/// A matched run of nops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LabelMatch {
    pub start: usize,
    pub len: usize,
}

impl LabelMatch {
    /// Position of the last matched nop.
    pub fn last(&self) -> usize {
        self.start + self.len - 1
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenomeTape {
    cells: Vec<Cell>,
}

impl GenomeTape {
    pub fn from_genome(genome: &Genome) -> Self {
        Self {
            cells: genome.iter().map(Cell::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn wrap(&self, pos: i64) -> usize {
        wrap(pos, self.cells.len())
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cell at `pos` modulo the length. The tape is never empty while an engine runs.
    pub fn cell(&self, pos: usize) -> &Cell {
        let i = pos % self.cells.len().max(1);
        &self.cells[i]
    }

    pub fn cell_mut(&mut self, pos: usize) -> &mut Cell {
        let i = pos % self.cells.len().max(1);
        &mut self.cells[i]
    }

    pub fn inst(&self, pos: usize) -> Inst {
        self.cell(pos).inst
    }

    pub fn set_inst(&mut self, pos: usize, inst: Inst) {
        self.cell_mut(pos).inst = inst;
    }

    /// Appends fresh cells.
    pub fn extend<I: IntoIterator<Item = Inst>>(&mut self, insts: I) {
        self.cells.extend(insts.into_iter().map(Cell::new));
    }

    pub fn truncate(&mut self, len: usize) {
        self.cells.truncate(len);
    }

    /// Replaces the whole content, keeping flags.
    pub fn restore(&mut self, cells: Vec<Cell>) {
        self.cells = cells;
    }

    pub fn genome(&self) -> Genome {
        self.cells.iter().map(|c| c.inst).collect()
    }

    /// Opcodes of `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Vec<Inst> {
        self.cells[start..end].iter().map(|c| c.inst).collect()
    }

    pub fn clear_flags(&mut self) {
        for cell in &mut self.cells {
            cell.copied = false;
            cell.executed = false;
        }
    }

    pub fn count_executed(&self, start: usize, end: usize) -> usize {
        self.cells[start..end].iter().filter(|c| c.executed).count()
    }

    pub fn count_copied(&self, start: usize, end: usize) -> usize {
        self.cells[start..end].iter().filter(|c| c.copied).count()
    }

    /// Marks `count` cells starting at `start` as executed, wrapping.
    pub fn mark_executed(&mut self, start: usize, count: usize) {
        for i in 0..count {
            self.cell_mut(start + i).executed = true;
        }
    }

    /// Whether `pattern` sits at `pos` as the head of a match of `kind`.
    fn matches_at(&self, inst_set: &InstSet, pattern: &Label, kind: SearchKind, pos: usize) -> bool {
        let len = self.cells.len();
        if pos + pattern.len() > len {
            return false;
        }
        let preceded_ok = match kind {
            SearchKind::Label => pos > 0 && inst_set.is_label(self.cells[pos - 1].inst),
            SearchKind::Sequence => pos == 0 || !inst_set.is_nop(self.cells[pos - 1].inst),
        };
        preceded_ok
            && pattern
                .nops()
                .iter()
                .enumerate()
                .all(|(i, n)| inst_set.nop_mod(self.cells[pos + i].inst) == Some(*n))
    }

    /// Finds the first occurrence of `pattern` relative to the searching
    /// instruction, which together with its own label spans `origin.0..=origin.1`.
    /// Start searches scan the whole tape from position 0. Matches starting
    /// inside the origin span are ignored, and a match never straddles the end
    /// of the tape. Empty patterns never match.
    pub fn search(
        &self,
        inst_set: &InstSet,
        pattern: &Label,
        kind: SearchKind,
        direction: Direction,
        origin: (usize, usize),
    ) -> Option<LabelMatch> {
        let len = self.cells.len();
        if pattern.is_empty() || len == 0 {
            return None;
        }
        let (first, last) = (origin.0 % len, origin.1 % len);
        let span = if last >= first {
            last - first + 1
        } else {
            len - first + last + 1
        };
        let in_origin = |pos: usize| (pos + len - first) % len < span;
        let hit = |pos: usize| {
            (!in_origin(pos) && self.matches_at(inst_set, pattern, kind, pos)).then_some(LabelMatch {
                start: pos,
                len: pattern.len(),
            })
        };
        match direction {
            Direction::Start => (0..len).find_map(hit),
            Direction::Forward => (0..len.saturating_sub(span))
                .map(|k| (last + 1 + k) % len)
                .find_map(hit),
            Direction::Backward => (0..len.saturating_sub(span))
                .map(|k| (first + len - 1 - k) % len)
                .find_map(hit),
        }
    }
}
