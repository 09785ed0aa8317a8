//! Per-category execution counters.

/// Number of categories tracked by [`ExecProfile`].
const CATEGORY_COUNT: usize = 10;

/// Coarse grouping of instructions used for profiling.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum InstCategory {
    /// Conditionals, labels and jumps.
    Flow = 0,
    /// Stack pushes, pops and selection.
    Stack = 1,
    /// Register arithmetic and bit twiddling.
    Arithmetic = 2,
    /// Environment input and output.
    Io = 3,
    /// Head movement, reads, writes and copies.
    Head = 4,
    /// Label and nop-sequence searches.
    Search = 5,
    /// Thread creation, exit and synchronization.
    Thread = 6,
    /// Allocation, division and death.
    Replication = 7,
    /// Nop modifiers executed as instructions.
    Nop = 8,
    /// Handlers registered from outside the crate.
    External = 9,
}

impl InstCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            InstCategory::Flow => "Flow",
            InstCategory::Stack => "Stack",
            InstCategory::Arithmetic => "Arithmetic",
            InstCategory::Io => "IO",
            InstCategory::Head => "Head",
            InstCategory::Search => "Search",
            InstCategory::Thread => "Thread",
            InstCategory::Replication => "Replication",
            InstCategory::Nop => "Nop",
            InstCategory::External => "External",
        }
    }

    /// All categories in discriminant order.
    pub const ALL: [InstCategory; CATEGORY_COUNT] = [
        InstCategory::Flow,
        InstCategory::Stack,
        InstCategory::Arithmetic,
        InstCategory::Io,
        InstCategory::Head,
        InstCategory::Search,
        InstCategory::Thread,
        InstCategory::Replication,
        InstCategory::Nop,
        InstCategory::External,
    ];
}

/// Counts of executed and failed instructions per [`InstCategory`].
///
/// Instructions that stalled on their cost are not counted; instructions that
/// failed through their failure probability count as failed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecProfile {
    executed: [u64; CATEGORY_COUNT],
    failed: [u64; CATEGORY_COUNT],
}

impl ExecProfile {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn record(&mut self, category: InstCategory, succeeded: bool) {
        let slot = &mut self.executed[category as usize];
        *slot = slot.saturating_add(1);
        if !succeeded {
            let slot = &mut self.failed[category as usize];
            *slot = slot.saturating_add(1);
        }
    }

    pub fn executed(&self, category: InstCategory) -> u64 {
        self.executed[category as usize]
    }

    pub fn failed(&self, category: InstCategory) -> u64 {
        self.failed[category as usize]
    }

    pub fn total_executed(&self) -> u64 {
        self.executed
            .iter()
            .fold(0u64, |acc, &v| acc.saturating_add(v))
    }

    pub fn total_failed(&self) -> u64 {
        self.failed.iter().fold(0u64, |acc, &v| acc.saturating_add(v))
    }

    /// `(category, executed, failed)` for every category.
    pub fn iter(&self) -> impl Iterator<Item = (InstCategory, u64, u64)> + '_ {
        InstCategory::ALL
            .into_iter()
            .map(|c| (c, self.executed(c), self.failed(c)))
    }
}
