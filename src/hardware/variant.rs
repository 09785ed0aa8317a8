//! Hardware variant selection.
//!
//! An outer loop drives organisms through the [`Hardware`] trait and picks the
//! implementation once, by [`HardwareKind`]. The threaded [`Engine`] is the
//! only variant provided here.

use crate::hardware::config::EngineConfig;
use crate::hardware::engine::Engine;
use crate::hardware::errors::HardwareError;
use crate::hardware::genome::Genome;
use crate::hardware::inst_set::InstSet;
use crate::hardware::organism::ExecContext;
use crate::hardware::profile::ExecProfile;
use crate::hardware::replication::ReplicationState;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// What an outer simulation loop needs from a virtual CPU.
pub trait Hardware: Send {
    fn kind(&self) -> HardwareKind;

    /// Runs one instruction. Returns `false` when nothing executed this cycle.
    fn single_process(&mut self, ctx: &mut ExecContext<'_>) -> bool;

    /// Runs up to `cycles` cycles, stopping early once the organism dies.
    /// Returns the number of cycles used, counting cycles that stalled on an
    /// unpaid cost or found every thread asleep.
    fn process(&mut self, ctx: &mut ExecContext<'_>, cycles: u64) -> u64 {
        let mut run = 0;
        while run < cycles && !ctx.organism.is_dead() {
            self.single_process(ctx);
            run += 1;
        }
        run
    }

    fn reset(&mut self);
    fn genome(&self) -> Genome;
    fn replication_state(&self) -> ReplicationState;
    fn profile(&self) -> &ExecProfile;
    fn total_cycles(&self) -> u64;
    /// Multi-line state dump.
    fn status_text(&self) -> String;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HardwareKind {
    /// Multi-threaded four-head CPU.
    #[default]
    Threaded,
}

impl HardwareKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            HardwareKind::Threaded => "threaded",
        }
    }
}

impl fmt::Display for HardwareKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HardwareKind {
    type Err = HardwareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "threaded" | "0" => Ok(HardwareKind::Threaded),
            other => Err(HardwareError::UnknownHardware(other.to_string())),
        }
    }
}

impl Hardware for Engine {
    fn kind(&self) -> HardwareKind {
        HardwareKind::Threaded
    }

    fn single_process(&mut self, ctx: &mut ExecContext<'_>) -> bool {
        Engine::single_process(self, ctx)
    }

    fn reset(&mut self) {
        Engine::reset(self)
    }

    fn genome(&self) -> Genome {
        Engine::genome(self)
    }

    fn replication_state(&self) -> ReplicationState {
        Engine::replication_state(self)
    }

    fn profile(&self) -> &ExecProfile {
        Engine::profile(self)
    }

    fn total_cycles(&self) -> u64 {
        Engine::total_cycles(self)
    }

    fn status_text(&self) -> String {
        self.status().to_string()
    }
}

/// Builds the hardware of `kind` loaded with `genome`.
pub fn create_hardware(
    kind: HardwareKind,
    inst_set: Arc<InstSet>,
    config: EngineConfig,
    genome: &Genome,
) -> Result<Box<dyn Hardware>, HardwareError> {
    match kind {
        HardwareKind::Threaded => Ok(Box::new(Engine::new(inst_set, config, genome)?)),
    }
}
