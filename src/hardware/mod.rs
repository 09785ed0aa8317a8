//! Virtual CPU for self-replicating digital organisms.
//!
//! A genome is a sequence of opcodes from an [`InstSet`]. The [`Engine`] loads it
//! onto a mutable tape and runs it one instruction per cycle, across one or more
//! cooperative threads. Organisms copy themselves with an allocate / copy /
//! divide loop; the engine validates each divide and hands the offspring genome
//! to the owning [`Organism`].
//!
//! # Architecture
//!
//! - **Tape**: opcodes plus per-cell copied/executed/mutated flags, indexed by
//!   four heads per thread (IP, READ, WRITE, FLOW), all wrapping
//! - **Registers**: eight per thread, each a [`DataValue`] carrying provenance
//!   (origination cycle, oldest ancestor, input/sensor ancestry)
//! - **Stacks**: a ring stack per thread plus one shared by the organism
//! - **Addressing**: nops following an instruction override its default
//!   register or head; runs of nops form labels for searches and jumps
//! - **Scheduling**: round-robin or sticky, threads may sleep on wait conditions
//! - **Replication**: allocation snapshots the tape, divide commits or rolls back
//!
//! # Modules
//!
//! - [`engine`]: the execute loop and the built-in instruction handlers
//! - [`inst_set`] / [`isa`]: instruction registry and the built-in catalog
//! - [`tape`], [`thread`], [`stack`], [`value`], [`label`]: machine state
//! - [`replication`]: allocation and divide rules, mutations
//! - [`organism`]: the organism and world capabilities the engine consumes
//! - [`config`], [`loader`], [`errors`]: configuration, file loading, diagnostics
//! - [`profile`], [`trace`]: execution counters and status dumps
//! - [`variant`]: hardware selection for outer simulation loops

pub mod config;
pub mod engine;
pub mod errors;
pub mod genome;
pub mod inst_set;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod label;
pub mod loader;
pub mod organism;
pub mod profile;
pub mod replication;
pub mod stack;
pub mod tape;
pub mod thread;
pub mod trace;
pub mod value;
pub mod variant;

pub use config::EngineConfig;
pub use engine::Engine;
pub use errors::HardwareError;
pub use genome::Genome;
pub use inst_set::{Inst, InstSet, InstSetBuilder};
pub use organism::{BasicOrganism, ExecContext, Organism, ReproductionOutcome, SeededWorld, World};
pub use value::DataValue;
pub use variant::{Hardware, HardwareKind, create_hardware};
