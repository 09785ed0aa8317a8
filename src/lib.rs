//! Threaded virtual CPU for self-replicating genomes.
//!
//! Provides the execution engine, its instruction set, the replication state
//! machine, and the small logging layer shared by the library and the `evo-run`
//! binary.

pub mod hardware;
pub mod utils;
