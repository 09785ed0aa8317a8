//! Allocation and division rules.
//!
//! A replication cycle runs through these phases:
//!
//! 1. **Growing**: `h-alloc` appends space and snapshots the tape.
//! 2. **DivideRequested**: `h-divide` names the divide point and the offspring end.
//! 3. **Validating**: lengths, executed share and copied share are checked
//!    ([`check_viable`]).
//! 4. **Committed**: the offspring is cut off, mutated and handed to the
//!    organism, and the parent engine is reset; or **RolledBack**: the
//!    snapshot is restored and the organism continues.

use crate::hardware::config::EngineConfig;
use crate::hardware::inst_set::{Inst, InstSet};
use crate::hardware::tape::Cell;
use evo_cpu_derive::Error;
use rand::{Rng, RngCore};

/// Where an engine is in its replication cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReplicationState {
    #[default]
    Idle,
    /// Space has been allocated on top of a parent of `parent_len` lines.
    Growing { parent_len: usize },
}

/// Tape contents saved by `h-alloc` so a failed divide can undo the growth.
#[derive(Clone, Debug)]
pub(crate) struct Allocation {
    pub parent_len: usize,
    pub snapshot: Vec<Cell>,
}

/// Why a divide was rolled back.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DivideFailure {
    #[error("divide without a preceding allocation")]
    NotAllocated,
    #[error("divide point {point} leaves no offspring on a tape of {len}")]
    InvalidDividePoint { point: usize, len: usize },
    #[error("offspring length {len} is below the minimum {min}")]
    ChildTooSmall { len: usize, min: usize },
    #[error("offspring length {len} is above the maximum {max}")]
    ChildTooLarge { len: usize, max: usize },
    #[error("parent length {len} is below the minimum {min}")]
    ParentTooSmall { len: usize, min: usize },
    #[error("parent length {len} is above the maximum {max}")]
    ParentTooLarge { len: usize, max: usize },
    #[error("{executed} of {len} parent lines executed, {required} required")]
    TooFewExecuted {
        executed: usize,
        len: usize,
        required: usize,
    },
    #[error("{copied} of {len} offspring lines copied, {required} required")]
    TooFewCopied {
        copied: usize,
        len: usize,
        required: usize,
    },
}

/// Per-organism mutation probabilities.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MutationRates {
    /// Per copied instruction.
    pub copy: f64,
    /// Per offspring site, at divide.
    pub point: f64,
    /// One insertion per divide.
    pub insertion: f64,
    /// One deletion per divide.
    pub deletion: f64,
}

/// Bernoulli trial that tolerates probabilities outside `0..=1`.
pub(crate) fn chance(rng: &mut dyn RngCore, p: f64) -> bool {
    p > 0.0 && rng.gen_range(0.0..1.0) < p
}

/// Smallest and largest legal length for offspring and parent.
pub fn size_bounds(config: &EngineConfig, genome_len: usize) -> (usize, usize) {
    let min = config
        .min_genome_size
        .max((genome_len as f64 * config.min_offspring_fraction) as usize);
    let max = config
        .max_genome_size
        .min((genome_len as f64 * config.max_offspring_fraction) as usize);
    (min, max)
}

/// Largest legal `h-alloc` request for a tape of `len` lines.
pub fn max_alloc(config: &EngineConfig, len: usize) -> usize {
    ((config.max_offspring_fraction * len as f64) as usize)
        .min(config.max_genome_size.saturating_sub(len))
}

/// Checks an allocation of `size` lines on top of `len`.
pub fn alloc_allowed(config: &EngineConfig, len: usize, size: usize) -> bool {
    size >= 1
        && len + size <= config.max_genome_size
        && size as f64 <= len as f64 * config.max_offspring_fraction
        && size as f64 >= len as f64 * config.min_offspring_fraction
}

/// Checks a pending divide. `genome_len` is the length the parent was born with.
pub fn check_viable(
    config: &EngineConfig,
    genome_len: usize,
    parent_len: usize,
    child_len: usize,
    executed: usize,
    copied: usize,
) -> Result<(), DivideFailure> {
    let (min, max) = size_bounds(config, genome_len);
    if child_len < min {
        return Err(DivideFailure::ChildTooSmall { len: child_len, min });
    }
    if child_len > max {
        return Err(DivideFailure::ChildTooLarge { len: child_len, max });
    }
    if parent_len < min {
        return Err(DivideFailure::ParentTooSmall { len: parent_len, min });
    }
    if parent_len > max {
        return Err(DivideFailure::ParentTooLarge { len: parent_len, max });
    }

    let required = (parent_len as f64 * config.min_exe_fraction) as usize;
    if executed < required {
        return Err(DivideFailure::TooFewExecuted {
            executed,
            len: parent_len,
            required,
        });
    }
    let required = (child_len as f64 * config.min_copied_fraction) as usize;
    if copied < required {
        return Err(DivideFailure::TooFewCopied {
            copied,
            len: child_len,
            required,
        });
    }
    Ok(())
}

/// Applies divide mutations to an offspring. Insertions and deletions keep the
/// length within `min_len..=max_len`. Returns the number of changes.
pub fn divide_mutations(
    child: &mut Vec<Inst>,
    rates: &MutationRates,
    inst_set: &InstSet,
    rng: &mut dyn RngCore,
    min_len: usize,
    max_len: usize,
) -> usize {
    let mut changes = 0;
    for inst in child.iter_mut() {
        if chance(rng, rates.point) {
            *inst = inst_set.random_inst(rng);
            changes += 1;
        }
    }
    if chance(rng, rates.insertion) && child.len() < max_len {
        let at = rng.gen_range(0..=child.len());
        child.insert(at, inst_set.random_inst(rng));
        changes += 1;
    }
    if chance(rng, rates.deletion) && child.len() > min_len.max(1) {
        let at = rng.gen_range(0..child.len());
        child.remove(at);
        changes += 1;
    }
    changes
}
