//! Capabilities the engine consumes from its surroundings.
//!
//! The engine never owns the organism or the world. Both are lent to it for
//! one cycle at a time through an [`ExecContext`].

use crate::hardware::genome::Genome;
use crate::hardware::inst_set::Inst;
use crate::hardware::replication::{DivideFailure, MutationRates};
use rand::RngCore;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Result of a replication attempt, delivered to [`Organism::reproduce`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReproductionOutcome {
    Offspring(Genome),
    Failed(DivideFailure),
}

/// The organism that owns an engine: cost accounting, mutation policy, task
/// input/output, reproduction and death.
pub trait Organism {
    /// Called before each instruction with its configured cost. Returning
    /// `false` stalls the current thread for this cycle.
    fn pay_cost(&mut self, inst: Inst, cost: u32) -> bool;
    fn mutation_rates(&self) -> MutationRates;
    /// Next value from the environment's input buffer.
    fn input(&mut self) -> i32;
    fn output(&mut self, value: i32);
    fn reproduce(&mut self, outcome: ReproductionOutcome);
    fn die(&mut self);
    fn is_dead(&self) -> bool;
}

/// Randomness and environment queries.
pub trait World {
    fn rng(&mut self) -> &mut dyn RngCore;
    /// Reads sensor `channel`. Worlds without sensors report zero.
    fn sense(&mut self, _channel: i32) -> i32 {
        0
    }
}

/// Per-cycle view of the organism and world handed to instruction handlers.
pub struct ExecContext<'a> {
    pub organism: &'a mut dyn Organism,
    pub world: &'a mut dyn World,
}

impl<'a> ExecContext<'a> {
    pub fn new(organism: &'a mut dyn Organism, world: &'a mut dyn World) -> Self {
        Self { organism, world }
    }
}

/// Organism that records everything it is told. Used by `evo-run` and tests.
#[derive(Clone, Debug, Default)]
pub struct BasicOrganism {
    pub rates: MutationRates,
    /// Input buffer, read cyclically.
    pub inputs: Vec<i32>,
    next_input: usize,
    pub outputs: Vec<i32>,
    pub offspring: Vec<Genome>,
    pub failures: Vec<DivideFailure>,
    dead: bool,
    /// Cycles still owed for the instruction being paid for.
    owed: u32,
}

impl BasicOrganism {
    pub fn new(inputs: Vec<i32>) -> Self {
        Self {
            inputs,
            ..Self::default()
        }
    }

    pub fn with_rates(mut self, rates: MutationRates) -> Self {
        self.rates = rates;
        self
    }
}

impl Organism for BasicOrganism {
    /// An instruction of cost `n` runs on the `n`-th consecutive request.
    fn pay_cost(&mut self, _inst: Inst, cost: u32) -> bool {
        match self.owed {
            0 if cost <= 1 => true,
            0 => {
                self.owed = cost - 1;
                false
            }
            1 => {
                self.owed = 0;
                true
            }
            n => {
                self.owed = n - 1;
                false
            }
        }
    }

    fn mutation_rates(&self) -> MutationRates {
        self.rates
    }

    fn input(&mut self) -> i32 {
        if self.inputs.is_empty() {
            return 0;
        }
        let value = self.inputs[self.next_input % self.inputs.len()];
        self.next_input = (self.next_input + 1) % self.inputs.len();
        value
    }

    fn output(&mut self, value: i32) {
        self.outputs.push(value);
    }

    fn reproduce(&mut self, outcome: ReproductionOutcome) {
        match outcome {
            ReproductionOutcome::Offspring(genome) => self.offspring.push(genome),
            ReproductionOutcome::Failed(reason) => self.failures.push(reason),
        }
    }

    fn die(&mut self) {
        self.dead = true;
    }

    fn is_dead(&self) -> bool {
        self.dead
    }
}

/// World backed by a seeded RNG and a single constant sensor reading.
pub struct SeededWorld {
    rng: StdRng,
    sensor: i32,
}

impl SeededWorld {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            sensor: 0,
        }
    }

    pub fn with_sensor(mut self, reading: i32) -> Self {
        self.sensor = reading;
        self
    }
}

impl World for SeededWorld {
    fn rng(&mut self) -> &mut dyn RngCore {
        &mut self.rng
    }

    fn sense(&mut self, channel: i32) -> i32 {
        self.sensor.wrapping_add(channel)
    }
}
