//! The fetch-decode-execute engine.
//!
//! An [`Engine`] owns one organism's tape, its threads and the stack they share.
//! Each call to [`Engine::single_process`] runs one instruction of one thread:
//!
//! 1. pick the thread (round-robin or sticky, skipping sleeping threads)
//! 2. fetch the instruction under its IP
//! 3. let the organism charge the instruction's cost (a refusal stalls the thread)
//! 4. roll the instruction's failure probability
//! 5. dispatch to the handler, which may consume following nops as operands
//! 6. advance the IP unless the handler moved it itself
//!
//! Handlers reach the engine through the public accessors below, so handlers
//! registered from outside the crate have the same view as the built-in ones.

pub(crate) mod handlers;
#[cfg(test)]
mod tests;

use crate::hardware::config::{AllocMethod, EngineConfig, SchedulingPolicy};
use crate::hardware::errors::HardwareError;
use crate::hardware::genome::Genome;
use crate::hardware::inst_set::{Inst, InstSet};
use crate::hardware::label::Label;
use crate::hardware::organism::{ExecContext, ReproductionOutcome};
use crate::hardware::profile::ExecProfile;
use crate::hardware::replication::{
    self, Allocation, DivideFailure, ReplicationState, chance, check_viable,
};
use crate::hardware::stack::{RingStack, StackSelector};
use crate::hardware::tape::{GenomeTape, Head, HeadId};
use crate::hardware::thread::{NUM_REGISTERS, ThreadContext};
use crate::hardware::trace::StatusDump;
use crate::hardware::value::{Age, DataValue};
use crate::{debug, info};
use std::sync::Arc;

pub struct Engine {
    inst_set: Arc<InstSet>,
    config: EngineConfig,
    tape: GenomeTape,
    /// Length of the genome the organism was born with.
    genome_len: usize,
    global_stack: RingStack,
    threads: Vec<ThreadContext>,
    cur_thread: usize,
    next_thread_id: u32,
    allocation: Option<Allocation>,
    /// Lines cut off by the last successful divide, reused by necro allocation.
    dead_tail: Vec<Inst>,
    advance_ip: bool,
    /// Cycles since birth or the last divide; stamps every written value.
    cycle_count: u64,
    total_cycles: u64,
    last_output: Age,
    profile: ExecProfile,
}

impl Engine {
    pub fn new(
        inst_set: Arc<InstSet>,
        config: EngineConfig,
        genome: &Genome,
    ) -> Result<Self, HardwareError> {
        config.validate()?;
        if genome.is_empty() {
            return Err(HardwareError::EmptyGenome);
        }
        if genome.len() > config.max_genome_size {
            return Err(HardwareError::GenomeSize {
                len: genome.len(),
                min: 1,
                max: config.max_genome_size,
            });
        }
        if let Some((position, inst)) = genome
            .iter()
            .enumerate()
            .find(|(_, inst)| !inst_set.is_valid(*inst))
        {
            return Err(HardwareError::InvalidOpcode {
                opcode: inst.0,
                position,
            });
        }

        let mut engine = Self {
            global_stack: RingStack::new(config.stack_size),
            tape: GenomeTape::from_genome(genome),
            genome_len: genome.len(),
            inst_set,
            config,
            threads: Vec::new(),
            cur_thread: 0,
            next_thread_id: 0,
            allocation: None,
            dead_tail: Vec::new(),
            advance_ip: true,
            cycle_count: 0,
            total_cycles: 0,
            last_output: Age::default(),
            profile: ExecProfile::new(),
        };
        engine.reset();
        Ok(engine)
    }

    /// Back to a single fresh thread at position 0 with cleared stacks and flags.
    /// The tape content itself is kept.
    pub fn reset(&mut self) {
        self.threads = vec![ThreadContext::new(0, self.config.stack_size)];
        self.cur_thread = 0;
        self.next_thread_id = 1;
        self.global_stack.clear();
        self.tape.clear_flags();
        self.genome_len = self.tape.len();
        self.allocation = None;
        self.advance_ip = true;
        self.cycle_count = 0;
        self.last_output = Age::default();
    }

    /// Runs one instruction of one thread. Returns `false` when nothing ran:
    /// every thread is asleep or the organism refused to pay for the instruction.
    pub fn single_process(&mut self, ctx: &mut ExecContext<'_>) -> bool {
        self.cycle_count += 1;
        self.total_cycles += 1;

        if self.schedule().is_none() {
            return false;
        }
        self.advance_ip = true;

        let ip = self.head(HeadId::Ip).position();
        let inst = self.tape.inst(ip);
        if !ctx.organism.pay_cost(inst, self.inst_set.cost(inst)) {
            return false;
        }

        self.tape.cell_mut(ip).executed = true;
        let prob_fail = self.inst_set.prob_fail(inst);
        let handler = self.inst_set.handler(inst);
        let succeeded = if prob_fail > 0.0 && chance(ctx.world.rng(), prob_fail) {
            false
        } else {
            handler.is_some_and(|handler| handler(self, ctx))
        };

        if self.config.trace {
            debug!(
                "cycle {} thread {} ip {:>4} {:<20} {}",
                self.total_cycles,
                self.threads[self.cur_thread].id(),
                ip,
                self.inst_set.name(inst),
                if succeeded { "ok" } else { "failed" }
            );
        }
        self.profile.record(self.inst_set.category(inst), succeeded);

        if self.advance_ip {
            self.advance_head(HeadId::Ip, 1);
        }
        true
    }

    /// Picks the thread that runs this cycle and makes it current.
    fn schedule(&mut self) -> Option<usize> {
        let n = self.threads.len();
        if self.config.scheduling == SchedulingPolicy::Sticky
            && !self.threads[self.cur_thread].is_waiting()
        {
            return Some(self.cur_thread);
        }
        let next = (1..=n)
            .map(|step| (self.cur_thread + step) % n)
            .find(|&i| !self.threads[i].is_waiting())?;
        self.cur_thread = next;
        Some(next)
    }

    // ==================== Accessors ====================

    pub fn inst_set(&self) -> &InstSet {
        &self.inst_set
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tape(&self) -> &GenomeTape {
        &self.tape
    }

    /// Current tape content as a genome.
    pub fn genome(&self) -> Genome {
        self.tape.genome()
    }

    pub fn genome_len(&self) -> usize {
        self.genome_len
    }

    pub fn threads(&self) -> &[ThreadContext] {
        &self.threads
    }

    pub fn current_thread(&self) -> &ThreadContext {
        &self.threads[self.cur_thread]
    }

    pub fn current_thread_index(&self) -> usize {
        self.cur_thread
    }

    pub fn global_stack(&self) -> &RingStack {
        &self.global_stack
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Age stamp for values written this cycle.
    pub fn now(&self) -> Age {
        Age::new(self.cycle_count)
    }

    pub fn profile(&self) -> &ExecProfile {
        &self.profile
    }

    pub fn replication_state(&self) -> ReplicationState {
        match &self.allocation {
            Some(a) => ReplicationState::Growing {
                parent_len: a.parent_len,
            },
            None => ReplicationState::Idle,
        }
    }

    pub fn status(&self) -> StatusDump<'_> {
        StatusDump::new(self)
    }

    // ==================== Registers ====================

    /// Register of the current thread.
    pub fn register(&self, reg: usize) -> &DataValue {
        self.threads[self.cur_thread].register(reg)
    }

    /// Writes a register of the current thread and wakes any thread waiting on it.
    pub fn set_register(&mut self, reg: usize, value: DataValue) {
        let reg = reg % NUM_REGISTERS;
        let cur = self.cur_thread;
        self.threads[cur].registers[reg] = value;
        self.wake_waiting_threads(cur, reg);
    }

    /// Wakes threads whose wait condition is met by `writer`'s `reg`, then
    /// repeats for the registers those wakes write.
    fn wake_waiting_threads(&mut self, writer: usize, reg: usize) {
        let now = self.now();
        let mut pending = vec![(writer, reg)];
        while let Some((writer, reg)) = pending.pop() {
            let written = self.threads[writer].registers[reg];
            for i in 0..self.threads.len() {
                if i == writer {
                    continue;
                }
                let Some(cond) = self.threads[i].wait else {
                    continue;
                };
                if cond.register != reg || !cond.kind.holds(written.value, cond.value) {
                    continue;
                }
                self.threads[i].wait = None;
                self.threads[i].registers[cond.dst] =
                    DataValue::derived(written.value, now, &written);
                pending.push((i, cond.dst));
            }
        }
    }

    // ==================== Heads ====================

    /// Head of the current thread.
    pub fn head(&self, head: HeadId) -> Head {
        self.threads[self.cur_thread].heads[head as usize]
    }

    pub fn set_head(&mut self, head: HeadId, pos: i64) {
        let len = self.tape.len();
        self.threads[self.cur_thread].heads[head as usize].set(pos, len);
    }

    pub fn advance_head(&mut self, head: HeadId, by: i64) {
        let len = self.tape.len();
        self.threads[self.cur_thread].heads[head as usize].advance(by, len);
    }

    /// Keeps the IP where the handler left it.
    pub fn suppress_ip_advance(&mut self) {
        self.advance_ip = false;
    }

    /// Skips the instruction after the IP.
    pub fn skip_next(&mut self) {
        self.advance_head(HeadId::Ip, 1);
    }

    /// Re-wraps every head of every thread after the tape length changed.
    fn adjust_heads(&mut self) {
        let len = self.tape.len();
        for thread in &mut self.threads {
            for head in &mut thread.heads {
                head.adjust(len);
            }
        }
    }

    // ==================== Operand modifiers ====================

    /// Consumes the nop after the IP, if there is one, and returns its modifier.
    pub fn take_modifier(&mut self) -> Option<u8> {
        let next = self.head(HeadId::Ip).position() + 1;
        let modifier = self.inst_set.nop_mod(self.tape.inst(next))?;
        self.advance_head(HeadId::Ip, 1);
        let ip = self.head(HeadId::Ip).position();
        self.tape.cell_mut(ip).executed = true;
        Some(modifier)
    }

    pub fn find_modified_register(&mut self, default: usize) -> usize {
        self.take_modifier()
            .map_or(default, |m| m as usize % NUM_REGISTERS)
    }

    /// Like [`find_modified_register`](Self::find_modified_register) with the
    /// register after `reg` as default.
    pub fn find_modified_next_register(&mut self, reg: usize) -> usize {
        self.find_modified_register((reg + 1) % NUM_REGISTERS)
    }

    pub fn find_modified_head(&mut self, default: HeadId) -> HeadId {
        self.take_modifier()
            .map_or(default, HeadId::from_modifier)
    }

    /// Reads the nops after the IP into the current thread's label, moving the
    /// IP onto the last one. Only the first `max_label_exe_size` are marked
    /// executed.
    pub fn read_label(&mut self) -> Label {
        let max = self.config.max_label_size;
        let exe = self.config.max_label_exe_size;
        let cur = self.cur_thread;
        self.threads[cur].label.clear();
        while self.threads[cur].label.len() < max {
            let next = self.head(HeadId::Ip).position() + 1;
            let Some(modifier) = self.inst_set.nop_mod(self.tape.inst(next)) else {
                break;
            };
            self.advance_head(HeadId::Ip, 1);
            self.threads[cur].label.push_bounded(modifier, max);
            if self.threads[cur].label.len() <= exe {
                let ip = self.head(HeadId::Ip).position();
                self.tape.cell_mut(ip).executed = true;
            }
        }
        self.threads[cur].label.clone()
    }

    // ==================== Stacks ====================

    fn active_stack_mut(&mut self) -> &mut RingStack {
        let cur = self.cur_thread;
        match self.threads[cur].active_stack {
            StackSelector::Local => &mut self.threads[cur].stack,
            StackSelector::Global => &mut self.global_stack,
        }
    }

    pub fn stack_push(&mut self, value: DataValue) {
        self.active_stack_mut().push(value);
    }

    pub fn stack_pop(&mut self) -> DataValue {
        self.active_stack_mut().pop()
    }

    pub fn stack_peek(&self) -> DataValue {
        let thread = &self.threads[self.cur_thread];
        match thread.active_stack {
            StackSelector::Local => thread.stack.peek(),
            StackSelector::Global => self.global_stack.peek(),
        }
    }

    pub fn switch_stack(&mut self) {
        let thread = &mut self.threads[self.cur_thread];
        thread.active_stack = thread.active_stack.toggled();
    }

    pub fn flip_stack(&mut self) {
        self.active_stack_mut().flip();
    }

    // ==================== Threads ====================

    /// Appends a copy of the current thread. Returns its index, or `None` at
    /// the thread limit.
    fn fork_current(&mut self) -> Option<usize> {
        if self.threads.len() >= self.config.max_threads {
            debug!(
                "fork rejected: {} threads at limit {}",
                self.threads.len(),
                self.config.max_threads
            );
            return None;
        }
        let id = self.next_thread_id;
        self.next_thread_id = self.next_thread_id.wrapping_add(1);
        let child = self.threads[self.cur_thread].spawn(id);
        self.threads.push(child);
        Some(self.threads.len() - 1)
    }

    /// Removes the current thread unless no other thread could run afterwards.
    fn exit_current(&mut self) -> bool {
        let cur = self.cur_thread;
        let others_awake = self
            .threads
            .iter()
            .enumerate()
            .any(|(i, t)| i != cur && !t.is_waiting());
        if !others_awake {
            debug!("exit rejected: thread {} is the last runnable thread", self.threads[cur].id());
            return false;
        }
        self.threads.remove(cur);
        self.cur_thread = if cur == 0 { self.threads.len() - 1 } else { cur - 1 };
        self.advance_ip = false;
        true
    }

    // ==================== Replication ====================

    /// Grows the tape by `size` lines for an offspring.
    fn allocate(&mut self, ctx: &mut ExecContext<'_>, size: usize) -> bool {
        let len = self.tape.len();
        if self.allocation.is_some() || !replication::alloc_allowed(&self.config, len, size) {
            debug!("allocation of {} lines on {} rejected", size, len);
            return false;
        }
        let snapshot = self.tape.cells().to_vec();
        let default = self.inst_set.default_inst();
        let fill: Vec<Inst> = match self.config.alloc_method {
            AllocMethod::Default => vec![default; size],
            AllocMethod::Necro => (0..size)
                .map(|i| self.dead_tail.get(i).copied().unwrap_or(default))
                .collect(),
            AllocMethod::Random => (0..size)
                .map(|_| self.inst_set.random_inst(ctx.world.rng()))
                .collect(),
        };
        self.tape.extend(fill);
        self.allocation = Some(Allocation {
            parent_len: len,
            snapshot,
        });
        true
    }

    /// Undoes an active allocation, if any.
    fn abandon_allocation(&mut self) {
        if let Some(alloc) = self.allocation.take() {
            self.tape.restore(alloc.snapshot);
            self.adjust_heads();
        }
    }

    /// Splits `divide_pos..len - extra_lines` off as the offspring.
    fn divide(&mut self, ctx: &mut ExecContext<'_>, divide_pos: usize, extra_lines: usize) -> bool {
        match self.check_divide(divide_pos, extra_lines) {
            Ok(()) => {
                self.commit_divide(ctx, divide_pos, extra_lines);
                true
            }
            Err(reason) => {
                self.rollback_divide(&reason);
                ctx.organism.reproduce(ReproductionOutcome::Failed(reason));
                false
            }
        }
    }

    fn check_divide(&self, divide_pos: usize, extra_lines: usize) -> Result<(), DivideFailure> {
        if self.config.require_allocate && self.allocation.is_none() {
            return Err(DivideFailure::NotAllocated);
        }
        let len = self.tape.len();
        if divide_pos == 0 || divide_pos + extra_lines >= len {
            return Err(DivideFailure::InvalidDividePoint {
                point: divide_pos,
                len,
            });
        }
        let child_end = len - extra_lines;
        check_viable(
            &self.config,
            self.genome_len,
            divide_pos,
            child_end - divide_pos,
            self.tape.count_executed(0, divide_pos),
            self.tape.count_copied(divide_pos, child_end),
        )
    }

    fn commit_divide(&mut self, ctx: &mut ExecContext<'_>, divide_pos: usize, extra_lines: usize) {
        let len = self.tape.len();
        let mut child = self.tape.slice(divide_pos, len - extra_lines);
        let rates = ctx.organism.mutation_rates();
        let mutations = replication::divide_mutations(
            &mut child,
            &rates,
            &self.inst_set,
            ctx.world.rng(),
            self.config.min_genome_size,
            self.config.max_genome_size,
        );
        self.dead_tail = self.tape.slice(divide_pos, len);
        self.tape.truncate(divide_pos);
        info!(
            "divide at cycle {}: parent {} lines, offspring {} lines, {} mutations",
            self.total_cycles,
            divide_pos,
            child.len(),
            mutations
        );
        self.reset();
        self.advance_ip = false;
        ctx.organism
            .reproduce(ReproductionOutcome::Offspring(Genome::new(child)));
    }

    fn rollback_divide(&mut self, reason: &DivideFailure) {
        debug!("divide rolled back: {}", reason);
        self.abandon_allocation();
        if self.config.divide_failure_resets {
            self.reset();
            self.advance_ip = false;
        }
    }

    /// Copies `inst` subject to the organism's copy mutation rate.
    fn copy_mutate(&self, ctx: &mut ExecContext<'_>, inst: Inst) -> (Inst, bool) {
        let rate = ctx.organism.mutation_rates().copy;
        if chance(ctx.world.rng(), rate) {
            (self.inst_set.random_inst(ctx.world.rng()), true)
        } else {
            (inst, false)
        }
    }

    /// Feeds a copied instruction to the current thread's copy trackers.
    fn track_copied(&mut self, inst: Inst) {
        let nop = self.inst_set.nop_mod(inst);
        let is_label = self.inst_set.is_label(inst);
        let max = self.config.max_label_size;
        self.threads[self.cur_thread].track_copied(nop, is_label, max);
    }
}
