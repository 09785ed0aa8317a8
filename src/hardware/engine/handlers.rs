//! Built-in instruction handlers.
//!
//! Each handler reads its operands through the engine's modifier helpers, so a
//! nop directly after the instruction is consumed as an operand override. A
//! handler returns `false` when the instruction failed; the IP still advances.

use crate::hardware::engine::Engine;
use crate::hardware::label::Label;
use crate::hardware::organism::{ExecContext, ReproductionOutcome};
use crate::hardware::replication::{self, DivideFailure, size_bounds};
use crate::hardware::genome::Genome;
use crate::hardware::tape::{Direction, HeadId, LabelMatch, SearchKind};
use crate::hardware::thread::{AX, BX, CX, DX, NUM_REGISTERS, WaitCondition, WaitKind};
use crate::hardware::value::DataValue;
use crate::debug;
use rand::Rng;

const LOW_24: i32 = 0x00FF_FFFF;

/// Random register content: a non-negative `i32`.
fn random_value(ctx: &mut ExecContext<'_>) -> i32 {
    ctx.world.rng().gen_range(0..=i32::MAX)
}

fn ones(value: i32) -> u32 {
    value.count_ones()
}

fn ones_24(value: i32) -> u32 {
    (value & LOW_24).count_ones()
}

/// Skips the next instruction unless `condition` holds. Conditionals never fail.
fn skip_unless(engine: &mut Engine, condition: bool) -> bool {
    if !condition {
        engine.skip_next();
    }
    true
}

/// Reads the `?BX? ?next?` operand pair.
fn register_pair(engine: &mut Engine) -> (DataValue, DataValue) {
    let op1 = engine.find_modified_register(BX);
    let op2 = engine.find_modified_next_register(op1);
    (*engine.register(op1), *engine.register(op2))
}

// ==================== Nops and labels ====================

pub fn nop(_: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    true
}

pub fn label(_: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    true
}

// ==================== Conditionals ====================

pub fn if_n_equ(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let (a, b) = register_pair(engine);
    skip_unless(engine, a.value != b.value)
}

pub fn if_less(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let (a, b) = register_pair(engine);
    skip_unless(engine, a.value < b.value)
}

fn if_single(engine: &mut Engine, test: fn(i32) -> bool) -> bool {
    let reg = engine.find_modified_register(BX);
    let value = engine.register(reg).value;
    skip_unless(engine, test(value))
}

pub fn if_not_0(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    if_single(engine, |v| v != 0)
}

pub fn if_equ_0(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    if_single(engine, |v| v == 0)
}

pub fn if_gtr_0(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    if_single(engine, |v| v > 0)
}

pub fn if_less_0(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    if_single(engine, |v| v < 0)
}

/// Constant named by the following nop: A is -2, B is -1, ..., H is 5. Zero
/// without a nop.
fn nop_constant(engine: &mut Engine) -> i32 {
    engine.take_modifier().map_or(0, |m| m as i32 - 2)
}

pub fn if_gtr_x(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let x = nop_constant(engine);
    let value = engine.register(BX).value;
    skip_unless(engine, value > x)
}

pub fn if_equ_x(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let x = nop_constant(engine);
    let value = engine.register(BX).value;
    skip_unless(engine, value == x)
}

pub fn if_cons(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    if_single(engine, |v| ones(v) >= 16)
}

pub fn if_cons_24(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    if_single(engine, |v| ones_24(v) >= 12)
}

pub fn if_less_cons(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let (a, b) = register_pair(engine);
    skip_unless(engine, ones(a.value) < ones(b.value))
}

pub fn if_less_cons_24(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let (a, b) = register_pair(engine);
    skip_unless(engine, ones_24(a.value) < ones_24(b.value))
}

pub fn if_stk_gtr(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let reg = engine.find_modified_register(BX);
    let value = engine.register(reg).value;
    let top = engine.stack_peek().value;
    skip_unless(engine, value > top)
}

// ==================== Stacks ====================

pub fn pop(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let reg = engine.find_modified_register(BX);
    let value = engine.stack_pop();
    let now = engine.now();
    engine.set_register(reg, DataValue::derived(value.value, now, &value));
    true
}

pub fn push(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let reg = engine.find_modified_register(BX);
    let value = *engine.register(reg);
    engine.stack_push(value);
    true
}

pub fn push_all(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let start = engine.find_modified_register(AX);
    for i in 0..NUM_REGISTERS {
        let value = *engine.register((start + i) % NUM_REGISTERS);
        engine.stack_push(value);
    }
    true
}

pub fn pop_all(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let start = engine.find_modified_register(AX);
    for i in (0..NUM_REGISTERS).rev() {
        let value = engine.stack_pop();
        let now = engine.now();
        engine.set_register(
            (start + i) % NUM_REGISTERS,
            DataValue::derived(value.value, now, &value),
        );
    }
    true
}

pub fn switch_stack(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    engine.switch_stack();
    true
}

pub fn swap_stack_top(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    engine.flip_stack();
    true
}

pub fn swap(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let op1 = engine.find_modified_register(BX);
    let op2 = engine.find_modified_next_register(op1);
    let (a, b) = (*engine.register(op1), *engine.register(op2));
    engine.set_register(op1, b);
    engine.set_register(op2, a);
    true
}

// ==================== Arithmetic ====================

/// Rewrites `?BX?` from its own value.
fn unary(engine: &mut Engine, op: fn(i32) -> i32) -> bool {
    let reg = engine.find_modified_register(BX);
    let src = *engine.register(reg);
    let now = engine.now();
    engine.set_register(reg, DataValue::derived(op(src.value), now, &src));
    true
}

/// Sets `?BX?` to a value built from nothing.
fn constant(engine: &mut Engine, value: i32) -> bool {
    let reg = engine.find_modified_register(BX);
    let now = engine.now();
    engine.set_register(reg, DataValue::fresh(value, now));
    true
}

/// `dst = op(op1, op2)` for the `?BX? ?dst? ?next?` operand triple. Fails when
/// `op` has no result.
fn binary(engine: &mut Engine, op: fn(i32, i32) -> Option<i32>) -> bool {
    let dst = engine.find_modified_register(BX);
    let op1 = engine.find_modified_register(dst);
    let op2 = engine.find_modified_next_register(op1);
    let (a, b) = (*engine.register(op1), *engine.register(op2));
    let Some(result) = op(a.value, b.value) else {
        return false;
    };
    let now = engine.now();
    engine.set_register(dst, DataValue::combined(result, now, &a, &b));
    true
}

pub fn shift_r(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    unary(engine, |v| v >> 1)
}

pub fn shift_l(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    unary(engine, |v| v.wrapping_shl(1))
}

pub fn inc(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    unary(engine, |v| v.wrapping_add(1))
}

pub fn dec(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    unary(engine, |v| v.wrapping_sub(1))
}

pub fn mult100(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    unary(engine, |v| v.wrapping_mul(100))
}

pub fn zero(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    constant(engine, 0)
}

pub fn one(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    constant(engine, 1)
}

pub fn random(engine: &mut Engine, ctx: &mut ExecContext<'_>) -> bool {
    let value = random_value(ctx);
    constant(engine, value)
}

pub fn add(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    binary(engine, |a, b| Some(a.wrapping_add(b)))
}

pub fn sub(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    binary(engine, |a, b| Some(a.wrapping_sub(b)))
}

pub fn mult(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    binary(engine, |a, b| Some(a.wrapping_mul(b)))
}

pub fn div(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    binary(engine, |a, b| a.checked_div(b))
}

pub fn modulo(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    binary(engine, |a, b| a.checked_rem(b))
}

pub fn nand(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    binary(engine, |a, b| Some(!(a & b)))
}

fn bit_consensus(engine: &mut Engine, test: fn(i32) -> bool) -> bool {
    let dst = engine.find_modified_register(BX);
    let src_reg = engine.find_modified_next_register(dst);
    let src = *engine.register(src_reg);
    let now = engine.now();
    engine.set_register(dst, DataValue::derived(test(src.value) as i32, now, &src));
    true
}

pub fn bit_cons(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    bit_consensus(engine, |v| ones(v) >= 16)
}

pub fn bit_cons_24(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    bit_consensus(engine, |v| ones_24(v) >= 12)
}

pub fn scramble_reg(engine: &mut Engine, ctx: &mut ExecContext<'_>) -> bool {
    let now = engine.now();
    for reg in 0..NUM_REGISTERS {
        let value = random_value(ctx);
        engine.set_register(reg, DataValue::fresh(value, now));
    }
    true
}

// ==================== Input / output ====================

/// Sends `reg` to the organism. With `io_expire`, values that do not stem from
/// an input, or only from inputs older than the previous output, are refused.
fn emit(engine: &mut Engine, ctx: &mut ExecContext<'_>, reg: usize) -> bool {
    let value = *engine.register(reg);
    if engine.config.io_expire
        && (!value.env_component || value.oldest_component < engine.last_output)
    {
        debug!("output of {} refused: expired input", value.value);
        return false;
    }
    ctx.organism.output(value.value);
    engine.last_output = engine.now();
    true
}

fn read_input(engine: &mut Engine, ctx: &mut ExecContext<'_>, reg: usize) {
    let value = ctx.organism.input();
    let now = engine.now();
    engine.set_register(reg, DataValue::from_env(value, now));
}

pub fn io(engine: &mut Engine, ctx: &mut ExecContext<'_>) -> bool {
    let reg = engine.find_modified_register(BX);
    // an expired output is dropped, the input still happens
    emit(engine, ctx, reg);
    read_input(engine, ctx, reg);
    true
}

pub fn input(engine: &mut Engine, ctx: &mut ExecContext<'_>) -> bool {
    let reg = engine.find_modified_register(BX);
    read_input(engine, ctx, reg);
    true
}

pub fn output(engine: &mut Engine, ctx: &mut ExecContext<'_>) -> bool {
    let reg = engine.find_modified_register(BX);
    emit(engine, ctx, reg)
}

pub fn output_zero(engine: &mut Engine, ctx: &mut ExecContext<'_>) -> bool {
    let reg = engine.find_modified_register(BX);
    let sent = emit(engine, ctx, reg);
    let now = engine.now();
    engine.set_register(reg, DataValue::fresh(0, now));
    sent
}

// ==================== Heads ====================

fn move_head(engine: &mut Engine, head: HeadId, target: HeadId) {
    let pos = engine.head(target).position();
    engine.set_head(head, pos as i64);
    if head == HeadId::Ip {
        engine.suppress_ip_advance();
    }
}

pub fn mov_head(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let head = engine.find_modified_head(HeadId::Ip);
    let target = engine.find_modified_head(HeadId::Flow);
    move_head(engine, head, target);
    true
}

pub fn mov_head_if_n_equ(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let head = engine.find_modified_head(HeadId::Ip);
    let target = engine.find_modified_head(HeadId::Flow);
    let (a, b) = register_pair(engine);
    if a.value != b.value {
        move_head(engine, head, target);
    }
    true
}

pub fn mov_head_if_less(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let head = engine.find_modified_head(HeadId::Ip);
    let target = engine.find_modified_head(HeadId::Flow);
    let (a, b) = register_pair(engine);
    if a.value < b.value {
        move_head(engine, head, target);
    }
    true
}

/// Marks the leading nops of a match executed, plus the `label` instruction
/// that introduces a label-kind match.
fn mark_found_executed(engine: &mut Engine, found: LabelMatch, kind: SearchKind) {
    let exe = found.len.min(engine.config.max_label_exe_size);
    match kind {
        SearchKind::Label => {
            let len = engine.tape.len();
            engine.tape.mark_executed((found.start + len - 1) % len, exe + 1);
        }
        SearchKind::Sequence => engine.tape.mark_executed(found.start, exe),
    }
}

/// Moves the IP onto the end of the `label`-marked copy of `pattern` found
/// forward of the label just read.
fn jump_to_label(engine: &mut Engine, before: usize, pattern: &Label) -> bool {
    let after = engine.head(HeadId::Ip).position();
    let found = engine.tape.search(
        &engine.inst_set,
        pattern,
        SearchKind::Label,
        Direction::Forward,
        (before, after),
    );
    let Some(found) = found else {
        return false;
    };
    mark_found_executed(engine, found, SearchKind::Label);
    engine.set_head(HeadId::Ip, found.last() as i64);
    true
}

pub fn goto(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let before = engine.head(HeadId::Ip).position();
    let label = engine.read_label();
    jump_to_label(engine, before, &label)
}

fn goto_if(engine: &mut Engine, test: fn(i32, i32) -> bool) -> bool {
    let (a, b) = register_pair(engine);
    let before = engine.head(HeadId::Ip).position();
    let label = engine.read_label();
    if !test(a.value, b.value) {
        return true;
    }
    jump_to_label(engine, before, &label)
}

pub fn goto_if_n_equ(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    goto_if(engine, |a, b| a != b)
}

fn goto_consensus_with(engine: &mut Engine, test: fn(i32) -> bool) -> bool {
    let reg = engine.find_modified_register(BX);
    let value = engine.register(reg).value;
    let before = engine.head(HeadId::Ip).position();
    let label = engine.read_label();
    if !test(value) {
        return true;
    }
    jump_to_label(engine, before, &label)
}

pub fn goto_consensus(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    goto_consensus_with(engine, |v| ones(v) >= 16)
}

pub fn goto_consensus_24(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    goto_consensus_with(engine, |v| ones_24(v) >= 12)
}

pub fn goto_if_less(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    goto_if(engine, |a, b| a < b)
}

pub fn jmp_head(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let head = engine.find_modified_head(HeadId::Ip);
    let reg = engine.find_modified_register(CX);
    let by = engine.register(reg).value as i64;
    engine.advance_head(head, by);
    if head == HeadId::Ip {
        engine.suppress_ip_advance();
    }
    true
}

pub fn get_head(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let head = engine.find_modified_head(HeadId::Ip);
    let reg = engine.find_modified_register(CX);
    let pos = engine.head(head).position() as i32;
    let now = engine.now();
    engine.set_register(reg, DataValue::fresh(pos, now));
    true
}

pub fn set_flow(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let reg = engine.find_modified_register(CX);
    let pos = engine.register(reg).value as i64;
    engine.set_head(HeadId::Flow, pos);
    true
}

pub fn h_read(engine: &mut Engine, ctx: &mut ExecContext<'_>) -> bool {
    let head = engine.find_modified_head(HeadId::Read);
    let reg = engine.find_modified_register(AX);
    let pos = engine.head(head).position();
    let (inst, _) = engine.copy_mutate(ctx, engine.tape.inst(pos));
    let now = engine.now();
    engine.set_register(reg, DataValue::fresh(inst.0 as i32, now));
    engine.track_copied(inst);
    engine.advance_head(head, 1);
    true
}

pub fn h_write(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let head = engine.find_modified_head(HeadId::Write);
    let reg = engine.find_modified_register(AX);
    let pos = engine.head(head).position();
    let inst = engine.inst_set.from_value(engine.register(reg).value);
    let cell = engine.tape.cell_mut(pos);
    cell.inst = inst;
    cell.copied = true;
    engine.advance_head(head, 1);
    true
}

pub fn h_copy(engine: &mut Engine, ctx: &mut ExecContext<'_>) -> bool {
    let read = engine.head(HeadId::Read).position();
    let write = engine.head(HeadId::Write).position();
    let (inst, mutated) = engine.copy_mutate(ctx, engine.tape.inst(read));
    let cell = engine.tape.cell_mut(write);
    cell.inst = inst;
    cell.copied = true;
    if mutated {
        cell.mutated = true;
    }
    engine.track_copied(inst);
    engine.advance_head(HeadId::Read, 1);
    engine.advance_head(HeadId::Write, 1);
    true
}

/// Skips the next instruction unless the label that follows (or its
/// complement) equals what the copy tracker saw last.
fn if_copied(engine: &mut Engine, complement: bool, sequence: bool) -> bool {
    let label = engine.read_label();
    let pattern = if complement { label.complement() } else { label };
    let thread = engine.current_thread();
    let copied = if sequence {
        thread.read_seq()
    } else {
        thread.read_label()
    };
    let same = *copied == pattern;
    skip_unless(engine, same)
}

pub fn if_copied_lbl_comp(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    if_copied(engine, true, false)
}

pub fn if_copied_lbl_direct(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    if_copied(engine, false, false)
}

pub fn if_copied_seq_comp(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    if_copied(engine, true, true)
}

pub fn if_copied_seq_direct(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    if_copied(engine, false, true)
}

// ==================== Searches ====================

/// Reads a label and looks for it (or its complement).
///
/// On a hit BX holds the distance from the end of the read label to the end of
/// the match, CX the label size, and FLOW points just past the match. On a miss
/// BX is zero and FLOW points just past the read label.
fn search(engine: &mut Engine, kind: SearchKind, direction: Direction, complement: bool) -> bool {
    let before = engine.head(HeadId::Ip).position();
    let label = engine.read_label();
    let after = engine.head(HeadId::Ip).position();
    let pattern = if complement { label.complement() } else { label };
    let found = engine
        .tape
        .search(&engine.inst_set, &pattern, kind, direction, (before, after));

    let now = engine.now();
    let size = DataValue::fresh(pattern.len() as i32, now);
    match found {
        Some(found) => {
            mark_found_executed(engine, found, kind);
            let distance = found.last() as i64 - after as i64;
            engine.set_register(BX, DataValue::fresh(distance as i32, now));
            engine.set_register(CX, size);
            engine.set_head(HeadId::Flow, found.last() as i64 + 1);
        }
        None => {
            engine.set_register(BX, DataValue::fresh(0, now));
            engine.set_register(CX, size);
            engine.set_head(HeadId::Flow, after as i64 + 1);
        }
    }
    true
}

macro_rules! search_handlers {
    ($( $name:ident => $kind:ident, $direction:ident, $complement:literal; )*) => {
        $(
            pub fn $name(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
                search(engine, SearchKind::$kind, Direction::$direction, $complement)
            }
        )*
    };
}

search_handlers! {
    search_lbl_comp_s => Label, Start, true;
    search_lbl_comp_f => Label, Forward, true;
    search_lbl_comp_b => Label, Backward, true;
    search_lbl_direct_s => Label, Start, false;
    search_lbl_direct_f => Label, Forward, false;
    search_lbl_direct_b => Label, Backward, false;
    search_seq_comp_s => Sequence, Start, true;
    search_seq_comp_f => Sequence, Forward, true;
    search_seq_comp_b => Sequence, Backward, true;
    search_seq_direct_s => Sequence, Start, false;
    search_seq_direct_f => Sequence, Forward, false;
    search_seq_direct_b => Sequence, Backward, false;
}

// ==================== Threads ====================

pub fn fork_thread(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    // the new thread starts on the next instruction, this one skips it
    engine.advance_head(HeadId::Ip, 1);
    if engine.fork_current().is_none() {
        engine.advance_head(HeadId::Ip, -1);
        return false;
    }
    true
}

pub fn thread_create(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let head = engine.find_modified_head(HeadId::Flow);
    let start = engine.head(head).position();
    let Some(index) = engine.fork_current() else {
        return false;
    };
    let len = engine.tape.len();
    engine.threads[index].heads[HeadId::Ip as usize].set(start as i64, len);
    true
}

pub fn exit_thread(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    engine.exit_current()
}

pub fn id_thread(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    let reg = engine.find_modified_register(BX);
    let id = engine.current_thread().id() as i32;
    let now = engine.now();
    engine.set_register(reg, DataValue::fresh(id, now));
    true
}

/// Puts the current thread to sleep until another thread writes a check
/// register value satisfying `kind` against the value register. If some
/// thread already holds such a value it is taken at once.
fn wait_cond(engine: &mut Engine, kind: WaitKind) -> bool {
    let value_reg = engine.find_modified_register(BX);
    let check_reg = engine.find_modified_register(DX);
    let dst = engine.find_modified_register(value_reg);
    let value = engine.register(value_reg).value;
    let cur = engine.cur_thread;

    let ready = engine
        .threads
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != cur)
        .map(|(_, t)| *t.register(check_reg))
        .find(|check| kind.holds(check.value, value));
    if let Some(check) = ready {
        let now = engine.now();
        engine.set_register(dst, DataValue::derived(check.value, now, &check));
        return true;
    }

    let others_awake = engine
        .threads
        .iter()
        .enumerate()
        .any(|(i, t)| i != cur && !t.is_waiting());
    if !others_awake {
        return false;
    }
    engine.threads[cur].wait = Some(WaitCondition {
        kind,
        register: check_reg,
        value,
        dst,
    });
    true
}

pub fn wait_cond_equ(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    wait_cond(engine, WaitKind::Equal)
}

pub fn wait_cond_less(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    wait_cond(engine, WaitKind::Less)
}

pub fn wait_cond_gtr(engine: &mut Engine, _: &mut ExecContext<'_>) -> bool {
    wait_cond(engine, WaitKind::Greater)
}

// ==================== Replication ====================

pub fn h_alloc(engine: &mut Engine, ctx: &mut ExecContext<'_>) -> bool {
    let dst = engine.find_modified_register(AX);
    let len = engine.tape.len();
    let size = replication::max_alloc(&engine.config, len);
    if !engine.allocate(ctx, size) {
        return false;
    }
    let now = engine.now();
    engine.set_register(dst, DataValue::fresh(len as i32, now));
    true
}

pub fn h_divide(engine: &mut Engine, ctx: &mut ExecContext<'_>) -> bool {
    let len = engine.tape.len();
    let divide_pos = engine.head(HeadId::Read).position();
    let child_end = match engine.head(HeadId::Write).position() {
        0 => len,
        end => end,
    };
    engine.divide(ctx, divide_pos, len - child_end)
}

/// Copies the whole tape as an offspring, without allocation or copy loop.
pub fn repro(engine: &mut Engine, ctx: &mut ExecContext<'_>) -> bool {
    engine.abandon_allocation();
    let mut child = Vec::with_capacity(engine.tape.len());
    for pos in 0..engine.tape.len() {
        let (inst, _) = engine.copy_mutate(ctx, engine.tape.inst(pos));
        child.push(inst);
    }
    let rates = ctx.organism.mutation_rates();
    replication::divide_mutations(
        &mut child,
        &rates,
        &engine.inst_set,
        ctx.world.rng(),
        engine.config.min_genome_size,
        engine.config.max_genome_size,
    );

    let (min, max) = size_bounds(&engine.config, engine.genome_len);
    let failure = if child.len() < min {
        Some(DivideFailure::ChildTooSmall {
            len: child.len(),
            min,
        })
    } else if child.len() > max {
        Some(DivideFailure::ChildTooLarge {
            len: child.len(),
            max,
        })
    } else {
        None
    };
    if let Some(reason) = failure {
        debug!("repro rejected: {}", reason);
        ctx.organism.reproduce(ReproductionOutcome::Failed(reason));
        return false;
    }

    engine.reset();
    engine.suppress_ip_advance();
    ctx.organism
        .reproduce(ReproductionOutcome::Offspring(Genome::new(child)));
    true
}

pub fn die(_: &mut Engine, ctx: &mut ExecContext<'_>) -> bool {
    ctx.organism.die();
    true
}
