use super::*;
use crate::hardware::inst_set::InstSetBuilder;
use crate::hardware::organism::{BasicOrganism, Organism, SeededWorld};
use crate::hardware::profile::InstCategory;
use crate::hardware::thread::{AX, BX, CX, DX, WaitCondition, WaitKind};
use crate::utils::test_utils::utils::{builtin, engine_from, engine_with, genome, small_config};
use proptest::prelude::*;

const ANCESTOR: &str = "
    h-alloc
    search-seq-comp-f nop-A nop-B
    mov-head nop-C
    search-seq-direct-f
    h-copy
    if-copied-seq-comp nop-A nop-B
    h-divide
    mov-head nop-A
    zero
    nop-B nop-C
";

/// Engine plus the organism and world it runs against.
struct Harness {
    engine: Engine,
    org: BasicOrganism,
    world: SeededWorld,
}

impl Harness {
    fn new(engine: Engine) -> Self {
        Self {
            engine,
            org: BasicOrganism::default(),
            world: SeededWorld::new(7),
        }
    }

    fn step(&mut self) -> bool {
        let mut ctx = ExecContext::new(&mut self.org, &mut self.world);
        self.engine.single_process(&mut ctx)
    }

    fn run(&mut self, cycles: usize) {
        for _ in 0..cycles {
            self.step();
        }
    }

    fn reg(&self, reg: usize) -> i32 {
        self.engine.register(reg).value
    }

    fn set(&mut self, reg: usize, value: i32) {
        self.engine.threads[self.engine.cur_thread].registers[reg] =
            DataValue::fresh(value, Age::default());
    }

    fn ip(&self) -> usize {
        self.engine.head(HeadId::Ip).position()
    }
}

fn harness(source: &str) -> Harness {
    Harness::new(engine_from(source))
}

fn harness_with(source: &str, config: EngineConfig) -> Harness {
    Harness::new(engine_with(source, config))
}

fn repeat(name: &str, n: usize) -> String {
    vec![name; n].join(" ")
}

// ==================== Construction ====================

#[test]
fn new_engine_has_one_fresh_thread() {
    let engine = engine_from("inc dec");
    assert_eq!(engine.threads().len(), 1);
    assert_eq!(engine.current_thread().id(), 0);
    assert_eq!(engine.head(HeadId::Ip).position(), 0);
    assert_eq!(engine.cycle_count(), 0);
    assert_eq!(engine.genome_len(), 2);
    assert_eq!(engine.replication_state(), ReplicationState::Idle);
}

#[test]
fn new_rejects_bad_genomes() {
    let set = builtin();
    let err = Engine::new(set.clone(), small_config(), &Genome::new(vec![])).err();
    assert!(matches!(err, Some(HardwareError::EmptyGenome)));

    let err = Engine::new(set.clone(), small_config(), &Genome::new(vec![Inst(250)])).err();
    assert!(matches!(
        err,
        Some(HardwareError::InvalidOpcode {
            opcode: 250,
            position: 0
        })
    ));

    let config = EngineConfig {
        max_genome_size: 4,
        ..small_config()
    };
    let err = Engine::new(set.clone(), config, &genome(&set, "inc inc inc inc inc")).err();
    assert!(matches!(
        err,
        Some(HardwareError::GenomeSize { len: 5, min: 1, max: 4 })
    ));
}

#[test]
fn new_validates_config() {
    let set = builtin();
    let config = EngineConfig {
        stack_size: 0,
        ..small_config()
    };
    let err = Engine::new(set.clone(), config, &genome(&set, "inc")).err();
    assert!(matches!(err, Some(HardwareError::Config(_))));
}

#[test]
fn engine_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<Engine>();
}

// ==================== Execute loop ====================

#[test]
fn ip_advances_and_wraps() {
    let mut h = harness("inc inc");
    h.run(3);
    assert_eq!(h.reg(BX), 3);
    assert_eq!(h.ip(), 1);
    assert_eq!(h.engine.cycle_count(), 3);
}

#[test]
fn following_nop_selects_register() {
    let mut h = harness("inc nop-C");
    h.step();
    assert_eq!(h.reg(CX), 1);
    assert_eq!(h.reg(BX), 0);
    assert_eq!(h.ip(), 0);
    assert!(h.engine.tape().cell(0).executed);
    assert!(h.engine.tape().cell(1).executed);
}

#[test]
fn consumed_modifiers_are_not_run_as_instructions() {
    let mut h = harness("inc nop-A dec");
    h.run(2);
    assert_eq!(h.reg(AX), 1);
    assert_eq!(h.reg(BX), -1);
    assert_eq!(h.engine.profile().executed(InstCategory::Arithmetic), 2);
    assert_eq!(h.engine.profile().executed(InstCategory::Nop), 0);
}

#[test]
fn unpaid_cost_stalls_without_effect() {
    let set = Arc::new(InstSet::parse("nop-A\ninc cost=3").unwrap());
    let g = genome(&set, "inc");
    let mut h = Harness::new(Engine::new(set, small_config(), &g).unwrap());

    assert!(!h.step());
    assert!(!h.step());
    assert_eq!(h.reg(BX), 0);
    assert_eq!(h.engine.profile().total_executed(), 0);
    assert!(h.step());
    assert_eq!(h.reg(BX), 1);
    assert_eq!(h.engine.cycle_count(), 3);
}

#[test]
fn certain_failure_skips_the_handler() {
    let set = Arc::new(InstSet::parse("nop-A\ninc prob_fail=1").unwrap());
    let g = genome(&set, "inc inc");
    let mut h = Harness::new(Engine::new(set, small_config(), &g).unwrap());

    assert!(h.step());
    assert_eq!(h.reg(BX), 0);
    assert_eq!(h.ip(), 1);
    assert_eq!(h.engine.profile().failed(InstCategory::Arithmetic), 1);
}

#[test]
fn reset_keeps_tape_and_lifetime_counters() {
    let mut h = harness("inc push");
    h.run(2);
    h.engine.reset();
    assert_eq!(h.reg(BX), 0);
    assert_eq!(h.engine.stack_peek(), DataValue::default());
    assert_eq!(h.engine.cycle_count(), 0);
    assert_eq!(h.engine.total_cycles(), 2);
    assert_eq!(h.engine.profile().total_executed(), 2);
    assert!(!h.engine.tape().cell(0).executed);
}

// ==================== Conditionals ====================

#[test]
fn if_n_equ_skips_on_equal() {
    let mut h = harness("if-n-equ inc dec");
    h.run(2);
    assert_eq!(h.reg(BX), -1);

    let mut h = harness("if-n-equ inc dec");
    h.set(CX, 1);
    h.run(2);
    assert_eq!(h.reg(BX), 1);
}

#[test]
fn if_less_runs_next_only_when_less() {
    let mut h = harness("if-less inc dec");
    h.set(CX, 4);
    h.run(2);
    assert_eq!(h.reg(BX), 1);
}

#[test]
fn if_gtr_x_takes_constant_from_nop() {
    // nop-D selects 1
    let mut h = harness("if-gtr-x nop-D inc dec");
    h.run(2);
    assert_eq!(h.reg(BX), -1);

    let mut h = harness("if-gtr-x nop-D inc dec");
    h.set(BX, 2);
    h.run(2);
    assert_eq!(h.reg(BX), 3);
}

#[test]
fn if_equ_x_without_nop_compares_with_zero() {
    let mut h = harness("if-equ-x inc dec");
    h.run(2);
    assert_eq!(h.reg(BX), 1);
}

#[test]
fn bit_consensus_conditionals() {
    let mut h = harness("if-cons inc dec");
    h.set(BX, 0xFFFF);
    h.run(2);
    assert_eq!(h.reg(BX), 0x10000);

    let mut h = harness("if-cons-24 inc dec");
    h.set(BX, 0x7FF);
    h.run(2);
    assert_eq!(h.reg(BX), 0x7FE);
}

#[test]
fn if_stk_gtr_compares_with_stack_top() {
    let mut h = harness("if-stk-gtr inc dec");
    h.set(BX, 3);
    h.engine.stack_push(DataValue::fresh(2, Age::default()));
    h.run(2);
    assert_eq!(h.reg(BX), 4);
}

// ==================== Stacks ====================

#[test]
fn push_then_pop_into_modified_register() {
    let mut h = harness("push pop nop-C");
    h.set(BX, 7);
    h.run(2);
    assert_eq!(h.reg(CX), 7);
    assert_eq!(h.engine.stack_peek(), DataValue::default());
}

#[test]
fn pop_restamps_value_and_keeps_ancestry() {
    let mut h = harness("push inc inc pop nop-C");
    h.engine.threads[0].registers[BX] = DataValue::from_env(7, Age::default());
    h.run(4);
    let cx = *h.engine.register(CX);
    assert_eq!(cx.value, 7);
    assert_eq!(cx.originated, Age::new(4));
    assert!(!cx.from_env);
    assert!(cx.env_component);
    assert_eq!(cx.oldest_component, Age::default());
}

#[test]
fn switch_stack_pushes_to_shared_stack() {
    let mut h = harness("switch-stack push");
    h.set(BX, 7);
    h.run(2);
    assert_eq!(h.engine.global_stack().peek().value, 7);
    assert_eq!(h.engine.current_thread().stack().peek().value, 0);
    assert_eq!(h.engine.current_thread().active_stack(), StackSelector::Global);
}

#[test]
fn pop_all_restores_rotated_registers() {
    let mut h = harness("push-all pop-all nop-B");
    for r in 0..NUM_REGISTERS {
        h.set(r, r as i32);
    }
    h.engine.threads[0].registers[AX] = DataValue::from_sensor(0, Age::default());
    h.run(2);
    for r in 0..NUM_REGISTERS {
        assert_eq!(h.reg(r), ((r + 7) % NUM_REGISTERS) as i32);
        assert_eq!(h.engine.register(r).originated, Age::new(2));
    }
    // the old AX lands in BX
    let restored = h.engine.register(BX);
    assert!(!restored.from_sensor);
    assert!(restored.sensor_component);
}

#[test]
fn swap_exchanges_registers() {
    let mut h = harness("swap");
    h.set(BX, 1);
    h.set(CX, 2);
    h.step();
    assert_eq!((h.reg(BX), h.reg(CX)), (2, 1));
}

// ==================== Arithmetic ====================

#[test]
fn add_merges_provenance() {
    let mut h = harness("add");
    h.engine.threads[0].registers[BX] = DataValue {
        value: 2,
        originated: Age::new(3),
        oldest_component: Age::new(3),
        env_component: true,
        ..DataValue::default()
    };
    h.engine.threads[0].registers[CX] = DataValue::fresh(5, Age::new(1));
    h.step();

    let bx = *h.engine.register(BX);
    assert_eq!(bx.value, 7);
    assert_eq!(bx.oldest_component, Age::new(1));
    assert!(bx.env_component);
    assert!(!bx.from_env);
    assert_eq!(bx.originated, Age::new(1));
}

#[test]
fn division_failures_leave_destination_alone() {
    let mut h = harness("div");
    h.set(BX, 9);
    h.step();
    assert_eq!(h.reg(BX), 9);
    assert_eq!(h.engine.profile().failed(InstCategory::Arithmetic), 1);

    let mut h = harness("mod");
    h.set(BX, i32::MIN);
    h.set(CX, -1);
    h.step();
    assert_eq!(h.reg(BX), i32::MIN);
}

#[test]
fn nand_and_wrapping_math() {
    let mut h = harness("nand");
    h.set(BX, 0b1100);
    h.set(CX, 0b1010);
    h.step();
    assert_eq!(h.reg(BX), !0b1000);

    let mut h = harness("inc");
    h.set(BX, i32::MAX);
    h.step();
    assert_eq!(h.reg(BX), i32::MIN);
}

#[test]
fn bit_cons_counts_source_bits() {
    let mut h = harness("bit-cons");
    h.set(CX, -1);
    h.step();
    assert_eq!(h.reg(BX), 1);

    let mut h = harness("bit-cons-24");
    h.set(CX, 0xFF);
    h.step();
    assert_eq!(h.reg(BX), 0);
}

#[test]
fn random_values_are_fresh_and_non_negative() {
    let mut h = harness("rand scramble-reg");
    h.step();
    let bx = *h.engine.register(BX);
    assert!(bx.value >= 0);
    assert!(!bx.env_component);
    h.step();
    assert!((0..NUM_REGISTERS).all(|r| h.reg(r) >= 0));
}

// ==================== Input / output ====================

#[test]
fn output_of_computed_value_expires() {
    let mut h = harness("output");
    h.set(BX, 4);
    h.step();
    assert!(h.org.outputs.is_empty());
    assert_eq!(h.engine.profile().failed(InstCategory::Io), 1);
}

#[test]
fn input_then_output_reaches_the_organism() {
    let mut h = harness("input output");
    h.org.inputs = vec![42, 43];
    h.run(4);
    assert_eq!(h.org.outputs, vec![42, 43]);
}

#[test]
fn stale_input_cannot_be_output_twice() {
    let mut h = harness("input output output");
    h.org.inputs = vec![42];
    h.run(3);
    assert_eq!(h.org.outputs, vec![42]);
}

#[test]
fn io_reads_even_when_output_expired() {
    let mut h = harness("IO");
    h.org.inputs = vec![9];
    h.step();
    assert!(h.org.outputs.is_empty());
    assert_eq!(h.reg(BX), 9);
    assert!(h.engine.register(BX).from_env);
    h.step();
    assert_eq!(h.org.outputs, vec![9]);
}

#[test]
fn output_zero_clears_register() {
    let config = EngineConfig {
        io_expire: false,
        ..small_config()
    };
    let mut h = harness_with("output-zero", config);
    h.set(BX, 5);
    h.step();
    assert_eq!(h.org.outputs, vec![5]);
    assert_eq!(h.reg(BX), 0);
}

// ==================== Heads ====================

#[test]
fn mov_head_to_flow_keeps_ip() {
    let mut h = harness("inc mov-head dec");
    h.run(2);
    assert_eq!(h.ip(), 0);
    h.step();
    assert_eq!(h.reg(BX), 2);
}

#[test]
fn jmp_head_moves_ip_by_register() {
    let mut h = harness("jmp-head inc dec dec");
    h.set(CX, 2);
    h.step();
    assert_eq!(h.ip(), 2);
    h.step();
    assert_eq!(h.reg(BX), -1);
}

#[test]
fn get_head_and_set_flow() {
    let mut h = harness("inc get-head set-flow");
    h.run(2);
    assert_eq!(h.reg(CX), 1);

    h.set(CX, 5);
    h.step();
    assert_eq!(h.engine.head(HeadId::Flow).position(), 2);
}

#[test]
fn goto_lands_after_matching_label() {
    let mut h = harness("goto nop-A inc label nop-A dec");
    h.run(2);
    assert_eq!(h.reg(BX), -1);
    assert!(h.engine.tape().cell(3).executed);
    assert!(h.engine.tape().cell(4).executed);
}

#[test]
fn goto_without_match_fails() {
    let mut h = harness("goto nop-A inc");
    h.step();
    assert_eq!(h.ip(), 2);
    assert_eq!(h.engine.profile().failed(InstCategory::Flow), 1);
}

#[test]
fn conditional_goto_reads_operands_before_label() {
    let source = "goto-if-n-equ nop-B nop-C nop-A inc label nop-A dec";
    let mut h = harness(source);
    h.set(BX, 1);
    h.run(2);
    assert_eq!(h.reg(BX), 0);

    let mut h = harness(source);
    h.run(2);
    assert_eq!(h.reg(BX), 1);
}

#[test]
fn goto_consensus_needs_sixteen_set_bits() {
    let source = "goto-consensus nop-B nop-A inc label nop-A dec";
    let mut h = harness(source);
    h.set(BX, 0x0000_FFFF);
    h.run(2);
    assert_eq!(h.reg(BX), 0x0000_FFFE);

    let mut h = harness(source);
    h.set(BX, 0x0000_7FFF);
    h.run(2);
    assert_eq!(h.reg(BX), 0x0000_8000);
}

#[test]
fn goto_consensus_24_counts_low_bits_only() {
    let source = "goto-consensus-24 nop-B nop-A inc label nop-A dec";
    let mut h = harness(source);
    h.set(BX, 0x00FF_F000);
    h.run(2);
    assert_eq!(h.reg(BX), 0x00FF_EFFF);

    // 18 bits set overall but only 11 in the low 24
    let mut h = harness(source);
    h.set(BX, 0x7F00_07FF);
    h.run(2);
    assert_eq!(h.reg(BX), 0x7F00_0800);

    let mut h = harness(&source.replace("-24", ""));
    h.set(BX, 0x7F00_07FF);
    h.run(2);
    assert_eq!(h.reg(BX), 0x7F00_07FE);
}

// ==================== Copying ====================

#[test]
fn h_copy_copies_and_flags_the_target() {
    let mut h = harness("h-copy inc dec");
    h.engine.set_head(HeadId::Write, 2);
    h.step();
    let cell = *h.engine.tape().cell(2);
    assert_eq!(cell.inst, h.engine.inst_set().inst("h-copy").unwrap());
    assert!(cell.copied);
    assert!(!cell.mutated);
    assert_eq!(h.engine.head(HeadId::Read).position(), 1);
    assert_eq!(h.engine.head(HeadId::Write).position(), 0);
}

#[test]
fn copy_mutation_flags_the_cell() {
    let mut h = harness("h-copy inc dec");
    h.org.rates.copy = 1.0;
    h.engine.set_head(HeadId::Write, 2);
    h.step();
    assert!(h.engine.tape().cell(2).mutated);
}

#[test]
fn h_read_and_h_write_move_opcodes_through_a_register() {
    let mut h = harness("h-read h-write inc dec");
    h.engine.set_head(HeadId::Write, 3);
    h.run(2);
    let h_read = h.engine.inst_set().inst("h-read").unwrap();
    assert_eq!(h.reg(AX), h_read.0 as i32);
    assert_eq!(h.engine.tape().inst(3), h_read);
    assert!(h.engine.tape().cell(3).copied);
}

#[test]
fn h_write_clamps_invalid_opcodes() {
    let mut h = harness("h-write inc");
    h.set(AX, 9999);
    h.engine.set_head(HeadId::Write, 1);
    h.step();
    assert_eq!(h.engine.tape().inst(1), h.engine.inst_set().default_inst());
}

#[test]
fn if_copied_compares_last_copied_nop_run() {
    // the copies land at 9/10, out of reach of dec's operand at 7
    let source = "h-copy h-copy if-copied-seq-direct nop-A nop-B inc dec zero zero zero zero zero";
    let mut h = harness(source);
    h.engine.set_head(HeadId::Read, 3);
    h.engine.set_head(HeadId::Write, 9);
    h.run(4);
    assert_eq!(h.engine.current_thread().read_seq().nops(), &[0, 1]);
    assert_eq!(h.reg(BX), 1);

    let mut h = harness(&source.replace("direct", "comp"));
    h.engine.set_head(HeadId::Read, 3);
    h.engine.set_head(HeadId::Write, 9);
    h.run(4);
    assert_eq!(h.reg(BX), -1);
    assert_eq!(h.reg(AX), 0);
}

// ==================== Searches ====================

#[test]
fn search_reports_distance_size_and_flow() {
    let mut h = harness("search-seq-comp-f nop-A inc nop-B dec");
    h.step();
    assert_eq!(h.reg(BX), 2);
    assert_eq!(h.reg(CX), 1);
    assert_eq!(h.engine.head(HeadId::Flow).position(), 4);
    assert!(h.engine.tape().cell(3).executed);
}

#[test]
fn search_miss_points_flow_past_label() {
    let mut h = harness("search-lbl-direct-f nop-C inc");
    h.set(BX, 8);
    h.step();
    assert_eq!(h.reg(BX), 0);
    assert_eq!(h.reg(CX), 1);
    assert_eq!(h.engine.head(HeadId::Flow).position(), 2);
}

#[test]
fn start_search_finds_label_after_itself() {
    let mut h = harness("search-lbl-direct-s nop-A inc label nop-A dec");
    h.step();
    assert_eq!(h.reg(BX), 3);
    assert_eq!(h.reg(CX), 1);
    assert_eq!(h.engine.head(HeadId::Flow).position(), 5);
    assert!(h.engine.tape().cell(3).executed);
    assert!(h.engine.tape().cell(4).executed);
}

#[test]
fn backward_search_gives_negative_distance() {
    let mut h = harness("label nop-B inc search-lbl-direct-b nop-B");
    h.engine.set_head(HeadId::Ip, 3);
    h.step();
    assert_eq!(h.reg(BX), 1 - 4);
    assert_eq!(h.engine.head(HeadId::Flow).position(), 2);
}

// ==================== Threads ====================

#[test]
fn fork_runs_both_threads_round_robin() {
    let mut h = harness("fork-thread inc dec");
    h.run(3);
    let threads = h.engine.threads();
    assert_eq!(threads.len(), 2);
    assert_eq!(threads[1].id(), 1);
    assert_eq!(threads[0].register(BX).value, -1);
    assert_eq!(threads[1].register(BX).value, 1);
}

#[test]
fn fork_at_thread_limit_fails() {
    let config = EngineConfig {
        max_threads: 1,
        ..small_config()
    };
    let mut h = harness_with("fork-thread inc", config);
    h.step();
    assert_eq!(h.engine.threads().len(), 1);
    assert_eq!(h.ip(), 1);
    assert_eq!(h.engine.profile().failed(InstCategory::Thread), 1);
}

#[test]
fn last_thread_cannot_exit() {
    let mut h = harness("exit-thread");
    h.step();
    assert_eq!(h.engine.threads().len(), 1);
    assert_eq!(h.engine.profile().failed(InstCategory::Thread), 1);
}

#[test]
fn exit_removes_current_thread() {
    let mut h = harness("fork-thread exit-thread inc");
    h.run(3);
    assert_eq!(h.engine.threads().len(), 1);
    assert_eq!(h.reg(BX), 1);
}

#[test]
fn id_thread_reports_stable_ids() {
    let mut h = harness("fork-thread id-thread id-thread");
    h.run(3);
    assert_eq!(h.engine.threads()[1].register(BX).value, 1);
    assert_eq!(h.engine.threads()[0].register(BX).value, 0);
}

#[test]
fn sticky_scheduling_keeps_the_running_thread() {
    let config = EngineConfig {
        scheduling: SchedulingPolicy::Sticky,
        ..small_config()
    };
    let mut h = harness_with("fork-thread inc inc", config);
    h.run(2);
    assert_eq!(h.engine.threads()[0].register(BX).value, 1);
    assert_eq!(h.engine.threads()[1].register(BX).value, 0);
}

#[test]
fn thread_create_starts_at_flow() {
    let mut h = harness("thread-create inc dec zero");
    h.engine.set_head(HeadId::Flow, 3);
    h.step();
    assert_eq!(h.engine.threads()[1].head(HeadId::Ip).position(), 3);
    assert_eq!(h.ip(), 1);
}

/// Thread A sleeps until thread B's CX equals A's BX.
fn wait_scenario() -> Harness {
    let mut h = harness("wait-cond-equ nop-B nop-C zero inc nop-C");
    h.set(BX, 5);
    let b = h.engine.fork_current().unwrap();
    let len = h.engine.tape().len();
    h.engine.threads[b].heads[HeadId::Ip as usize].set(4, len);
    h.engine.threads[b].registers[CX] = DataValue::fresh(4, Age::default());
    h.engine.cur_thread = b;
    h
}

#[test]
fn waiting_thread_wakes_on_matching_write() {
    let mut h = wait_scenario();

    h.step();
    let a = &h.engine.threads()[0];
    assert!(a.is_waiting());
    assert_eq!(a.head(HeadId::Ip).position(), 3);

    h.step();
    let a = &h.engine.threads()[0];
    assert!(!a.is_waiting());
    assert_eq!(a.register(BX).value, 5);
    assert_eq!(a.register(BX).originated, Age::new(2));
    assert_eq!(a.head(HeadId::Ip).position(), 3);
    assert_eq!(h.engine.threads()[1].register(CX).value, 5);
}

#[test]
fn wait_is_skipped_when_already_satisfied() {
    let mut h = wait_scenario();
    h.engine.threads[1].registers[CX] = DataValue::from_env(5, Age::default());
    h.step();
    let a = &h.engine.threads()[0];
    assert!(!a.is_waiting());
    assert_eq!(a.register(BX).value, 5);
    assert_eq!(a.register(BX).originated, Age::new(1));
    assert!(!a.register(BX).from_env);
    assert!(a.register(BX).env_component);
}

#[test]
fn woken_value_is_restamped() {
    let mut h = wait_scenario();
    h.step();
    assert!(h.engine.threads()[0].is_waiting());
    h.engine.cur_thread = 1;
    h.engine.set_register(CX, DataValue::from_env(5, Age::default()));
    let bx = *h.engine.threads()[0].register(BX);
    assert_eq!(bx.value, 5);
    assert_eq!(bx.originated, h.engine.now());
    assert!(!bx.from_env);
    assert!(bx.env_component);
}

#[test]
fn lone_thread_cannot_wait() {
    let mut h = harness("wait-cond-equ zero");
    h.set(BX, 5);
    h.step();
    assert!(!h.engine.current_thread().is_waiting());
    assert_eq!(h.engine.profile().failed(InstCategory::Thread), 1);
}

#[test]
fn nothing_runs_while_every_thread_sleeps() {
    let mut h = harness("inc inc");
    h.engine.fork_current().unwrap();
    for thread in &mut h.engine.threads {
        thread.wait = Some(WaitCondition {
            kind: WaitKind::Equal,
            register: CX,
            value: 1,
            dst: BX,
        });
    }
    assert!(!h.step());
    assert_eq!(h.engine.cycle_count(), 1);
    assert_eq!(h.engine.profile().total_executed(), 0);
}

#[test]
fn wake_cascades_through_woken_destination() {
    let mut h = harness("inc nop-C");
    h.engine.fork_current().unwrap();
    h.engine.fork_current().unwrap();
    // thread 1 waits for CX == 1 into DX; thread 2 waits for DX == 1 into AX
    h.engine.threads[1].wait = Some(WaitCondition {
        kind: WaitKind::Equal,
        register: CX,
        value: 1,
        dst: DX,
    });
    h.engine.threads[2].wait = Some(WaitCondition {
        kind: WaitKind::Equal,
        register: DX,
        value: 1,
        dst: AX,
    });
    h.engine.cur_thread = 2;
    h.step();
    assert!(h.engine.threads().iter().all(|t| !t.is_waiting()));
    assert_eq!(h.engine.threads()[2].register(AX).value, 1);
}

// ==================== Replication ====================

#[test]
fn h_alloc_grows_tape_and_reports_old_length() {
    let mut h = harness(&format!("h-alloc h-alloc {}", repeat("inc", 8)));
    h.step();
    assert_eq!(h.engine.tape().len(), 30);
    assert_eq!(h.reg(AX), 10);
    assert_eq!(
        h.engine.replication_state(),
        ReplicationState::Growing { parent_len: 10 }
    );
    assert_eq!(h.engine.tape().inst(29), h.engine.inst_set().default_inst());

    // a second allocation while growing fails
    h.step();
    assert_eq!(h.engine.tape().len(), 30);
    assert_eq!(h.engine.profile().failed(InstCategory::Replication), 1);
}

#[test]
fn necro_allocation_revives_the_dead_tail() {
    let config = EngineConfig {
        alloc_method: AllocMethod::Necro,
        ..small_config()
    };
    let mut h = harness_with("h-alloc dec dec dec", config);
    let inc = h.engine.inst_set().inst("inc").unwrap();
    h.engine.dead_tail = vec![inc; 3];
    h.step();
    let tape = h.engine.tape();
    assert_eq!(tape.len(), 12);
    assert!((4..7).all(|i| tape.inst(i) == inc));
    assert!((7..12).all(|i| tape.inst(i) == h.engine.inst_set().default_inst()));
}

#[test]
fn random_allocation_fills_valid_opcodes() {
    let config = EngineConfig {
        alloc_method: AllocMethod::Random,
        ..small_config()
    };
    let mut h = harness_with("h-alloc dec dec dec", config);
    h.step();
    assert_eq!(h.engine.tape().len(), 12);
    let set = h.engine.inst_set();
    assert!(h.engine.genome().iter().all(|i| set.is_valid(i)));
}

#[test]
fn divide_with_small_parent_rolls_back() {
    let mut h = harness(&repeat("inc", 100));
    let Harness { engine, org, world } = &mut h;
    let mut ctx = ExecContext::new(org, world);
    assert!(engine.allocate(&mut ctx, 100));
    assert_eq!(engine.tape().len(), 200);
    assert!(!engine.divide(&mut ctx, 40, 0));

    assert_eq!(h.engine.tape().len(), 100);
    assert_eq!(h.engine.replication_state(), ReplicationState::Idle);
    assert_eq!(
        h.org.failures,
        vec![DivideFailure::ParentTooSmall { len: 40, min: 50 }]
    );
    assert!(h.org.offspring.is_empty());
}

#[test]
fn divide_requires_allocation_and_valid_point() {
    let mut h = harness(&format!("h-divide {}", repeat("inc", 19)));
    h.step();
    assert_eq!(h.org.failures, vec![DivideFailure::NotAllocated]);

    let Harness { engine, org, world } = &mut h;
    let mut ctx = ExecContext::new(org, world);
    assert!(engine.allocate(&mut ctx, 20));
    assert!(!engine.divide(&mut ctx, 0, 0));
    assert!(matches!(
        h.org.failures.last(),
        Some(DivideFailure::InvalidDividePoint { point: 0, len: 40 })
    ));
}

#[test]
fn divide_checks_executed_then_copied_shares() {
    let mut h = harness(&repeat("inc", 20));
    let Harness { engine, org, world } = &mut h;
    let mut ctx = ExecContext::new(org, world);
    engine.allocate(&mut ctx, 20);
    engine.divide(&mut ctx, 20, 0);
    engine.allocate(&mut ctx, 20);
    engine.tape.mark_executed(0, 20);
    engine.divide(&mut ctx, 20, 0);
    assert!(matches!(
        h.org.failures.as_slice(),
        [
            DivideFailure::TooFewExecuted { required: 10, .. },
            DivideFailure::TooFewCopied { required: 10, .. }
        ]
    ));
}

#[test]
fn failed_divide_can_reset_threads() {
    let config = EngineConfig {
        divide_failure_resets: true,
        ..small_config()
    };
    let mut h = harness_with(&repeat("inc", 20), config);
    h.engine.fork_current().unwrap();
    let Harness { engine, org, world } = &mut h;
    let mut ctx = ExecContext::new(org, world);
    engine.divide(&mut ctx, 10, 0);
    assert_eq!(h.engine.threads().len(), 1);
    assert_eq!(h.org.failures, vec![DivideFailure::NotAllocated]);
}

#[test]
fn successful_divide_hands_over_offspring_and_resets() {
    let mut h = harness(&repeat("inc", 20));
    h.run(5);
    let Harness { engine, org, world } = &mut h;
    let mut ctx = ExecContext::new(org, world);
    assert!(engine.allocate(&mut ctx, 20));
    engine.tape.mark_executed(0, 20);
    for pos in 20..40 {
        engine.tape.cell_mut(pos).copied = true;
    }
    assert!(engine.divide(&mut ctx, 20, 0));

    assert_eq!(h.org.offspring.len(), 1);
    assert_eq!(h.org.offspring[0].len(), 20);
    assert_eq!(h.engine.tape().len(), 20);
    assert_eq!(h.engine.cycle_count(), 0);
    assert_eq!(h.reg(BX), 0);
    assert_eq!(h.engine.dead_tail.len(), 20);
    assert_eq!(h.engine.replication_state(), ReplicationState::Idle);
}

#[test]
fn ancestor_copies_itself() {
    let set = builtin();
    let ancestor = genome(&set, ANCESTOR);
    assert_eq!(ancestor.len(), 17);
    let mut h = Harness::new(Engine::new(set, small_config(), &ancestor).unwrap());

    let mut cycles = 0;
    while h.org.offspring.is_empty() && cycles < 500 {
        h.step();
        cycles += 1;
    }

    assert!(h.org.failures.is_empty());
    assert_eq!(h.org.offspring, vec![ancestor.clone()]);
    assert_eq!(h.engine.genome(), ancestor);
    assert_eq!(h.engine.total_cycles(), 55);
    assert_eq!(h.engine.head(HeadId::Ip).position(), 0);
}

#[test]
fn demo_files_replicate() {
    let set = Arc::new(InstSet::parse(include_str!("../../../demos/instset.cfg")).unwrap());
    let config = EngineConfig::parse(include_str!("../../../demos/engine.cfg")).unwrap();
    let ancestor = genome(&set, include_str!("../../../demos/ancestor.org"));
    let mut h = Harness::new(Engine::new(set, config, &ancestor).unwrap());

    let mut cycles = 0;
    while h.org.offspring.is_empty() && cycles < 500 {
        h.step();
        cycles += 1;
    }
    assert_eq!(h.org.offspring, vec![ancestor]);
    assert!(h.org.failures.is_empty());
}

#[test]
fn repro_copies_whole_tape() {
    let mut h = harness(&format!("repro {}", repeat("inc", 9)));
    h.step();
    assert_eq!(h.org.offspring.len(), 1);
    assert_eq!(h.org.offspring[0], h.engine.genome());
    assert_eq!(h.ip(), 0);
    assert_eq!(h.engine.cycle_count(), 0);
}

#[test]
fn repro_rejects_offspring_outside_bounds() {
    let config = EngineConfig {
        min_genome_size: 8,
        ..EngineConfig::default()
    };
    let mut h = harness_with("repro inc", config);
    h.step();
    assert!(h.org.offspring.is_empty());
    assert_eq!(
        h.org.failures,
        vec![DivideFailure::ChildTooSmall { len: 2, min: 8 }]
    );
}

#[test]
fn die_kills_the_organism() {
    let mut h = harness("die");
    h.step();
    assert!(h.org.is_dead());
}

// ==================== External handlers ====================

fn sense(engine: &mut Engine, ctx: &mut ExecContext<'_>) -> bool {
    let reg = engine.find_modified_register(BX);
    let reading = ctx.world.sense(engine.register(reg).value);
    let now = engine.now();
    engine.set_register(reg, DataValue::from_sensor(reading, now));
    true
}

#[test]
fn registered_sensor_feeds_provenance() {
    let set = InstSetBuilder::new()
        .register("sense", sense)
        .parse("nop-A\nnop-B\nnop-C\nsense\nadd")
        .unwrap();
    let set = Arc::new(set);
    let g = genome(&set, "sense add");
    let mut h = Harness::new(Engine::new(set, small_config(), &g).unwrap());
    h.world = SeededWorld::new(1).with_sensor(10);

    h.step();
    assert_eq!(h.reg(BX), 10);
    assert!(h.engine.register(BX).from_sensor);
    h.step();
    let bx = *h.engine.register(BX);
    assert!(bx.sensor_component);
    assert!(!bx.from_sensor);
    assert_eq!(h.engine.profile().executed(InstCategory::External), 1);
}

// ==================== Properties ====================

const BINARY_OPS: [&str; 6] = ["add", "sub", "mult", "div", "mod", "nand"];

proptest! {
    #[test]
    fn heads_stay_on_tape(
        len in 1usize..64,
        moves in proptest::collection::vec((0usize..4, -1000i64..1000, any::<bool>()), 0..50),
    ) {
        let mut engine = engine_from(&repeat("inc", len));
        for (head, by, absolute) in moves {
            let head = HeadId::ALL[head];
            if absolute {
                engine.set_head(head, by);
            } else {
                engine.advance_head(head, by);
            }
            for id in HeadId::ALL {
                prop_assert!(engine.head(id).position() < len);
            }
        }
    }

    #[test]
    fn binary_results_keep_oldest_ancestry(
        op in 0usize..BINARY_OPS.len(),
        a in any::<i32>(),
        b in any::<i32>(),
        age_a in 0u64..100,
        age_b in 0u64..100,
        env_a in any::<bool>(),
        env_b in any::<bool>(),
    ) {
        let mut h = harness(BINARY_OPS[op]);
        h.engine.threads[0].registers[BX] = DataValue {
            env_component: env_a,
            ..DataValue::fresh(a, Age::new(age_a))
        };
        h.engine.threads[0].registers[CX] = DataValue {
            env_component: env_b,
            ..DataValue::fresh(b, Age::new(age_b))
        };
        h.step();
        if h.engine.profile().total_failed() == 0 {
            let bx = *h.engine.register(BX);
            prop_assert_eq!(bx.oldest_component, Age::new(age_a.min(age_b)));
            prop_assert_eq!(bx.env_component, env_a || env_b);
            prop_assert_eq!(bx.originated, Age::new(1));
        }
    }

    #[test]
    fn some_thread_always_survives(forks in proptest::collection::vec(any::<bool>(), 0..40)) {
        let mut engine = engine_from("inc");
        for fork in forks {
            let before = engine.threads().len();
            if fork {
                let forked = engine.fork_current().is_some();
                prop_assert_eq!(forked, before < engine.config().max_threads);
            } else {
                let exited = engine.exit_current();
                prop_assert_eq!(exited, before > 1);
                if !exited {
                    prop_assert_eq!(engine.threads().len(), before);
                }
            }
            prop_assert!(!engine.threads().is_empty());
            prop_assert!(engine.threads().len() <= engine.config().max_threads);
            prop_assert!(engine.cur_thread < engine.threads().len());
        }
    }
}
