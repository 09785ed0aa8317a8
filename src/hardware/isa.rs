//! Built-in instruction catalog.
//!
//! The [`for_each_instruction!`](crate::for_each_instruction) macro holds the
//! canonical list of library instructions and invokes a callback macro with it,
//! so the catalog enum and the static checks are generated from one table.
//!
//! Each entry reads `Variant = "name" => Category [flags], handler`, where the
//! optional flag is `nop N` (a nop carrying modifier `N`) or `label`.
//!
//! Operand notation in the docs: `?BX?` is a register defaulting to BX that a
//! following nop may override, `?next?` defaults to the register after the
//! previous operand, `?IP?`/`?FLOW?` are heads.

use crate::hardware::engine::handlers;
use crate::hardware::inst_set::Handler;
use crate::hardware::profile::InstCategory;

/// Invokes a callback macro with the complete instruction definition list.
#[macro_export]
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Nops
            // =========================
            /// nop-A ; modifier 0: register AX, head IP
            NopA = "nop-A" => Nop [nop 0], nop,
            /// nop-B ; modifier 1: register BX, head READ
            NopB = "nop-B" => Nop [nop 1], nop,
            /// nop-C ; modifier 2: register CX, head WRITE
            NopC = "nop-C" => Nop [nop 2], nop,
            /// nop-D ; modifier 3: register DX, head FLOW
            NopD = "nop-D" => Nop [nop 3], nop,
            /// nop-E ; modifier 4: register EX, head IP
            NopE = "nop-E" => Nop [nop 4], nop,
            /// nop-F ; modifier 5: register FX, head READ
            NopF = "nop-F" => Nop [nop 5], nop,
            /// nop-G ; modifier 6: register GX, head WRITE
            NopG = "nop-G" => Nop [nop 6], nop,
            /// nop-H ; modifier 7: register HX, head FLOW
            NopH = "nop-H" => Nop [nop 7], nop,
            // =========================
            // Conditionals and labels
            // =========================
            /// if-n-equ ?BX? ?next? ; skip next if equal
            IfNEqu = "if-n-equ" => Flow [], if_n_equ,
            /// if-less ?BX? ?next? ; skip next unless op1 < op2
            IfLess = "if-less" => Flow [], if_less,
            /// if-not-0 ?BX? ; skip next if zero
            IfNot0 = "if-not-0" => Flow [], if_not_0,
            /// if-equ-0 ?BX? ; skip next unless zero
            IfEqu0 = "if-equ-0" => Flow [], if_equ_0,
            /// if-gtr-0 ?BX? ; skip next unless positive
            IfGtr0 = "if-gtr-0" => Flow [], if_gtr_0,
            /// if-less-0 ?BX? ; skip next unless negative
            IfLess0 = "if-less-0" => Flow [], if_less_0,
            /// if-gtr-x [nop] ; skip next unless BX > x, x selected by the nop (-2..=5)
            IfGtrX = "if-gtr-x" => Flow [], if_gtr_x,
            /// if-equ-x [nop] ; skip next unless BX == x, x selected by the nop (-2..=5)
            IfEquX = "if-equ-x" => Flow [], if_equ_x,
            /// if-cons ?BX? ; skip next unless at least 16 of 32 bits are set
            IfCons = "if-cons" => Flow [], if_cons,
            /// if-cons-24 ?BX? ; skip next unless at least 12 of the low 24 bits are set
            IfCons24 = "if-cons-24" => Flow [], if_cons_24,
            /// if-less-cons ?BX? ?next? ; skip next unless popcount(op1) < popcount(op2)
            IfLessCons = "if-less-cons" => Flow [], if_less_cons,
            /// if-less-cons-24 ?BX? ?next? ; as if-less-cons over the low 24 bits
            IfLessCons24 = "if-less-cons-24" => Flow [], if_less_cons_24,
            /// if-stk-gtr ?BX? ; skip next unless op1 > top of the active stack
            IfStkGtr = "if-stk-gtr" => Flow [], if_stk_gtr,
            /// label ; marks the start of a searchable label
            Label = "label" => Flow [label], label,
            // =========================
            // Stacks
            // =========================
            /// pop ?BX? ; op1 = pop
            Pop = "pop" => Stack [], pop,
            /// push ?BX? ; push op1
            Push = "push" => Stack [], push,
            /// pop-all ?AX? ; pop into every register, last pushed first
            PopAll = "pop-all" => Stack [], pop_all,
            /// push-all ?AX? ; push every register starting at op1
            PushAll = "push-all" => Stack [], push_all,
            /// switch-stack ; toggle between the local and the shared stack
            SwitchStack = "switch-stack" => Stack [], switch_stack,
            /// swap-stk-top ; reverse the active stack
            SwapStkTop = "swap-stk-top" => Stack [], swap_stack_top,
            /// swap ?BX? ?next? ; exchange two registers
            Swap = "swap" => Stack [], swap,
            // =========================
            // Arithmetic
            // =========================
            /// shift-r ?BX? ; op1 >>= 1
            ShiftR = "shift-r" => Arithmetic [], shift_r,
            /// shift-l ?BX? ; op1 <<= 1
            ShiftL = "shift-l" => Arithmetic [], shift_l,
            /// inc ?BX? ; op1 += 1
            Inc = "inc" => Arithmetic [], inc,
            /// dec ?BX? ; op1 -= 1
            Dec = "dec" => Arithmetic [], dec,
            /// zero ?BX? ; op1 = 0
            Zero = "zero" => Arithmetic [], zero,
            /// one ?BX? ; op1 = 1
            One = "one" => Arithmetic [], one,
            /// rand ?BX? ; op1 = random non-negative value
            Rand = "rand" => Arithmetic [], random,
            /// mult100 ?BX? ; op1 *= 100
            Mult100 = "mult100" => Arithmetic [], mult100,
            /// add ?BX? ?dst? ?next? ; dst = op1 + op2
            Add = "add" => Arithmetic [], add,
            /// sub ?BX? ?dst? ?next? ; dst = op1 - op2
            Sub = "sub" => Arithmetic [], sub,
            /// mult ?BX? ?dst? ?next? ; dst = op1 * op2
            Mult = "mult" => Arithmetic [], mult,
            /// div ?BX? ?dst? ?next? ; dst = op1 / op2, fails on zero or overflow
            Div = "div" => Arithmetic [], div,
            /// mod ?BX? ?dst? ?next? ; dst = op1 % op2, fails on zero or overflow
            Mod = "mod" => Arithmetic [], modulo,
            /// nand ?BX? ?dst? ?next? ; dst = !(op1 & op2)
            Nand = "nand" => Arithmetic [], nand,
            /// bit-cons ?BX? ?next? ; dst = 1 if at least 16 bits of src are set, else 0
            BitCons = "bit-cons" => Arithmetic [], bit_cons,
            /// bit-cons-24 ?BX? ?next? ; as bit-cons over the low 24 bits, threshold 12
            BitCons24 = "bit-cons-24" => Arithmetic [], bit_cons_24,
            /// scramble-reg ; every register = random value
            ScrambleReg = "scramble-reg" => Arithmetic [], scramble_reg,
            // =========================
            // Input / output
            // =========================
            /// IO ?BX? ; output op1, then op1 = input
            Io = "IO" => Io [], io,
            /// input ?BX? ; op1 = input
            Input = "input" => Io [], input,
            /// output ?BX? ; output op1
            Output = "output" => Io [], output,
            /// output-zero ?BX? ; output op1, then op1 = 0
            OutputZero = "output-zero" => Io [], output_zero,
            // =========================
            // Heads
            // =========================
            /// mov-head ?IP? ?FLOW? ; head = target head
            MovHead = "mov-head" => Head [], mov_head,
            /// mov-head-if-n-equ ?IP? ?FLOW? ?BX? ?next? ; mov-head if op1 != op2
            MovHeadIfNEqu = "mov-head-if-n-equ" => Head [], mov_head_if_n_equ,
            /// mov-head-if-less ?IP? ?FLOW? ?BX? ?next? ; mov-head if op1 < op2
            MovHeadIfLess = "mov-head-if-less" => Head [], mov_head_if_less,
            /// goto label ; IP = end of the matching label, searching forward
            Goto = "goto" => Flow [], goto,
            /// goto-if-n-equ ?BX? ?next? label ; goto if op1 != op2
            GotoIfNEqu = "goto-if-n-equ" => Flow [], goto_if_n_equ,
            /// goto-if-less ?BX? ?next? label ; goto if op1 < op2
            GotoIfLess = "goto-if-less" => Flow [], goto_if_less,
            /// goto-consensus ?BX? label ; goto if at least 16 bits of op1 are set
            GotoConsensus = "goto-consensus" => Flow [], goto_consensus,
            /// goto-consensus-24 ?BX? label ; goto if at least 12 of the low 24 bits of op1 are set
            GotoConsensus24 = "goto-consensus-24" => Flow [], goto_consensus_24,
            /// jmp-head ?IP? ?CX? ; head += op1
            JmpHead = "jmp-head" => Head [], jmp_head,
            /// get-head ?IP? ?CX? ; op1 = head position
            GetHead = "get-head" => Head [], get_head,
            /// set-flow ?CX? ; FLOW = op1
            SetFlow = "set-flow" => Head [], set_flow,
            /// h-read ?READ? ?AX? ; op1 = opcode at head, head += 1
            HRead = "h-read" => Head [], h_read,
            /// h-write ?WRITE? ?AX? ; opcode at head = op1, head += 1
            HWrite = "h-write" => Head [], h_write,
            /// h-copy ; tape[WRITE] = tape[READ], both advance
            HCopy = "h-copy" => Head [], h_copy,
            /// if-copied-lbl-comp label ; skip next unless the complement matches the last copied label
            IfCopiedLblComp = "if-copied-lbl-comp" => Head [], if_copied_lbl_comp,
            /// if-copied-lbl-direct label ; skip next unless the label matches the last copied label
            IfCopiedLblDirect = "if-copied-lbl-direct" => Head [], if_copied_lbl_direct,
            /// if-copied-seq-comp label ; skip next unless the complement matches the last copied nop run
            IfCopiedSeqComp = "if-copied-seq-comp" => Head [], if_copied_seq_comp,
            /// if-copied-seq-direct label ; skip next unless the label matches the last copied nop run
            IfCopiedSeqDirect = "if-copied-seq-direct" => Head [], if_copied_seq_direct,
            // =========================
            // Searches
            // =========================
            /// search-lbl-comp-s label ; find the complement after a `label`, from the start
            SearchLblCompS = "search-lbl-comp-s" => Search [], search_lbl_comp_s,
            /// search-lbl-comp-f label ; find the complement after a `label`, forward
            SearchLblCompF = "search-lbl-comp-f" => Search [], search_lbl_comp_f,
            /// search-lbl-comp-b label ; find the complement after a `label`, backward
            SearchLblCompB = "search-lbl-comp-b" => Search [], search_lbl_comp_b,
            /// search-lbl-direct-s label ; find the label after a `label`, from the start
            SearchLblDirectS = "search-lbl-direct-s" => Search [], search_lbl_direct_s,
            /// search-lbl-direct-f label ; find the label after a `label`, forward
            SearchLblDirectF = "search-lbl-direct-f" => Search [], search_lbl_direct_f,
            /// search-lbl-direct-b label ; find the label after a `label`, backward
            SearchLblDirectB = "search-lbl-direct-b" => Search [], search_lbl_direct_b,
            /// search-seq-comp-s label ; find the complement as a nop run, from the start
            SearchSeqCompS = "search-seq-comp-s" => Search [], search_seq_comp_s,
            /// search-seq-comp-f label ; find the complement as a nop run, forward
            SearchSeqCompF = "search-seq-comp-f" => Search [], search_seq_comp_f,
            /// search-seq-comp-b label ; find the complement as a nop run, backward
            SearchSeqCompB = "search-seq-comp-b" => Search [], search_seq_comp_b,
            /// search-seq-direct-s label ; find the label as a nop run, from the start
            SearchSeqDirectS = "search-seq-direct-s" => Search [], search_seq_direct_s,
            /// search-seq-direct-f label ; find the label as a nop run, forward
            SearchSeqDirectF = "search-seq-direct-f" => Search [], search_seq_direct_f,
            /// search-seq-direct-b label ; find the label as a nop run, backward
            SearchSeqDirectB = "search-seq-direct-b" => Search [], search_seq_direct_b,
            // =========================
            // Threads
            // =========================
            /// fork-thread ; spawn a copy of this thread at the next instruction, skip it here
            ForkThread = "fork-thread" => Thread [], fork_thread,
            /// thread-create ?FLOW? ; spawn a copy of this thread starting at the head
            ThreadCreate = "thread-create" => Thread [], thread_create,
            /// exit-thread ; remove this thread unless it is the last runnable one
            ExitThread = "exit-thread" => Thread [], exit_thread,
            /// id-thread ?BX? ; op1 = thread id
            IdThread = "id-thread" => Thread [], id_thread,
            /// wait-cond-equ ?BX? ?DX? ?dst? ; sleep until some thread writes check == value
            WaitCondEqu = "wait-cond-equ" => Thread [], wait_cond_equ,
            /// wait-cond-less ?BX? ?DX? ?dst? ; sleep until some thread writes check < value
            WaitCondLess = "wait-cond-less" => Thread [], wait_cond_less,
            /// wait-cond-gtr ?BX? ?DX? ?dst? ; sleep until some thread writes check > value
            WaitCondGtr = "wait-cond-gtr" => Thread [], wait_cond_gtr,
            // =========================
            // Replication
            // =========================
            /// h-alloc ?AX? ; grow the tape for an offspring, op1 = old length
            HAlloc = "h-alloc" => Replication [], h_alloc,
            /// h-divide ; split the offspring off at READ, ending at WRITE
            HDivide = "h-divide" => Replication [], h_divide,
            /// repro ; copy the whole tape as an offspring
            Repro = "repro" => Replication [], repro,
            /// die ; kill the organism
            Die = "die" => Replication [], die,
        }
    };
}

#[macro_export]
macro_rules! define_instructions {
    (@nop) => { None };
    (@nop nop $v:literal) => { Some($v) };
    (@nop label) => { None };
    (@label) => { false };
    (@label label) => { true };
    (@label nop $v:literal) => { false };

    (
        $(
            $(#[$doc:meta])*
            $name:ident = $mnemonic:literal => $category:ident [ $( $flag:ident $( $arg:literal )? )? ], $handler:ident
        ),* $(,)?
    ) => {
        // =========================
        // Library instruction enum
        // =========================
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum LibInst {
            $(
                $(#[$doc])*
                $name,
            )*
        }

        impl LibInst {
            /// Every library instruction in catalog order.
            pub const ALL: &'static [LibInst] = &[ $( LibInst::$name, )* ];

            /// Name used in instruction-set and genome files.
            pub const fn name(self) -> &'static str {
                match self {
                    $( LibInst::$name => $mnemonic, )*
                }
            }

            pub const fn category(self) -> InstCategory {
                match self {
                    $( LibInst::$name => InstCategory::$category, )*
                }
            }

            /// Modifier carried by a nop, `None` for everything else.
            pub const fn nop_mod(self) -> Option<u8> {
                match self {
                    $( LibInst::$name => $crate::define_instructions!(@nop $( $flag $( $arg )? )?), )*
                }
            }

            pub const fn is_label(self) -> bool {
                match self {
                    $( LibInst::$name => $crate::define_instructions!(@label $( $flag $( $arg )? )?), )*
                }
            }

            pub fn handler(self) -> Handler {
                match self {
                    $( LibInst::$name => handlers::$handler, )*
                }
            }

            pub fn from_name(name: &str) -> Option<LibInst> {
                match name {
                    $( $mnemonic => Some(LibInst::$name), )*
                    _ => None,
                }
            }
        }
    };
}

for_each_instruction!(define_instructions);
