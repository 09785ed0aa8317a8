//! Human-readable engine status.
//!
//! ```text
//! cycle 12 (total 512)  genome 17 -> tape 51  growing from 17  fingerprint 3f9a...
//! thread 0 [current]
//!   AX 17 ...  BX 13 ...
//!   IP 7 READ 3 WRITE 20 FLOW 7
//!   stack local: 0 0 0 ...
//!   active stack: local  label: AB  read-label: (none)  read-seq: A
//!   stack global: 0 0 0 ...
//! tape:
//!       0  h-alloc                x..
//!      17  h-alloc                .c.
//! ```

use crate::hardware::engine::Engine;
use crate::hardware::replication::ReplicationState;
use crate::hardware::stack::RingStack;
use crate::hardware::tape::HeadId;
use crate::hardware::thread::REGISTER_NAMES;
use std::fmt;

/// Borrowed view of an engine that formats its full state.
pub struct StatusDump<'a> {
    engine: &'a Engine,
    show_tape: bool,
}

impl<'a> StatusDump<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self {
            engine,
            show_tape: true,
        }
    }

    /// Leaves the tape listing out.
    pub fn without_tape(mut self) -> Self {
        self.show_tape = false;
        self
    }
}

fn write_stack(f: &mut fmt::Formatter<'_>, name: &str, stack: &RingStack) -> fmt::Result {
    write!(f, "  stack {name}:")?;
    for value in stack.iter() {
        write!(f, " {}", value.value)?;
    }
    writeln!(f)
}

impl fmt::Display for StatusDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let engine = self.engine;
        let tape = engine.tape();

        write!(
            f,
            "cycle {} (total {})  genome {} -> tape {}",
            engine.cycle_count(),
            engine.total_cycles(),
            engine.genome_len(),
            tape.len()
        )?;
        match engine.replication_state() {
            ReplicationState::Idle => write!(f, "  idle")?,
            ReplicationState::Growing { parent_len } => write!(f, "  growing from {parent_len}")?,
        }
        writeln!(f, "  fingerprint {}", engine.genome().fingerprint())?;

        for (i, thread) in engine.threads().iter().enumerate() {
            let state = match thread.wait_condition() {
                Some(cond) => format!(
                    "waiting for {} {:?} {}",
                    REGISTER_NAMES[cond.register], cond.kind, cond.value
                ),
                None if i == engine.current_thread_index() => "current".to_string(),
                None => "ready".to_string(),
            };
            writeln!(f, "thread {} [{}]", thread.id(), state)?;

            write!(f, " ")?;
            for (name, value) in REGISTER_NAMES.iter().zip(thread.registers()) {
                write!(f, " {name} {value}")?;
            }
            writeln!(f)?;

            write!(f, " ")?;
            for head in HeadId::ALL {
                write!(f, " {} {}", head.as_str(), thread.head(head).position())?;
            }
            writeln!(f)?;

            write_stack(f, "local", thread.stack())?;
            writeln!(
                f,
                "  active stack: {}  label: {}  read-label: {}  read-seq: {}",
                thread.active_stack().as_str(),
                thread.label(),
                thread.read_label(),
                thread.read_seq()
            )?;
        }
        write_stack(f, "global", engine.global_stack())?;

        if self.show_tape {
            writeln!(f, "tape:")?;
            for (pos, cell) in tape.cells().iter().enumerate() {
                let flags: String = [
                    (cell.executed, 'x'),
                    (cell.copied, 'c'),
                    (cell.mutated, 'm'),
                ]
                .iter()
                .map(|&(set, c)| if set { c } else { '.' })
                .collect();
                writeln!(f, "  {:>5}  {:<22} {}", pos, engine.inst_set().name(cell.inst), flags)?;
            }
        }
        Ok(())
    }
}
