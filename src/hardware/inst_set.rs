//! Instruction-set registry: opcode assignment, handler binding, costs.
//!
//! An [`InstSet`] is built once (from a file, or from the whole built-in
//! catalog) and then shared read-only by every engine through an `Arc`.
//! Opcodes are assigned in file order; opcode 0 doubles as the default
//! instruction used to fill freshly allocated tape and to replace invalid
//! opcodes written by `h-write`.
//!
//! Handlers that are not part of the built-in catalog are attached by name with
//! [`InstSetBuilder::register`] before the file is parsed.

use crate::hardware::engine::Engine;
use crate::hardware::errors::HardwareError;
use crate::hardware::isa::LibInst;
use crate::hardware::loader;
use crate::hardware::organism::ExecContext;
use crate::hardware::profile::InstCategory;
use rand::{Rng, RngCore};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Instruction handler. Returns `false` when the instruction failed; failure
/// is never fatal to the engine.
pub type Handler = fn(&mut Engine, &mut ExecContext<'_>) -> bool;

/// Largest number of instructions one set may hold.
pub const MAX_INSTRUCTIONS: usize = 256;

/// Opcode of an instruction within its [`InstSet`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Inst(pub u8);

#[derive(Clone, Debug)]
struct InstEntry {
    name: String,
    handler: Handler,
    category: InstCategory,
    nop_mod: Option<u8>,
    is_label: bool,
    cost: u32,
    prob_fail: f64,
}

/// Collects instruction entries and externally provided handlers.
#[derive(Default)]
pub struct InstSetBuilder {
    external: HashMap<String, Handler>,
    entries: Vec<InstEntry>,
}

impl InstSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `handler` available under `name`. Registered names shadow built-ins.
    pub fn register(mut self, name: impl Into<String>, handler: Handler) -> Self {
        self.external.insert(name.into(), handler);
        self
    }

    /// Appends `name` with default cost and failure probability.
    pub fn push(&mut self, name: &str) -> Result<Inst, HardwareError> {
        self.push_at(name, 0, 0.0, 0, 0)
    }

    fn push_at(
        &mut self,
        name: &str,
        cost: u32,
        prob_fail: f64,
        line: usize,
        offset: usize,
    ) -> Result<Inst, HardwareError> {
        if self.entries.iter().any(|e| e.name == name) {
            return Err(HardwareError::DuplicateInstruction {
                name: name.to_string(),
                line,
                offset,
            });
        }
        if self.entries.len() >= MAX_INSTRUCTIONS {
            return Err(HardwareError::TooManyInstructions {
                count: self.entries.len() + 1,
                max: MAX_INSTRUCTIONS,
            });
        }
        let entry = if let Some(handler) = self.external.get(name) {
            InstEntry {
                name: name.to_string(),
                handler: *handler,
                category: InstCategory::External,
                nop_mod: None,
                is_label: false,
                cost,
                prob_fail,
            }
        } else if let Some(lib) = LibInst::from_name(name) {
            InstEntry {
                name: name.to_string(),
                handler: lib.handler(),
                category: lib.category(),
                nop_mod: lib.nop_mod(),
                is_label: lib.is_label(),
                cost,
                prob_fail,
            }
        } else {
            return Err(HardwareError::UnknownInstruction {
                name: name.to_string(),
                line,
                offset,
            });
        };
        let inst = Inst(self.entries.len() as u8);
        self.entries.push(entry);
        Ok(inst)
    }

    /// Parses an instruction-set file: one `name [cost=N] [prob_fail=P]` per line.
    pub fn parse(mut self, source: &str) -> Result<InstSet, HardwareError> {
        for (idx, line) in source.lines().enumerate() {
            let toks = loader::tokens(line);
            let Some(&(column, name)) = toks.first() else {
                continue;
            };
            let mut cost = 0u32;
            let mut prob_fail = 0.0f64;
            for &(attr_col, attr) in &toks[1..] {
                let invalid = |message: &str| HardwareError::InvalidAttribute {
                    attribute: attr.to_string(),
                    message: message.to_string(),
                    line: idx + 1,
                    offset: attr_col,
                };
                let Some((key, value)) = attr.split_once('=') else {
                    return Err(invalid("expected key=value"));
                };
                match key {
                    "cost" => {
                        cost = value
                            .parse()
                            .map_err(|_| invalid("cost must be a non-negative integer"))?;
                    }
                    "prob_fail" => {
                        prob_fail = value
                            .parse()
                            .map_err(|_| invalid("prob_fail must be a number"))?;
                        if !(0.0..=1.0).contains(&prob_fail) {
                            return Err(invalid("prob_fail must be within 0..=1"));
                        }
                    }
                    _ => return Err(invalid("unknown attribute")),
                }
            }
            self.push_at(name, cost, prob_fail, idx + 1, column)?;
        }
        self.build()
    }

    pub fn build(self) -> Result<InstSet, HardwareError> {
        if self.entries.is_empty() {
            return Err(HardwareError::EmptyInstSet);
        }
        let by_name = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), Inst(i as u8)))
            .collect();
        Ok(InstSet {
            entries: self.entries,
            by_name,
        })
    }
}

/// Name/opcode registry with the handler table used for dispatch.
#[derive(Clone, Debug)]
pub struct InstSet {
    entries: Vec<InstEntry>,
    by_name: HashMap<String, Inst>,
}

impl InstSet {
    /// Every built-in instruction, in catalog order (the nops come first).
    pub fn builtin() -> Self {
        let entries = LibInst::ALL
            .iter()
            .map(|lib| InstEntry {
                name: lib.name().to_string(),
                handler: lib.handler(),
                category: lib.category(),
                nop_mod: lib.nop_mod(),
                is_label: lib.is_label(),
                cost: 0,
                prob_fail: 0.0,
            })
            .collect::<Vec<_>>();
        let by_name = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), Inst(i as u8)))
            .collect();
        Self { entries, by_name }
    }

    /// Parses an instruction-set file using only built-in handlers.
    pub fn parse(source: &str) -> Result<Self, HardwareError> {
        InstSetBuilder::new().parse(source)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, HardwareError> {
        let source = fs::read_to_string(path)?;
        Self::parse(&source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, inst: Inst) -> Option<&InstEntry> {
        self.entries.get(inst.0 as usize)
    }

    pub fn is_valid(&self, inst: Inst) -> bool {
        (inst.0 as usize) < self.entries.len()
    }

    pub fn inst(&self, name: &str) -> Option<Inst> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, inst: Inst) -> &str {
        self.entry(inst).map_or("(invalid)", |e| e.name.as_str())
    }

    pub fn handler(&self, inst: Inst) -> Option<Handler> {
        self.entry(inst).map(|e| e.handler)
    }

    pub fn category(&self, inst: Inst) -> InstCategory {
        self.entry(inst).map_or(InstCategory::External, |e| e.category)
    }

    pub fn nop_mod(&self, inst: Inst) -> Option<u8> {
        self.entry(inst).and_then(|e| e.nop_mod)
    }

    pub fn is_nop(&self, inst: Inst) -> bool {
        self.nop_mod(inst).is_some()
    }

    pub fn is_label(&self, inst: Inst) -> bool {
        self.entry(inst).is_some_and(|e| e.is_label)
    }

    pub fn cost(&self, inst: Inst) -> u32 {
        self.entry(inst).map_or(0, |e| e.cost)
    }

    pub fn prob_fail(&self, inst: Inst) -> f64 {
        self.entry(inst).map_or(0.0, |e| e.prob_fail)
    }

    pub fn default_inst(&self) -> Inst {
        Inst(0)
    }

    /// Opcode for a register value; out-of-range values become the default.
    pub fn from_value(&self, value: i32) -> Inst {
        if value >= 0 && (value as usize) < self.entries.len() {
            Inst(value as u8)
        } else {
            self.default_inst()
        }
    }

    /// Nop instruction carrying `modifier`, if the set has one.
    pub fn nop(&self, modifier: u8) -> Option<Inst> {
        self.entries
            .iter()
            .position(|e| e.nop_mod == Some(modifier))
            .map(|i| Inst(i as u8))
    }

    pub fn random_inst(&self, rng: &mut dyn RngCore) -> Inst {
        Inst(rng.gen_range(0..self.entries.len()) as u8)
    }

    /// Instructions in opcode order.
    pub fn iter(&self) -> impl Iterator<Item = (Inst, &str)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (Inst(i as u8), e.name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always_true(_: &mut Engine, _: &mut ExecContext<'_>) -> bool {
        true
    }

    #[test]
    fn opcodes_follow_file_order() {
        let set = InstSet::parse("nop-A\nnop-B\n# comment\n\nh-copy cost=3\n").unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.inst("h-copy"), Some(Inst(2)));
        assert_eq!(set.cost(Inst(2)), 3);
        assert_eq!(set.nop_mod(Inst(1)), Some(1));
        assert!(!set.is_nop(Inst(2)));
    }

    #[test]
    fn prob_fail_attribute_is_parsed_and_bounded() {
        let set = InstSet::parse("nop-A prob_fail=0.25").unwrap();
        assert_eq!(set.prob_fail(Inst(0)), 0.25);
        let err = InstSet::parse("nop-A prob_fail=2").unwrap_err();
        assert!(matches!(err, HardwareError::InvalidAttribute { line: 1, offset: 7, .. }));
    }

    #[test]
    fn unknown_and_duplicate_names_are_errors() {
        assert!(matches!(
            InstSet::parse("nop-A\n  teleport"),
            Err(HardwareError::UnknownInstruction { line: 2, offset: 3, .. })
        ));
        assert!(matches!(
            InstSet::parse("nop-A\nnop-A"),
            Err(HardwareError::DuplicateInstruction { line: 2, .. })
        ));
        assert!(matches!(
            InstSet::parse("nop-A weight=2"),
            Err(HardwareError::InvalidAttribute { .. })
        ));
        assert!(matches!(InstSet::parse("# empty"), Err(HardwareError::EmptyInstSet)));
    }

    #[test]
    fn registered_handlers_resolve_by_name() {
        let set = InstSetBuilder::new()
            .register("sense-food", always_true)
            .parse("nop-A\nsense-food")
            .unwrap();
        let inst = set.inst("sense-food").unwrap();
        assert_eq!(set.category(inst), InstCategory::External);
        assert!(set.handler(inst).is_some());
    }

    #[test]
    fn invalid_values_clamp_to_default() {
        let set = InstSet::builtin();
        assert_eq!(set.from_value(-1), set.default_inst());
        assert_eq!(set.from_value(10_000), set.default_inst());
        assert_eq!(set.from_value(3), Inst(3));
        assert_eq!(set.name(Inst(255)), "(invalid)");
    }

    #[test]
    fn builtin_starts_with_the_nops() {
        let set = InstSet::builtin();
        for m in 0..8u8 {
            assert_eq!(set.nop(m), Some(Inst(m)));
        }
        assert!(set.is_label(set.inst("label").unwrap()));
    }
}
