//! Engine configuration.
//!
//! Read from a plain `KEY value` file with `#` comments:
//!
//! ```text
//! SCHEDULING      sticky
//! MAX_THREADS     4
//! ALLOC_METHOD    necro
//! ```
//!
//! Every key is optional; missing keys keep their defaults.

use crate::hardware::errors::HardwareError;
use crate::hardware::loader;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// How the engine picks the thread that runs next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SchedulingPolicy {
    /// Every cycle moves on to the next runnable thread.
    #[default]
    RoundRobin,
    /// The current thread keeps running until it sleeps or exits.
    Sticky,
}

impl FromStr for SchedulingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round-robin" | "0" => Ok(SchedulingPolicy::RoundRobin),
            "sticky" | "1" => Ok(SchedulingPolicy::Sticky),
            _ => Err(format!("expected `round-robin` or `sticky`, got `{s}`")),
        }
    }
}

/// What fills tape space added by `h-alloc`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AllocMethod {
    /// The instruction set's default instruction.
    #[default]
    Default,
    /// Whatever the space held before the last divide cut it off.
    Necro,
    /// Uniformly random instructions.
    Random,
}

impl FromStr for AllocMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" | "0" => Ok(AllocMethod::Default),
            "necro" | "1" => Ok(AllocMethod::Necro),
            "random" | "2" => Ok(AllocMethod::Random),
            _ => Err(format!("expected `default`, `necro` or `random`, got `{s}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub scheduling: SchedulingPolicy,
    /// Capacity of each local stack and of the shared stack.
    pub stack_size: usize,
    pub max_threads: usize,
    /// Longest label read after an instruction.
    pub max_label_size: usize,
    /// Label nops up to this count are marked executed when read or matched.
    pub max_label_exe_size: usize,
    pub min_offspring_fraction: f64,
    pub max_offspring_fraction: f64,
    pub min_genome_size: usize,
    pub max_genome_size: usize,
    /// Share of the offspring that must have been copied.
    pub min_copied_fraction: f64,
    /// Share of the parent that must have been executed.
    pub min_exe_fraction: f64,
    pub require_allocate: bool,
    pub alloc_method: AllocMethod,
    /// Also reset threads and stacks when a divide is rolled back.
    pub divide_failure_resets: bool,
    /// Reject outputs not derived from input, or older than the last output.
    pub io_expire: bool,
    /// Log every executed instruction at debug level.
    pub trace: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scheduling: SchedulingPolicy::RoundRobin,
            stack_size: 10,
            max_threads: 1,
            max_label_size: 10,
            max_label_exe_size: 1,
            min_offspring_fraction: 0.5,
            max_offspring_fraction: 2.0,
            min_genome_size: 8,
            max_genome_size: 2048,
            min_copied_fraction: 0.5,
            min_exe_fraction: 0.5,
            require_allocate: true,
            alloc_method: AllocMethod::Default,
            divide_failure_resets: false,
            io_expire: true,
            trace: false,
        }
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(format!("expected a boolean, got `{value}`")),
    }
}

fn parse_num<T: FromStr>(value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("expected a number, got `{value}`"))
}

impl EngineConfig {
    /// Parses a configuration file on top of the defaults.
    pub fn parse(source: &str) -> Result<Self, HardwareError> {
        let mut config = Self::default();
        for (idx, line) in source.lines().enumerate() {
            let toks = loader::tokens(line);
            let Some(&(_, key)) = toks.first() else {
                continue;
            };
            let invalid = |message: String| HardwareError::InvalidConfig {
                line: idx + 1,
                key: key.to_string(),
                message,
            };
            let value = match toks.as_slice() {
                [_, (_, value)] => *value,
                [_] => return Err(invalid("missing value".to_string())),
                _ => return Err(invalid("expected a single value".to_string())),
            };
            config.set(key, value).map_err(invalid)?;
        }
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, HardwareError> {
        let source = fs::read_to_string(path)?;
        Self::parse(&source)
    }

    /// Sets one key from its textual value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "SCHEDULING" => self.scheduling = value.parse()?,
            "STACK_SIZE" => self.stack_size = parse_num(value)?,
            "MAX_THREADS" => self.max_threads = parse_num(value)?,
            "MAX_LABEL_SIZE" => self.max_label_size = parse_num(value)?,
            "MAX_LABEL_EXE_SIZE" => self.max_label_exe_size = parse_num(value)?,
            "MIN_OFFSPRING_FRACTION" => self.min_offspring_fraction = parse_num(value)?,
            "MAX_OFFSPRING_FRACTION" => self.max_offspring_fraction = parse_num(value)?,
            "MIN_GENOME_SIZE" => self.min_genome_size = parse_num(value)?,
            "MAX_GENOME_SIZE" => self.max_genome_size = parse_num(value)?,
            "MIN_COPIED_FRACTION" => self.min_copied_fraction = parse_num(value)?,
            "MIN_EXE_FRACTION" => self.min_exe_fraction = parse_num(value)?,
            "REQUIRE_ALLOCATE" => self.require_allocate = parse_bool(value)?,
            "ALLOC_METHOD" => self.alloc_method = value.parse()?,
            "DIVIDE_FAILURE_RESETS" => self.divide_failure_resets = parse_bool(value)?,
            "IO_EXPIRE" => self.io_expire = parse_bool(value)?,
            "TRACE" => self.trace = parse_bool(value)?,
            _ => return Err("unknown key".to_string()),
        }
        Ok(())
    }

    /// Checks that the values are usable together.
    pub fn validate(&self) -> Result<(), HardwareError> {
        if self.stack_size == 0 {
            return Err(HardwareError::Config("STACK_SIZE must be at least 1".into()));
        }
        if self.max_threads == 0 {
            return Err(HardwareError::Config("MAX_THREADS must be at least 1".into()));
        }
        if !(self.min_offspring_fraction > 0.0
            && self.min_offspring_fraction <= 1.0
            && self.max_offspring_fraction >= 1.0)
        {
            return Err(HardwareError::Config(format!(
                "offspring fractions must satisfy 0 < {} <= 1 <= {}",
                self.min_offspring_fraction, self.max_offspring_fraction
            )));
        }
        if self.min_genome_size > self.max_genome_size {
            return Err(HardwareError::Config(format!(
                "MIN_GENOME_SIZE {} exceeds MAX_GENOME_SIZE {}",
                self.min_genome_size, self.max_genome_size
            )));
        }
        for (name, v) in [
            ("MIN_COPIED_FRACTION", self.min_copied_fraction),
            ("MIN_EXE_FRACTION", self.min_exe_fraction),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(HardwareError::Config(format!("{name} must be within 0..=1")));
            }
        }
        Ok(())
    }
}
