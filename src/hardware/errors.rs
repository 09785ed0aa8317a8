use evo_cpu_derive::Error;

/// Errors raised while building an instruction set, loading a genome or reading
/// configuration. Nothing here is produced once an engine is running.
#[derive(Debug, Error)]
pub enum HardwareError {
    /// Instruction name that is neither built in nor registered.
    #[error("unknown instruction `{name}`")]
    UnknownInstruction {
        name: String,
        line: usize,
        offset: usize,
    },
    /// Same instruction listed twice in an instruction-set file.
    #[error("instruction `{name}` is defined more than once")]
    DuplicateInstruction {
        name: String,
        line: usize,
        offset: usize,
    },
    /// Malformed `key=value` attribute on an instruction-set line.
    #[error("invalid attribute `{attribute}`: {message}")]
    InvalidAttribute {
        attribute: String,
        message: String,
        line: usize,
        offset: usize,
    },
    /// More instructions than fit in an opcode.
    #[error("instruction set holds {count} instructions, at most {max} are allowed")]
    TooManyInstructions { count: usize, max: usize },
    /// Instruction set without a single instruction.
    #[error("empty instruction set")]
    EmptyInstSet,
    /// Genome without a single instruction.
    #[error("empty genome")]
    EmptyGenome,
    /// Genome containing an opcode the instruction set does not define.
    #[error("invalid opcode {opcode} at position {position}")]
    InvalidOpcode { opcode: u8, position: usize },
    /// Genome longer or shorter than the configured bounds.
    #[error("genome length {len} is outside {min}..={max}")]
    GenomeSize { len: usize, min: usize, max: usize },
    /// Bad line in a configuration file.
    #[error("line {line}: {key}: {message}")]
    InvalidConfig {
        line: usize,
        key: String,
        message: String,
    },
    /// Configuration values that contradict each other.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Unknown hardware variant name.
    #[error("unknown hardware kind `{0}`")]
    UnknownHardware(String),
    /// File could not be read.
    #[error("io error: {0}")]
    Io(String),
}

impl HardwareError {
    /// Line and column (both 1-based) of errors that point into a source file.
    pub fn location(&self) -> Option<(usize, usize)> {
        match self {
            HardwareError::UnknownInstruction { line, offset, .. }
            | HardwareError::DuplicateInstruction { line, offset, .. }
            | HardwareError::InvalidAttribute { line, offset, .. } => Some((*line, *offset)),
            HardwareError::InvalidConfig { line, .. } => Some((*line, 1)),
            _ => None,
        }
    }
}

impl From<std::io::Error> for HardwareError {
    fn from(err: std::io::Error) -> Self {
        HardwareError::Io(err.to_string())
    }
}
