//! Immutable instruction sequences handed in and out of the engine.

use crate::hardware::inst_set::{Inst, InstSet};
use sha3::{Digest, Sha3_256};
use std::fmt;

/// SHA3-256 digest of a genome's opcodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub [u8; 32]);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Genome {
    insts: Vec<Inst>,
}

impl Genome {
    pub fn new(insts: Vec<Inst>) -> Self {
        Self { insts }
    }

    pub fn len(&self) -> usize {
        self.insts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    pub fn as_slice(&self) -> &[Inst] {
        &self.insts
    }

    pub fn iter(&self) -> impl Iterator<Item = Inst> + '_ {
        self.insts.iter().copied()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha3_256::new();
        let opcodes: Vec<u8> = self.insts.iter().map(|i| i.0).collect();
        hasher.update(&opcodes);
        Fingerprint(hasher.finalize().into())
    }

    /// Instruction names separated by spaces, in the genome file format.
    pub fn to_names(&self, inst_set: &InstSet) -> String {
        self.insts
            .iter()
            .map(|i| inst_set.name(*i))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<Vec<Inst>> for Genome {
    fn from(insts: Vec<Inst>) -> Self {
        Self::new(insts)
    }
}

impl FromIterator<Inst> for Genome {
    fn from_iter<T: IntoIterator<Item = Inst>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
