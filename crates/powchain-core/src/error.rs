use thiserror::Error;

/// Reasons a chain fails verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("chain is empty")]
    Empty,

    #[error("genesis block is malformed")]
    BadGenesis,

    #[error("block at position {position} carries index {index}")]
    IndexMismatch { position: usize, index: u64 },

    #[error("chain broken at index {index}")]
    BrokenLink { index: u64 },

    #[error("invalid proof of work at index {index}")]
    InvalidProof { index: u64 },

    /// The chain grew while a proof was being searched for.
    #[error("mining template targets block {expected} but the next block is {actual}")]
    StaleTemplate { expected: u64, actual: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PowError {
    #[error("proof search aborted after {attempts} attempts")]
    Exhausted { attempts: u64 },
}
