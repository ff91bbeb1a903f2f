use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A block's `previous_hash` disagrees with the recomputed digest of its predecessor.
    #[error("block {index}: previous hash {found} does not match predecessor digest {expected}")]
    StructuralMismatch {
        index: u64,
        expected: String,
        found: String,
    },
    /// The proofs of a block and its predecessor fail the difficulty predicate.
    #[error("block {index}: proof {proof} does not satisfy difficulty over previous proof {prev_proof}")]
    ProofInvalid {
        index: u64,
        prev_proof: u64,
        proof: u64,
    },
    #[error("no valid chain among the candidates")]
    NoValidChain,
    #[error("empty input: {0}")]
    EmptyInput(&'static str),
    #[error("proof-of-work search cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },
    #[error("proof-of-work witness space exhausted")]
    SearchExhausted,
    #[error("unknown chain: {0}")]
    UnknownChain(String),
    #[error("chain already exists: {0}")]
    ChainExists(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}
