use crate::constants::{DEFAULT_DIFFICULTY, HASH_HEX_SIZE};
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of leading `'0'` hex characters a proof digest must carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct Difficulty(usize);

impl Difficulty {
    pub fn new(zeros: usize) -> Result<Self> {
        if zeros > HASH_HEX_SIZE {
            return Err(LedgerError::Config(format!(
                "difficulty {zeros} exceeds digest length {HASH_HEX_SIZE}"
            )));
        }
        Ok(Self(zeros))
    }

    pub fn zeros(&self) -> usize {
        self.0
    }

    /// True iff `digest` starts with the required number of ASCII zeros.
    pub fn meets(&self, digest: &str) -> bool {
        digest.len() >= self.0 && digest.bytes().take(self.0).all(|b| b == b'0')
    }
}

impl TryFrom<usize> for Difficulty {
    type Error = LedgerError;

    fn try_from(zeros: usize) -> Result<Self> {
        Self::new(zeros)
    }
}

impl From<Difficulty> for usize {
    fn from(d: Difficulty) -> usize {
        d.0
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self(DEFAULT_DIFFICULTY)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub difficulty: Difficulty,
    /// Upper bound on a single mining search; `None` searches until a witness is found.
    pub mine_timeout: Option<Duration>,
}

impl LedgerConfig {
    pub fn new(difficulty: usize, mine_timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            difficulty: Difficulty::new(difficulty)?,
            mine_timeout,
        })
    }
}
