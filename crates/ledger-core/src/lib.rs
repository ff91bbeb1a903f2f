use canonical::Canonical;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

pub mod canonical;
pub mod chain;
pub mod config;
pub mod consensus;
pub mod constants;
pub mod error;
pub mod hashlink;
pub mod merkle;
pub mod mine;
pub mod pow;
pub mod registry;

pub use chain::{Chain, SharedChain};
pub use config::{Difficulty, LedgerConfig};
pub use consensus::{consensus, consensus_index};
pub use error::{LedgerError, Result};
pub use hashlink::{make_hash, valid_list, HashListNode};
pub use merkle::{MerkleProof, MerkleTree};
pub use pow::{proof_algorithm, proof_of_work, SearchControl};
pub use registry::ChainRegistry;

/// Lower-case hex SHA-256 digest of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: u64) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }

    // Keys inserted in sorted order so the encoding is identical whether or
    // not serde_json preserves insertion order.
    fn canonical_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("amount".into(), Value::from(self.amount));
        map.insert("recipient".into(), Value::from(self.recipient.as_str()));
        map.insert("sender".into(), Value::from(self.sender.as_str()));
        Value::Object(map)
    }
}

/// A sealed block. Blocks are created by [`Chain`] and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    index: u64,
    timestamp: f64,
    transactions: Vec<Transaction>,
    proof: u64,
    previous_hash: String,
}

impl Block {
    pub(crate) fn new(
        index: u64,
        timestamp: f64,
        transactions: Vec<Transaction>,
        proof: u64,
        previous_hash: String,
    ) -> Self {
        Self {
            index,
            timestamp,
            transactions,
            proof,
            previous_hash,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    /// Seconds since the Unix epoch at sealing time.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn proof(&self) -> u64 {
        self.proof
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    /// Canonical JSON with keys in sorted order at every level:
    /// `{"index", "previous_hash", "proof", "timestamp", "transactions"}`.
    /// See [`canonical`] for spacing, escaping and float forms.
    pub fn canonical_json(&self) -> String {
        let mut map = Map::new();
        map.insert("index".into(), Value::from(self.index));
        map.insert(
            "previous_hash".into(),
            Value::from(self.previous_hash.as_str()),
        );
        map.insert("proof".into(), Value::from(self.proof));
        map.insert("timestamp".into(), Value::from(self.timestamp));
        map.insert(
            "transactions".into(),
            Value::Array(
                self.transactions
                    .iter()
                    .map(Transaction::canonical_value)
                    .collect(),
            ),
        );
        Canonical(&Value::Object(map)).to_string()
    }

    /// SHA-256 of the canonical encoding, lower-case hex.
    pub fn hash(&self) -> String {
        sha256_hex(self.canonical_json().as_bytes())
    }
}

#[cfg(test)]
impl Block {
    pub(crate) fn set_proof(&mut self, proof: u64) {
        self.proof = proof;
    }

    pub(crate) fn set_previous_hash(&mut self, previous_hash: &str) {
        self.previous_hash = previous_hash.to_string();
    }

    pub(crate) fn transactions_mut(&mut self) -> &mut Vec<Transaction> {
        &mut self.transactions
    }

    pub(crate) fn set_timestamp(&mut self, timestamp: f64) {
        self.timestamp = timestamp;
    }
}
