use crate::{
    config::Difficulty,
    constants::{GENESIS_PREVIOUS_HASH, GENESIS_PROOF},
    error::{LedgerError, Result},
    pow::{is_valid_proof, proof_of_work, proof_of_work_with, SearchControl},
    Block, Transaction,
};
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}

/// Ordered blocks plus the buffer of transactions waiting for the next block.
/// Always holds at least the genesis block.
#[derive(Clone, Debug, Serialize)]
pub struct Chain {
    blocks: Vec<Block>,
    pending: Vec<Transaction>,
    difficulty: Difficulty,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    pub fn new() -> Self {
        Self::with_difficulty(Difficulty::default())
    }

    pub fn with_difficulty(difficulty: Difficulty) -> Self {
        let mut chain = Self {
            blocks: Vec::new(),
            pending: Vec::new(),
            difficulty,
        };
        chain.seal(GENESIS_PROOF, GENESIS_PREVIOUS_HASH.to_string());
        chain
    }

    /// Rebuilds a chain from blocks received elsewhere. The blocks are taken
    /// as-is; call [`Chain::verify`] before trusting them.
    pub fn from_blocks(blocks: Vec<Block>, difficulty: Difficulty) -> Result<Self> {
        if blocks.is_empty() {
            return Err(LedgerError::EmptyInput("a chain needs at least one block"));
        }
        Ok(Self {
            blocks,
            pending: Vec::new(),
            difficulty,
        })
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Never true; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn last_block(&self) -> &Block {
        // Non-empty by construction.
        &self.blocks[self.blocks.len() - 1]
    }

    /// Queues a transaction for the next block. Returns the chain's current
    /// length, which is a pre-commit reference rather than a committed location.
    pub fn new_transaction(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: u64,
    ) -> u64 {
        let tx = Transaction::new(sender, recipient, amount);
        debug!(sender = %tx.sender, recipient = %tx.recipient, amount, "queued transaction");
        self.pending.push(tx);
        self.blocks.len() as u64
    }

    /// Seals the pending transactions into a new block linked to the current
    /// last block. The proof is recorded as given; `verify` checks it.
    pub fn new_block(&mut self, proof: u64) -> &Block {
        let previous_hash = self.last_block().hash();
        self.seal(proof, previous_hash)
    }

    /// Searches for the next proof and seals a block with it.
    pub fn mine_block(&mut self, control: &SearchControl) -> Result<&Block> {
        let proof = proof_of_work_with(self.last_block().proof(), self.difficulty, control)?;
        Ok(self.new_block(proof))
    }

    /// Unbounded search for the witness following the last block's proof.
    pub fn proof_of_work(&self) -> u64 {
        proof_of_work(self.last_block().proof(), self.difficulty)
    }

    // The only path that takes an explicit previous hash; used for genesis.
    fn seal(&mut self, proof: u64, previous_hash: String) -> &Block {
        let mut timestamp = now_secs();
        if let Some(last) = self.blocks.last() {
            timestamp = timestamp.max(last.timestamp());
        }
        let block = Block::new(
            self.blocks.len() as u64 + 1,
            timestamp,
            std::mem::take(&mut self.pending),
            proof,
            previous_hash,
        );
        info!(
            index = block.index(),
            proof,
            transactions = block.transactions().len(),
            "sealed block"
        );
        self.blocks.push(block);
        self.last_block()
    }

    /// Walks adjacent block pairs and reports the first broken link or proof.
    pub fn verify(&self) -> Result<()> {
        for pair in self.blocks.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let expected = prev.hash();
            if next.previous_hash() != expected {
                warn!(index = next.index(), "previous hash mismatch");
                return Err(LedgerError::StructuralMismatch {
                    index: next.index(),
                    expected,
                    found: next.previous_hash().to_string(),
                });
            }
            if !is_valid_proof(prev.proof(), next.proof(), self.difficulty) {
                warn!(index = next.index(), proof = next.proof(), "proof fails difficulty");
                return Err(LedgerError::ProofInvalid {
                    index: next.index(),
                    prev_proof: prev.proof(),
                    proof: next.proof(),
                });
            }
        }
        Ok(())
    }

    pub fn validate_chain(&self) -> bool {
        self.verify().is_ok()
    }

    #[cfg(test)]
    pub(crate) fn block_mut(&mut self, position: usize) -> &mut Block {
        &mut self.blocks[position]
    }
}

/// A chain behind a single-writer lock. Submissions and sealing are
/// serialized; readers see the chain either before or after an append.
#[derive(Clone, Debug, Default)]
pub struct SharedChain {
    inner: Arc<RwLock<Chain>>,
}

impl SharedChain {
    pub fn new(chain: Chain) -> Self {
        Self {
            inner: Arc::new(RwLock::new(chain)),
        }
    }

    // Poisoning is ignored: `seal` pushes a fully built block in one step.
    fn read(&self) -> RwLockReadGuard<'_, Chain> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Chain> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn submit_transaction(
        &self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: u64,
    ) -> u64 {
        self.write().new_transaction(sender, recipient, amount)
    }

    pub fn seal_block(&self, proof: u64) -> Block {
        self.write().new_block(proof).clone()
    }

    /// Searches without holding the lock, then seals only if no other block
    /// was appended meanwhile; otherwise searches again from the new tip.
    pub fn mine_block(&self, control: &SearchControl) -> Result<Block> {
        loop {
            let (last_proof, difficulty, len) = {
                let chain = self.read();
                (chain.last_block().proof(), chain.difficulty(), chain.len())
            };
            let proof = proof_of_work_with(last_proof, difficulty, control)?;
            let mut chain = self.write();
            if chain.len() == len {
                return Ok(chain.new_block(proof).clone());
            }
            debug!(stale_len = len, len = chain.len(), "chain advanced during search, retrying");
        }
    }

    pub fn verify(&self) -> Result<()> {
        self.read().verify()
    }

    pub fn validate_chain(&self) -> bool {
        self.read().validate_chain()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn last_block(&self) -> Block {
        self.read().last_block().clone()
    }

    pub fn snapshot(&self) -> Chain {
        self.read().clone()
    }
}
