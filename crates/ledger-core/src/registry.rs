use crate::{
    chain::{Chain, SharedChain},
    config::LedgerConfig,
    consensus::consensus_index,
    error::{LedgerError, Result},
    pow::SearchControl,
    Block,
};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use tracing::info;

/// Named chain instances sharing one configuration.
#[derive(Debug, Default)]
pub struct ChainRegistry {
    config: LedgerConfig,
    chains: RwLock<BTreeMap<String, SharedChain>>,
}

impl ChainRegistry {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            chains: RwLock::default(),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Starts a new chain from genesis under `name`.
    pub fn create(&self, name: &str) -> Result<SharedChain> {
        self.insert(name, Chain::with_difficulty(self.config.difficulty))
    }

    pub fn insert(&self, name: &str, chain: Chain) -> Result<SharedChain> {
        let mut chains = self.chains.write().unwrap_or_else(PoisonError::into_inner);
        if chains.contains_key(name) {
            return Err(LedgerError::ChainExists(name.to_string()));
        }
        let shared = SharedChain::new(chain);
        chains.insert(name.to_string(), shared.clone());
        info!(name, "registered chain");
        Ok(shared)
    }

    pub fn get(&self, name: &str) -> Result<SharedChain> {
        self.chains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownChain(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.chains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn submit_transaction(
        &self,
        name: &str,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: u64,
    ) -> Result<u64> {
        Ok(self.get(name)?.submit_transaction(sender, recipient, amount))
    }

    /// Seals with an externally supplied proof.
    pub fn seal_block(&self, name: &str, proof: u64) -> Result<Block> {
        Ok(self.get(name)?.seal_block(proof))
    }

    /// Seals with a proof found here, bounded by the configured mine timeout.
    pub fn mine_block(&self, name: &str) -> Result<Block> {
        let chain = self.get(name)?;
        let control = match self.config.mine_timeout {
            Some(timeout) => SearchControl::with_timeout(timeout),
            None => SearchControl::new(),
        };
        chain.mine_block(&control)
    }

    pub fn validate(&self, name: &str) -> Result<bool> {
        Ok(self.get(name)?.validate_chain())
    }

    /// Runs consensus over the named chains and returns the winner's name.
    pub fn consensus<I, S>(&self, names: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names.into_iter().map(|n| n.as_ref().to_string()).collect();
        let snapshots = names
            .iter()
            .map(|name| Ok(self.get(name)?.snapshot()))
            .collect::<Result<Vec<Chain>>>()?;
        let winner = consensus_index(&snapshots)?;
        Ok(names[winner].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Difficulty;
    use std::time::Duration;

    fn registry() -> ChainRegistry {
        ChainRegistry::new(LedgerConfig {
            difficulty: Difficulty::new(2).unwrap(),
            mine_timeout: None,
        })
    }

    #[test]
    fn create_and_lookup() {
        let reg = registry();
        reg.create("main").unwrap();
        reg.create("fork").unwrap();
        assert_eq!(reg.names(), vec!["fork".to_string(), "main".to_string()]);
        assert_eq!(reg.get("main").unwrap().len(), 1);
        assert_eq!(
            reg.create("main").unwrap_err(),
            LedgerError::ChainExists("main".into())
        );
        assert_eq!(
            reg.get("nope").unwrap_err(),
            LedgerError::UnknownChain("nope".into())
        );
    }

    #[test]
    fn submit_mine_validate() {
        let reg = registry();
        reg.create("main").unwrap();
        assert_eq!(reg.submit_transaction("main", "bob", "alice", 10), Ok(1));
        let block = reg.mine_block("main").unwrap();
        assert_eq!(block.index(), 2);
        assert_eq!(block.transactions().len(), 1);
        assert_eq!(reg.validate("main"), Ok(true));
    }

    #[test]
    fn bad_external_proof_invalidates() {
        let reg = registry();
        reg.create("main").unwrap();
        let chain = reg.get("main").unwrap();
        let bad = (1..)
            .find(|w| !crate::pow::is_valid_proof(100, *w, Difficulty::new(2).unwrap()))
            .unwrap();
        reg.seal_block("main", bad).unwrap();
        assert_eq!(reg.validate("main"), Ok(false));
        assert!(matches!(
            chain.verify(),
            Err(LedgerError::ProofInvalid { index: 2, .. })
        ));
    }

    #[test]
    fn consensus_by_name() {
        let reg = registry();
        for name in ["a", "b", "c"] {
            reg.create(name).unwrap();
        }
        reg.mine_block("b").unwrap();
        reg.mine_block("b").unwrap();
        reg.mine_block("c").unwrap();
        reg.seal_block("c", 0).unwrap();
        reg.seal_block("c", 0).unwrap();
        reg.seal_block("c", 0).unwrap();
        assert_eq!(reg.consensus(["a", "b", "c"]), Ok("b".to_string()));
        assert_eq!(
            reg.consensus(["a", "missing"]),
            Err(LedgerError::UnknownChain("missing".into()))
        );
    }

    #[test]
    fn mine_timeout_is_applied() {
        let reg = ChainRegistry::new(LedgerConfig {
            difficulty: Difficulty::new(64).unwrap(),
            mine_timeout: Some(Duration::from_millis(20)),
        });
        reg.create("hard").unwrap();
        assert!(matches!(
            reg.mine_block("hard"),
            Err(LedgerError::Cancelled { .. })
        ));
    }
}
