//! Longest-valid-chain selection.
//!
//! Ties are broken by input order: among equally long valid chains the first
//! one encountered wins, so the result depends on how candidates are listed.

use crate::chain::Chain;
use crate::error::{LedgerError, Result};
use tracing::debug;

fn select<'a, I>(chains: I) -> Option<(usize, &'a Chain)>
where
    I: IntoIterator<Item = &'a Chain>,
{
    let mut best: Option<(usize, &'a Chain)> = None;
    for (position, chain) in chains.into_iter().enumerate() {
        if let Err(err) = chain.verify() {
            debug!(position, %err, "rejecting candidate chain");
            continue;
        }
        match best {
            Some((_, current)) if chain.len() <= current.len() => {}
            _ => best = Some((position, chain)),
        }
    }
    if let Some((position, chain)) = best {
        debug!(position, len = chain.len(), "selected chain");
    }
    best
}

/// Returns the longest chain that passes validation.
pub fn consensus<'a, I>(chains: I) -> Result<&'a Chain>
where
    I: IntoIterator<Item = &'a Chain>,
{
    select(chains)
        .map(|(_, chain)| chain)
        .ok_or(LedgerError::NoValidChain)
}

/// Like [`consensus`], but returns the winner's position in the input.
pub fn consensus_index<'a, I>(chains: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a Chain>,
{
    select(chains)
        .map(|(position, _)| position)
        .ok_or(LedgerError::NoValidChain)
}
