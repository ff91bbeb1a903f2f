use crate::{
    config::Difficulty,
    error::{LedgerError, Result},
    pow::{is_valid_proof, SearchControl},
};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Searches witnesses in parallel and returns the smallest one whose proof
/// digest meets `difficulty`, i.e. the same witness the sequential search finds.
pub fn proof_of_work_parallel(
    prev_proof: u64,
    difficulty: Difficulty,
    control: &SearchControl,
) -> Result<u64> {
    let started = Instant::now();

    // Rayon splits the range across threads. `find_first` keeps searching to
    // the left of any hit, so the result is still the minimal witness. A
    // cancelled control makes every remaining candidate "match"; the re-check
    // below tells the two apart.
    let found = (1u64..u64::MAX)
        .into_par_iter()
        .find_first(|witness| {
            control.is_cancelled() || is_valid_proof(prev_proof, *witness, difficulty)
        });

    match found {
        Some(witness) if is_valid_proof(prev_proof, witness, difficulty) => {
            info!(
                prev_proof,
                witness,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "found proof-of-work witness (parallel)"
            );
            Ok(witness)
        }
        Some(witness) => {
            debug!(prev_proof, witness, "parallel proof-of-work search cancelled");
            Err(LedgerError::Cancelled { attempts: witness })
        }
        None => Err(LedgerError::SearchExhausted),
    }
}
