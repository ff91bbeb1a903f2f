use crate::config::Difficulty;
use crate::constants::SEARCH_CHECK_INTERVAL;
use crate::error::{LedgerError, Result};
use crate::sha256_hex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// SHA-256 hex digest of the decimal string of `new_proof² - prev_proof²`.
/// The difference may be negative; squares are taken in 128-bit arithmetic so
/// no witness overflows.
pub fn proof_algorithm(prev_proof: u64, new_proof: u64) -> String {
    let prev = u128::from(prev_proof).pow(2);
    let new = u128::from(new_proof).pow(2);
    let delta = if new >= prev {
        (new - prev).to_string()
    } else {
        format!("-{}", prev - new)
    };
    sha256_hex(delta.as_bytes())
}

pub fn is_valid_proof(prev_proof: u64, new_proof: u64, difficulty: Difficulty) -> bool {
    difficulty.meets(&proof_algorithm(prev_proof, new_proof))
}

/// Cancellation flag plus optional deadline for a proof-of-work search.
/// Clones share the same flag, so one handle can stop a search running on
/// another thread.
#[derive(Clone, Debug, Default)]
pub struct SearchControl {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl SearchControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// True once `cancel` was called on any clone or the deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// First witness, counting up from 1, whose proof digest meets `difficulty`.
/// The search is unbounded.
pub fn proof_of_work(prev_proof: u64, difficulty: Difficulty) -> u64 {
    let mut witness = 1u64;
    while !is_valid_proof(prev_proof, witness, difficulty) {
        witness = witness.wrapping_add(1);
    }
    witness
}

/// Same search as [`proof_of_work`], checking `control` every
/// `SEARCH_CHECK_INTERVAL` attempts.
pub fn proof_of_work_with(
    prev_proof: u64,
    difficulty: Difficulty,
    control: &SearchControl,
) -> Result<u64> {
    let started = Instant::now();
    let mut witness = 1u64;
    loop {
        if (witness - 1) % SEARCH_CHECK_INTERVAL == 0 && control.is_cancelled() {
            debug!(prev_proof, attempts = witness - 1, "proof-of-work search cancelled");
            return Err(LedgerError::Cancelled {
                attempts: witness - 1,
            });
        }
        if is_valid_proof(prev_proof, witness, difficulty) {
            info!(
                prev_proof,
                witness,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "found proof-of-work witness"
            );
            return Ok(witness);
        }
        witness = witness
            .checked_add(1)
            .ok_or(LedgerError::SearchExhausted)?;
    }
}
