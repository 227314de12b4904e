//! Append-only, hash-linked block storage

use crate::ingest::chain_digest;
use skyledger_core::{Block, PendingObservation, GENESIS_DIGEST};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// First place where a chain stops being consistent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainViolation {
    #[error("block at position {position} has sequence id {found}, expected {expected}")]
    SequenceGap {
        position: usize,
        expected: u64,
        found: u64,
    },

    #[error("block {sequence_id} links to {found}, expected {expected}")]
    BrokenLink {
        sequence_id: u64,
        expected: String,
        found: String,
    },

    #[error("block {sequence_id} content could not be serialized: {reason}")]
    Unhashable { sequence_id: u64, reason: String },

    #[error("block {sequence_id} has digest {found}, content hashes to {expected}")]
    DigestMismatch {
        sequence_id: u64,
        expected: String,
        found: String,
    },
}

/// Ordered blocks, oldest first. Blocks are only ever pushed.
#[derive(Debug, Default)]
pub struct Ledger {
    blocks: Vec<Block>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Digest of the newest block, or the genesis sentinel when empty.
    pub fn head(&self) -> &str {
        self.blocks
            .last()
            .map(|b| b.digest.as_str())
            .unwrap_or(GENESIS_DIGEST)
    }

    /// Store a block for `pending` linked to the current head.
    ///
    /// The caller computes `digest` against the same head while holding
    /// exclusive access; see [`crate::IngestionCoordinator::submit`].
    pub fn append(&mut self, pending: PendingObservation, digest: String) -> Block {
        let block = Block {
            sequence_id: self.blocks.len() as u64 + 1,
            previous_digest: self.head().to_string(),
            location: pending.location,
            weather: pending.weather,
            captured_at: pending.captured_at,
            digest,
        };
        self.blocks.push(block.clone());
        block
    }

    /// All blocks, newest first (display order).
    pub fn all(&self) -> Vec<Block> {
        self.blocks.iter().rev().cloned().collect()
    }

    /// All blocks, oldest first (chain order).
    pub fn chain(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get(&self, sequence_id: u64) -> Option<&Block> {
        let index = usize::try_from(sequence_id).ok()?.checked_sub(1)?;
        self.blocks.get(index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Walk the chain oldest-first, checking numbering, linkage, and that
    /// every digest still matches its content.
    pub fn verify(&self) -> Result<(), ChainViolation> {
        verify_chain(&self.blocks)
    }
}

/// Check an oldest-first block sequence.
pub fn verify_chain(blocks: &[Block]) -> Result<(), ChainViolation> {
    let mut previous = GENESIS_DIGEST.to_string();
    for (position, block) in blocks.iter().enumerate() {
        let expected_seq = position as u64 + 1;
        if block.sequence_id != expected_seq {
            return Err(ChainViolation::SequenceGap {
                position,
                expected: expected_seq,
                found: block.sequence_id,
            });
        }
        if block.previous_digest != previous {
            return Err(ChainViolation::BrokenLink {
                sequence_id: block.sequence_id,
                expected: previous,
                found: block.previous_digest.clone(),
            });
        }
        let recomputed = chain_digest(&block.content(), &block.previous_digest).map_err(|e| {
            ChainViolation::Unhashable {
                sequence_id: block.sequence_id,
                reason: e.to_string(),
            }
        })?;
        if recomputed != block.digest {
            return Err(ChainViolation::DigestMismatch {
                sequence_id: block.sequence_id,
                expected: recomputed,
                found: block.digest.clone(),
            });
        }
        previous = block.digest.clone();
    }
    Ok(())
}

/// Handle to the session's ledger, shared by every ingestion path.
///
/// Readers may run concurrently; appends take the write lock and are
/// serialized.
#[derive(Clone, Debug, Default)]
pub struct SharedLedger(Arc<RwLock<Ledger>>);

impl SharedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Ledger> {
        self.0.read().await
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, Ledger> {
        self.0.write().await
    }

    /// Blocks newest-first.
    pub async fn snapshot(&self) -> Vec<Block> {
        self.0.read().await.all()
    }

    pub async fn len(&self) -> usize {
        self.0.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.0.read().await.is_empty()
    }

    pub async fn head(&self) -> String {
        self.0.read().await.head().to_string()
    }

    pub async fn verify(&self) -> Result<(), ChainViolation> {
        self.0.read().await.verify()
    }
}
