//! Skyledger Chain - digest function, append-only ledger, and the single
//! ingestion path every observation goes through.

pub mod digest;
pub mod ingest;
pub mod ledger;

pub use digest::{digest, DIGEST_LEN};
pub use ingest::{canonical_content, chain_digest, recompute_digests, IngestionCoordinator};
pub use ledger::{ChainViolation, Ledger, SharedLedger};
