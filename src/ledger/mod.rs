//! Ingestion of confirmed on-chain facts.
//!
//! The chain adapter is an outside producer: it pushes [`LedgerFact`]s into the channel built
//! by [`ingest_channel`] and [`LedgerIngestor::run`] applies them through the same guarded paths as
//! direct calls. Replays are expected and reported, never double counted.
mod fact;
mod ingestor;

pub use fact::*;
pub use ingestor::*;

#[cfg(test)]
mod ingestor_test;
