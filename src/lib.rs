//! Election lifecycle and vote tally engine.
//!
//! [`ElectionEngine`] is the entry point. Build one with [`EngineBuilder`] over the in-memory
//! store or the sled-backed store, then drive elections through
//! `Created -> Registration -> Voting -> Ended -> ResultDeclared`. Confirmed on-chain facts are
//! fed through [`LedgerIngestor`].
mod config;
mod constants;
mod engine;
mod errors;
mod ledger;
pub mod metrics;
mod storage;
pub mod utils;

pub use config::*;
pub use engine::*;
pub use errors::*;
pub use ledger::*;
pub use metrics::gather_metrics;
pub use storage::*;
pub use utils::*;


//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
