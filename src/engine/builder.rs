//! Assembles an [`ElectionEngine`] from configuration.
//!
//! ## Example
//! ```ignore
//! let engine = EngineBuilder::new()?.build_sled()?;
//! let election = engine.create_election(request, &Actor::organizer("org-1")).await?;
//! ```

use std::sync::Arc;

use tracing::info;

use crate::init_sled_election_db;
use crate::time::Clock;
use crate::time::SystemClock;
use crate::BallotConfig;
use crate::ElectionEngine;
use crate::ElectionStore;
use crate::MemoryElectionStore;
use crate::Result;
use crate::SledElectionStore;

pub struct EngineBuilder {
    config: BallotConfig,
    clock: Arc<dyn Clock>,
}

impl EngineBuilder {
    /// Loads and validates configuration from defaults, `CONFIG_PATH` and `BALLOT__` variables.
    pub fn new() -> Result<Self> {
        Self::from_config(BallotConfig::new()?)
    }

    /// Validates `config` and keeps it. Fails with `Error::Config` on the first invalid section.
    pub fn from_config(config: BallotConfig) -> Result<Self> {
        Ok(Self {
            config: config.validate()?,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn clock(
        mut self,
        clock: Arc<dyn Clock>,
    ) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &BallotConfig {
        &self.config
    }

    pub fn build_with_store<S: ElectionStore>(
        self,
        store: Arc<S>,
    ) -> ElectionEngine<S> {
        ElectionEngine::new(store, &self.config.engine, self.clock)
    }

    pub fn build_memory(self) -> ElectionEngine<MemoryElectionStore> {
        self.build_with_store(Arc::new(MemoryElectionStore::new()))
    }

    /// Opens (or creates) the sled database under `storage.db_root_dir`.
    pub fn build_sled(self) -> Result<ElectionEngine<SledElectionStore>> {
        let db = init_sled_election_db(&self.config.storage)?;
        let store = SledElectionStore::open(db)?;
        info!("sled election store opened at {:?}", self.config.storage.db_root_dir);
        Ok(self.build_with_store(Arc::new(store)))
    }
}
