use serde::Deserialize;
use serde::Serialize;

use super::invalid;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LedgerConfig {
    /// Capacity of the channel feeding ledger facts to the ingestor
    #[serde(default = "default_ingest_buffer_size")]
    pub ingest_buffer_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            ingest_buffer_size: default_ingest_buffer_size(),
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ingest_buffer_size == 0 {
            return Err(invalid("ingest_buffer_size must be greater than 0".into()));
        }
        Ok(())
    }
}

fn default_ingest_buffer_size() -> usize {
    1024
}
