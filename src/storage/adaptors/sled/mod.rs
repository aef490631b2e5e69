mod sled_election_store;

pub use sled_election_store::*;


use crate::constants::ELECTION_DB_DIR;
use crate::Error;
use crate::StorageConfig;

#[doc(hidden)]
pub fn init_sled_election_db(config: &StorageConfig) -> Result<sled::Db, Error> {
    tracing::debug!("init_sled_election_db from path: {:?}", &config.db_root_dir);

    let election_db_path = config.db_root_dir.join(ELECTION_DB_DIR);

    sled::Config::default()
        .path(&election_db_path)
        .cache_capacity(config.cache_capacity_bytes)
        .flush_every_ms(config.flush_every_ms)
        .use_compression(config.use_compression)
        .compression_factor(1)
        .open()
        .map_err(|e| {
            tracing::warn!(
                "Try to open DB at this location: {:?} and failed: {:?}",
                election_db_path,
                e
            );
            e.into()
        })
}
