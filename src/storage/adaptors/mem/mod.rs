mod mem_election_store;

pub use mem_election_store::*;
