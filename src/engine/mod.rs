mod ballot;
mod builder;
mod candidacy;
mod election_engine;
mod event;
mod lifecycle;
mod tally;
mod types;

pub use ballot::*;
pub use builder::*;
pub use candidacy::*;
pub use election_engine::*;
pub use event::*;
pub use lifecycle::*;
pub use tally::*;
pub use types::*;
