mod actor;
mod ballot;
mod candidate;
mod election;
mod tally;

pub use actor::*;
pub use ballot::*;
pub use candidate::*;
pub use election::*;
pub use tally::*;
