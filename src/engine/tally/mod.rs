mod tally_handler;
mod winner;

pub use tally_handler::*;
pub use winner::*;
