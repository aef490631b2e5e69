mod vote_guard;

pub use vote_guard::*;
