mod adaptors;
mod election_store;
mod store_executor;


pub use adaptors::*;
pub use election_store::*;
pub use store_executor::*;
