mod approval_workflow;

pub use approval_workflow::*;
