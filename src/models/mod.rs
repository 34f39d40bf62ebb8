pub mod deployment;
pub mod workflow;
