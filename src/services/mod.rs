pub mod deployments;
pub mod pipedream;
