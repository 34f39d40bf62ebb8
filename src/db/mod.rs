pub mod deployment_repository;
pub mod deployment_store;
pub mod json_deployment_repository;
#[cfg(test)]
pub mod mock_db;
pub mod workflow_catalog;
