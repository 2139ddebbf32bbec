pub mod json_workflow_repository;
pub mod state_migration;

pub use crate::json_workflow_repository::JsonWorkflowRepository;
pub use crate::state_migration::StateMigration;
