//! Workflow state repository trait.

use crate::error::Result;
use async_trait::async_trait;

use super::model::WorkflowState;

/// Storage abstraction for persisted workflow snapshots.
///
/// Implementations own the load/persist cycle around migration: a
/// snapshot returned by `find_by_id` is always in the current schema.
#[async_trait]
pub trait WorkflowStateRepository: Send + Sync {
    /// Loads the snapshot for a workflow, migrating it if needed.
    async fn find_by_id(&self, workflow_id: &str) -> Result<Option<WorkflowState>>;

    /// Persists a snapshot, replacing any previous one.
    async fn save(&self, workflow_id: &str, state: &WorkflowState) -> Result<()>;

    /// Removes a persisted snapshot. Missing snapshots are not an error.
    async fn delete(&self, workflow_id: &str) -> Result<()>;

    /// Lists the IDs of all persisted workflows.
    async fn list_ids(&self) -> Result<Vec<String>>;
}
