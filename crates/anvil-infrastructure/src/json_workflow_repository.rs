//! JSON-based WorkflowStateRepository implementation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anvil_core::error::{AnvilError, Result};
use anvil_core::logging::StructuredLogger;
use anvil_core::workflow::{WorkflowState, WorkflowStateRepository};
use async_trait::async_trait;

use crate::state_migration::StateMigration;

/// A repository implementation for storing workflow snapshots as JSON files.
///
/// - Stores one file per workflow under a `workflows/` directory
/// - Deserializes permissively, so snapshots from any prior build load
/// - Runs [`StateMigration`] on every load and persists the upgraded
///   snapshot before handing it out, so later readers only ever see the
///   current shape
pub struct JsonWorkflowRepository {
    base_dir: PathBuf,
    logger: Arc<dyn StructuredLogger>,
}

impl JsonWorkflowRepository {
    /// Creates a new `JsonWorkflowRepository` rooted at `base_dir`.
    ///
    /// The directory structure is created if it doesn't exist:
    /// ```text
    /// base_dir/
    /// └── workflows/
    ///     ├── workflow-id-1.json
    ///     └── workflow-id-2.json
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the directory structure cannot be created.
    pub fn new(base_dir: impl AsRef<Path>, logger: Arc<dyn StructuredLogger>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();

        let workflows_dir = base_dir.join("workflows");
        fs::create_dir_all(&workflows_dir)
            .map_err(|e| AnvilError::io(format!("Failed to create workflows directory: {e}")))?;

        Ok(Self { base_dir, logger })
    }

    /// Creates a `JsonWorkflowRepository` at the default location (~/.anvil).
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or if
    /// the directory structure cannot be created.
    pub fn default_location(logger: Arc<dyn StructuredLogger>) -> Result<Self> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| AnvilError::io("Failed to get home directory".to_string()))?;
        Self::new(home_dir.join(".anvil"), logger)
    }

    /// Returns the file path for a given workflow ID.
    fn workflow_file_path(&self, workflow_id: &str) -> PathBuf {
        self.base_dir
            .join("workflows")
            .join(format!("{workflow_id}.json"))
    }

    fn persist(&self, path: &Path, state: &WorkflowState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        fs::write(path, json)
            .map_err(|e| AnvilError::io(format!("Failed to write workflow file {path:?}: {e}")))?;
        Ok(())
    }

    /// Loads a snapshot from a specific file path.
    ///
    /// This method handles:
    /// 1. Reading the JSON file
    /// 2. Running the structural migration engine
    /// 3. Persisting the upgraded snapshot when one was produced
    fn load_workflow_from_path(&self, path: &Path) -> Result<WorkflowState> {
        let json = fs::read_to_string(path)
            .map_err(|e| AnvilError::io(format!("Failed to read workflow file {path:?}: {e}")))?;

        let state: WorkflowState = serde_json::from_str(&json)?;

        match StateMigration::migrate_if_needed(&state, self.logger.as_ref()) {
            Some(migrated) => {
                tracing::info!("Migrated workflow snapshot on load: {:?}", path);
                self.persist(path, &migrated)?;
                Ok(migrated)
            }
            None => Ok(state),
        }
    }
}

#[async_trait]
impl WorkflowStateRepository for JsonWorkflowRepository {
    async fn find_by_id(&self, workflow_id: &str) -> Result<Option<WorkflowState>> {
        let file_path = self.workflow_file_path(workflow_id);

        if !file_path.exists() {
            return Ok(None);
        }

        self.load_workflow_from_path(&file_path).map(Some)
    }

    async fn save(&self, workflow_id: &str, state: &WorkflowState) -> Result<()> {
        let file_path = self.workflow_file_path(workflow_id);
        self.persist(&file_path, state)
    }

    async fn delete(&self, workflow_id: &str) -> Result<()> {
        let file_path = self.workflow_file_path(workflow_id);

        if file_path.exists() {
            fs::remove_file(&file_path).map_err(|e| {
                AnvilError::io(format!("Failed to delete workflow file {file_path:?}: {e}"))
            })?;
        }

        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let workflows_dir = self.base_dir.join("workflows");
        let mut ids = Vec::new();

        for entry in fs::read_dir(&workflows_dir)
            .map_err(|e| AnvilError::io(format!("Failed to read workflows directory: {e}")))?
        {
            let entry =
                entry.map_err(|e| AnvilError::io(format!("Failed to read directory entry: {e}")))?;
            let path = entry.path();

            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }

        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anvil_core::logging::NoopLogger;
    use serde_json::json;

    fn repository(dir: &tempfile::TempDir) -> JsonWorkflowRepository {
        JsonWorkflowRepository::new(dir.path(), Arc::new(NoopLogger)).unwrap()
    }

    fn legacy_snapshot() -> serde_json::Value {
        json!({
            "generatedFilesMap": {
                "src/index.ts": {
                    "file_path": "src/index.ts",
                    "file_contents": "export {}",
                    "file_purpose": "entry"
                }
            },
            "conversationMessages": [
                { "role": "user", "content": "build a saas", "conversationId": "conv-1" }
            ],
            "inferenceContext": { "model": "m", "userApiKeys": { "openai": "sk-x" } },
            "latestScreenshot": "https://img/old.png",
            "templateDetails": { "name": "saas-kit" },
            "query": "build a saas"
        })
    }

    #[tokio::test]
    async fn test_missing_workflow_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir);
        assert!(repo.find_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir);

        let state = WorkflowState {
            project_name: "blog-x1".to_string(),
            template_name: "blog-starter".to_string(),
            project_updates_accumulator: Some(Vec::new()),
            ..WorkflowState::default()
        };

        repo.save("wf-1", &state).await.unwrap();
        let loaded = repo.find_by_id("wf-1").await.unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn test_legacy_snapshot_is_migrated_and_rewritten_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir);

        let path = dir.path().join("workflows").join("wf-legacy.json");
        fs::write(&path, legacy_snapshot().to_string()).unwrap();

        let loaded = repo.find_by_id("wf-legacy").await.unwrap().unwrap();
        assert_eq!(loaded.template_name, "saas-kit");
        assert!(loaded.template_details.is_none());
        assert!(loaded.latest_screenshot.is_none());
        assert_eq!(loaded.project_updates_accumulator, Some(Vec::new()));
        assert!(!loaded.project_name.is_empty());

        // The upgraded snapshot was written back: the raw file no longer
        // carries any legacy key.
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.get("templateDetails").is_none());
        assert!(raw.get("latestScreenshot").is_none());
        assert!(raw["inferenceContext"].get("userApiKeys").is_none());
        assert_eq!(raw["generatedFilesMap"]["src/index.ts"]["filePath"], json!("src/index.ts"));

        // A second load finds nothing left to migrate.
        let reloaded = repo.find_by_id("wf-legacy").await.unwrap().unwrap();
        assert_eq!(reloaded, loaded);
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir);

        repo.save("wf-a", &WorkflowState::default()).await.unwrap();
        repo.save("wf-b", &WorkflowState::default()).await.unwrap();
        assert_eq!(repo.list_ids().await.unwrap(), vec!["wf-a", "wf-b"]);

        repo.delete("wf-a").await.unwrap();
        assert_eq!(repo.list_ids().await.unwrap(), vec!["wf-b"]);

        // Deleting a missing workflow is not an error.
        repo.delete("wf-a").await.unwrap();
    }
}
