//! Workflow state domain model.
//!
//! [`WorkflowState`] is the durable snapshot of one code-generation
//! session. It is deliberately permissive on read: snapshots written by
//! years-old builds carry no schema version, so every legacy shape is
//! modeled as an optional field (a structural detector) and resolved by
//! the migration engine rather than rejected at deserialization time.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::message::ConversationMessage;

/// The durable snapshot of one code-generation session.
///
/// Persisted as camelCase JSON. Fields the current build does not model
/// are preserved verbatim in `extra` so an upgrade never silently drops
/// state written by a newer or older build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    /// Generated source files, keyed by file path.
    #[serde(default)]
    pub generated_files_map: HashMap<String, FileRecordDto>,
    /// Chronological conversation log, append-only in normal operation.
    #[serde(default)]
    pub conversation_messages: Vec<ConversationMessage>,
    /// Opaque configuration for the inference subsystem.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_context: Option<Value>,
    /// Deprecated screenshot reference; removed on migration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_screenshot: Option<Value>,
    /// Legacy nested template descriptor; hoisted into `template_name`
    /// on migration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_details: Option<TemplateDetails>,
    /// Pending update notices. Required going forward; `None` marks a
    /// snapshot written before the field existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_updates_accumulator: Option<Vec<Value>>,
    /// Name of the template the session started from.
    #[serde(default)]
    pub template_name: String,
    /// Human-facing project name.
    #[serde(default)]
    pub project_name: String,
    /// Original user request, used only as a naming fallback.
    #[serde(default)]
    pub query: String,
    /// Optional planning artifact produced before generation started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blueprint: Option<Blueprint>,
    /// Fields this build does not model; preserved across round trips.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Legacy nested template descriptor (`templateDetails`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDetails {
    /// Template name, the only sub-field migration cares about.
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Planning artifact; may carry a candidate project name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    /// Candidate project name proposed during planning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One generated source file in its persisted form.
///
/// Acts as the structural detector for file-record schemas: the current
/// convention uses camelCase keys, an older one used snake_case. Every
/// field is optional so any mix of the two deserializes; resolution
/// happens in [`FileRecordDto::normalized`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FileRecordDto {
    #[serde(rename = "filePath", default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(rename = "fileContents", default, skip_serializing_if = "Option::is_none")]
    pub file_contents: Option<String>,
    #[serde(rename = "filePurpose", default, skip_serializing_if = "Option::is_none")]
    pub file_purpose: Option<String>,
    #[serde(rename = "lastDiff", default, skip_serializing_if = "Option::is_none")]
    pub last_diff: Option<String>,

    /// Legacy snake_case counterpart of `filePath`.
    #[serde(rename = "file_path", default, skip_serializing_if = "Option::is_none")]
    pub legacy_file_path: Option<String>,
    /// Legacy snake_case counterpart of `fileContents`.
    #[serde(rename = "file_contents", default, skip_serializing_if = "Option::is_none")]
    pub legacy_file_contents: Option<String>,
    /// Legacy snake_case counterpart of `filePurpose`.
    #[serde(rename = "file_purpose", default, skip_serializing_if = "Option::is_none")]
    pub legacy_file_purpose: Option<String>,

    /// Fields this build does not model; preserved across round trips.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl FileRecordDto {
    /// Resolves this record to the current convention.
    ///
    /// Current fields win over their legacy counterparts; `lastDiff`
    /// defaults to the empty string when absent entirely.
    pub fn resolve(&self) -> FileRecord {
        FileRecord {
            file_path: pick(&self.file_path, &self.legacy_file_path),
            file_contents: pick(&self.file_contents, &self.legacy_file_contents),
            file_purpose: pick(&self.file_purpose, &self.legacy_file_purpose),
            last_diff: self.last_diff.clone().unwrap_or_default(),
        }
    }

    /// Rebuilds this record in pure current-convention form, carrying
    /// unmodeled fields through unchanged. Comparing the result against
    /// `self` by value tells the migration engine whether the entry
    /// actually needs rewriting.
    pub fn normalized(&self) -> FileRecordDto {
        let resolved = self.resolve();
        FileRecordDto {
            file_path: Some(resolved.file_path),
            file_contents: Some(resolved.file_contents),
            file_purpose: Some(resolved.file_purpose),
            last_diff: Some(resolved.last_diff),
            legacy_file_path: None,
            legacy_file_contents: None,
            legacy_file_purpose: None,
            extra: self.extra.clone(),
        }
    }
}

impl From<FileRecord> for FileRecordDto {
    fn from(record: FileRecord) -> Self {
        FileRecordDto {
            file_path: Some(record.file_path),
            file_contents: Some(record.file_contents),
            file_purpose: Some(record.file_purpose),
            last_diff: Some(record.last_diff),
            ..FileRecordDto::default()
        }
    }
}

fn pick(current: &Option<String>, legacy: &Option<String>) -> String {
    current
        .clone()
        .or_else(|| legacy.clone())
        .unwrap_or_default()
}

/// One generated source file in its resolved, current-convention form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub file_path: String,
    pub file_contents: String,
    pub file_purpose: String,
    /// Last applied patch; empty when the file has never been diffed.
    #[serde(default)]
    pub last_diff: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_record_resolves_to_current_names() {
        let dto: FileRecordDto = serde_json::from_value(json!({
            "file_path": "src/main.ts",
            "file_contents": "console.log('hi')",
            "file_purpose": "entry point"
        }))
        .unwrap();

        let record = dto.resolve();
        assert_eq!(record.file_path, "src/main.ts");
        assert_eq!(record.file_contents, "console.log('hi')");
        assert_eq!(record.file_purpose, "entry point");
        assert_eq!(record.last_diff, "");
    }

    #[test]
    fn test_current_field_wins_over_legacy() {
        let dto: FileRecordDto = serde_json::from_value(json!({
            "filePath": "src/new.ts",
            "file_path": "src/old.ts",
            "fileContents": "new",
            "file_contents": "old",
            "filePurpose": "p"
        }))
        .unwrap();

        assert_eq!(dto.resolve().file_path, "src/new.ts");
        assert_eq!(dto.resolve().file_contents, "new");
    }

    #[test]
    fn test_normalized_is_identity_for_current_records() {
        let dto: FileRecordDto = serde_json::from_value(json!({
            "filePath": "src/app.ts",
            "fileContents": "body",
            "filePurpose": "app shell",
            "lastDiff": "@@ -1 +1 @@"
        }))
        .unwrap();

        assert_eq!(dto.normalized(), dto);
    }

    #[test]
    fn test_normalized_differs_when_last_diff_missing() {
        let dto: FileRecordDto = serde_json::from_value(json!({
            "filePath": "src/app.ts",
            "fileContents": "body",
            "filePurpose": "app shell"
        }))
        .unwrap();

        let normalized = dto.normalized();
        assert_ne!(normalized, dto);
        assert_eq!(normalized.last_diff.as_deref(), Some(""));
    }

    #[test]
    fn test_state_preserves_unknown_fields() {
        let raw = json!({
            "generatedFilesMap": {},
            "conversationMessages": [],
            "templateName": "blog-starter",
            "projectName": "blog-x1",
            "query": "make a blog",
            "projectUpdatesAccumulator": [],
            "sessionTag": "durable-7"
        });
        let state: WorkflowState = serde_json::from_value(raw).unwrap();
        assert_eq!(state.extra.get("sessionTag"), Some(&json!("durable-7")));
        assert_eq!(state.project_updates_accumulator, Some(vec![]));

        let back = serde_json::to_value(&state).unwrap();
        assert_eq!(back.get("sessionTag"), Some(&json!("durable-7")));
    }

    #[test]
    fn test_deprecated_fields_deserialize_as_detectors() {
        let state: WorkflowState = serde_json::from_value(json!({
            "latestScreenshot": { "url": "https://img/1.png" },
            "templateDetails": { "name": "saas-kit", "tier": "pro" },
            "query": "crm tool"
        }))
        .unwrap();

        assert!(state.latest_screenshot.is_some());
        let details = state.template_details.unwrap();
        assert_eq!(details.name, "saas-kit");
        assert_eq!(details.extra.get("tier"), Some(&json!("pro")));
        assert!(state.project_updates_accumulator.is_none());
    }
}
