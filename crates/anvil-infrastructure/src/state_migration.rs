//! Workflow state migration engine.
//!
//! Snapshots carry no schema version, so this engine brings an arbitrary
//! persisted [`WorkflowState`] up to the current shape purely by
//! structural inspection. It is a pure, synchronous transform: no I/O of
//! its own, never mutates its input, never fails. Five independent
//! passes each read the original snapshot and raise a shared
//! "needs migration" flag; only when at least one pass produced a change
//! is a new state assembled, otherwise `None` tells the caller to skip a
//! redundant persist.

use std::collections::{HashMap, HashSet};

use anvil_core::logging::StructuredLogger;
use anvil_core::naming::{generate_nano_id, generate_project_name};
use anvil_core::workflow::{
    ConversationMessage, FileRecordDto, WorkflowState, conversation_sequence,
};
use chrono::Utc;
use serde_json::{Value, json};

/// Dedup+sort output above this count triggers internal-memo pruning.
/// At or below it, bookkeeping messages are tolerated.
const CLEANUP_THRESHOLD: usize = 25;

/// Legacy per-user credential field inside the inference context.
const USER_API_KEYS_FIELD: &str = "userApiKeys";

/// Upper bound for generated project names.
const PROJECT_NAME_MAX_LEN: usize = 20;

struct FilePass {
    records: HashMap<String, FileRecordDto>,
    changed: bool,
}

struct ConversationPass {
    messages: Vec<ConversationMessage>,
    changed: bool,
}

struct InferencePass {
    context: Option<Value>,
    changed: bool,
}

struct ReconcilePass {
    template_name: Option<String>,
    changed: bool,
}

struct NamingPass {
    project_name: Option<String>,
    changed: bool,
}

/// Version-less, idempotent upgrade of persisted workflow state.
pub struct StateMigration;

impl StateMigration {
    /// Brings `state` up to the current schema.
    ///
    /// Returns `Some(new_state)` when anything had to change, `None`
    /// when the snapshot is already current so the caller can keep
    /// using the original object. Safe to run on every load.
    pub fn migrate_if_needed(
        state: &WorkflowState,
        logger: &dyn StructuredLogger,
    ) -> Option<WorkflowState> {
        let files = Self::normalize_files(&state.generated_files_map);
        let conversation = Self::consolidate_conversation(&state.conversation_messages, logger);
        let inference = Self::strip_user_credentials(state.inference_context.as_ref());
        let reconciliation = Self::reconcile_deprecated_fields(state, logger);
        let naming =
            Self::backfill_project_name(state, reconciliation.template_name.as_deref(), logger);

        let needs_migration = files.changed
            || conversation.changed
            || inference.changed
            || reconciliation.changed
            || naming.changed;
        if !needs_migration {
            return None;
        }

        logger.info(
            "Migrating state: schema format, conversation cleanup, security fixes, and naming backfill",
            &[
                ("generatedFilesCount", json!(files.records.len())),
                ("finalConversationCount", json!(conversation.messages.len())),
                ("removedUserApiKeys", json!(inference.changed)),
            ],
        );

        Some(WorkflowState {
            generated_files_map: files.records,
            conversation_messages: conversation.messages,
            inference_context: inference.context,
            // Deprecated fields must not survive onto the new state.
            latest_screenshot: None,
            template_details: None,
            project_updates_accumulator: Some(Vec::new()),
            template_name: reconciliation
                .template_name
                .unwrap_or_else(|| state.template_name.clone()),
            project_name: naming
                .project_name
                .unwrap_or_else(|| state.project_name.clone()),
            query: state.query.clone(),
            blueprint: state.blueprint.clone(),
            extra: state.extra.clone(),
        })
    }

    /// Pass 1: rewrite every file record in the current convention.
    ///
    /// An entry flags only when its rebuilt form differs from the
    /// original by value; a record already in pure current form is
    /// rebuilt but does not count as a change.
    fn normalize_files(files: &HashMap<String, FileRecordDto>) -> FilePass {
        let mut records = HashMap::with_capacity(files.len());
        let mut changed = false;

        for (key, record) in files {
            let normalized = record.normalized();
            if normalized != *record {
                changed = true;
            }
            records.insert(key.clone(), normalized);
        }

        FilePass { records, changed }
    }

    /// Pass 2: deduplicate, reorder, and bound the conversation log.
    fn consolidate_conversation(
        messages: &[ConversationMessage],
        logger: &dyn StructuredLogger,
    ) -> ConversationPass {
        if messages.is_empty() {
            return ConversationPass {
                messages: Vec::new(),
                changed: false,
            };
        }

        let original_count = messages.len();

        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for message in messages {
            let key = match message.conversation_id.as_deref() {
                Some(token) if !token.is_empty() => token.to_string(),
                // Token-less messages get a synthetic key stamped with
                // the observation time, so they never dedup against
                // each other.
                _ => format!(
                    "{}_{}_{}",
                    message.role.label(),
                    message.content.fingerprint(),
                    Utc::now().timestamp_nanos_opt().unwrap_or_default()
                ),
            };
            if seen.insert(key) {
                unique.push(message.clone());
            }
        }

        // Stable sort: sequence-bearing tokens order by their numeric
        // component, everything else shares 0 and keeps relative order.
        unique.sort_by_key(|message| {
            message
                .conversation_id
                .as_deref()
                .map(conversation_sequence)
                .unwrap_or(0)
        });
        let deduplicated_count = unique.len();

        let final_messages = if deduplicated_count > CLEANUP_THRESHOLD {
            let (memos, real): (Vec<_>, Vec<_>) = unique
                .into_iter()
                .partition(|message| message.content.is_internal_memo());

            logger.info(
                "Conversation cleanup analysis",
                &[
                    ("totalUniqueMessages", json!(deduplicated_count)),
                    ("realConversations", json!(real.len())),
                    ("internalMemos", json!(memos.len())),
                ],
            );

            real
        } else {
            unique
        };

        let changed = final_messages.len() != original_count;
        if changed {
            logger.info(
                "Consolidated conversation history",
                &[
                    ("originalCount", json!(original_count)),
                    ("deduplicatedCount", json!(deduplicated_count)),
                    ("finalCount", json!(final_messages.len())),
                    (
                        "duplicatesRemoved",
                        json!(original_count - deduplicated_count),
                    ),
                    (
                        "internalMemosRemoved",
                        json!(deduplicated_count - final_messages.len()),
                    ),
                ],
            );
        }

        ConversationPass {
            messages: final_messages,
            changed,
        }
    }

    /// Pass 3: purge the legacy per-user credential field from the
    /// inference context. A context without the field passes through
    /// untouched.
    fn strip_user_credentials(context: Option<&Value>) -> InferencePass {
        match context {
            Some(Value::Object(map)) if map.contains_key(USER_API_KEYS_FIELD) => {
                let mut scrubbed = map.clone();
                scrubbed.remove(USER_API_KEYS_FIELD);
                InferencePass {
                    context: Some(Value::Object(scrubbed)),
                    changed: true,
                }
            }
            other => InferencePass {
                context: other.cloned(),
                changed: false,
            },
        }
    }

    /// Pass 4: detect deprecated and missing top-level fields, and hoist
    /// `templateDetails.name` into the flat `templateName`.
    fn reconcile_deprecated_fields(
        state: &WorkflowState,
        logger: &dyn StructuredLogger,
    ) -> ReconcilePass {
        let mut changed =
            state.latest_screenshot.is_some() || state.project_updates_accumulator.is_none();

        let template_name = state.template_details.as_ref().map(|details| {
            changed = true;
            logger.info(
                "Migrating templateDetails to templateName",
                &[("templateName", json!(details.name))],
            );
            details.name.clone()
        });

        ReconcilePass {
            template_name,
            changed,
        }
    }

    /// Pass 5: synthesize a project name for snapshots that predate the
    /// field. Seed priority: blueprint candidate, (possibly hoisted)
    /// template name, raw user query.
    fn backfill_project_name(
        state: &WorkflowState,
        migrated_template_name: Option<&str>,
        logger: &dyn StructuredLogger,
    ) -> NamingPass {
        if !state.project_name.is_empty() {
            return NamingPass {
                project_name: None,
                changed: false,
            };
        }

        let template_name = migrated_template_name.unwrap_or(&state.template_name);
        let seed = state
            .blueprint
            .as_ref()
            .and_then(|blueprint| blueprint.project_name.as_deref())
            .filter(|candidate| !candidate.is_empty())
            .or_else(|| (!template_name.is_empty()).then_some(template_name))
            .or_else(|| (!state.query.is_empty()).then_some(state.query.as_str()));

        let project_name = generate_project_name(seed, &generate_nano_id(), PROJECT_NAME_MAX_LEN);
        logger.info(
            "Generating missing projectName",
            &[("projectName", json!(project_name))],
        );

        NamingPass {
            project_name: Some(project_name),
            changed: true,
        }
    }
}
