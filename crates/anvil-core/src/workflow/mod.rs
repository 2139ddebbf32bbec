//! Workflow domain: the persisted state aggregate and its satellites.

pub mod message;
pub mod model;
pub mod repository;

pub use message::{
    ConversationMessage, MessageContent, MessageRole, conversation_sequence,
    CONVERSATION_ID_PREFIX, FINGERPRINT_LEN, INTERNAL_MEMO_MARKER, PROJECT_UPDATES_MARKER,
};
pub use model::{Blueprint, FileRecord, FileRecordDto, TemplateDetails, WorkflowState};
pub use repository::WorkflowStateRepository;
