//! Conversation message types.
//!
//! Messages are persisted as camelCase JSON. Content is heterogeneous in
//! the wild (plain strings and structured payloads), so it is modeled as
//! a tagged union and every inspection (fingerprinting, memo detection)
//! runs on a derived plain-text projection instead of branching inline.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;

/// Marker injected into bookkeeping messages by the orchestrating agent.
pub const INTERNAL_MEMO_MARKER: &str = "**<Internal Memo>**";

/// Alternate marker used by project-update bookkeeping messages.
pub const PROJECT_UPDATES_MARKER: &str = "Project Updates:";

/// Prefix of sequence-bearing correlation tokens (`conv-<n>` and friends).
pub const CONVERSATION_ID_PREFIX: &str = "conv-";

/// Number of content characters that feed the dedup fingerprint.
pub const FINGERPRINT_LEN: usize = 100;

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the AI assistant.
    Assistant,
    /// System-generated message.
    System,
    /// Tool invocation result.
    Tool,
    /// Any role this build does not recognize (legacy or future data).
    #[serde(other)]
    Unknown,
}

impl MessageRole {
    /// Returns the wire label for this role.
    pub fn label(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
            MessageRole::Tool => "tool",
            MessageRole::Unknown => "unknown",
        }
    }
}

impl Default for MessageRole {
    fn default() -> Self {
        MessageRole::Unknown
    }
}

/// Message content: either plain text or an arbitrary structured payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain-text content.
    Text(String),
    /// Structured content (tool calls, rich payloads).
    Structured(Value),
}

impl MessageContent {
    /// Plain-text view of the content. Structured payloads are projected
    /// through their JSON encoding.
    pub fn text_projection(&self) -> Cow<'_, str> {
        match self {
            MessageContent::Text(text) => Cow::Borrowed(text),
            MessageContent::Structured(value) => {
                Cow::Owned(serde_json::to_string(value).unwrap_or_default())
            }
        }
    }

    /// Short content fingerprint used when a message has no correlation
    /// token to deduplicate by.
    pub fn fingerprint(&self) -> String {
        self.text_projection().chars().take(FINGERPRINT_LEN).collect()
    }

    /// Whether this content is recognized as internal bookkeeping rather
    /// than user-facing dialogue.
    pub fn is_internal_memo(&self) -> bool {
        let projection = self.text_projection();
        projection.contains(INTERNAL_MEMO_MARKER) || projection.contains(PROJECT_UPDATES_MARKER)
    }
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

/// A single turn in the persisted conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    /// The role of the message sender.
    #[serde(default)]
    pub role: MessageRole,
    /// The content of the message.
    #[serde(default)]
    pub content: MessageContent,
    /// Opaque correlation token, sometimes sequence-bearing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Fields this build does not model; preserved across round trips.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Extracts the monotonic sequence number from a correlation token.
///
/// Tokens follow the `conv-<n>[-...]` convention. Anything else (absent
/// prefix, empty or non-numeric component) degrades to 0 so callers can
/// stable-sort without a failure path.
pub fn conversation_sequence(token: &str) -> u64 {
    let Some(rest) = token.strip_prefix(CONVERSATION_ID_PREFIX) else {
        return 0;
    };
    rest.split('-')
        .next()
        .and_then(|component| component.parse().ok())
        .unwrap_or(0)
}
