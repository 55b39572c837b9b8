//! Push Channel Event Types
//!
//! Events announced out-of-band by the backend over the persistent push
//! connection. The payload is a tagged union; anything without a known
//! `type` discriminant is rejected at the decode boundary and never reaches
//! the stores.

use courier_core::ConversationId;
use serde::{Deserialize, Serialize};

/// Scope of a push subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushScope {
    /// Only events for one conversation are interesting.
    Conversation(ConversationId),
    /// Grouped / sender-level views: every conversation event is interesting.
    All,
}

/// Push event types for real-time invalidation.
///
/// Only `MessageReceived` triggers a thread refresh; every other type is
/// informational and ignored by the listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PushEvent {
    /// A new message arrived for a conversation. Carries the provider's own
    /// identifier, which does not map one-to-one onto pending entries.
    MessageReceived {
        conversation_id: ConversationId,
        provider_message_id: Option<String>,
    },

    /// A conversation's metadata changed server-side.
    ConversationUpdated { conversation_id: ConversationId },

    /// Connection established (synthesized client-side).
    Connected,

    /// Connection lost (synthesized client-side).
    Disconnected { reason: String },

    /// An error occurred on the channel.
    Error { message: String },
}

impl PushEvent {
    /// Get the event type as a string for logging/debugging.
    pub fn event_type(&self) -> &'static str {
        match self {
            PushEvent::MessageReceived { .. } => "MessageReceived",
            PushEvent::ConversationUpdated { .. } => "ConversationUpdated",
            PushEvent::Connected => "Connected",
            PushEvent::Disconnected { .. } => "Disconnected",
            PushEvent::Error { .. } => "Error",
        }
    }

    /// Whether this event should invalidate a thread under the given scope.
    pub fn invalidates(&self, scope: PushScope) -> Option<ConversationId> {
        match self {
            PushEvent::MessageReceived {
                conversation_id, ..
            } => match scope {
                PushScope::All => Some(*conversation_id),
                PushScope::Conversation(active) if active == *conversation_id => {
                    Some(*conversation_id)
                }
                PushScope::Conversation(_) => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::EntityIdType;
    use uuid::Uuid;

    fn conversation() -> ConversationId {
        ConversationId::new(Uuid::now_v7())
    }

    #[test]
    fn test_event_serialization_round_trip() {
        let event = PushEvent::MessageReceived {
            conversation_id: conversation(),
            provider_message_id: Some("prov-42".to_string()),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"MessageReceived\""));
        let decoded: PushEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn test_unknown_discriminant_rejected() {
        let json = r#"{"type":"SomethingElse","conversation_id":"00000000-0000-0000-0000-000000000000"}"#;
        assert!(serde_json::from_str::<PushEvent>(json).is_err());
    }

    #[test]
    fn test_invalidates_matching_conversation_only() {
        let active = conversation();
        let other = conversation();
        let event = PushEvent::MessageReceived {
            conversation_id: active,
            provider_message_id: None,
        };
        assert_eq!(event.invalidates(PushScope::Conversation(active)), Some(active));
        assert_eq!(event.invalidates(PushScope::Conversation(other)), None);
        assert_eq!(event.invalidates(PushScope::All), Some(active));
    }

    #[test]
    fn test_non_message_events_never_invalidate() {
        let event = PushEvent::ConversationUpdated {
            conversation_id: conversation(),
        };
        assert_eq!(event.invalidates(PushScope::All), None);
        assert_eq!(
            PushEvent::Connected.invalidates(PushScope::All),
            None
        );
    }
}
