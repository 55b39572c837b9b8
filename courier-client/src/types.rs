//! Wire types for the Courier backend API.
//!
//! Inbound payloads are narrowed here, at the boundary: anything that does
//! not deserialize into these shapes is rejected before it can reach the
//! typed message model.

use chrono::{DateTime, Utc};
use courier_core::{
    AccountId, Attachment, Channel, ConversationId, ConversationMutation, ConversationSummary,
    EntityIdType, Message, MessageId,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Messages
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentResponse {
    pub attachment_id: String,
    pub file_name: String,
    pub media_type: String,
    pub url: String,
}

impl From<AttachmentResponse> for Attachment {
    fn from(value: AttachmentResponse) -> Self {
        Attachment {
            attachment_id: value.attachment_id,
            file_name: value.file_name,
            media_type: value.media_type,
            url: value.url,
        }
    }
}

impl From<Attachment> for AttachmentResponse {
    fn from(value: Attachment) -> Self {
        AttachmentResponse {
            attachment_id: value.attachment_id,
            file_name: value.file_name,
            media_type: value.media_type,
            url: value.url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message_id: Uuid,
    pub conversation_id: Uuid,
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<AttachmentResponse>,
    pub outbound: bool,
    pub created_at: DateTime<Utc>,
}

impl MessageResponse {
    /// Narrow into the core message model. The server never knows about
    /// local echoes, so `local_echo` starts empty.
    pub fn into_message(self) -> Message {
        Message {
            message_id: MessageId::new(self.message_id),
            conversation_id: ConversationId::new(self.conversation_id),
            body: self.body,
            attachments: self.attachments.into_iter().map(Attachment::from).collect(),
            outbound: self.outbound,
            created_at: self.created_at,
            local_echo: None,
        }
    }
}

/// Ordered confirmed thread for one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadResponse {
    pub conversation_id: Uuid,
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub chat_id: String,
    pub account_id: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub status: String,
    /// May be null even on success; the sender then relies on the
    /// content/time heuristic at the next refresh.
    pub message: Option<MessageResponse>,
}

// ----------------------------------------------------------------------------
// Conversations
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub conversation_id: Uuid,
    pub display_name: String,
    pub channel: Channel,
    pub unread: bool,
    pub favorite: bool,
    pub stage: String,
    pub assignee: Option<Uuid>,
    pub last_activity_at: DateTime<Utc>,
}

impl ConversationResponse {
    pub fn into_summary(self) -> ConversationSummary {
        ConversationSummary {
            conversation_id: ConversationId::new(self.conversation_id),
            display_name: self.display_name,
            channel: self.channel,
            unread: self.unread,
            favorite: self.favorite,
            stage: self.stage,
            assignee: self.assignee.map(AccountId::new),
            last_activity_at: self.last_activity_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListConversationsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorites_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConversationsResponse {
    pub conversations: Vec<ConversationResponse>,
}

/// Partial update for a conversation; only the field being toggled is sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateConversationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Outer option: whether the field is part of the update.
    /// Inner option: assign or clear.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Option<Uuid>>,
}

impl From<&ConversationMutation> for UpdateConversationRequest {
    fn from(mutation: &ConversationMutation) -> Self {
        let mut request = UpdateConversationRequest::default();
        match mutation {
            ConversationMutation::SetRead(read) => request.unread = Some(!read),
            ConversationMutation::SetFavorite(favorite) => request.favorite = Some(*favorite),
            ConversationMutation::SetStage(stage) => request.stage = Some(stage.clone()),
            ConversationMutation::SetAssignee(assignee) => {
                request.assignee = Some(assignee.map(|id| id.as_uuid()));
            }
        }
        request
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_response_narrowing() {
        let response = MessageResponse {
            message_id: Uuid::now_v7(),
            conversation_id: Uuid::now_v7(),
            body: "hello".to_string(),
            attachments: vec![AttachmentResponse {
                attachment_id: "a1".to_string(),
                file_name: "deck.pdf".to_string(),
                media_type: "application/pdf".to_string(),
                url: "https://files.test/a1".to_string(),
            }],
            outbound: true,
            created_at: Utc::now(),
        };
        let message = response.clone().into_message();
        assert_eq!(message.message_id.as_uuid(), response.message_id);
        assert_eq!(message.attachments.len(), 1);
        assert_eq!(message.local_echo, None);
    }

    #[test]
    fn test_send_response_tolerates_null_message() {
        let json = r#"{"status":"accepted","message":null}"#;
        let response: SendMessageResponse = serde_json::from_str(json).unwrap();
        assert!(response.message.is_none());
    }

    #[test]
    fn test_update_request_from_mutation_serializes_sparsely() {
        let request = UpdateConversationRequest::from(&ConversationMutation::SetRead(true));
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"unread":false}"#);
    }

    #[test]
    fn test_update_request_can_clear_assignee() {
        let request = UpdateConversationRequest::from(&ConversationMutation::SetAssignee(None));
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"assignee":null}"#);
    }

    #[test]
    fn test_malformed_message_rejected_at_boundary() {
        let json = r#"{"message_id":"not-a-uuid","conversation_id":"x","body":1}"#;
        assert!(serde_json::from_str::<MessageResponse>(json).is_err());
    }
}
