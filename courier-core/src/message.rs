//! Message entities: confirmed messages, pending (optimistic) messages, and
//! the merged thread entry rendered by the client.

use crate::identity::{ChatRoute, ConversationId, EchoId, MessageId, Timestamp};
use serde::{Deserialize, Serialize};

/// Delivery lifecycle of a locally-originated message.
///
/// Only meaningful for the local user's own outbound messages; confirmed
/// remote messages are implicitly `Delivered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeliveryState {
    /// Created locally, network send not yet acknowledged.
    Sending,
    /// Send call acknowledged by the backend.
    Sent,
    /// Present in the authoritative thread.
    Delivered,
}

impl DeliveryState {
    /// Delivery state only ever moves forward: `Sending -> Sent -> Delivered`.
    pub fn can_advance_to(&self, next: DeliveryState) -> bool {
        next > *self
    }
}

/// An opaque attachment reference, passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub attachment_id: String,
    pub file_name: String,
    pub media_type: String,
    pub url: String,
}

/// A message present in the authoritative server-returned thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: MessageId,
    pub conversation_id: ConversationId,
    /// Message body; plain or rich text, opaque to the sync core.
    pub body: String,
    pub attachments: Vec<Attachment>,
    /// True when the local user authored this message.
    pub outbound: bool,
    pub created_at: Timestamp,
    /// The local echo this confirmed message superseded, stamped by the
    /// matcher for traceability. Never set by the server.
    pub local_echo: Option<EchoId>,
}

/// A locally-created message that has not yet been reconciled against the
/// confirmed thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMessage {
    pub echo_id: EchoId,
    pub conversation_id: ConversationId,
    pub route: ChatRoute,
    pub body: String,
    pub attachments: Vec<Attachment>,
    pub created_at: Timestamp,
    pub delivery_state: DeliveryState,
    /// Server identifier recorded from the send acknowledgment, when the
    /// backend returned one. `None` until the ack arrives, and possibly
    /// forever (the send response's message field may be null on success).
    pub server_id: Option<MessageId>,
}

impl PendingMessage {
    /// Advance the delivery state, ignoring regressions.
    ///
    /// Returns true when the state actually changed.
    pub fn advance_to(&mut self, next: DeliveryState) -> bool {
        if self.delivery_state.can_advance_to(next) {
            self.delivery_state = next;
            true
        } else {
            false
        }
    }
}

/// Resolved identity of a thread entry, used for duplicate checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageIdentity {
    /// Durable server identifier.
    Server(MessageId),
    /// Local echo only; no server identifier known yet.
    Local(EchoId),
}

/// One entry in the merged, rendered thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadEntry {
    Confirmed(Message),
    Pending(PendingMessage),
}

impl ThreadEntry {
    pub fn created_at(&self) -> Timestamp {
        match self {
            ThreadEntry::Confirmed(message) => message.created_at,
            ThreadEntry::Pending(pending) => pending.created_at,
        }
    }

    pub fn conversation_id(&self) -> ConversationId {
        match self {
            ThreadEntry::Confirmed(message) => message.conversation_id,
            ThreadEntry::Pending(pending) => pending.conversation_id,
        }
    }

    /// The strongest identity known for this entry. A pending entry that has
    /// received a server ID from its acknowledgment resolves to that ID, so a
    /// confirmed duplicate can be detected before the matcher prunes it.
    pub fn identity(&self) -> MessageIdentity {
        match self {
            ThreadEntry::Confirmed(message) => MessageIdentity::Server(message.message_id),
            ThreadEntry::Pending(pending) => match pending.server_id {
                Some(id) => MessageIdentity::Server(id),
                None => MessageIdentity::Local(pending.echo_id),
            },
        }
    }

    /// Delivery state shown to the user for this entry.
    pub fn delivery_state(&self) -> DeliveryState {
        match self {
            ThreadEntry::Confirmed(_) => DeliveryState::Delivered,
            ThreadEntry::Pending(pending) => pending.delivery_state,
        }
    }
}
