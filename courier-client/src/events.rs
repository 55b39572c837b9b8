//! Event types for the host application's event loop.

use crate::push::PushEvent;
use courier_core::ConversationId;

#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Raw event decoded from the push channel.
    Push(Box<PushEvent>),
    /// The confirmed thread for a conversation should be refetched.
    ThreadInvalidated(ConversationId),
    /// A background API call failed; for display only.
    ApiError(String),
}
