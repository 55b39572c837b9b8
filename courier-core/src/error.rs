//! Error types for Courier operations

use crate::identity::ConversationId;
use thiserror::Error;

/// Errors from the send path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("Missing routing information for send: {field}")]
    MissingRouting { field: &'static str },

    #[error("Network failure during send: {reason}")]
    Network { reason: String },

    #[error("Send rejected by backend with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// Errors from thread refresh and store access.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("Network failure during thread fetch: {reason}")]
    Network { reason: String },

    #[error("Stale refresh discarded for conversation {conversation_id}")]
    StaleRefresh { conversation_id: ConversationId },

    #[error("Unknown conversation: {conversation_id}")]
    UnknownConversation { conversation_id: ConversationId },
}

/// Errors from the push channel boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PushError {
    #[error("Malformed push payload: {reason}")]
    MalformedPayload { reason: String },

    #[error("Push channel closed")]
    ChannelClosed,
}

/// Master error type for all Courier operations.
#[derive(Debug, Clone, Error)]
pub enum CourierError {
    #[error("Send error: {0}")]
    Send(#[from] SendError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Push error: {0}")]
    Push(#[from] PushError),
}

/// Result type alias for Courier operations.
pub type CourierResult<T> = Result<T, CourierError>;
