//! Identity types for Courier entities

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Raw entity identifier.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Common interface for strongly-typed entity IDs.
///
/// Every ID newtype wraps a [`Uuid`]; the wrapper exists so a
/// `ConversationId` can never be passed where a `MessageId` is expected.
pub trait EntityIdType: Copy + Eq + std::hash::Hash {
    /// Wrap a raw UUID.
    fn new(id: Uuid) -> Self;

    /// Unwrap to the raw UUID.
    fn as_uuid(&self) -> Uuid;
}

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl EntityIdType for $name {
            fn new(id: Uuid) -> Self {
                Self(id)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id! {
    /// A conversation (unified email + LinkedIn thread).
    ConversationId
}

entity_id! {
    /// Durable server-assigned message identifier.
    MessageId
}

entity_id! {
    /// Locally-generated temporary identifier for an optimistic message,
    /// assigned the instant the user presses Send.
    EchoId
}

entity_id! {
    /// A user account (sender identity / assignee).
    AccountId
}

/// Generate a fresh local echo ID.
///
/// UUIDv7 embeds a Unix timestamp, so echo IDs sort by creation time.
pub fn new_echo_id() -> EchoId {
    EchoId::new(Uuid::now_v7())
}

/// Provider-side routing handle for an outbound send.
///
/// Both fields are opaque provider strings, not Courier IDs; the backend
/// resolves them to the actual delivery channel.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChatRoute {
    /// Destination chat/thread handle on the provider side.
    pub chat_id: String,
    /// Sending account handle on the provider side.
    pub account_id: String,
}

impl ChatRoute {
    pub fn new(chat_id: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            account_id: account_id.into(),
        }
    }

    /// A route is usable only when both handles are present.
    pub fn is_complete(&self) -> bool {
        !self.chat_id.trim().is_empty() && !self.account_id.trim().is_empty()
    }
}
