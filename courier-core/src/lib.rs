//! Courier Core - Sync Data Types
//!
//! Pure data structures and pure reconciliation logic for the Courier sales
//! inbox. No I/O and no async: everything here is deterministic and directly
//! testable. The client crate owns the network and the stores.

pub mod conversation;
pub mod error;
pub mod identity;
pub mod message;
pub mod project;
pub mod reconcile;

pub use conversation::{Channel, ConversationMutation, ConversationSummary};
pub use error::{CourierError, CourierResult, PushError, SendError, SyncError};
pub use identity::{
    new_echo_id, AccountId, ChatRoute, ConversationId, EchoId, EntityId, EntityIdType, MessageId,
    Timestamp,
};
pub use message::{
    Attachment, DeliveryState, Message, MessageIdentity, PendingMessage, ThreadEntry,
};
pub use project::project;
pub use reconcile::{reconcile, MatchPair, ReconcileOutcome, MATCH_WINDOW_MS};
