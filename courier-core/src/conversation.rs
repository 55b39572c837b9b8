//! Conversation summary entities cached by inbox list views.
//!
//! The sync core never mutates conversations server-side on its own; these
//! types exist so the optimistic read/favorite/stage/assignment toggles have
//! a concrete cache entry to snapshot and roll back.

use crate::identity::{AccountId, ConversationId, Timestamp};
use serde::{Deserialize, Serialize};

/// Source channel of a unified conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Email,
    LinkedIn,
}

/// One row in an inbox list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: ConversationId,
    pub display_name: String,
    pub channel: Channel,
    pub unread: bool,
    pub favorite: bool,
    /// Pipeline stage tag (e.g. "lead", "qualified", "won").
    pub stage: String,
    pub assignee: Option<AccountId>,
    pub last_activity_at: Timestamp,
}

/// Optimistic mutation applied to every cached view containing a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationMutation {
    SetRead(bool),
    SetFavorite(bool),
    SetStage(String),
    SetAssignee(Option<AccountId>),
}

impl ConversationMutation {
    /// Apply this mutation to a cached summary in place.
    pub fn apply_to(&self, summary: &mut ConversationSummary) {
        match self {
            ConversationMutation::SetRead(read) => summary.unread = !read,
            ConversationMutation::SetFavorite(favorite) => summary.favorite = *favorite,
            ConversationMutation::SetStage(stage) => summary.stage = stage.clone(),
            ConversationMutation::SetAssignee(assignee) => summary.assignee = *assignee,
        }
    }
}
