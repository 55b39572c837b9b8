//! Per-conversation thread partitions: the confirmed thread store and the
//! pending send queue, with generation-tagged refreshes.
//!
//! The store is an explicit keyed map; every accessor takes the
//! conversation ID. Mutating one conversation's partition can never affect
//! another's.

use courier_core::{
    project, reconcile, ConversationId, DeliveryState, EchoId, Message, MessageId, PendingMessage,
    SyncError, ThreadEntry,
};
use std::collections::HashMap;

/// Tag handed out when a refresh is started, so a late-arriving result can
/// be recognized and discarded instead of clobbering newer data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    pub conversation_id: ConversationId,
    generation: u64,
}

#[derive(Debug, Default, Clone)]
struct ThreadState {
    confirmed: Vec<Message>,
    pending: Vec<PendingMessage>,
    /// Highest generation handed out via `begin_refresh`.
    issued_generation: u64,
    /// Generation floor: only tickets above this can apply.
    applied_generation: u64,
}

/// Keyed store of confirmed threads and pending send queues.
#[derive(Debug, Default)]
pub struct ThreadStore {
    threads: HashMap<ConversationId, ThreadState>,
}

impl ThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a refresh for a conversation, tagging it with a generation.
    pub fn begin_refresh(&mut self, conversation_id: ConversationId) -> RefreshTicket {
        let state = self.threads.entry(conversation_id).or_default();
        state.issued_generation += 1;
        RefreshTicket {
            conversation_id,
            generation: state.issued_generation,
        }
    }

    /// Apply a completed refresh: replace the confirmed list wholesale, run
    /// the matcher, drop reconciled pending entries, and stamp the matched
    /// confirmed messages with the echo they superseded.
    ///
    /// A ticket at or below the applied floor (outranked by a newer applied
    /// refresh, or abandoned by a conversation switch) is discarded.
    pub fn complete_refresh(
        &mut self,
        ticket: RefreshTicket,
        mut confirmed: Vec<Message>,
    ) -> Result<(), SyncError> {
        let state = self
            .threads
            .get_mut(&ticket.conversation_id)
            .ok_or(SyncError::UnknownConversation {
                conversation_id: ticket.conversation_id,
            })?;

        if ticket.generation <= state.applied_generation {
            tracing::debug!(
                conversation_id = %ticket.conversation_id,
                generation = ticket.generation,
                floor = state.applied_generation,
                "discarding stale thread refresh"
            );
            return Err(SyncError::StaleRefresh {
                conversation_id: ticket.conversation_id,
            });
        }
        state.applied_generation = ticket.generation;

        let outcome = reconcile(&state.pending, &confirmed);
        if outcome.collisions > 0 {
            tracing::warn!(
                conversation_id = %ticket.conversation_id,
                collisions = outcome.collisions,
                "ambiguous content/time matches during reconciliation"
            );
        }
        for pair in &outcome.matches {
            if let Some(message) = confirmed
                .iter_mut()
                .find(|message| message.message_id == pair.message_id)
            {
                message.local_echo = Some(pair.echo_id);
            }
        }
        state.confirmed = confirmed;
        state.pending = outcome.retained;
        Ok(())
    }

    /// Abandon interest in every outstanding refresh for a conversation.
    /// Used on conversation switch; the partition's data stays intact.
    pub fn abandon_refreshes(&mut self, conversation_id: ConversationId) {
        if let Some(state) = self.threads.get_mut(&conversation_id) {
            state.applied_generation = state.issued_generation;
        }
    }

    /// Insert a pending entry at the tail of its conversation's queue.
    pub fn insert_pending(&mut self, pending: PendingMessage) {
        self.threads
            .entry(pending.conversation_id)
            .or_default()
            .pending
            .push(pending);
    }

    /// Record a send acknowledgment: advance to `Sent` and remember the
    /// server identifier when the backend returned one. Removal stays the
    /// matcher's job so a late refresh still reconciles deterministically.
    pub fn mark_sent(
        &mut self,
        conversation_id: ConversationId,
        echo_id: EchoId,
        server_id: Option<MessageId>,
    ) -> bool {
        let Some(state) = self.threads.get_mut(&conversation_id) else {
            return false;
        };
        let Some(pending) = state
            .pending
            .iter_mut()
            .find(|pending| pending.echo_id == echo_id)
        else {
            return false;
        };
        pending.advance_to(DeliveryState::Sent);
        if server_id.is_some() {
            pending.server_id = server_id;
        }
        true
    }

    /// Remove a pending entry outright (send failure). No ghost state stays.
    pub fn remove_pending(&mut self, conversation_id: ConversationId, echo_id: EchoId) -> bool {
        let Some(state) = self.threads.get_mut(&conversation_id) else {
            return false;
        };
        let before = state.pending.len();
        state.pending.retain(|pending| pending.echo_id != echo_id);
        state.pending.len() != before
    }

    /// The merged, time-ordered view for one conversation.
    pub fn merged_view(&self, conversation_id: ConversationId) -> Vec<ThreadEntry> {
        match self.threads.get(&conversation_id) {
            Some(state) => project(&state.confirmed, &state.pending),
            None => Vec::new(),
        }
    }

    /// The surviving pending queue for one conversation, in insertion order.
    pub fn pending(&self, conversation_id: ConversationId) -> Vec<PendingMessage> {
        self.threads
            .get(&conversation_id)
            .map(|state| state.pending.clone())
            .unwrap_or_default()
    }

    /// The last known-good confirmed list for one conversation.
    pub fn confirmed(&self, conversation_id: ConversationId) -> Vec<Message> {
        self.threads
            .get(&conversation_id)
            .map(|state| state.confirmed.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use courier_core::{new_echo_id, ChatRoute, EntityIdType, Timestamp};
    use uuid::Uuid;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn conversation() -> ConversationId {
        ConversationId::new(Uuid::now_v7())
    }

    fn confirmed(conversation_id: ConversationId, body: &str, at: Timestamp) -> Message {
        Message {
            message_id: MessageId::new(Uuid::now_v7()),
            conversation_id,
            body: body.to_string(),
            attachments: Vec::new(),
            outbound: true,
            created_at: at,
            local_echo: None,
        }
    }

    fn pending(conversation_id: ConversationId, body: &str, at: Timestamp) -> PendingMessage {
        PendingMessage {
            echo_id: new_echo_id(),
            conversation_id,
            route: ChatRoute::new("chat", "acct"),
            body: body.to_string(),
            attachments: Vec::new(),
            created_at: at,
            delivery_state: DeliveryState::Sending,
            server_id: None,
        }
    }

    #[test]
    fn test_refresh_reconciles_and_stamps_echo() {
        let id = conversation();
        let mut store = ThreadStore::new();
        let entry = pending(id, "hi", t0());
        store.insert_pending(entry.clone());

        let ticket = store.begin_refresh(id);
        let message = confirmed(id, "hi", t0() + Duration::seconds(2));
        store.complete_refresh(ticket, vec![message.clone()]).unwrap();

        assert!(store.pending(id).is_empty());
        let confirmed = store.confirmed(id);
        assert_eq!(confirmed[0].local_echo, Some(entry.echo_id));
        assert_eq!(store.merged_view(id).len(), 1);
    }

    #[test]
    fn test_stale_refresh_discarded() {
        let id = conversation();
        let mut store = ThreadStore::new();
        let old_ticket = store.begin_refresh(id);
        let new_ticket = store.begin_refresh(id);

        store
            .complete_refresh(new_ticket, vec![confirmed(id, "new", t0())])
            .unwrap();
        let err = store
            .complete_refresh(old_ticket, vec![confirmed(id, "old", t0())])
            .unwrap_err();
        assert!(matches!(err, SyncError::StaleRefresh { .. }));
        assert_eq!(store.confirmed(id)[0].body, "new");
    }

    #[test]
    fn test_abandoned_refresh_cannot_apply() {
        let id = conversation();
        let mut store = ThreadStore::new();
        store.insert_pending(pending(id, "kept", t0()));
        let ticket = store.begin_refresh(id);
        store.abandon_refreshes(id);

        let err = store
            .complete_refresh(ticket, vec![confirmed(id, "late", t0())])
            .unwrap_err();
        assert!(matches!(err, SyncError::StaleRefresh { .. }));
        // Partition data is untouched by the abandonment.
        assert_eq!(store.pending(id).len(), 1);
        assert!(store.confirmed(id).is_empty());
    }

    #[test]
    fn test_partitions_are_isolated() {
        let a = conversation();
        let b = conversation();
        let mut store = ThreadStore::new();
        store.insert_pending(pending(a, "for a", t0()));

        let ticket = store.begin_refresh(b);
        store
            .complete_refresh(ticket, vec![confirmed(b, "for b", t0())])
            .unwrap();

        assert_eq!(store.pending(a).len(), 1);
        assert!(store.confirmed(a).is_empty());
        assert_eq!(store.confirmed(b).len(), 1);
        assert!(store.pending(b).is_empty());
    }

    #[test]
    fn test_mark_sent_records_server_id_once() {
        let id = conversation();
        let mut store = ThreadStore::new();
        let entry = pending(id, "hi", t0());
        store.insert_pending(entry.clone());

        let server_id = MessageId::new(Uuid::now_v7());
        assert!(store.mark_sent(id, entry.echo_id, Some(server_id)));
        let queue = store.pending(id);
        assert_eq!(queue[0].delivery_state, DeliveryState::Sent);
        assert_eq!(queue[0].server_id, Some(server_id));

        // A later ack without an identifier must not erase the recorded one.
        assert!(store.mark_sent(id, entry.echo_id, None));
        assert_eq!(store.pending(id)[0].server_id, Some(server_id));
    }

    #[test]
    fn test_remove_pending_cleans_up() {
        let id = conversation();
        let mut store = ThreadStore::new();
        let entry = pending(id, "hi", t0());
        store.insert_pending(entry.clone());
        assert!(store.remove_pending(id, entry.echo_id));
        assert!(store.merged_view(id).is_empty());
        assert!(!store.remove_pending(id, entry.echo_id));
    }
}
