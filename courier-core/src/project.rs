//! The merged view projector: the single time-ordered list the client
//! renders, combining the confirmed thread with the surviving pending queue.

use crate::message::{Message, PendingMessage, ThreadEntry};

/// Project the merged thread. Pure and idempotent: the same inputs always
/// produce the same ordering, so re-renders never flicker.
///
/// Entries sort ascending by `created_at`; on equal timestamps confirmed
/// entries come before pending ones (the sort is stable and confirmed
/// entries are concatenated first).
pub fn project(confirmed: &[Message], pending: &[PendingMessage]) -> Vec<ThreadEntry> {
    let mut entries: Vec<ThreadEntry> = Vec::with_capacity(confirmed.len() + pending.len());
    entries.extend(confirmed.iter().cloned().map(ThreadEntry::Confirmed));
    entries.extend(pending.iter().cloned().map(ThreadEntry::Pending));
    entries.sort_by_key(ThreadEntry::created_at);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{new_echo_id, ChatRoute, ConversationId, EntityIdType, MessageId};
    use crate::message::DeliveryState;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn confirmed_at(offset_s: i64) -> Message {
        Message {
            message_id: MessageId::new(Uuid::now_v7()),
            conversation_id: ConversationId::new(Uuid::nil()),
            body: "c".to_string(),
            attachments: Vec::new(),
            outbound: false,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
                + Duration::seconds(offset_s),
            local_echo: None,
        }
    }

    fn pending_at(offset_s: i64) -> PendingMessage {
        PendingMessage {
            echo_id: new_echo_id(),
            conversation_id: ConversationId::new(Uuid::nil()),
            route: ChatRoute::new("chat", "acct"),
            body: "p".to_string(),
            attachments: Vec::new(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
                + Duration::seconds(offset_s),
            delivery_state: DeliveryState::Sending,
            server_id: None,
        }
    }

    #[test]
    fn test_ascending_by_created_at() {
        let merged = project(&[confirmed_at(10), confirmed_at(0)], &[pending_at(5)]);
        let times: Vec<_> = merged.iter().map(ThreadEntry::created_at).collect();
        let mut sorted = times.clone();
        sorted.sort();
        assert_eq!(times, sorted);
    }

    #[test]
    fn test_idempotent() {
        let confirmed = vec![confirmed_at(3), confirmed_at(1)];
        let pending = vec![pending_at(2), pending_at(1)];
        let first = project(&confirmed, &pending);
        let second = project(&confirmed, &pending);
        assert_eq!(first, second);
    }

    #[test]
    fn test_confirmed_before_pending_on_tie() {
        let merged = project(&[confirmed_at(1)], &[pending_at(1)]);
        assert!(matches!(merged[0], ThreadEntry::Confirmed(_)));
        assert!(matches!(merged[1], ThreadEntry::Pending(_)));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(project(&[], &[]).is_empty());
    }
}
