//! The matcher: decides which pending entries have been superseded by a
//! confirmed entry and must be dropped from the merged view.
//!
//! Two rules, because the send acknowledgment races the thread refresh:
//!
//! - When the acknowledgment won, the pending entry carries the server ID and
//!   matching is exact and unambiguous.
//! - When the refresh won, only the content + time heuristic is available:
//!   an outbound confirmed message with identical body within the match
//!   window is treated as the same message, closest timestamp first.

use crate::identity::{EchoId, MessageId};
use crate::message::{Message, PendingMessage};
use std::collections::{HashMap, HashSet};

/// Tolerance between optimistic creation time and the message landing in the
/// authoritative store. Wide enough for clock skew and processing delay,
/// at the accepted cost of ambiguity for identical bodies sent in quick
/// succession.
pub const MATCH_WINDOW_MS: i64 = 15_000;

/// A reconciled pair: the pending echo and the confirmed message that now
/// represents it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPair {
    pub echo_id: EchoId,
    pub message_id: MessageId,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Pending entries that survived, in their original insertion order.
    pub retained: Vec<PendingMessage>,
    /// Pending entries collapsed into a confirmed message.
    pub matches: Vec<MatchPair>,
    /// Number of heuristic matches that had more than one candidate within
    /// the window. Not an error; counted so callers can log the ambiguity.
    pub collisions: u32,
}

/// Reconcile the pending queue against a freshly fetched confirmed thread.
///
/// Each confirmed message is claimed by at most one pending entry per pass,
/// so two pendings can never collapse onto the same confirmed message.
/// Exact server-ID claims happen before any heuristic claim: an acknowledged
/// entry can never lose its own message to another entry's content match.
pub fn reconcile(pending: &[PendingMessage], confirmed: &[Message]) -> ReconcileOutcome {
    let mut collisions = 0u32;
    let mut claimed: HashSet<MessageId> = HashSet::new();
    let mut resolved: HashMap<EchoId, MessageId> = HashMap::new();

    for entry in pending {
        if let Some(server_id) = entry.server_id {
            let present = confirmed
                .iter()
                .any(|message| message.message_id == server_id);
            if present && claimed.insert(server_id) {
                resolved.insert(entry.echo_id, server_id);
            }
        }
    }

    for entry in pending {
        // Identifier matching is exact; an acknowledged entry whose message
        // has not surfaced yet stays pending rather than falling back.
        if entry.server_id.is_some() {
            continue;
        }
        let (candidate, candidate_count) = closest_heuristic_match(entry, confirmed, &claimed);
        if candidate_count > 1 {
            collisions += 1;
        }
        if let Some(message_id) = candidate {
            claimed.insert(message_id);
            resolved.insert(entry.echo_id, message_id);
        }
    }

    let mut retained = Vec::new();
    let mut matches = Vec::new();
    for entry in pending {
        match resolved.get(&entry.echo_id) {
            Some(&message_id) => matches.push(MatchPair {
                echo_id: entry.echo_id,
                message_id,
            }),
            None => retained.push(entry.clone()),
        }
    }

    ReconcileOutcome {
        retained,
        matches,
        collisions,
    }
}

/// Find the confirmed message closest in time to `pending` among unclaimed
/// outbound messages with an identical body inside the window. Returns the
/// winner and how many candidates were in the window.
fn closest_heuristic_match(
    pending: &PendingMessage,
    confirmed: &[Message],
    claimed: &HashSet<MessageId>,
) -> (Option<MessageId>, usize) {
    let mut best: Option<(i64, MessageId)> = None;
    let mut count = 0usize;

    for message in confirmed {
        if !message.outbound
            || claimed.contains(&message.message_id)
            || message.body != pending.body
        {
            continue;
        }
        let delta = (message.created_at - pending.created_at)
            .num_milliseconds()
            .abs();
        if delta > MATCH_WINDOW_MS {
            continue;
        }
        count += 1;
        // Strict `<` keeps the first candidate on an exact tie.
        match best {
            Some((best_delta, _)) if delta >= best_delta => {}
            _ => best = Some((delta, message.message_id)),
        }
    }

    (best.map(|(_, id)| id), count)
}
