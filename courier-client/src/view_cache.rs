//! Optimistic cache of inbox list views with exact-snapshot rollback.
//!
//! A mutation first snapshots every affected entry verbatim, then mutates
//! all views containing the conversation. On failure the snapshot is
//! restored entry-for-entry: an exact copy, never a re-derivation, so
//! concurrent unrelated edits to other entries survive the rollback.

use courier_core::{ConversationId, ConversationMutation, ConversationSummary};
use std::collections::{HashMap, HashSet};

/// Identity of one cached inbox view (e.g. "inbox:all", "inbox:unread",
/// "stage:qualified").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey(String);

impl ViewKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Verbatim copy of one cache entry, taken before an optimistic mutation.
#[derive(Debug, Clone, PartialEq)]
struct SnapshotEntry {
    view: ViewKey,
    /// Version of the view when the snapshot was taken. A wholesale view
    /// replacement bumps the version, invalidating the entry.
    version: u64,
    summary: ConversationSummary,
}

/// In-memory snapshot of every cache entry an optimistic mutation touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSnapshot {
    entries: Vec<SnapshotEntry>,
}

impl CacheSnapshot {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Keyed cache of conversation list views.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ViewCache {
    views: HashMap<ViewKey, Vec<ConversationSummary>>,
    /// Bumped on every wholesale view replacement, so stale snapshots can
    /// be recognized at restore time.
    versions: HashMap<ViewKey, u64>,
    stale: HashSet<ViewKey>,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a view wholesale from a fresh list fetch.
    pub fn set_view(&mut self, key: ViewKey, summaries: Vec<ConversationSummary>) {
        self.stale.remove(&key);
        *self.versions.entry(key.clone()).or_insert(0) += 1;
        self.views.insert(key, summaries);
    }

    pub fn view(&self, key: &ViewKey) -> Option<&[ConversationSummary]> {
        self.views.get(key).map(Vec::as_slice)
    }

    pub fn is_stale(&self, key: &ViewKey) -> bool {
        self.stale.contains(key)
    }

    /// Snapshot every affected entry, then apply the mutation to all cached
    /// views containing the conversation.
    pub fn apply(
        &mut self,
        conversation_id: ConversationId,
        mutation: &ConversationMutation,
    ) -> CacheSnapshot {
        let mut snapshot = CacheSnapshot::default();
        for (key, summaries) in &mut self.views {
            let version = self.versions.get(key).copied().unwrap_or(0);
            for summary in summaries.iter_mut() {
                if summary.conversation_id == conversation_id {
                    snapshot.entries.push(SnapshotEntry {
                        view: key.clone(),
                        version,
                        summary: summary.clone(),
                    });
                    mutation.apply_to(summary);
                }
            }
        }
        snapshot
    }

    /// Restore every snapshotted entry verbatim. Entries whose view was
    /// replaced wholesale since the snapshot are skipped: the refetch is
    /// newer than the state being rolled back.
    pub fn restore(&mut self, snapshot: CacheSnapshot) {
        for entry in snapshot.entries {
            if self.versions.get(&entry.view).copied().unwrap_or(0) != entry.version {
                continue;
            }
            if let Some(summaries) = self.views.get_mut(&entry.view) {
                if let Some(slot) = summaries
                    .iter_mut()
                    .find(|summary| summary.conversation_id == entry.summary.conversation_id)
                {
                    *slot = entry.summary;
                }
            }
        }
    }

    /// Mark every view containing the conversation as stale, so the next
    /// list fetch picks up server-side side effects of a mutation.
    pub fn mark_stale(&mut self, conversation_id: ConversationId) {
        for (key, summaries) in &self.views {
            if summaries
                .iter()
                .any(|summary| summary.conversation_id == conversation_id)
            {
                self.stale.insert(key.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use courier_core::{Channel, EntityIdType};
    use uuid::Uuid;

    fn summary(conversation_id: ConversationId, name: &str) -> ConversationSummary {
        ConversationSummary {
            conversation_id,
            display_name: name.to_string(),
            channel: Channel::Email,
            unread: true,
            favorite: false,
            stage: "lead".to_string(),
            assignee: None,
            last_activity_at: Utc::now(),
        }
    }

    #[test]
    fn test_apply_mutates_every_containing_view() {
        let id = ConversationId::new(Uuid::now_v7());
        let mut cache = ViewCache::new();
        cache.set_view(ViewKey::new("inbox:all"), vec![summary(id, "Ada")]);
        cache.set_view(ViewKey::new("inbox:unread"), vec![summary(id, "Ada")]);

        let snapshot = cache.apply(id, &ConversationMutation::SetRead(true));
        assert_eq!(snapshot.len(), 2);
        for key in ["inbox:all", "inbox:unread"] {
            let view = cache.view(&ViewKey::new(key)).unwrap();
            assert!(!view[0].unread);
        }
    }

    #[test]
    fn test_restore_is_exact() {
        let id = ConversationId::new(Uuid::now_v7());
        let mut cache = ViewCache::new();
        cache.set_view(ViewKey::new("inbox:all"), vec![summary(id, "Ada")]);
        let before = cache.clone();

        let snapshot = cache.apply(id, &ConversationMutation::SetStage("won".to_string()));
        assert_ne!(cache, before);
        cache.restore(snapshot);
        assert_eq!(cache, before);
    }

    #[test]
    fn test_restore_leaves_unrelated_entries_alone() {
        let target = ConversationId::new(Uuid::now_v7());
        let other = ConversationId::new(Uuid::now_v7());
        let mut cache = ViewCache::new();
        cache.set_view(
            ViewKey::new("inbox:all"),
            vec![summary(target, "Ada"), summary(other, "Grace")],
        );

        let snapshot = cache.apply(target, &ConversationMutation::SetFavorite(true));

        // An unrelated mutation lands between apply and rollback.
        cache.apply(other, &ConversationMutation::SetRead(true));
        cache.restore(snapshot);

        let view = cache.view(&ViewKey::new("inbox:all")).unwrap();
        assert!(!view[0].favorite);
        assert!(!view[1].unread);
    }

    #[test]
    fn test_restore_skips_views_refetched_since_snapshot() {
        let id = ConversationId::new(Uuid::now_v7());
        let key = ViewKey::new("inbox:all");
        let mut cache = ViewCache::new();
        cache.set_view(key.clone(), vec![summary(id, "Ada")]);

        let snapshot = cache.apply(id, &ConversationMutation::SetFavorite(true));

        // A refetch replaces the view before the rollback lands; the fresh
        // server state must not be stomped by the stale snapshot.
        let mut fresh = summary(id, "Ada Lovelace");
        fresh.unread = false;
        cache.set_view(key.clone(), vec![fresh.clone()]);
        cache.restore(snapshot);

        assert_eq!(cache.view(&key).unwrap()[0], fresh);
    }

    #[test]
    fn test_mark_stale_targets_containing_views_only() {
        let id = ConversationId::new(Uuid::now_v7());
        let mut cache = ViewCache::new();
        cache.set_view(ViewKey::new("inbox:all"), vec![summary(id, "Ada")]);
        cache.set_view(ViewKey::new("stage:won"), Vec::new());

        cache.mark_stale(id);
        assert!(cache.is_stale(&ViewKey::new("inbox:all")));
        assert!(!cache.is_stale(&ViewKey::new("stage:won")));

        cache.set_view(ViewKey::new("inbox:all"), vec![summary(id, "Ada")]);
        assert!(!cache.is_stale(&ViewKey::new("inbox:all")));
    }
}
