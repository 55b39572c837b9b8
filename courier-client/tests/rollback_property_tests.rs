use chrono::Utc;
use courier_client::view_cache::{ViewCache, ViewKey};
use courier_core::{
    AccountId, Channel, ConversationId, ConversationMutation, ConversationSummary, EntityIdType,
};
use proptest::prelude::*;
use uuid::Uuid;

fn arb_uuid() -> impl Strategy<Value = Uuid> {
    any::<[u8; 16]>().prop_map(Uuid::from_bytes)
}

fn arb_summary() -> impl Strategy<Value = ConversationSummary> {
    (
        arb_uuid(),
        "[a-zA-Z ]{1,40}",
        any::<bool>(),
        any::<bool>(),
        "[a-z]{1,20}",
        prop::option::of(arb_uuid()),
    )
        .prop_map(
            |(id, display_name, unread, favorite, stage, assignee)| ConversationSummary {
                conversation_id: ConversationId::new(id),
                display_name,
                channel: Channel::LinkedIn,
                unread,
                favorite,
                stage,
                assignee: assignee.map(AccountId::new),
                last_activity_at: Utc::now(),
            },
        )
}

fn arb_mutation() -> impl Strategy<Value = ConversationMutation> {
    prop_oneof![
        any::<bool>().prop_map(ConversationMutation::SetRead),
        any::<bool>().prop_map(ConversationMutation::SetFavorite),
        "[a-z]{1,20}".prop_map(ConversationMutation::SetStage),
        prop::option::of(arb_uuid().prop_map(AccountId::new))
            .prop_map(ConversationMutation::SetAssignee),
    ]
}

fn populate(views: Vec<(String, Vec<ConversationSummary>)>) -> ViewCache {
    let mut cache = ViewCache::new();
    for (key, summaries) in views {
        cache.set_view(ViewKey::new(key), summaries);
    }
    cache
}

proptest! {
    // The rollback contract: apply-then-restore is bit-for-bit identity,
    // whatever the mutation and whatever the cache contents.
    #[test]
    fn apply_then_restore_is_identity(
        views in prop::collection::vec(
            ("[a-z:]{1,12}", prop::collection::vec(arb_summary(), 0..5)),
            0..4,
        ),
        target in arb_uuid(),
        mutation in arb_mutation(),
    ) {
        let mut cache = populate(views);
        let before = cache.clone();

        let snapshot = cache.apply(ConversationId::new(target), &mutation);
        cache.restore(snapshot);

        prop_assert_eq!(cache, before);
    }

    // Picking the target from the cached entries exercises the non-trivial
    // path where the mutation actually lands somewhere.
    #[test]
    fn restore_reverts_a_real_mutation(
        mut summaries in prop::collection::vec(arb_summary(), 1..6),
        pick in any::<prop::sample::Index>(),
        mutation in arb_mutation(),
    ) {
        // Same conversation may appear in several views.
        let target = summaries[pick.index(summaries.len())].conversation_id;
        let mut cache = ViewCache::new();
        cache.set_view(ViewKey::new("inbox:all"), summaries.clone());
        summaries.reverse();
        cache.set_view(ViewKey::new("inbox:recent"), summaries);
        let before = cache.clone();

        let snapshot = cache.apply(target, &mutation);
        prop_assert!(!snapshot.is_empty());
        cache.restore(snapshot);

        prop_assert_eq!(cache, before);
    }

    #[test]
    fn mutation_on_absent_conversation_is_a_noop(
        summaries in prop::collection::vec(arb_summary(), 0..5),
        mutation in arb_mutation(),
    ) {
        let mut cache = ViewCache::new();
        cache.set_view(ViewKey::new("inbox:all"), summaries);
        let before = cache.clone();

        // Freshly generated UUIDv7 cannot collide with the arbitrary ones.
        let snapshot = cache.apply(ConversationId::new(Uuid::now_v7()), &mutation);
        prop_assert!(snapshot.is_empty());
        prop_assert_eq!(&cache, &before);

        cache.restore(snapshot);
        prop_assert_eq!(cache, before);
    }
}
