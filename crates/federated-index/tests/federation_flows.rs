//! # Federation Flow Tests
//!
//! End-to-end reads through `FederatedFeedService` over in-memory stores.
//!
//! ## Test Categories
//!
//! 1. **Notifications** - windows, pagination, dedup, partial sources, hydration
//! 2. **Reactions and Threads** - source selection, union, dedup
//! 3. **Followers** - private and community indexes
//! 4. **Direct Lookups** - entries, blobs, authors

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

use federated_index::{
    encode_millis, encode_time, AuthorCache, BlobContent, BlobEncoding, FederatedFeedApi,
    FederatedFeedService, FederationConfig, FeedError, MemoryBlobStore, MemoryStore,
    NotificationQuery, OwnerId, OwnerStore, StoreRegistry, Subject, ViewerInfo,
};

// =============================================================================
// TEST HELPERS
// =============================================================================

const T0: u64 = 1_700_000_000_000;

fn ms(n: u64) -> u64 {
    T0 + n * 1_000
}

fn time(millis: u64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis as i64).unwrap()
}

fn cursor(millis: u64) -> String {
    encode_millis(millis).to_string()
}

fn post_url(n: u32) -> String {
    format!("hyper://b0b/ctzn.network/post/{n}")
}

fn notification(item: &str, millis: u64) -> serde_json::Value {
    json!({ "itemUrl": item, "createdAt": time(millis).to_rfc3339() })
}

fn open(registry: &StoreRegistry, owner: &str, private: bool) -> MemoryStore {
    let mem = MemoryStore::new();
    let store = OwnerStore::new(OwnerId::new(owner), Arc::new(mem.clone()));
    if private {
        registry.open_private(store);
    } else {
        registry.open_public(store);
    }
    mem
}

/// Alice views; she belongs to the `club` community. Bob authors posts.
struct World {
    registry: Arc<StoreRegistry>,
    alice_private: MemoryStore,
    alice_public: MemoryStore,
    club: MemoryStore,
    bob: MemoryStore,
    bob_blobs: Arc<MemoryBlobStore>,
}

impl World {
    fn new() -> Self {
        let registry = StoreRegistry::new();
        let alice_private = open(&registry, "alice", true);
        let alice_public = open(&registry, "alice", false);
        let club = open(&registry, "club", false);

        let bob = MemoryStore::new();
        let bob_blobs = Arc::new(MemoryBlobStore::new());
        registry.open_public(
            OwnerStore::new(OwnerId::new("bob"), Arc::new(bob.clone()))
                .with_blobs(bob_blobs.clone()),
        );

        registry.alias_address("a11ce", OwnerId::new("alice"));
        registry.alias_address("b0b", OwnerId::new("bob"));
        for voter in ["u1", "u2", "u3", "u4"] {
            registry.alias_address(voter, OwnerId::new(voter));
        }

        let world = Self {
            registry: Arc::new(registry),
            alice_private,
            alice_public,
            club,
            bob,
            bob_blobs,
        };
        world.join("club");
        world
    }

    fn service(&self) -> FederatedFeedService<StoreRegistry> {
        FederatedFeedService::new(Arc::clone(&self.registry), FederationConfig::for_testing())
            .unwrap()
    }

    fn viewer() -> ViewerInfo {
        ViewerInfo::new("alice", "hyper://a11ce/")
    }

    fn join(&self, community: &str) {
        self.alice_public
            .namespace("memberships")
            .put(community, json!({ "community": { "userId": community } }));
    }

    fn post(&self, n: u32, millis: u64) {
        self.bob.namespace("ctzn.network/post").put(
            n.to_string(),
            json!({ "text": format!("post {n}"), "createdAt": time(millis).to_rfc3339() }),
        );
    }

    /// Notification about post `n` in Alice's private index.
    fn private_notification(&self, n: u32, millis: u64) {
        self.post(n, millis);
        self.alice_private
            .namespace("notificationsIdx")
            .put(cursor(millis), notification(&post_url(n), millis));
    }

    /// Notification about post `n` in the club index, scoped to Alice.
    fn club_notification(&self, n: u32, millis: u64) {
        self.post(n, millis);
        self.club.namespace("notificationsIdx").put(
            format!("a11ce:{}", cursor(millis)),
            notification(&post_url(n), millis),
        );
    }
}

fn keys(page: &[federated_index::HydratedNotification]) -> Vec<String> {
    page.iter().map(|n| n.key.clone()).collect()
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

#[tokio::test]
async fn test_window_spans_sources() {
    let world = World::new();
    world.private_notification(5, ms(5));
    world.private_notification(2, ms(2));
    world.club_notification(4, ms(4));
    world.club_notification(3, ms(3));
    world.club_notification(1, ms(1));

    let page = world
        .service()
        .list_notifications(
            &World::viewer(),
            &NotificationQuery::new().lt(cursor(ms(4))).limit(2),
        )
        .await
        .unwrap();

    assert_eq!(keys(&page), vec![cursor(ms(3)), cursor(ms(2))]);
    assert_eq!(page[0].item_url, post_url(3));
}

#[tokio::test]
async fn test_date_bounds_match_raw_cursors() {
    let world = World::new();
    for n in 1..=6 {
        if n % 2 == 0 {
            world.private_notification(n, ms(n as u64));
        } else {
            world.club_notification(n, ms(n as u64));
        }
    }
    let service = world.service();

    let by_date = service
        .list_notifications(
            &World::viewer(),
            &NotificationQuery::new().before(time(ms(5))).after(time(ms(1))),
        )
        .await
        .unwrap();
    let by_cursor = service
        .list_notifications(
            &World::viewer(),
            &NotificationQuery::new()
                .lt(encode_time(time(ms(5))).to_string())
                .gt(cursor(ms(1))),
        )
        .await
        .unwrap();

    assert_eq!(keys(&by_date), keys(&by_cursor));
    assert_eq!(
        keys(&by_date),
        vec![cursor(ms(4)), cursor(ms(3)), cursor(ms(2))]
    );
}

#[tokio::test]
async fn test_pagination_is_monotonic_and_bounded_by_count() {
    let world = World::new();
    for n in 1..=7u32 {
        if n % 3 == 0 {
            world.private_notification(n, ms(n as u64));
        } else {
            world.club_notification(n, ms(n as u64));
        }
    }
    let service = world.service();
    let viewer = World::viewer();

    let mut seen: Vec<String> = Vec::new();
    let mut query = NotificationQuery::new().limit(3);
    loop {
        let page = service.list_notifications(&viewer, &query).await.unwrap();
        let count = service.count_notifications(&viewer, &query).await.unwrap();
        assert!(page.len() <= 3);
        assert!(page.len() <= count);
        if let (Some(last_seen), Some(first)) = (seen.last(), page.first()) {
            assert!(*last_seen > first.key);
        }
        match page.last() {
            Some(last) => query = NotificationQuery::new().limit(3).lt(last.key.clone()),
            None => break,
        }
        seen.extend(keys(&page));
    }

    let expected: Vec<String> = (1..=7u64).rev().map(|n| cursor(ms(n))).collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_same_item_from_two_sources_appears_once() {
    let world = World::new();
    world.private_notification(1, ms(2));
    world.club_notification(1, ms(1));

    let page = world
        .service()
        .list_notifications(&World::viewer(), &NotificationQuery::new())
        .await
        .unwrap();

    assert_eq!(page.len(), 1);
    assert_eq!(page[0].key, cursor(ms(2)));
}

#[tokio::test]
async fn test_other_subscribers_entries_are_out_of_scope() {
    let world = World::new();
    world.club_notification(1, ms(1));
    world.post(2, ms(2));
    world.club.namespace("notificationsIdx").put(
        format!("someoneelse:{}", cursor(ms(2))),
        notification(&post_url(2), ms(2)),
    );

    let page = world
        .service()
        .list_notifications(&World::viewer(), &NotificationQuery::new())
        .await
        .unwrap();
    assert_eq!(keys(&page), vec![cursor(ms(1))]);
}

#[tokio::test]
async fn test_missing_and_failing_communities_do_not_disturb_others() {
    let world = World::new();
    world.private_notification(3, ms(3));
    world.club_notification(2, ms(2));
    world.club_notification(1, ms(1));
    let viewer = World::viewer();

    let baseline = world
        .service()
        .list_notifications(&viewer, &NotificationQuery::new())
        .await
        .unwrap();

    world.join("ghost");
    let broken = open(&world.registry, "broken", false);
    broken
        .namespace("notificationsIdx")
        .put(format!("a11ce:{}", cursor(ms(9))), notification(&post_url(9), ms(9)));
    broken.set_failing(true);
    world.join("broken");

    let degraded = world
        .service()
        .list_notifications(&viewer, &NotificationQuery::new())
        .await
        .unwrap();

    assert_eq!(keys(&baseline), keys(&degraded));
    assert_eq!(degraded.len(), 3);
}

#[tokio::test]
async fn test_viewer_without_stores_gets_empty_page() {
    let world = World::new();
    let page = world
        .service()
        .list_notifications(
            &ViewerInfo::new("nobody", "hyper://n0b0dy/"),
            &NotificationQuery::new(),
        )
        .await
        .unwrap();
    assert!(page.is_empty());
}

#[tokio::test]
async fn test_unscopable_viewer_fails() {
    let world = World::new();
    let result = world
        .service()
        .list_notifications(
            &ViewerInfo::new("alice", "not a url"),
            &NotificationQuery::new(),
        )
        .await;
    assert!(matches!(result, Err(FeedError::MalformedReference(_))));
}

#[tokio::test]
async fn test_hydration_blends_time_and_sets_author() {
    let world = World::new();
    world.private_notification(1, ms(10));
    // The item says it was written earlier than the index recorded it.
    world.post(1, ms(4));

    let page = world
        .service()
        .list_notifications(&World::viewer(), &NotificationQuery::new())
        .await
        .unwrap();

    let n = &page[0];
    assert_eq!(n.created_at, Some(time(ms(10))));
    assert_eq!(n.blended_created_at, Some(time(ms(4))));
    assert_eq!(n.author.user_id, OwnerId::new("bob"));
    assert_eq!(n.author.url, "hyper://bob/");
    assert_eq!(n.item.as_ref().unwrap()["text"], "post 1");
}

#[tokio::test]
async fn test_unresolvable_item_is_listed_nowhere_but_counted() {
    let world = World::new();
    world.private_notification(1, ms(1));
    world.alice_private.namespace("notificationsIdx").put(
        cursor(ms(2)),
        notification("hyper://stranger/ctzn.network/post/1", ms(2)),
    );
    let service = world.service();
    let viewer = World::viewer();

    let page = service
        .list_notifications(&viewer, &NotificationQuery::new())
        .await
        .unwrap();
    let count = service
        .count_notifications(&viewer, &NotificationQuery::new())
        .await
        .unwrap();

    assert_eq!(keys(&page), vec![cursor(ms(1))]);
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_notification_without_recorded_time_is_still_served() {
    let world = World::new();
    world.private_notification(1, ms(1));
    world.private_notification(2, ms(2));
    world.post(3, ms(3));
    world
        .alice_private
        .namespace("notificationsIdx")
        .put(cursor(ms(3)), json!({ "itemUrl": post_url(3) }));
    world.post(4, ms(4));
    world.alice_private.namespace("notificationsIdx").put(
        cursor(ms(4)),
        json!({ "itemUrl": post_url(4), "createdAt": "not a time" }),
    );
    let service = world.service();
    let viewer = World::viewer();

    let count = service
        .count_notifications(&viewer, &NotificationQuery::new())
        .await
        .unwrap();
    let page = service
        .list_notifications(&viewer, &NotificationQuery::new())
        .await
        .unwrap();

    assert_eq!(count, 4);
    assert_eq!(
        keys(&page),
        vec![cursor(ms(4)), cursor(ms(3)), cursor(ms(2)), cursor(ms(1))]
    );
    // Without a recorded time the item's own time is shown.
    assert_eq!(page[1].created_at, None);
    assert_eq!(page[1].blended_created_at, Some(time(ms(3))));
}

#[tokio::test]
async fn test_empty_raw_cursor_means_unbounded() {
    let world = World::new();
    for n in 1..=3u32 {
        world.private_notification(n, ms(n as u64));
    }
    let service = world.service();
    let viewer = World::viewer();

    let count = service
        .count_notifications(&viewer, &NotificationQuery::new().lt("").gt(""))
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_oversized_page_limit_config_is_rejected() {
    let world = World::new();
    let config = FederationConfig {
        max_page_limit: 100,
        ..FederationConfig::for_testing()
    };
    let result = FederatedFeedService::new(Arc::clone(&world.registry), config);
    assert!(matches!(result, Err(FeedError::InvalidArgument(_))));
}

#[test]
fn test_count_is_truncated_to_limit() {
    let world = World::new();
    for n in 1..=5u32 {
        world.club_notification(n, ms(n as u64));
    }
    let service = world.service();
    let viewer = World::viewer();

    let limited = tokio_test::block_on(
        service.count_notifications(&viewer, &NotificationQuery::new().limit(2)),
    );
    let clamped = tokio_test::block_on(
        service.count_notifications(&viewer, &NotificationQuery::new().limit(500)),
    );
    assert_eq!(limited.unwrap(), 2);
    assert_eq!(clamped.unwrap(), 5);
}

// =============================================================================
// REACTIONS AND THREADS
// =============================================================================

fn voters(ids: &[OwnerId]) -> BTreeSet<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[tokio::test]
async fn test_community_reactions_union_with_viewer_index() {
    let world = World::new();
    let url = post_url(1);
    world.club.namespace("reactionsIdx").put(
        url.clone(),
        json!({
            "subject": { "dbUrl": url, "authorId": "bob" },
            "reactions": { "like": ["hyper://u1/", "hyper://u2/"] }
        }),
    );
    world.alice_private.namespace("reactionsIdx").put(
        url.clone(),
        json!({ "reactions": { "like": ["hyper://u2/", "hyper://u3/"], "laugh": ["hyper://u4/"] } }),
    );

    let subject = Subject::in_community(url.clone(), "bob", "club");
    let summary = world
        .service()
        .get_reactions(&subject, Some(&OwnerId::new("alice")))
        .await
        .unwrap();

    assert_eq!(summary.subject.author_id, Some(OwnerId::new("bob")));
    assert_eq!(voters(&summary.reactions["like"]), voters(&[
        OwnerId::new("u1"),
        OwnerId::new("u2"),
        OwnerId::new("u3"),
    ]));
    assert_eq!(summary.reactions["like"].len(), 3);
    assert_eq!(summary.reactions["laugh"], vec![OwnerId::new("u4")]);
}

#[tokio::test]
async fn test_voters_stay_with_their_tag() {
    let world = World::new();
    let url = post_url(2);
    world.club.namespace("reactionsIdx").put(
        url.clone(),
        json!({ "reactions": {
            "wow": ["hyper://u1/"],
            "like": ["hyper://u2/", "hyper://u3/"],
            "angry": [],
            "laugh": ["hyper://u4/", "hyper://nobody/"]
        } }),
    );

    let subject = Subject::in_community(url, "bob", "club");
    let summary = world
        .service()
        .get_reactions(&subject, None)
        .await
        .unwrap();

    assert_eq!(summary.reactions.len(), 4);
    assert_eq!(summary.reactions["wow"], vec![OwnerId::new("u1")]);
    assert_eq!(
        summary.reactions["like"],
        vec![OwnerId::new("u2"), OwnerId::new("u3")]
    );
    assert!(summary.reactions["angry"].is_empty());
    assert_eq!(summary.reactions["laugh"], vec![OwnerId::new("u4")]);
}

#[tokio::test]
async fn test_unresolvable_voters_are_dropped() {
    let world = World::new();
    let url = post_url(1);
    world.alice_private.namespace("reactionsIdx").put(
        url.clone(),
        json!({
            "subject": { "dbUrl": url, "authorId": "bob", "kind": "post" },
            "reactions": { "like": ["hyper://u1/", "hyper://nobody/"] }
        }),
    );

    // Bob's private index is not open here, so only Alice's contributes.
    let summary = world
        .service()
        .get_reactions(&Subject::authored(url.clone(), "bob"), Some(&OwnerId::new("alice")))
        .await
        .unwrap();

    assert_eq!(summary.reactions["like"], vec![OwnerId::new("u1")]);
    assert_eq!(summary.subject.extra["kind"], "post");
}

#[tokio::test]
async fn test_reactions_without_any_source_fall_back_to_bare_subject() {
    let world = World::new();
    let url = post_url(7);
    let summary = world
        .service()
        .get_reactions(&Subject::in_community(url.clone(), "bob", "club"), None)
        .await
        .unwrap();
    assert_eq!(summary.subject.db_url, url);
    assert!(summary.subject.author_id.is_none());
    assert!(summary.reactions.is_empty());
}

#[tokio::test]
async fn test_author_viewing_own_subject_reads_one_index() {
    let world = World::new();
    let url = "hyper://a11ce/ctzn.network/post/1".to_string();
    world.alice_private.namespace("reactionsIdx").put(
        url.clone(),
        json!({ "reactions": { "like": ["hyper://u1/"] } }),
    );
    let summary = world
        .service()
        .get_reactions(&Subject::authored(url, "alice"), Some(&OwnerId::new("alice")))
        .await
        .unwrap();
    assert_eq!(summary.reactions["like"], vec![OwnerId::new("u1")]);
}

#[tokio::test]
async fn test_replies_dedup_across_author_and_viewer() {
    let world = World::new();
    let bob_private = open(&world.registry, "bob", true);
    let url = post_url(1);
    bob_private.namespace("threadIdx").put(
        url.clone(),
        json!({ "items": [{ "dbUrl": "P1" }, { "dbUrl": "P2" }] }),
    );
    world.alice_private.namespace("threadIdx").put(
        url.clone(),
        json!({ "items": [{ "dbUrl": "P2" }, { "dbUrl": "P3" }] }),
    );

    let service = world.service();
    let subject = Subject::authored(url, "bob");
    let alice = OwnerId::new("alice");
    let replies = service.get_replies(&subject, Some(&alice)).await.unwrap();
    let urls: Vec<_> = replies.iter().map(|r| r.db_url.as_str()).collect();
    assert_eq!(urls, vec!["P1", "P2", "P3"]);
    assert_eq!(service.get_reply_count(&subject, Some(&alice)).await.unwrap(), 3);
}

#[tokio::test]
async fn test_replies_from_community_index() {
    let world = World::new();
    let url = post_url(1);
    world.club.namespace("threadIdx").put(
        url.clone(),
        json!({ "items": [{ "dbUrl": "P1" }, { "dbUrl": "P1" }] }),
    );
    let service = world.service();
    let subject = Subject::in_community(url, "bob", "club");

    // A single contributing source is returned as recorded.
    assert_eq!(service.get_reply_count(&subject, None).await.unwrap(), 2);
}

#[tokio::test]
async fn test_replies_tolerate_failing_author_index() {
    let world = World::new();
    let bob_private = open(&world.registry, "bob", true);
    let url = post_url(1);
    bob_private
        .namespace("threadIdx")
        .put(url.clone(), json!({ "items": [{ "dbUrl": "P1" }] }));
    bob_private.set_failing(true);
    world
        .alice_private
        .namespace("threadIdx")
        .put(url.clone(), json!({ "items": [{ "dbUrl": "P9" }] }));

    let replies = world
        .service()
        .get_replies(&Subject::authored(url, "bob"), Some(&OwnerId::new("alice")))
        .await
        .unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].db_url, "P9");
}

// =============================================================================
// FOLLOWERS
// =============================================================================

#[tokio::test]
async fn test_follower_ids_from_private_index() {
    let world = World::new();
    world
        .alice_private
        .namespace("followsIdx")
        .put("bob", json!({ "followerIds": ["alice", "carol"] }));
    let service = world.service();

    let ids = service
        .list_follower_ids(&OwnerId::new("bob"), &OwnerId::new("alice"))
        .await
        .unwrap();
    assert_eq!(ids, vec![OwnerId::new("alice"), OwnerId::new("carol")]);

    let none = service
        .list_follower_ids(&OwnerId::new("bob"), &OwnerId::new("bob"))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_community_follower_ids_union() {
    let world = World::new();
    world
        .club
        .namespace("followsIdx")
        .put("bob", json!({ "followerIds": ["x", "y"] }));
    let other = open(&world.registry, "other", false);
    other
        .namespace("followsIdx")
        .put("bob", json!({ "followerIds": ["y", "z"] }));
    world.join("other");
    world.join("ghost");

    let ids = world
        .service()
        .list_community_follower_ids(&OwnerId::new("bob"), &OwnerId::new("alice"))
        .await
        .unwrap();
    assert_eq!(
        ids,
        vec![OwnerId::new("x"), OwnerId::new("y"), OwnerId::new("z")]
    );
}

// =============================================================================
// DIRECT LOOKUPS
// =============================================================================

#[tokio::test]
async fn test_get_entry_at() {
    let world = World::new();
    world.post(1, ms(1));
    let service = world.service();

    let found = service.get_entry_at(&post_url(1)).await.unwrap();
    assert_eq!(found.store.owner_id, OwnerId::new("bob"));
    assert_eq!(found.entry.key, "1");
    assert_eq!(found.entry.value["text"], "post 1");

    assert!(service
        .get_entry_at(&post_url(99))
        .await
        .unwrap_err()
        .is_not_found());
    assert!(matches!(
        service.get_entry_at("hyper://zzz/ctzn.network/post/1").await,
        Err(FeedError::Unresolvable(_))
    ));
    assert!(matches!(
        service.get_entry_at("hyper://b0b/").await,
        Err(FeedError::MalformedReference(_))
    ));
}

#[tokio::test]
async fn test_get_blob_encodings() {
    let world = World::new();
    world.bob_blobs.put("avatar", b"hi".to_vec());
    let service = world.service();

    assert_eq!(
        service.get_blob("bob", "avatar", BlobEncoding::Raw).await.unwrap(),
        BlobContent::Bytes(b"hi".to_vec())
    );
    assert_eq!(
        service
            .get_blob("hyper://b0b/", "avatar", BlobEncoding::Utf8)
            .await
            .unwrap(),
        BlobContent::Text("hi".to_string())
    );
    assert_eq!(
        service.get_blob("bob", "avatar", BlobEncoding::Hex).await.unwrap(),
        BlobContent::Text("6869".to_string())
    );
}

#[tokio::test]
async fn test_get_blob_failures() {
    let world = World::new();
    let service = world.service();

    assert!(matches!(
        service.get_blob("bob", "", BlobEncoding::Raw).await,
        Err(FeedError::InvalidArgument(_))
    ));
    assert!(service
        .get_blob("bob", "banner", BlobEncoding::Raw)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(service
        .get_blob("alice", "avatar", BlobEncoding::Raw)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(matches!(
        service.get_blob("hyper://nobody/", "avatar", BlobEncoding::Raw).await,
        Err(FeedError::Unresolvable(_))
    ));
}

#[tokio::test]
async fn test_resolve_author_uses_profile_and_cache() {
    let world = World::new();
    let profile = world.bob.namespace("profile");
    profile.put("self", json!({ "displayName": "Bob" }));
    let service = world.service();
    let bob = OwnerId::new("bob");

    let mut cache = AuthorCache::new();
    let first = service.resolve_author(&bob, Some(&mut cache)).await.unwrap();
    assert_eq!(first.display_name, "Bob");
    assert_eq!(first.url, "hyper://bob/");
    assert_eq!(cache.len(), 1);

    profile.put("self", json!({ "displayName": "Robert" }));
    let cached = service.resolve_author(&bob, Some(&mut cache)).await.unwrap();
    assert_eq!(cached.display_name, "Bob");
    let fresh = service.resolve_author(&bob, None).await.unwrap();
    assert_eq!(fresh.display_name, "Robert");
}

#[tokio::test]
async fn test_resolve_author_falls_back_to_id() {
    let world = World::new();
    let carol = world
        .service()
        .resolve_author(&OwnerId::new("carol"), None)
        .await
        .unwrap();
    assert_eq!(carol.display_name, "carol");
    assert_eq!(carol.url, "hyper://carol/");
}
