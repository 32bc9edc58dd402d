use agora::{
    AggregationSettings, MemoryStore, ProfileAggregationService,
    errors::ProfileError,
    fixtures::Fixture,
    models::ImageRole,
};

const DEMO: &str = include_str!("../fixtures/demo.json");

async fn demo_store(store: MemoryStore) -> MemoryStore {
    Fixture::from_json(DEMO).unwrap().load(&store).await.unwrap();
    store
}

#[tokio::test]
async fn profile_joins_every_section() {
    let store = demo_store(MemoryStore::new()).await;
    let service = ProfileAggregationService::new(&store, AggregationSettings::default());

    let view = service.fetch_user_profile("ada.l").await.unwrap();
    assert_eq!(view.user.id, "u-ada");

    assert_eq!(view.images.len(), 2);
    assert_eq!(view.images.get(ImageRole::Profile), Some("https://cdn.example.com/ada/avatar.png"));
    assert_eq!(view.images.get(ImageRole::CoverProfile), Some("https://cdn.example.com/ada/cover.png"));

    let posts: Vec<&str> = view.posts.iter().map(|p| p.post.id.as_str()).collect();
    assert_eq!(posts, vec!["post-2", "post-1"]);
    let media: Vec<i64> = view.posts[1].media.iter().map(|m| m.display_order).collect();
    assert_eq!(media, vec![1, 2]);

    let communities: Vec<(&str, i64, i64)> = view
        .communities
        .iter()
        .map(|c| (c.community.id.as_str(), c.membership_count, c.like_count))
        .collect();
    assert_eq!(communities, vec![("cv-poets", 0, 0), ("cv-engines", 5, 12)]);
    assert!(view.communities[0].parent.is_none());
    let parent = view.communities[1].parent.as_ref().unwrap();
    assert_eq!((parent.name.as_str(), parent.category.as_deref()), ("Machines", Some("engineering")));

    let friends: Vec<(&str, usize)> = view
        .friends
        .iter()
        .map(|f| (f.user.user_id.as_str(), f.mutual_friends_count))
        .collect();
    assert_eq!(friends, vec![("u-cy", 1), ("u-bob", 1)]);
    assert_eq!(
        view.friends[1].user.profile_image.as_deref(),
        Some("https://cdn.example.com/bob/avatar.png")
    );
    assert!(view.friends[0].user.profile_image.is_none());

    let followers: Vec<&str> = view.followers.iter().map(|u| u.user_id.as_str()).collect();
    assert_eq!(followers, vec!["u-dee", "u-bob"]);
    let following: Vec<&str> = view.following.iter().map(|u| u.user_id.as_str()).collect();
    assert_eq!(following, vec!["u-dee"]);

    assert_eq!(view.about.skills, vec!["mathematics"]);
    assert_eq!(view.about.interests, vec!["poetry"]);
    assert_eq!(view.about.work_experience.len(), 1);
    assert_eq!(view.about.education.len(), 1);
}

#[tokio::test]
async fn unknown_handle_is_404_without_further_reads() {
    let store = demo_store(MemoryStore::new()).await;
    let service = ProfileAggregationService::new(&store, AggregationSettings::default());

    let before = store.read_count();
    let err = service.fetch_user_profile("nobody").await.unwrap_err();
    assert!(matches!(err, ProfileError::NotFound));
    assert_eq!(err.to_response().status, 404);
    assert_eq!(err.to_response().error, "User not found");
    assert_eq!(store.read_count() - before, 1);
}

#[tokio::test]
async fn user_without_images_or_relations_gets_empty_sections() {
    let store = demo_store(MemoryStore::new()).await;
    let service = ProfileAggregationService::new(&store, AggregationSettings::default());

    let view = service.fetch_user_profile("cy_y").await.unwrap();
    assert!(view.images.is_empty());
    assert!(view.posts.is_empty());
    assert!(view.communities.is_empty());
    assert!(view.followers.is_empty());
    assert_eq!(view.friends.len(), 2);
    assert_eq!(view.about, Default::default());
}

#[tokio::test]
async fn backend_failures_collapse_to_500() {
    // A ceiling of zero makes every `in` query fail.
    let store = demo_store(MemoryStore::with_max_in_values(0)).await;
    let service = ProfileAggregationService::new(&store, AggregationSettings::default());

    let err = service.fetch_user_profile("ada.l").await.unwrap_err();
    assert!(matches!(err, ProfileError::Failed(_)));
    let response = err.to_response();
    assert_eq!(response.status, 500);
    assert_eq!(response.error, "Failed to fetch user profile");
}

#[tokio::test]
async fn aggregation_is_idempotent() {
    let store = demo_store(MemoryStore::new()).await;
    let service = ProfileAggregationService::new(
        &store,
        AggregationSettings {
            request_timeout_ms: Some(5_000),
        },
    );
    let first = service.fetch_user_profile("ada.l").await.unwrap();
    let second = service.fetch_user_profile("ada.l").await.unwrap();
    assert_eq!(first, second);
}
