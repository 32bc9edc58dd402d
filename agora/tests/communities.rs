use agora::{
    AggregationSettings, AgoraError, CommunityService, DocumentStoreExt, MemoryStore, ProfileAggregationService,
    accounts::{NewUser, register_user},
    communities::{JoinOutcome, membership_id},
    models::{CommunityVariantMembership, MembershipCounter, RequestStatus, Visibility, collections},
};

async fn register(store: &MemoryStore, handle: &str) -> String {
    register_user(
        store,
        NewUser {
            user_name: handle.to_string(),
            email: format!("{handle}@example.com"),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .id
}

async fn counter(store: &MemoryStore, community_id: &str) -> Option<MembershipCounter> {
    store
        .get_as(collections::COMMUNITY_COUNTERS, community_id)
        .await
        .unwrap()
}

#[tokio::test]
async fn joining_a_public_community_twice_counts_once() {
    let store = MemoryStore::new();
    let owner = register(&store, "owner").await;
    let member = register(&store, "member").await;
    let service = CommunityService::new(&store);
    let community = service
        .create_community(&owner, "Rustaceans", "", Visibility::Public)
        .await
        .unwrap();

    let first = service.join_community(&member, &community.id).await.unwrap();
    let second = service.join_community(&member, &community.id).await.unwrap();
    assert!(matches!(first, JoinOutcome::Joined { newly_joined: true, .. }));
    assert!(matches!(second, JoinOutcome::Joined { newly_joined: false, .. }));
    assert_eq!(counter(&store, &community.id).await.unwrap().membership_count, 1);

    service.leave_community(&member, &community.id).await.unwrap();
    assert_eq!(counter(&store, &community.id).await.unwrap().membership_count, 0);
    let closed: CommunityVariantMembership = store
        .get_as(collections::COMMUNITY_MEMBERSHIPS, &membership_id(&member, &community.id))
        .await
        .unwrap()
        .unwrap();
    assert!(!closed.is_member);
    assert!(closed.to.is_some());

    assert!(matches!(
        service.leave_community(&member, &community.id).await,
        Err(AgoraError::NotFound { .. })
    ));
}

#[tokio::test]
async fn private_communities_go_through_requests() {
    let store = MemoryStore::new();
    let owner = register(&store, "owner").await;
    let member = register(&store, "member").await;
    let service = CommunityService::new(&store);
    let community = service
        .create_community(&owner, "Inner Circle", "invite only", Visibility::Private)
        .await
        .unwrap();

    let outcome = service.join_community(&member, &community.id).await.unwrap();
    match outcome {
        JoinOutcome::Requested(request) => assert_eq!(request.status, RequestStatus::Pending),
        other => panic!("expected a pending request, got {other:?}"),
    }
    assert!(counter(&store, &community.id).await.is_none());

    let answered = service
        .respond_to_request(&member, &community.id, true)
        .await
        .unwrap();
    assert_eq!(answered.status, RequestStatus::Accepted);
    assert_eq!(counter(&store, &community.id).await.unwrap().membership_count, 1);

    assert!(service.respond_to_request(&member, &community.id, true).await.is_err());
}

#[tokio::test]
async fn likes_show_up_in_the_owners_profile() {
    let store = MemoryStore::new();
    let owner = register(&store, "owner").await;
    let service = CommunityService::new(&store);
    let community = service
        .create_community(&owner, "Climbers", "", Visibility::Public)
        .await
        .unwrap();
    assert_eq!(service.like_community(&community.id).await.unwrap(), 1);
    assert_eq!(service.like_community(&community.id).await.unwrap(), 2);
    assert!(service.like_community("missing").await.is_err());

    let profile = ProfileAggregationService::new(&store, AggregationSettings::default())
        .fetch_user_profile("owner")
        .await
        .unwrap();
    assert_eq!(profile.communities.len(), 1);
    assert_eq!(profile.communities[0].like_count, 2);
    assert_eq!(profile.communities[0].membership_count, 0);
}

#[tokio::test]
async fn blank_names_and_unknown_owners_are_rejected() {
    let store = MemoryStore::new();
    let service = CommunityService::new(&store);
    assert!(matches!(
        service.create_community("ghost", "  ", "", Visibility::Public).await,
        Err(AgoraError::Validation(_))
    ));
    assert!(matches!(
        service.create_community("ghost", "Real name", "", Visibility::Public).await,
        Err(AgoraError::NotFound { entity: "user", .. })
    ));
}
