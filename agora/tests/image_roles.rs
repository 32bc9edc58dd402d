use agora::{
    AgoraError, DocumentStore, ImageRoleResolver, MemoryStore,
    images::assignment_id,
    models::{ImageRole, collections},
};
use serde_json::json;

#[tokio::test]
async fn user_without_assignments_resolves_to_empty_map() {
    let store = MemoryStore::new();
    let resolver = ImageRoleResolver::new(&store);
    let roles = resolver.resolve_roles("nobody").await.unwrap();
    assert!(roles.is_empty());
    assert_eq!(resolver.resolve_with_fallback("nobody", &ImageRole::ALL).await.unwrap(), None);
}

#[tokio::test]
async fn set_role_last_write_wins_with_one_row() {
    let store = MemoryStore::new();
    let resolver = ImageRoleResolver::new(&store);
    let first = resolver
        .add_profile_image("u1", "https://cdn.example.com/one.png", Some("profile"))
        .await
        .unwrap();
    let second = resolver
        .add_profile_image("u1", "https://cdn.example.com/two.png", None)
        .await
        .unwrap();

    resolver.set_role("u1", ImageRole::Profile, &first).await.unwrap();
    resolver.set_role("u1", ImageRole::Profile, &second).await.unwrap();

    let roles = resolver.resolve_roles("u1").await.unwrap();
    assert_eq!(roles.get(ImageRole::Profile), Some("https://cdn.example.com/two.png"));
    assert_eq!(store.len(collections::PROFILE_IMAGE_SET_AS), 1);
}

#[tokio::test]
async fn set_role_cleans_up_legacy_duplicates() {
    let store = MemoryStore::new();
    let resolver = ImageRoleResolver::new(&store);
    let image = resolver
        .add_profile_image("u1", "https://cdn.example.com/cover.png", None)
        .await
        .unwrap();
    for legacy in ["legacy-a", "legacy-b"] {
        let doc = json!({"userId": "u1", "profileImageId": "gone", "setAs": "coverProfile"});
        store
            .set(collections::PROFILE_IMAGE_SET_AS, legacy, doc.as_object().cloned().unwrap())
            .await
            .unwrap();
    }
    // The legacy rows point at a missing image, so the role is absent for now.
    assert!(resolver.resolve_roles("u1").await.unwrap().is_empty());

    resolver.set_role("u1", ImageRole::CoverProfile, &image).await.unwrap();
    assert_eq!(store.len(collections::PROFILE_IMAGE_SET_AS), 1);
    assert!(
        store
            .get(collections::PROFILE_IMAGE_SET_AS, &assignment_id("u1", ImageRole::CoverProfile))
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn fallback_prefers_earlier_roles() {
    let store = MemoryStore::new();
    let resolver = ImageRoleResolver::new(&store);
    let logo = resolver
        .add_profile_image("biz", "https://cdn.example.com/logo.png", None)
        .await
        .unwrap();
    let face = resolver
        .add_profile_image("biz", "https://cdn.example.com/face.png", None)
        .await
        .unwrap();
    resolver.set_role("biz", ImageRole::Profile, &face).await.unwrap();

    let preference = [ImageRole::CompanyProfile, ImageRole::Profile];
    assert_eq!(
        resolver.resolve_with_fallback("biz", &preference).await.unwrap().as_deref(),
        Some("https://cdn.example.com/face.png")
    );
    resolver.set_role("biz", ImageRole::CompanyProfile, &logo).await.unwrap();
    assert_eq!(
        resolver.resolve_with_fallback("biz", &preference).await.unwrap().as_deref(),
        Some("https://cdn.example.com/logo.png")
    );
}

#[tokio::test]
async fn foreign_images_and_bad_urls_are_rejected() {
    let store = MemoryStore::new();
    let resolver = ImageRoleResolver::new(&store);
    let theirs = resolver
        .add_profile_image("u2", "https://cdn.example.com/theirs.png", None)
        .await
        .unwrap();

    assert!(matches!(
        resolver.set_role("u1", ImageRole::Profile, &theirs).await,
        Err(AgoraError::InvalidRequest { .. })
    ));
    assert!(matches!(
        resolver.set_role("u1", ImageRole::Profile, "missing").await,
        Err(AgoraError::NotFound { .. })
    ));
    assert!(matches!(
        resolver.add_profile_image("u1", "not a url", None).await,
        Err(AgoraError::Validation(_))
    ));
}
