use std::{collections::HashMap, sync::LazyLock};

use chrono::Utc;
use email_address::EmailAddress;
use log::{debug, warn};
use serde_json::json;
use regex::Regex;

use crate::{
    errors::{AgoraError, AgoraResult, StoreError, ValidationError, ValidationIssue},
    id::generate_document_id,
    models::{User, collections},
    store::{DocumentStore, DocumentStoreExt, Query, SortOrder, Transition, TransitionOutcome, patch},
};

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.]{3,30}$").expect("username pattern is valid"));

/// Fields collected at registration.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
    pub gender: Option<String>,
    pub birthday: Option<String>,
    pub country: Option<String>,
}

/// Looks a user up by handle.
///
/// Handles are unique by convention only. When several documents share one,
/// the oldest wins.
pub async fn find_by_username<S: DocumentStore>(store: &S, user_name: &str) -> Result<Option<User>, StoreError> {
    let query = Query::collection(collections::USERS)
        .eq("userName", user_name)
        .order_by("createdAt", SortOrder::Asc);
    let mut matches: Vec<User> = store.query_as(&query).await?;
    if matches.len() > 1 {
        warn!("{} users share the handle '{user_name}'", matches.len());
    }
    Ok(if matches.is_empty() { None } else { Some(matches.swap_remove(0)) })
}

/// Batch lookup of user documents by id.
pub async fn users_by_id<S: DocumentStore>(store: &S, ids: &[String]) -> Result<HashMap<String, User>, StoreError> {
    let users: Vec<User> = store
        .query_in_chunks_as(&Query::collection(collections::USERS), "id", ids)
        .await?;
    Ok(users.into_iter().map(|user| (user.id.clone(), user)).collect())
}

pub async fn register_user<S: DocumentStore>(store: &S, new_user: NewUser) -> AgoraResult<User> {
    let mut issues = Vec::new();
    if !USERNAME_PATTERN.is_match(&new_user.user_name) {
        issues.push(ValidationIssue::new(
            "userName",
            "validation.regex",
            "must be 3-30 letters, digits, '_' or '.'",
        ));
    }
    if !EmailAddress::is_valid(&new_user.email) {
        issues.push(ValidationIssue::new("email", "validation.email", "must be a valid email address"));
    }
    if !issues.is_empty() {
        return Err(ValidationError::new(issues).into());
    }

    let id = generate_document_id();
    let taken = || {
        AgoraError::Validation(ValidationError::single(
            "userName",
            "validation.unique",
            "handle is already taken",
        ))
    };
    // Users seeded without a claim are only found by exact handle.
    if find_by_username(store, &new_user.user_name).await?.is_some() {
        return Err(taken());
    }
    let claim_id = new_user.user_name.to_lowercase();
    let claim = Transition::new(
        collections::USER_NAME_CLAIMS,
        claim_id.as_str(),
        "claimed",
        patch(json!({ "claimed": true, "userId": id, "userName": new_user.user_name })),
    )
    .or_create();
    if !matches!(store.transition(&claim).await?, TransitionOutcome::Applied { .. }) {
        return Err(taken());
    }

    let user = User {
        id,
        first_name: new_user.first_name,
        last_name: new_user.last_name,
        user_name: new_user.user_name,
        email: new_user.email,
        bio: None,
        gender: new_user.gender,
        birthday: new_user.birthday,
        country: new_user.country,
        is_admin: false,
        created_at: Utc::now(),
    };
    if let Err(err) = store.set_as(collections::USERS, &user.id, &user).await {
        // Release the handle so the registration can be retried.
        if let Err(release) = store.delete(collections::USER_NAME_CLAIMS, &claim_id).await {
            warn!("could not release handle '{claim_id}': {release}");
        }
        return Err(err.into());
    }
    debug!("registered user {} as '{}'", user.id, user.user_name);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn new_user(handle: &str, email: &str) -> NewUser {
        NewUser {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            user_name: handle.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn registration_validates_and_rejects_taken_handles() {
        let store = MemoryStore::new();
        let user = register_user(&store, new_user("ada.l", "ada@example.com")).await.unwrap();
        assert_eq!(find_by_username(&store, "ada.l").await.unwrap().map(|u| u.id), Some(user.id));

        let err = register_user(&store, new_user("ADA.L", "other@example.com")).await.unwrap_err();
        assert!(matches!(err, AgoraError::Validation(ref v) if v.issues[0].code == "validation.unique"));

        let err = register_user(&store, new_user("x", "not-an-email")).await.unwrap_err();
        match err {
            AgoraError::Validation(v) => assert_eq!(v.issues.len(), 2),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
