//! Community write workflows: creation, join requests, membership and likes.
//!
//! Memberships and join requests are keyed by `{user}_{variant}` so a
//! second join overwrites rather than duplicates. Counters live in one
//! document per community variant. Membership counts only move inside a
//! [`Transition`] on `isMember`, so concurrent joins or leaves by the same
//! user change the count once.

use chrono::Utc;
use log::{debug, info};
use serde_json::json;

use crate::{
    errors::{AgoraError, AgoraResult, ValidationError},
    id::{composite_id, generate_document_id},
    models::{
        CommunityRequest, CommunityVariant, CommunityVariantMembership, RequestStatus, Visibility, collections,
    },
    store::{Document, DocumentStore, DocumentStoreExt, Transition, TransitionOutcome, patch, to_document},
};

/// Result of asking to join a community.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    /// The user is now a member. `newly_joined` is false when they already were.
    Joined {
        membership: CommunityVariantMembership,
        newly_joined: bool,
    },
    /// The community is private; a request awaits the owner's answer.
    Requested(CommunityRequest),
}

pub fn membership_id(user_id: &str, community_variant_id: &str) -> String {
    composite_id(&[user_id, community_variant_id])
}

fn counter_seed(community_variant_id: &str) -> Document {
    patch(json!({
        "communityVariantId": community_variant_id,
        "membershipCount": 0,
        "likeCount": 0,
    }))
}

pub struct CommunityService<'a, S> {
    store: &'a S,
}

impl<'a, S: DocumentStore> CommunityService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn create_community(
        &self,
        owner_id: &str,
        name: &str,
        description: &str,
        visibility: Visibility,
    ) -> AgoraResult<CommunityVariant> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::single("name", "validation.required", "name is required").into());
        }
        if self.store.get(collections::USERS, owner_id).await?.is_none() {
            return Err(AgoraError::not_found("user", owner_id));
        }

        let community = CommunityVariant {
            id: generate_document_id(),
            community_id: None,
            user_id: owner_id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            visibility,
            created_at: Utc::now(),
        };
        self.store
            .set_as(collections::COMMUNITY_VARIANTS, &community.id, &community)
            .await?;
        info!("user {owner_id} created community {}", community.id);
        Ok(community)
    }

    pub async fn join_community(&self, user_id: &str, community_variant_id: &str) -> AgoraResult<JoinOutcome> {
        let community = self.require_community(community_variant_id).await?;
        if self.store.get(collections::USERS, user_id).await?.is_none() {
            return Err(AgoraError::not_found("user", user_id));
        }

        match community.visibility {
            Visibility::Public => self.admit(user_id, community_variant_id).await,
            Visibility::Private => {
                if let Some(existing) = self.active_membership(user_id, community_variant_id).await? {
                    debug!("user {user_id} is already a member of {community_variant_id}");
                    return Ok(JoinOutcome::Joined {
                        membership: existing,
                        newly_joined: false,
                    });
                }
                let id = membership_id(user_id, community_variant_id);
                let request = CommunityRequest {
                    id: id.clone(),
                    user_id: user_id.to_string(),
                    community_variant_id: community_variant_id.to_string(),
                    status: RequestStatus::Pending,
                    created_at: Utc::now(),
                };
                self.store.set_as(collections::COMMUNITY_REQUESTS, &id, &request).await?;
                debug!("user {user_id} requested to join private community {community_variant_id}");
                Ok(JoinOutcome::Requested(request))
            }
        }
    }

    /// Answers a pending join request. Accepting admits the user.
    pub async fn respond_to_request(
        &self,
        user_id: &str,
        community_variant_id: &str,
        accept: bool,
    ) -> AgoraResult<CommunityRequest> {
        let id = membership_id(user_id, community_variant_id);
        let mut request = self
            .store
            .get_as::<CommunityRequest>(collections::COMMUNITY_REQUESTS, &id)
            .await?
            .filter(|request| request.status == RequestStatus::Pending)
            .ok_or_else(|| AgoraError::not_found("community request", id.as_str()))?;

        // Admit before the status flips: a failed status write leaves the request pending.
        if accept {
            self.admit(user_id, community_variant_id).await?;
        }
        let status = if accept {
            RequestStatus::Accepted
        } else {
            RequestStatus::Declined
        };
        let status_value = serde_json::to_value(status).map_err(crate::errors::StoreError::from)?;
        self.store
            .update(collections::COMMUNITY_REQUESTS, &id, patch(json!({ "status": status_value })))
            .await?;
        request.status = status;
        Ok(request)
    }

    /// Closes the user's membership interval and decrements the member count.
    pub async fn leave_community(&self, user_id: &str, community_variant_id: &str) -> AgoraResult<()> {
        let id = membership_id(user_id, community_variant_id);
        let leave = Transition::new(
            collections::COMMUNITY_MEMBERSHIPS,
            id.as_str(),
            "isMember",
            patch(json!({ "isMember": false, "to": Utc::now() })),
        )
        .with_counter(
            collections::COMMUNITY_COUNTERS,
            community_variant_id,
            "membershipCount",
            -1,
            counter_seed(community_variant_id),
        );
        match self.store.transition(&leave).await? {
            TransitionOutcome::Applied { counter } => {
                debug!("community {community_variant_id} now has {counter:?} members");
                Ok(())
            }
            TransitionOutcome::Unchanged | TransitionOutcome::Missing => Err(AgoraError::not_found("membership", id)),
        }
    }

    /// Adds one like and returns the new like count.
    pub async fn like_community(&self, community_variant_id: &str) -> AgoraResult<i64> {
        self.require_community(community_variant_id).await?;
        Ok(self
            .store
            .increment(
                collections::COMMUNITY_COUNTERS,
                community_variant_id,
                "likeCount",
                1,
                counter_seed(community_variant_id),
            )
            .await?)
    }

    /// Opens a membership interval unless one is already active.
    async fn admit(&self, user_id: &str, community_variant_id: &str) -> AgoraResult<JoinOutcome> {
        let id = membership_id(user_id, community_variant_id);
        let membership = CommunityVariantMembership {
            id: id.clone(),
            user_id: user_id.to_string(),
            community_variant_id: community_variant_id.to_string(),
            is_member: true,
            from: Utc::now(),
            to: None,
        };
        let join = Transition::new(
            collections::COMMUNITY_MEMBERSHIPS,
            id.as_str(),
            "isMember",
            to_document(&membership)?,
        )
        .or_create()
        .with_counter(
            collections::COMMUNITY_COUNTERS,
            community_variant_id,
            "membershipCount",
            1,
            counter_seed(community_variant_id),
        );
        match self.store.transition(&join).await? {
            TransitionOutcome::Applied { counter } => {
                debug!("user {user_id} joined {community_variant_id} ({counter:?} members)");
                Ok(JoinOutcome::Joined {
                    membership,
                    newly_joined: true,
                })
            }
            TransitionOutcome::Unchanged | TransitionOutcome::Missing => {
                debug!("user {user_id} is already a member of {community_variant_id}");
                let existing = self
                    .active_membership(user_id, community_variant_id)
                    .await?
                    .unwrap_or(membership);
                Ok(JoinOutcome::Joined {
                    membership: existing,
                    newly_joined: false,
                })
            }
        }
    }

    async fn active_membership(
        &self,
        user_id: &str,
        community_variant_id: &str,
    ) -> AgoraResult<Option<CommunityVariantMembership>> {
        let membership: Option<CommunityVariantMembership> = self
            .store
            .get_as(
                collections::COMMUNITY_MEMBERSHIPS,
                &membership_id(user_id, community_variant_id),
            )
            .await?;
        Ok(membership.filter(|membership| membership.is_member))
    }

    async fn require_community(&self, community_variant_id: &str) -> AgoraResult<CommunityVariant> {
        self.store
            .get_as(collections::COMMUNITY_VARIANTS, community_variant_id)
            .await?
            .ok_or_else(|| AgoraError::not_found("community", community_variant_id))
    }
}
