//! Friends, followers and friend requests.
//!
//! A friendship is one request row per unordered pair, keyed by the
//! canonical pair id. Accepting it writes two directed [`FriendLink`] rows so
//! a user's friend list is always a single equality query.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use serde_json::json;

use crate::{
    accounts::users_by_id,
    errors::{AgoraError, AgoraResult},
    id::{composite_id, pair_id},
    images::ImageRoleResolver,
    models::{FriendLink, Following, Friendship, FriendshipStatus, ImageRole, User, collections},
    store::{DocumentStore, DocumentStoreExt, Query, SortOrder, patch},
};

/// Display identity of a related user.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelatedUser {
    pub user_id: String,
    pub user_name: String,
    pub display_name: String,
    pub profile_image: Option<String>,
    /// When the relation was created.
    pub since: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FriendWithDetails {
    #[serde(flatten)]
    pub user: RelatedUser,
    pub mutual_friends_count: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub friendship_id: String,
    /// The other party: the sender for incoming requests, the recipient for sent ones.
    pub counterpart: RelatedUser,
}

pub struct RelationshipAggregator<'a, S> {
    store: &'a S,
    images: ImageRoleResolver<'a, S>,
}

impl<'a, S: DocumentStore> RelationshipAggregator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            images: ImageRoleResolver::new(store),
        }
    }

    /// Accepted friends, newest friendship first.
    pub async fn get_friends(&self, user_id: &str) -> AgoraResult<Vec<FriendWithDetails>> {
        let query = Query::collection(collections::FRIEND_LINKS)
            .eq("ownerId", user_id)
            .order_by("createdAt", SortOrder::Desc);
        let links: Vec<FriendLink> = self.store.query_as(&query).await?;
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let own: HashSet<&str> = links.iter().map(|link| link.friend_id.as_str()).collect();
        let related: Vec<(String, DateTime<Utc>)> =
            links.iter().map(|link| (link.friend_id.clone(), link.created_at)).collect();
        let friend_ids: Vec<String> = related.iter().map(|(id, _)| id.clone()).collect();

        let (users, friend_sets) = tokio::try_join!(self.related_users(related), self.friend_id_sets(&friend_ids))?;
        debug!("user {user_id}: {} friends resolved", users.len());

        Ok(users
            .into_iter()
            .map(|user| {
                let mutual_friends_count = friend_sets
                    .get(&user.user_id)
                    .map_or(0, |theirs| theirs.iter().filter(|id| own.contains(id.as_str())).count());
                FriendWithDetails {
                    user,
                    mutual_friends_count,
                }
            })
            .collect())
    }

    /// Number of friends `a` and `b` have in common. Symmetric.
    pub async fn mutual_friends_count(&self, a: &str, b: &str) -> AgoraResult<usize> {
        let sets = self.friend_id_sets(&[a.to_string(), b.to_string()]).await?;
        let (Some(left), Some(right)) = (sets.get(a), sets.get(b)) else {
            return Ok(0);
        };
        Ok(left
            .intersection(right)
            .filter(|id| id.as_str() != a && id.as_str() != b)
            .count())
    }

    pub async fn get_followers(&self, user_id: &str) -> AgoraResult<Vec<RelatedUser>> {
        let query = Query::collection(collections::FOLLOWINGS)
            .eq("followeeId", user_id)
            .order_by("createdAt", SortOrder::Desc);
        let rows: Vec<Following> = self.store.query_as(&query).await?;
        self.related_users(rows.into_iter().map(|row| (row.follower_id, row.created_at)).collect())
            .await
    }

    pub async fn get_following(&self, user_id: &str) -> AgoraResult<Vec<RelatedUser>> {
        let query = Query::collection(collections::FOLLOWINGS)
            .eq("followerId", user_id)
            .order_by("createdAt", SortOrder::Desc);
        let rows: Vec<Following> = self.store.query_as(&query).await?;
        self.related_users(rows.into_iter().map(|row| (row.followee_id, row.created_at)).collect())
            .await
    }

    /// Pending requests addressed to `user_id`. Requests the user sent are not included.
    pub async fn get_friend_requests(&self, user_id: &str) -> AgoraResult<Vec<FriendRequest>> {
        self.pending_requests("userId2", user_id).await
    }

    /// Pending requests `user_id` sent that the recipient has not answered.
    pub async fn get_sent_friend_requests(&self, user_id: &str) -> AgoraResult<Vec<FriendRequest>> {
        self.pending_requests("userId1", user_id).await
    }

    async fn pending_requests(&self, side: &str, user_id: &str) -> AgoraResult<Vec<FriendRequest>> {
        let query = Query::collection(collections::FRIENDSHIPS)
            .eq(side, user_id)
            .eq("friendshipStatus", FriendshipStatus::Pending.as_str())
            .order_by("createdAt", SortOrder::Desc);
        let rows: Vec<Friendship> = self.store.query_as(&query).await?;
        let by_counterpart: HashMap<String, String> = rows
            .iter()
            .map(|row| (row.other(user_id).to_string(), row.id.clone()))
            .collect();
        let related = self
            .related_users(
                rows.iter()
                    .map(|row| (row.other(user_id).to_string(), row.created_at))
                    .collect(),
            )
            .await?;
        Ok(related
            .into_iter()
            .filter_map(|counterpart| {
                by_counterpart.get(&counterpart.user_id).map(|friendship_id| FriendRequest {
                    friendship_id: friendship_id.clone(),
                    counterpart,
                })
            })
            .collect())
    }

    /// Friend-id set of every user in `user_ids`, from one batched read.
    async fn friend_id_sets(&self, user_ids: &[String]) -> AgoraResult<HashMap<String, HashSet<String>>> {
        let links: Vec<FriendLink> = self
            .store
            .query_in_chunks_as(&Query::collection(collections::FRIEND_LINKS), "ownerId", user_ids)
            .await?;
        let mut sets: HashMap<String, HashSet<String>> = HashMap::new();
        for link in links {
            sets.entry(link.owner_id).or_default().insert(link.friend_id);
        }
        Ok(sets)
    }

    /// Attaches identity and profile image to `(user_id, since)` pairs,
    /// keeping input order. Ids without a user document are dropped.
    pub(crate) async fn related_users(&self, related: Vec<(String, DateTime<Utc>)>) -> AgoraResult<Vec<RelatedUser>> {
        if related.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = related.iter().map(|(id, _)| id.clone()).collect();
        let (users, images) = tokio::try_join!(
            async { users_by_id(self.store, &ids).await.map_err(AgoraError::from) },
            self.images.resolve_role_for_many(&ids, ImageRole::Profile),
        )?;

        Ok(related
            .into_iter()
            .filter_map(|(id, since)| match users.get(&id) {
                Some(user) => Some(to_related(user, images.get(&id).cloned(), since)),
                None => {
                    warn!("related user {id} has no user document");
                    None
                }
            })
            .collect())
    }

    pub async fn send_friend_request(&self, from: &str, to: &str) -> AgoraResult<Friendship> {
        if from == to {
            return Err(AgoraError::invalid("cannot send a friend request to yourself"));
        }
        self.require_users(&[from, to]).await?;

        let id = pair_id(from, to);
        if let Some(existing) = self.store.get_as::<Friendship>(collections::FRIENDSHIPS, &id).await? {
            match existing.friendship_status {
                FriendshipStatus::Accepted => return Err(AgoraError::invalid("users are already friends")),
                FriendshipStatus::Pending => return Err(AgoraError::invalid("a friend request is already pending")),
                FriendshipStatus::Declined => debug!("reopening declined friendship {id}"),
            }
        }

        let friendship = Friendship {
            id: id.clone(),
            user_id1: from.to_string(),
            user_id2: to.to_string(),
            friendship_status: FriendshipStatus::Pending,
            created_at: Utc::now(),
        };
        self.store.set_as(collections::FRIENDSHIPS, &id, &friendship).await?;
        Ok(friendship)
    }

    /// `to` answers the pending request `from` sent.
    ///
    /// The friend links are written before the status flips, so a failure
    /// part way leaves the request pending and the answer can be retried.
    /// Accepting an already accepted request rewrites its links.
    pub async fn respond_to_friend_request(&self, from: &str, to: &str, accept: bool) -> AgoraResult<Friendship> {
        let id = pair_id(from, to);
        let mut friendship = self
            .store
            .get_as::<Friendship>(collections::FRIENDSHIPS, &id)
            .await?
            .filter(|row| row.user_id1 == from && row.user_id2 == to)
            .filter(|row| match row.friendship_status {
                FriendshipStatus::Pending => true,
                FriendshipStatus::Accepted => accept,
                FriendshipStatus::Declined => false,
            })
            .ok_or_else(|| AgoraError::not_found("friend request", format!("{from} -> {to}")))?;

        if accept {
            self.write_links(&id, from, to).await?;
            if friendship.friendship_status == FriendshipStatus::Accepted {
                debug!("friendship {id} was already accepted; links rewritten");
                return Ok(friendship);
            }
        }

        let status = if accept {
            FriendshipStatus::Accepted
        } else {
            FriendshipStatus::Declined
        };
        self.store
            .update(
                collections::FRIENDSHIPS,
                &id,
                patch(json!({ "friendshipStatus": status.as_str() })),
            )
            .await?;
        friendship.friendship_status = status;
        Ok(friendship)
    }

    /// Links go first; the friendship row is deleted last so a failed
    /// removal can be repeated.
    pub async fn remove_friend(&self, a: &str, b: &str) -> AgoraResult<()> {
        self.store
            .delete(collections::FRIEND_LINKS, &composite_id(&[a, b]))
            .await?;
        self.store
            .delete(collections::FRIEND_LINKS, &composite_id(&[b, a]))
            .await?;
        self.store.delete(collections::FRIENDSHIPS, &pair_id(a, b)).await?;
        Ok(())
    }

    async fn write_links(&self, friendship_id: &str, a: &str, b: &str) -> AgoraResult<()> {
        let now = Utc::now();
        for (owner, friend) in [(a, b), (b, a)] {
            let link_id = composite_id(&[owner, friend]);
            let link = FriendLink {
                id: link_id.clone(),
                owner_id: owner.to_string(),
                friend_id: friend.to_string(),
                friendship_id: friendship_id.to_string(),
                created_at: now,
            };
            self.store.set_as(collections::FRIEND_LINKS, &link_id, &link).await?;
        }
        Ok(())
    }

    /// Idempotent: following twice keeps the first follow.
    pub async fn follow(&self, follower: &str, followee: &str) -> AgoraResult<Following> {
        if follower == followee {
            return Err(AgoraError::invalid("cannot follow yourself"));
        }
        self.require_users(&[follower, followee]).await?;

        let id = composite_id(&[follower, followee]);
        if let Some(existing) = self.store.get_as::<Following>(collections::FOLLOWINGS, &id).await? {
            return Ok(existing);
        }
        let following = Following {
            id: id.clone(),
            follower_id: follower.to_string(),
            followee_id: followee.to_string(),
            created_at: Utc::now(),
        };
        self.store.set_as(collections::FOLLOWINGS, &id, &following).await?;
        Ok(following)
    }

    pub async fn unfollow(&self, follower: &str, followee: &str) -> AgoraResult<()> {
        self.store
            .delete(collections::FOLLOWINGS, &composite_id(&[follower, followee]))
            .await?;
        Ok(())
    }

    async fn require_users(&self, ids: &[&str]) -> AgoraResult<()> {
        for id in ids {
            if self.store.get(collections::USERS, id).await?.is_none() {
                return Err(AgoraError::not_found("user", *id));
            }
        }
        Ok(())
    }
}

fn to_related(user: &User, profile_image: Option<String>, since: DateTime<Utc>) -> RelatedUser {
    RelatedUser {
        user_id: user.id.clone(),
        user_name: user.user_name.clone(),
        display_name: user.display_name(),
        profile_image,
        since,
    }
}
