//! External profile aggregation.
//!
//! Assembles everything a visitor sees on another user's profile from the
//! normalized collections in one fan-out of reads and one in-memory join.

use std::collections::HashMap;

use log::{debug, error, warn};
use serde::Serialize;

use crate::{
    accounts::find_by_username,
    config::AggregationSettings,
    errors::{AgoraError, AgoraResult, ProfileError},
    images::{ImageRoleResolver, RoleImages},
    models::{
        AboutItem, AboutItemType, Community, CommunityVariant, Education, MembershipCounter, Post, PostMedia, User,
        WorkExperience, collections,
    },
    relationships::{FriendWithDetails, RelatedUser, RelationshipAggregator},
    store::{DocumentStore, DocumentStoreExt, Query, SortOrder},
    with_deadline,
};

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub user: User,
    pub posts: Vec<PostView>,
    pub communities: Vec<CommunitySummary>,
    pub images: RoleImages,
    pub following: Vec<RelatedUser>,
    pub followers: Vec<RelatedUser>,
    pub friends: Vec<FriendWithDetails>,
    pub about: AboutSection,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub media: Vec<MediaSummary>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaSummary {
    #[serde(rename = "type")]
    pub media_type: String,
    pub type_url: String,
    pub file_type: Option<String>,
    pub display_order: i64,
}

impl From<PostMedia> for MediaSummary {
    fn from(media: PostMedia) -> Self {
        Self {
            media_type: media.media_type,
            type_url: media.type_url,
            file_type: media.file_type,
            display_order: media.display_order,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommunitySummary {
    #[serde(flatten)]
    pub community: CommunityVariant,
    /// The community this variant belongs to, when it has one.
    pub parent: Option<Community>,
    pub membership_count: i64,
    pub like_count: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AboutSection {
    pub work_experience: Vec<WorkExperience>,
    pub education: Vec<Education>,
    pub interests: Vec<String>,
    pub skills: Vec<String>,
}

impl AboutSection {
    fn from_parts(work_experience: Vec<WorkExperience>, education: Vec<Education>, items: Vec<AboutItem>) -> Self {
        let mut section = AboutSection {
            work_experience,
            education,
            ..Default::default()
        };
        for item in items {
            match item.item_type {
                AboutItemType::Interest => section.interests.push(item.value),
                AboutItemType::Skill => section.skills.push(item.value),
                AboutItemType::Other => debug!("ignoring about item {} of unknown type", item.id),
            }
        }
        section
    }
}

pub struct ProfileAggregationService<'a, S> {
    store: &'a S,
    settings: AggregationSettings,
}

impl<'a, S: DocumentStore> ProfileAggregationService<'a, S> {
    pub fn new(store: &'a S, settings: AggregationSettings) -> Self {
        Self { store, settings }
    }

    /// Full external profile of the user holding `username`.
    ///
    /// A missing handle is reported as [`ProfileError::NotFound`]; any other
    /// failure anywhere in the pipeline becomes [`ProfileError::Failed`]. No
    /// partial view is returned.
    pub async fn fetch_user_profile(&self, username: &str) -> Result<ProfileView, ProfileError> {
        with_deadline(self.settings.request_timeout(), self.aggregate(username))
            .await
            .map_err(|err| {
                match &err {
                    AgoraError::NotFound { entity: "user", .. } => debug!("no profile for handle '{username}'"),
                    other => error!("profile aggregation for '{username}' failed: {other}"),
                }
                ProfileError::from(err)
            })
    }

    async fn aggregate(&self, username: &str) -> AgoraResult<ProfileView> {
        let user = find_by_username(self.store, username)
            .await?
            .ok_or_else(|| AgoraError::not_found("user", username))?;
        let user_id = user.id.as_str();

        let resolver = ImageRoleResolver::new(self.store);
        let relationships = RelationshipAggregator::new(self.store);
        let (images, posts, communities, friends, followers, following, about) = tokio::try_join!(
            resolver.resolve_roles(user_id),
            self.posts_with_media(user_id),
            self.owned_communities(user_id),
            relationships.get_friends(user_id),
            relationships.get_followers(user_id),
            relationships.get_following(user_id),
            self.about(user_id),
        )?;

        debug!(
            "profile '{username}': {} posts, {} communities, {} friends, {} followers, {} following",
            posts.len(),
            communities.len(),
            friends.len(),
            followers.len(),
            following.len()
        );
        Ok(ProfileView {
            user,
            posts,
            communities,
            images,
            following,
            followers,
            friends,
            about,
        })
    }

    /// Posts newest first, each with its media ordered by `displayOrder`.
    async fn posts_with_media(&self, user_id: &str) -> AgoraResult<Vec<PostView>> {
        let query = Query::collection(collections::POSTS)
            .eq("userId", user_id)
            .order_by("createdAt", SortOrder::Desc);
        let posts: Vec<Post> = self.store.query_as(&query).await?;
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: Vec<String> = posts.iter().map(|post| post.id.clone()).collect();
        let media_query = Query::collection(collections::POST_MEDIA).order_by("displayOrder", SortOrder::Asc);
        let media: Vec<PostMedia> = self
            .store
            .query_in_chunks_as(&media_query, "postId", &post_ids)
            .await?;

        let mut by_post: HashMap<String, Vec<MediaSummary>> = HashMap::new();
        for item in media {
            by_post.entry(item.post_id.clone()).or_default().push(item.into());
        }
        Ok(posts
            .into_iter()
            .map(|post| {
                let media = by_post.remove(&post.id).unwrap_or_default();
                PostView { post, media }
            })
            .collect())
    }

    /// Communities the user owns, left-joined to their counters.
    async fn owned_communities(&self, user_id: &str) -> AgoraResult<Vec<CommunitySummary>> {
        let query = Query::collection(collections::COMMUNITY_VARIANTS)
            .eq("userId", user_id)
            .order_by("createdAt", SortOrder::Desc);
        let variants: Vec<CommunityVariant> = self.store.query_as(&query).await?;
        let variant_ids: Vec<String> = variants.iter().map(|variant| variant.id.clone()).collect();
        let mut parent_ids: Vec<String> = variants
            .iter()
            .filter_map(|variant| variant.community_id.clone())
            .collect();
        parent_ids.sort();
        parent_ids.dedup();

        let counters_query = Query::collection(collections::COMMUNITY_COUNTERS);
        let parents_query = Query::collection(collections::COMMUNITIES);
        let (counters, parents) = tokio::try_join!(
            self.store
                .query_in_chunks_as::<MembershipCounter>(&counters_query, "communityVariantId", &variant_ids),
            self.store.query_in_chunks_as::<Community>(&parents_query, "id", &parent_ids),
        )?;
        Ok(join_counters(variants, counters, parents))
    }

    async fn about(&self, user_id: &str) -> AgoraResult<AboutSection> {
        let work_query = Query::collection(collections::work_experience(user_id));
        let education_query = Query::collection(collections::education(user_id));
        let items_query = Query::collection(collections::about(user_id));
        let (work_experience, education, items) = tokio::try_join!(
            self.store.query_as::<WorkExperience>(&work_query),
            self.store.query_as::<Education>(&education_query),
            self.store.query_as::<AboutItem>(&items_query),
        )?;
        Ok(AboutSection::from_parts(work_experience, education, items))
    }
}

/// Missing counters count as zero. Duplicate counters for one community keep the first.
fn join_counters(
    variants: Vec<CommunityVariant>,
    counters: Vec<MembershipCounter>,
    parents: Vec<Community>,
) -> Vec<CommunitySummary> {
    let parents: HashMap<String, Community> = parents
        .into_iter()
        .map(|parent| (parent.id.clone(), parent))
        .collect();
    let mut by_variant: HashMap<String, MembershipCounter> = HashMap::new();
    for counter in counters {
        if by_variant.contains_key(&counter.community_variant_id) {
            warn!("duplicate counter {} for community {}", counter.id, counter.community_variant_id);
            continue;
        }
        by_variant.insert(counter.community_variant_id.clone(), counter);
    }
    variants
        .into_iter()
        .map(|community| {
            let (membership_count, like_count) = by_variant
                .get(&community.id)
                .map_or((0, 0), |counter| (counter.membership_count.max(0), counter.like_count.max(0)));
            let parent = community
                .community_id
                .as_ref()
                .and_then(|id| parents.get(id))
                .cloned();
            CommunitySummary {
                community,
                parent,
                membership_count,
                like_count,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn variant(id: &str) -> CommunityVariant {
        CommunityVariant {
            id: id.to_string(),
            community_id: None,
            user_id: "owner".to_string(),
            name: id.to_uppercase(),
            description: String::new(),
            visibility: Default::default(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn communities_without_counters_aggregate_to_zero() {
        let counters = vec![MembershipCounter {
            id: "c1".to_string(),
            community_variant_id: "v1".to_string(),
            membership_count: 5,
            like_count: 2,
        }];
        let mut grouped = variant("v2");
        grouped.community_id = Some("c1".to_string());
        let parents = vec![Community {
            id: "c1".to_string(),
            name: "Outdoors".to_string(),
            description: String::new(),
            category: Some("sport".to_string()),
        }];
        let joined = join_counters(vec![variant("v1"), grouped], counters, parents);
        assert_eq!((joined[0].membership_count, joined[0].like_count), (5, 2));
        assert_eq!((joined[1].membership_count, joined[1].like_count), (0, 0));
        assert!(joined[0].parent.is_none());
        assert_eq!(joined[1].parent.as_ref().map(|p| p.name.as_str()), Some("Outdoors"));
    }

    #[test]
    fn about_items_partition_by_type() {
        let items = vec![
            AboutItem {
                id: "a".into(),
                item_type: AboutItemType::Skill,
                value: "rust".into(),
            },
            AboutItem {
                id: "b".into(),
                item_type: AboutItemType::Interest,
                value: "climbing".into(),
            },
            AboutItem {
                id: "c".into(),
                item_type: AboutItemType::Other,
                value: "?".into(),
            },
        ];
        let about = AboutSection::from_parts(Vec::new(), Vec::new(), items);
        assert_eq!(about.skills, vec!["rust"]);
        assert_eq!(about.interests, vec!["climbing"]);
    }
}
