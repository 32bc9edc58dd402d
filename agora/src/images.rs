//! Image role resolution.
//!
//! A user's current profile or cover picture is never stored on the user
//! document. It is resolved by joining the role-assignment collection
//! against the uploaded images.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use log::{debug, warn};
use serde::Serialize;

use crate::{
    config::Placeholders,
    errors::{AgoraError, AgoraResult, ValidationError},
    id::composite_id,
    models::{ImageRole, ProfileImage, ProfileImageSetAs, collections},
    store::{DocumentStore, DocumentStoreExt, Query},
};

/// Role → image URL for one user. Roles without an assignment are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoleImages(BTreeMap<ImageRole, String>);

impl RoleImages {
    pub fn get(&self, role: ImageRole) -> Option<&str> {
        self.0.get(&role).map(String::as_str)
    }

    pub fn url_or<'a>(&'a self, role: ImageRole, default: &'a str) -> &'a str {
        self.get(role).unwrap_or(default)
    }

    /// First role of `preference` that has an image.
    pub fn first_of(&self, preference: &[ImageRole]) -> Option<&str> {
        preference.iter().find_map(|role| self.get(*role))
    }

    /// Every role, with configured placeholders standing in for missing ones.
    pub fn with_placeholders(&self, placeholders: &Placeholders) -> BTreeMap<ImageRole, String> {
        ImageRole::ALL
            .into_iter()
            .map(|role| (role, self.url_or(role, placeholders.for_role(role)).to_string()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Canonical id of the single assignment record for `(user_id, role)`.
pub fn assignment_id(user_id: &str, role: ImageRole) -> String {
    composite_id(&[user_id, role.as_str()])
}

/// Picks the current assignment among rows sharing one `(user, role)` key.
///
/// The canonical keyed record wins; rows left behind by older writers fall
/// back to the smallest id so repeated reads agree.
fn current_assignment<'a>(rows: &[&'a ProfileImageSetAs]) -> Option<&'a ProfileImageSetAs> {
    rows.iter()
        .copied()
        .find(|row| row.id == assignment_id(&row.user_id, row.set_as))
        .or_else(|| rows.iter().copied().min_by(|a, b| a.id.cmp(&b.id)))
}

fn current_by_key(assignments: &[ProfileImageSetAs]) -> BTreeMap<(&str, ImageRole), &ProfileImageSetAs> {
    let mut grouped: BTreeMap<(&str, ImageRole), Vec<&ProfileImageSetAs>> = BTreeMap::new();
    for row in assignments {
        grouped.entry((row.user_id.as_str(), row.set_as)).or_default().push(row);
    }
    grouped
        .into_iter()
        .filter_map(|(key, rows)| current_assignment(&rows).map(|row| (key, row)))
        .collect()
}

pub struct ImageRoleResolver<'a, S> {
    store: &'a S,
}

impl<'a, S: DocumentStore> ImageRoleResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn resolve_roles(&self, user_id: &str) -> AgoraResult<RoleImages> {
        let assignments_query = Query::collection(collections::PROFILE_IMAGE_SET_AS).eq("userId", user_id);
        let images_query = Query::collection(collections::PROFILE_IMAGES).eq("userId", user_id);
        let (assignments, images) = tokio::try_join!(
            self.store.query_as::<ProfileImageSetAs>(&assignments_query),
            self.store.query_as::<ProfileImage>(&images_query),
        )?;

        let images_by_id: HashMap<&str, &ProfileImage> =
            images.iter().map(|image| (image.id.as_str(), image)).collect();

        let mut resolved = BTreeMap::new();
        for ((_, role), row) in current_by_key(&assignments) {
            match images_by_id.get(row.profile_image_id.as_str()) {
                Some(image) => {
                    resolved.insert(role, image.image_url.clone());
                }
                None => warn!(
                    "role {} of user {user_id} points at missing image {}",
                    role.as_str(),
                    row.profile_image_id
                ),
            }
        }
        Ok(RoleImages(resolved))
    }

    /// Image URL filling `role` for each of `user_ids`, in two batched reads.
    pub async fn resolve_role_for_many(
        &self,
        user_ids: &[String],
        role: ImageRole,
    ) -> AgoraResult<HashMap<String, String>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let base = Query::collection(collections::PROFILE_IMAGE_SET_AS).eq("setAs", role.as_str());
        let assignments: Vec<ProfileImageSetAs> = self.store.query_in_chunks_as(&base, "userId", user_ids).await?;
        let current = current_by_key(&assignments);

        let image_ids: Vec<String> = current.values().map(|row| row.profile_image_id.clone()).collect();
        let images: Vec<ProfileImage> = self
            .store
            .query_in_chunks_as(&Query::collection(collections::PROFILE_IMAGES), "id", &image_ids)
            .await?;
        let images_by_id: HashMap<&str, &ProfileImage> =
            images.iter().map(|image| (image.id.as_str(), image)).collect();

        debug!(
            "resolved {} {} assignments for {} users",
            current.len(),
            role.as_str(),
            user_ids.len()
        );
        Ok(current
            .into_iter()
            .filter_map(|((user_id, _), row)| {
                images_by_id
                    .get(row.profile_image_id.as_str())
                    .map(|image| (user_id.to_string(), image.image_url.clone()))
            })
            .collect())
    }

    /// URL of the first role in `preference` that the user has filled.
    pub async fn resolve_with_fallback(&self, user_id: &str, preference: &[ImageRole]) -> AgoraResult<Option<String>> {
        let roles = self.resolve_roles(user_id).await?;
        Ok(roles.first_of(preference).map(str::to_string))
    }

    /// Points `role` at `image_id` for the user. Last write wins.
    pub async fn set_role(&self, user_id: &str, role: ImageRole, image_id: &str) -> AgoraResult<()> {
        let image: ProfileImage = self
            .store
            .get_as(collections::PROFILE_IMAGES, image_id)
            .await?
            .ok_or_else(|| AgoraError::not_found("profile image", image_id))?;
        if image.user_id != user_id {
            return Err(AgoraError::invalid(format!(
                "image {image_id} does not belong to user {user_id}"
            )));
        }

        let id = assignment_id(user_id, role);
        let assignment = ProfileImageSetAs {
            id: id.clone(),
            user_id: user_id.to_string(),
            profile_image_id: image_id.to_string(),
            set_as: role,
        };
        self.store
            .set_as(collections::PROFILE_IMAGE_SET_AS, &id, &assignment)
            .await?;

        // Drop stray rows for the same key so every reader sees one assignment.
        let stale_query = Query::collection(collections::PROFILE_IMAGE_SET_AS)
            .eq("userId", user_id)
            .eq("setAs", role.as_str());
        let stale: Vec<ProfileImageSetAs> = self.store.query_as(&stale_query).await?;
        for row in stale.into_iter().filter(|row| row.id != id) {
            debug!("removing duplicate {} assignment {}", role.as_str(), row.id);
            self.store.delete(collections::PROFILE_IMAGE_SET_AS, &row.id).await?;
        }
        Ok(())
    }

    /// Records an uploaded image and returns its id. The URL is opaque beyond being well-formed.
    pub async fn add_profile_image(
        &self,
        user_id: &str,
        image_url: &str,
        type_of_image: Option<&str>,
    ) -> AgoraResult<String> {
        if url::Url::parse(image_url).is_err() {
            return Err(ValidationError::single("imageURL", "validation.url", "must be a valid URL").into());
        }
        let image = ProfileImage {
            id: String::new(),
            user_id: user_id.to_string(),
            image_url: image_url.to_string(),
            type_of_image: type_of_image.map(str::to_string),
            uploaded_at: Utc::now(),
        };
        Ok(self.store.add_as(collections::PROFILE_IMAGES, &image).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, user: &str, role: ImageRole, image: &str) -> ProfileImageSetAs {
        ProfileImageSetAs {
            id: id.to_string(),
            user_id: user.to_string(),
            profile_image_id: image.to_string(),
            set_as: role,
        }
    }

    #[test]
    fn canonical_row_beats_legacy_duplicates() {
        let rows = [
            row("aaa", "u1", ImageRole::Profile, "old"),
            row("u1_profile", "u1", ImageRole::Profile, "new"),
        ];
        let current = current_by_key(&rows);
        assert_eq!(current[&("u1", ImageRole::Profile)].profile_image_id, "new");
    }

    #[test]
    fn legacy_duplicates_break_ties_by_smallest_id() {
        let rows = [
            row("zzz", "u1", ImageRole::CoverProfile, "second"),
            row("bbb", "u1", ImageRole::CoverProfile, "first"),
        ];
        let current = current_by_key(&rows);
        assert_eq!(current[&("u1", ImageRole::CoverProfile)].profile_image_id, "first");
    }

    #[test]
    fn placeholders_fill_missing_roles() {
        let mut map = BTreeMap::new();
        map.insert(ImageRole::Profile, "https://cdn/me.png".to_string());
        let images = RoleImages(map);
        let filled = images.with_placeholders(&Placeholders::default());
        assert_eq!(filled.len(), ImageRole::ALL.len());
        assert_eq!(filled[&ImageRole::Profile], "https://cdn/me.png");
        assert_eq!(filled[&ImageRole::CoverProfile], Placeholders::default().cover);
        assert_eq!(images.first_of(&[ImageRole::CompanyProfile, ImageRole::Profile]), Some("https://cdn/me.png"));
    }
}
