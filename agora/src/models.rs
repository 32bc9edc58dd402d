//! Document shapes of every collection the aggregators read or write.
//!
//! Documents reference each other through string id fields only; nothing
//! enforces those references, so readers treat dangling ids as absent data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Collection names and sub-collection paths.
pub mod collections {
    pub const USERS: &str = "users";
    /// One document per lowercased handle, created when the handle is claimed.
    pub const USER_NAME_CLAIMS: &str = "userNameClaims";
    pub const PROFILE_IMAGES: &str = "profileImages";
    pub const PROFILE_IMAGE_SET_AS: &str = "profileImageSetAs";
    pub const FRIENDSHIPS: &str = "friendships";
    pub const FRIEND_LINKS: &str = "friendLinks";
    pub const FOLLOWINGS: &str = "followings";
    pub const POSTS: &str = "posts";
    pub const POST_MEDIA: &str = "postMedia";
    pub const COMMUNITIES: &str = "communities";
    pub const COMMUNITY_VARIANTS: &str = "communityVariants";
    pub const COMMUNITY_MEMBERSHIPS: &str = "communityVariantMemberships";
    pub const COMMUNITY_COUNTERS: &str = "communityVariantMembershipAndLikeCount";
    pub const COMMUNITY_REQUESTS: &str = "communityRequests";
    pub const PRODUCTS: &str = "products";
    pub const COLORS: &str = "colors";
    pub const SIZES: &str = "sizes";
    pub const COLOR_VARIANTS: &str = "colorVariants";
    pub const SIZE_VARIANTS: &str = "sizeVariants";
    pub const VARIANTS: &str = "variants";
    pub const SUB_IMAGES: &str = "subImages";
    pub const OWNERSHIP: &str = "ownership";
    pub const BUSINESSES: &str = "businesses";
    pub const REVIEWS: &str = "reviews";

    pub fn work_experience(user_id: &str) -> String {
        format!("{USERS}/{user_id}/workExperience")
    }

    pub fn education(user_id: &str) -> String {
        format!("{USERS}/{user_id}/education")
    }

    pub fn about(user_id: &str) -> String {
        format!("{USERS}/{user_id}/about")
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub user_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() { self.user_name.clone() } else { full.to_string() }
    }
}

/// Named slot an uploaded image can fill.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum ImageRole {
    Profile,
    CoverProfile,
    JobProfile,
    PostProfile,
    CompanyProfile,
}

impl ImageRole {
    pub const ALL: [ImageRole; 5] = [
        ImageRole::Profile,
        ImageRole::CoverProfile,
        ImageRole::JobProfile,
        ImageRole::PostProfile,
        ImageRole::CompanyProfile,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ImageRole::Profile => "profile",
            ImageRole::CoverProfile => "coverProfile",
            ImageRole::JobProfile => "jobProfile",
            ImageRole::PostProfile => "postProfile",
            ImageRole::CompanyProfile => "companyProfile",
        }
    }
}

impl std::str::FromStr for ImageRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ImageRole::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| format!("unknown image role '{value}'"))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileImage {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    #[serde(rename = "imageURL")]
    pub image_url: String,
    #[serde(default)]
    pub type_of_image: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Assignment of one uploaded image to one role.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileImageSetAs {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub profile_image_id: String,
    pub set_as: ImageRole,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Declined,
}

impl FriendshipStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            FriendshipStatus::Pending => "pending",
            FriendshipStatus::Accepted => "accepted",
            FriendshipStatus::Declined => "declined",
        }
    }
}

/// One row per unordered pair. `user_id1` sent the request, `user_id2` received it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Friendship {
    #[serde(default)]
    pub id: String,
    pub user_id1: String,
    pub user_id2: String,
    pub friendship_status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    /// The party that is not `user_id`.
    pub fn other(&self, user_id: &str) -> &str {
        if self.user_id1 == user_id { &self.user_id2 } else { &self.user_id1 }
    }
}

/// Directed half of an accepted friendship, owned by `owner_id`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FriendLink {
    #[serde(default)]
    pub id: String,
    pub owner_id: String,
    pub friend_id: String,
    pub friendship_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Following {
    #[serde(default)]
    pub id: String,
    pub follower_id: String,
    pub followee_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub visibility: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostMedia {
    #[serde(default)]
    pub id: String,
    pub post_id: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub type_url: String,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub display_order: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Community {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// A concrete community owned by one user.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommunityVariant {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub community_id: Option<String>,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
}

/// Membership interval; `to` stays empty while the membership is active.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommunityVariantMembership {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub community_variant_id: String,
    pub is_member: bool,
    pub from: DateTime<Utc>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

/// Aggregate counter document, one per community variant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MembershipCounter {
    #[serde(default)]
    pub id: String,
    pub community_variant_id: String,
    #[serde(default)]
    pub membership_count: i64,
    #[serde(default)]
    pub like_count: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommunityRequest {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub community_variant_id: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    #[serde(default)]
    pub id: String,
    pub company: String,
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub current: bool,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    #[serde(default)]
    pub id: String,
    pub school: String,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub field_of_study: Option<String>,
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub end_year: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AboutItemType {
    Interest,
    Skill,
    #[serde(other)]
    Other,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AboutItem {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: AboutItemType,
    pub value: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// Global color vocabulary entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Color {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub hex_code: Option<String>,
}

/// Global size vocabulary entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Size {
    #[serde(default)]
    pub id: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColorVariant {
    #[serde(default)]
    pub id: String,
    pub product_id: String,
    pub color_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SizeVariant {
    #[serde(default)]
    pub id: String,
    pub product_id: String,
    pub size_id: String,
}

/// Priced, stocked SKU.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    #[serde(default)]
    pub id: String,
    pub product_id: String,
    #[serde(default)]
    pub color_variant_id: Option<String>,
    #[serde(default)]
    pub size_variant_id: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub sku: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubImage {
    #[serde(default)]
    pub id: String,
    pub product_id: String,
    #[serde(rename = "imageURL")]
    pub image_url: String,
    #[serde(default)]
    pub order: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SellerType {
    Individual,
    Business,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ownership {
    #[serde(default)]
    pub id: String,
    pub product_id: String,
    pub user_id: String,
    pub seller_type: SellerType,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BusinessInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub established: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BusinessMetrics {
    #[serde(default)]
    pub total_products: i64,
    #[serde(default)]
    pub total_sales: i64,
    #[serde(default)]
    pub followers: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BusinessReputation {
    #[serde(default)]
    pub reviews: i64,
    #[serde(default)]
    pub feedback: i64,
    #[serde(default)]
    pub rating: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub profile: BusinessInfo,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub metrics: BusinessMetrics,
    #[serde(default)]
    pub business_profile: BusinessReputation,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(default)]
    pub id: String,
    pub product_id: String,
    pub user_id: String,
    pub rating: f64,
    #[serde(default)]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_names_follow_camel_case() {
        let assignment: ProfileImageSetAs = serde_json::from_value(json!({
            "id": "u1_coverProfile",
            "userId": "u1",
            "profileImageId": "img",
            "setAs": "coverProfile"
        }))
        .unwrap();
        assert_eq!(assignment.set_as, ImageRole::CoverProfile);

        let friendship: Friendship = serde_json::from_value(json!({
            "userId1": "a",
            "userId2": "b",
            "friendshipStatus": "accepted",
            "createdAt": "2024-03-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(friendship.other("b"), "a");

        let image = serde_json::to_value(ProfileImage {
            id: "i".into(),
            user_id: "u".into(),
            image_url: "https://cdn/x.png".into(),
            type_of_image: None,
            uploaded_at: Utc::now(),
        })
        .unwrap();
        assert!(image.get("imageURL").is_some());
    }

    #[test]
    fn unknown_about_types_are_tolerated() {
        let item: AboutItem = serde_json::from_value(json!({"type": "language", "value": "fr"})).unwrap();
        assert_eq!(item.item_type, AboutItemType::Other);
    }

    #[test]
    fn image_roles_parse_case_insensitively() {
        assert_eq!("companyprofile".parse::<ImageRole>(), Ok(ImageRole::CompanyProfile));
        assert!("banner".parse::<ImageRole>().is_err());
    }
}
