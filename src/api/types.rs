//! API response type definitions.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

/// Deserialize an id that the platform sends either as a JSON string or as a
/// bare number.
pub fn deserialize_flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleId {
        String(String),
        Int(u64),
    }

    match FlexibleId::deserialize(deserializer)? {
        FlexibleId::String(s) => Ok(s),
        FlexibleId::Int(i) => Ok(i.to_string()),
    }
}

fn deserialize_optional_flexible_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleId {
        String(String),
        Int(u64),
    }

    Ok(match Option::<FlexibleId>::deserialize(deserializer)? {
        None => None,
        Some(FlexibleId::String(s)) => Some(s),
        Some(FlexibleId::Int(i)) => Some(i.to_string()),
    })
}

/// Login endpoint response.
#[derive(Debug, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(
        default,
        alias = "userId",
        deserialize_with = "deserialize_optional_flexible_id"
    )]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user: Option<bool>,
    pub message: Option<String>,
    pub checkpoint_url: Option<String>,
    #[serde(default)]
    pub two_factor_required: bool,
    pub two_factor_info: Option<TwoFactorInfo>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TwoFactorInfo {
    pub two_factor_identifier: Option<String>,
}

/// Plain `{status, message}` envelope used by mutations.
#[derive(Debug, Default, Deserialize)]
pub struct StatusResponse {
    pub status: Option<String>,
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn is_ok(&self) -> bool {
        self.status.as_deref() == Some("ok")
    }
}

/// Counted edge collection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EdgeCount {
    #[serde(default)]
    pub count: u64,
}

/// GraphQL connection list.
#[derive(Debug, Clone, Deserialize)]
pub struct Edges<T> {
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<T>>,
}

impl<T> Default for Edges<T> {
    fn default() -> Self {
        Self { edges: Vec::new() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

/// `web_profile_info` response.
#[derive(Debug, Deserialize)]
pub struct WebProfileInfoResponse {
    pub data: WebProfileInfoData,
}

#[derive(Debug, Deserialize)]
pub struct WebProfileInfoData {
    pub user: Option<ProfileUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub is_private: bool,
    pub profile_pic_url_hd: Option<String>,
    pub profile_pic_url: Option<String>,
    #[serde(default)]
    pub edge_owner_to_timeline_media: EdgeCount,
    #[serde(default)]
    pub edge_followed_by: EdgeCount,
    #[serde(default)]
    pub edge_follow: EdgeCount,
}

/// Public profile summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub user_id: String,
    pub username: String,
    pub full_name: String,
    pub is_private: bool,
    pub profile_pic_url: Option<String>,
    pub post_count: u64,
    pub follower_count: u64,
    pub following_count: u64,
}

impl From<ProfileUser> for UserInfo {
    fn from(user: ProfileUser) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            full_name: user.full_name,
            is_private: user.is_private,
            profile_pic_url: user.profile_pic_url_hd.or(user.profile_pic_url),
            post_count: user.edge_owner_to_timeline_media.count,
            follower_count: user.edge_followed_by.count,
            following_count: user.edge_follow.count,
        }
    }
}

/// Post lookup by shortcode.
#[derive(Debug, Deserialize)]
pub struct ShortcodeMediaResponse {
    pub data: Option<ShortcodeMediaData>,
}

#[derive(Debug, Deserialize)]
pub struct ShortcodeMediaData {
    pub xdt_shortcode_media: Option<ShortcodeMedia>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShortcodeMedia {
    pub id: String,
    pub shortcode: String,
    #[serde(default)]
    pub is_video: bool,
    pub video_url: Option<String>,
    pub display_url: Option<String>,
    pub taken_at_timestamp: Option<i64>,
    pub product_type: Option<String>,
    #[serde(default)]
    pub edge_media_to_caption: Edges<CaptionNode>,
    pub edge_sidecar_to_children: Option<Edges<SidecarChild>>,
    pub owner: Option<MediaOwner>,
}

impl ShortcodeMedia {
    /// First caption text, or empty.
    pub fn caption(&self) -> String {
        self.edge_media_to_caption
            .edges
            .first()
            .map(|edge| edge.node.text.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptionNode {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SidecarChild {
    #[serde(default)]
    pub is_video: bool,
    pub video_url: Option<String>,
    pub display_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaOwner {
    pub username: Option<String>,
}

/// Paginated user timeline.
#[derive(Debug, Deserialize)]
pub struct TimelineResponse {
    pub data: Option<TimelineData>,
}

#[derive(Debug, Deserialize)]
pub struct TimelineData {
    #[serde(rename = "xdt_api__v1__feed__user_timeline_graphql_connection")]
    pub connection: Option<TimelineConnection>,
}

#[derive(Debug, Deserialize)]
pub struct TimelineConnection {
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<TimelineNode>>,
    #[serde(default)]
    pub page_info: PageInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineNode {
    pub code: Option<String>,
    pub shortcode: Option<String>,
    pub product_type: Option<String>,
}

impl TimelineNode {
    pub fn shortcode(&self) -> Option<&str> {
        self.code.as_deref().or(self.shortcode.as_deref())
    }

    pub fn is_clip(&self) -> bool {
        self.product_type.as_deref() == Some("clips")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// A story item from the REST feed.
#[derive(Debug, Clone, Deserialize)]
pub struct StoryItem {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub pk: String,
    pub taken_at: Option<i64>,
    pub media_type: Option<u8>,
    pub video_duration: Option<f64>,
    #[serde(default)]
    pub video_versions: Vec<ImageVersion>,
    pub image_versions2: Option<ImageVersions>,
}

impl StoryItem {
    pub fn is_video(&self) -> bool {
        self.media_type == Some(2) || self.video_duration.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageVersions {
    #[serde(default)]
    pub candidates: Vec<ImageVersion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageVersion {
    pub url: String,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub width: u32,
}

/// `media/<pk>/info` response.
#[derive(Debug, Deserialize)]
pub struct MediaInfoResponse {
    #[serde(default)]
    pub items: Vec<StoryItem>,
}

/// `feed/reels_media` response keyed by user id.
#[derive(Debug, Deserialize)]
pub struct ReelsMediaResponse {
    #[serde(default)]
    pub reels: HashMap<String, Reel>,
}

#[derive(Debug, Deserialize)]
pub struct Reel {
    #[serde(default)]
    pub items: Vec<StoryItem>,
}

/// Highlight tray.
#[derive(Debug, Deserialize)]
pub struct HighlightsResponse {
    pub data: Option<HighlightsData>,
}

#[derive(Debug, Deserialize)]
pub struct HighlightsData {
    pub user: Option<HighlightsUser>,
}

#[derive(Debug, Deserialize)]
pub struct HighlightsUser {
    #[serde(default)]
    pub edge_highlight_reels: Edges<HighlightNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HighlightNode {
    pub id: String,
    pub title: Option<String>,
}

/// Items of one highlight reel.
#[derive(Debug, Deserialize)]
pub struct HighlightItemsResponse {
    pub data: Option<HighlightItemsData>,
}

#[derive(Debug, Deserialize)]
pub struct HighlightItemsData {
    #[serde(default)]
    pub reels_media: Vec<HighlightReel>,
}

#[derive(Debug, Deserialize)]
pub struct HighlightReel {
    #[serde(default)]
    pub items: Vec<HighlightItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HighlightItem {
    #[serde(default)]
    pub is_video: bool,
    #[serde(default)]
    pub video_resources: Vec<DisplayResource>,
    #[serde(default)]
    pub display_resources: Vec<DisplayResource>,
    pub video_url: Option<String>,
    pub display_url: Option<String>,
}

/// One highlight reel with its resolved items.
#[derive(Debug, Clone)]
pub struct Highlight {
    pub id: String,
    pub title: String,
    pub items: Vec<HighlightItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayResource {
    pub src: String,
    #[serde(default)]
    pub config_height: u32,
}

/// Rupload initiate or chunk answer.
#[derive(Debug, Default, Deserialize)]
pub struct RuploadResponse {
    pub status: Option<String>,
    pub offset: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_optional_flexible_id")]
    pub upload_id: Option<String>,
}

/// Configure answer.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigureResponse {
    pub status: Option<String>,
    pub message: Option<String>,
    pub error_title: Option<String>,
    pub media: Option<ConfiguredMedia>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfiguredMedia {
    #[serde(default, deserialize_with = "deserialize_optional_flexible_id")]
    pub pk: Option<String>,
    pub id: Option<String>,
    pub code: Option<String>,
}

/// Comment answer.
#[derive(Debug, Default, Deserialize)]
pub struct CommentResponse {
    pub status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_flexible_id")]
    pub id: Option<String>,
}
