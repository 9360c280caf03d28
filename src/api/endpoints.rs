//! Endpoint paths and GraphQL document ids.
//!
//! These are unstable platform details and are kept together so they can be
//! updated in one place.

pub const BASE_URL: &str = "https://www.instagram.com";
pub const I_BASE_URL: &str = "https://i.instagram.com";
pub const API_URL: &str = "https://www.instagram.com/api/v1";
pub const LOGIN_URL: &str = "https://www.instagram.com/api/v1/web/accounts/login/ajax/";
pub const GRAPHQL_URL: &str = "https://www.instagram.com/graphql/query";

/// Value of the `x-asbd-id` header sent by the web app.
pub const ASBD_ID: &str = "198387";

/// Rollout hash sent when the page does not expose one.
pub const DEFAULT_ROLLOUT_HASH: &str = "1000000000";

/// Post lookup by shortcode, primary id first.
pub const POST_DOC_IDS: &[&str] = &[
    "8845758582119845",
    "7950326061742207",
    "9830740690327183",
    "9935000046557399",
    "10015901848480474",
    "23907016675582737",
    "24141963108832236",
    "24319041294395440",
    "29588494114099064",
    "29789987647283145",
    "29645355751775862",
];

/// Paginated user timeline.
pub const USER_POSTS_DOC_IDS: &[&str] = &[
    "9310670392322965",
    "17862778007156914",
    "17880305679164675",
    "17885113105037631",
];

/// Highlight tray of a user.
pub const HIGHLIGHTS_DOC_IDS: &[&str] = &[
    "17864450716183058",
    "17965172502067288",
    "17913930445236500",
    "17862894953138603",
];

/// Items of one highlight reel.
pub const HIGHLIGHT_ITEMS_DOC_ID: &str = "25147404345163462";

pub const LIKE_DOC_ID: &str = "23951234354462179";
pub const UNLIKE_DOC_ID: &str = "9624975597538585";

pub const LIKE_FRIENDLY_NAME: &str = "usePolarisLikeMediaLikeMutation";
pub const UNLIKE_FRIENDLY_NAME: &str = "usePolarisLikeMediaUnlikeMutation";

/// Build a GraphQL query URL from a document id and JSON variables.
pub fn graphql_query_url(doc_id: &str, variables: &serde_json::Value) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("doc_id", doc_id)
        .append_pair("variables", &variables.to_string())
        .finish();
    format!("{}?{}", GRAPHQL_URL, query)
}

pub fn web_profile_info_url(username: &str) -> String {
    format!("{}/users/web_profile_info/?username={}", API_URL, username)
}

pub fn media_info_url(media_pk: &str) -> String {
    format!("{}/api/v1/media/{}/info/", I_BASE_URL, media_pk)
}

pub fn reels_media_url(user_id: &str) -> String {
    format!("{}/api/v1/feed/reels_media/?reel_ids={}", I_BASE_URL, user_id)
}

pub fn comment_url(media_id: &str) -> String {
    format!("{}/web/comments/{}/add/", API_URL, media_id)
}

pub fn photo_rupload_url(entity_name: &str) -> String {
    format!("{}/rupload_igphoto/{}", BASE_URL, entity_name)
}

pub fn video_rupload_url(entity_name: &str) -> String {
    format!("{}/rupload_igvideo/{}", BASE_URL, entity_name)
}

pub fn configure_photo_url() -> String {
    format!("{}/web/create/configure/", API_URL)
}

pub fn configure_reel_url() -> String {
    format!("{}/media/configure_to_clips/", API_URL)
}

pub fn post_url(shortcode: &str) -> String {
    format!("{}/p/{}/", BASE_URL, shortcode)
}

pub fn profile_url(username: &str) -> String {
    format!("{}/{}/", BASE_URL, username)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_url_encodes_variables() {
        let url = graphql_query_url("123", &serde_json::json!({"shortcode": "ABC"}));
        assert!(url.starts_with("https://www.instagram.com/graphql/query?doc_id=123&variables="));
        assert!(url.contains("%22shortcode%22"));
    }

    #[test]
    fn test_primary_ids_come_first() {
        assert_eq!(POST_DOC_IDS[0], "8845758582119845");
        assert_eq!(USER_POSTS_DOC_IDS[0], "9310670392322965");
        assert_eq!(HIGHLIGHTS_DOC_IDS[0], "17864450716183058");
    }
}
