//! Like and unlike via the GraphQL mutation endpoint.

use serde_json::json;

use crate::api::endpoints::{
    post_url, GRAPHQL_URL, LIKE_DOC_ID, LIKE_FRIENDLY_NAME, UNLIKE_DOC_ID, UNLIKE_FRIENDLY_NAME,
};
use crate::api::types::StatusResponse;
use crate::api::InstagramClient;
use crate::config::parse_shortcode;
use crate::error::{Error, Result};
use crate::session::{RequestSpec, Session};

/// Like the post at `url`.
pub async fn like_post(client: &mut InstagramClient, session: &mut Session, url: &str) -> Result<()> {
    let shortcode = parse_shortcode(url)?;
    let media_id = client.media_id(session, &shortcode).await?;
    let variables = json!({ "media_id": media_id, "container_module": "feed_timeline" });

    mutate(client, session, &shortcode, LIKE_FRIENDLY_NAME, LIKE_DOC_ID, variables).await?;
    tracing::info!("Liked {}", shortcode);
    Ok(())
}

/// Remove a like from the post at `url`.
pub async fn unlike_post(client: &mut InstagramClient, session: &mut Session, url: &str) -> Result<()> {
    let shortcode = parse_shortcode(url)?;
    let media_id = client.media_id(session, &shortcode).await?;
    let variables = json!({ "media_id": media_id });

    mutate(client, session, &shortcode, UNLIKE_FRIENDLY_NAME, UNLIKE_DOC_ID, variables).await?;
    tracing::info!("Unliked {}", shortcode);
    Ok(())
}

async fn mutate(
    client: &mut InstagramClient,
    session: &mut Session,
    shortcode: &str,
    friendly_name: &str,
    doc_id: &str,
    variables: serde_json::Value,
) -> Result<()> {
    client.pace().await;

    let spec = RequestSpec::post_form(GRAPHQL_URL, mutation_form(friendly_name, doc_id, &variables))
        .referer(post_url(shortcode))
        .header("x-fb-friendly-name", friendly_name);
    let response: StatusResponse = client.execute_json(session, &spec).await?;

    if !response.is_ok() {
        return Err(Error::Rejected(
            response
                .message
                .unwrap_or_else(|| format!("{} was not accepted", friendly_name)),
        ));
    }
    Ok(())
}

fn mutation_form(friendly_name: &str, doc_id: &str, variables: &serde_json::Value) -> Vec<(String, String)> {
    vec![
        ("fb_api_caller_class".to_string(), "RelayModern".to_string()),
        ("fb_api_req_friendly_name".to_string(), friendly_name.to_string()),
        ("server_timestamps".to_string(), "true".to_string()),
        ("variables".to_string(), variables.to_string()),
        ("doc_id".to_string(), doc_id.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_form_fields() {
        let form = mutation_form(LIKE_FRIENDLY_NAME, LIKE_DOC_ID, &json!({"media_id": "1"}));
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("fb_api_caller_class"), Some("RelayModern"));
        assert_eq!(get("doc_id"), Some(LIKE_DOC_ID));
        assert_eq!(get("variables"), Some(r#"{"media_id":"1"}"#));
        assert_eq!(get("server_timestamps"), Some("true"));
    }
}
