//! Core types for Cyclecast

use serde::{Deserialize, Serialize};

use crate::error::{CyclecastError, Result};

// ============================================================================
// Content pool
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Single,
    Thread,
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentKind::Single => write!(f, "single"),
            ContentKind::Thread => write!(f, "thread"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentBody {
    Text(String),
    Posts(Vec<String>),
}

/// One entry of the content pool, identified by its position in the pool file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type", alias = "kind")]
    pub kind: ContentKind,
    #[serde(rename = "content", alias = "body")]
    pub body: ContentBody,
}

impl ContentItem {
    pub fn single(text: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Single,
            body: ContentBody::Text(text.into()),
        }
    }

    pub fn thread<I, S>(posts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: ContentKind::Thread,
            body: ContentBody::Posts(posts.into_iter().map(Into::into).collect()),
        }
    }

    /// Check that the body shape matches the declared kind
    pub fn check_shape(&self, index: usize) -> Result<()> {
        match (self.kind, &self.body) {
            (ContentKind::Single, ContentBody::Text(_)) => Ok(()),
            (ContentKind::Thread, ContentBody::Posts(posts)) if !posts.is_empty() => Ok(()),
            (ContentKind::Thread, ContentBody::Posts(_)) => Err(CyclecastError::InvalidInput(
                format!("Content item {} is a thread with no posts", index),
            )),
            (ContentKind::Single, ContentBody::Posts(_)) => Err(CyclecastError::InvalidInput(
                format!("Content item {} is a single post but its content is a list", index),
            )),
            (ContentKind::Thread, ContentBody::Text(_)) => Err(CyclecastError::InvalidInput(
                format!("Content item {} is a thread but its content is a single string", index),
            )),
        }
    }

    /// Texts to publish, in order
    pub fn texts(&self) -> Vec<&str> {
        match &self.body {
            ContentBody::Text(text) => vec![text.as_str()],
            ContentBody::Posts(posts) => posts.iter().map(String::as_str).collect(),
        }
    }
}

/// Parse a pool document and check every item's shape
pub fn parse_pool(raw: &str, source: &str) -> Result<Vec<ContentItem>> {
    let items: Vec<ContentItem> = serde_json::from_str(raw).map_err(|e| {
        crate::error::StoreError::Json {
            key: source.to_string(),
            source: e,
        }
    })?;

    for (index, item) in items.iter().enumerate() {
        item.check_shape(index)?;
    }

    Ok(items)
}

// ============================================================================
// Posting state
// ============================================================================

/// Progress through the current cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingState {
    #[serde(rename = "posted", alias = "postedIndices", default)]
    pub posted_indices: Vec<usize>,
    #[serde(rename = "order", alias = "shuffledOrder", default)]
    pub shuffled_order: Vec<usize>,
}

impl PostingState {
    /// True when a new permutation has to be drawn before selecting
    pub fn needs_reshuffle(&self, pool_size: usize) -> bool {
        self.shuffled_order.is_empty() || self.posted_indices.len() >= pool_size
    }

    /// First index of the order that has not been posted and is valid for the pool
    pub fn next_unposted(&self, pool_size: usize) -> Option<usize> {
        self.shuffled_order
            .iter()
            .copied()
            .find(|idx| *idx < pool_size && !self.posted_indices.contains(idx))
    }

    pub fn remaining(&self, pool_size: usize) -> usize {
        self.shuffled_order
            .iter()
            .filter(|idx| **idx < pool_size && !self.posted_indices.contains(idx))
            .count()
    }
}

// ============================================================================
// OAuth2 credentials and wire types
// ============================================================================

/// Persisted OAuth2 token pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Token endpoint response body
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Rotate `current` with this response, keeping the old refresh token if none was issued
    pub fn rotate(self, current: &Credentials) -> Credentials {
        Credentials {
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .unwrap_or_else(|| current.refresh_token.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTo {
    pub in_reply_to_tweet_id: String,
}

/// Create-post request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyTo>,
}

impl CreatePostRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reply: None,
        }
    }

    pub fn replying_to(text: impl Into<String>, post_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reply: Some(ReplyTo {
                in_reply_to_tweet_id: post_id.into(),
            }),
        }
    }

    pub fn reply_target(&self) -> Option<&str> {
        self.reply.as_ref().map(|r| r.in_reply_to_tweet_id.as_str())
    }
}

/// Create-post response body; the new ID lives at `data.id`
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostResponse {
    #[serde(default)]
    pub data: Option<CreatedPost>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPost {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_reads_type_content_keys() {
        let raw = r#"[
            {"type": "single", "content": "hello"},
            {"type": "thread", "content": ["a", "b", "c"]}
        ]"#;
        let pool = parse_pool(raw, "tweets.json").unwrap();

        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0], ContentItem::single("hello"));
        assert_eq!(pool[1], ContentItem::thread(["a", "b", "c"]));
        assert_eq!(pool[1].texts(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_pool_accepts_kind_body_aliases() {
        let raw = r#"[{"kind": "thread", "body": ["x", "y"]}]"#;
        let pool = parse_pool(raw, "pool.json").unwrap();
        assert_eq!(pool[0].kind, ContentKind::Thread);
    }

    #[test]
    fn test_pool_rejects_mismatched_shapes() {
        let single_list = r#"[{"type": "single", "content": ["a"]}]"#;
        assert!(matches!(
            parse_pool(single_list, "p"),
            Err(CyclecastError::InvalidInput(_))
        ));

        let thread_text = r#"[{"type": "thread", "content": "a"}]"#;
        assert!(matches!(
            parse_pool(thread_text, "p"),
            Err(CyclecastError::InvalidInput(_))
        ));

        let empty_thread = r#"[{"type": "single", "content": "ok"}, {"type": "thread", "content": []}]"#;
        match parse_pool(empty_thread, "p") {
            Err(CyclecastError::InvalidInput(msg)) => assert!(msg.contains("item 1")),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_pool_rejects_unknown_kind() {
        let raw = r#"[{"type": "poll", "content": "a"}]"#;
        assert!(matches!(
            parse_pool(raw, "p"),
            Err(CyclecastError::Store(crate::error::StoreError::Json { .. }))
        ));
    }

    #[test]
    fn test_state_uses_posted_order_keys() {
        let state = PostingState {
            posted_indices: vec![2],
            shuffled_order: vec![2, 0, 1],
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["posted"], serde_json::json!([2]));
        assert_eq!(json["order"], serde_json::json!([2, 0, 1]));

        let aliased: PostingState =
            serde_json::from_str(r#"{"postedIndices": [1], "shuffledOrder": [1, 0]}"#).unwrap();
        assert_eq!(aliased.posted_indices, vec![1]);
        assert_eq!(aliased.shuffled_order, vec![1, 0]);
    }

    #[test]
    fn test_state_missing_fields_default_empty() {
        let state: PostingState = serde_json::from_str("{}").unwrap();
        assert!(state.needs_reshuffle(3));
    }

    #[test]
    fn test_next_unposted_skips_posted_and_out_of_range() {
        let state = PostingState {
            posted_indices: vec![4],
            shuffled_order: vec![4, 7, 1, 0],
        };
        assert_eq!(state.next_unposted(5), Some(1));
        assert_eq!(state.remaining(5), 2);
    }

    #[test]
    fn test_needs_reshuffle_when_exhausted() {
        let state = PostingState {
            posted_indices: vec![1, 0],
            shuffled_order: vec![1, 0],
        };
        assert!(state.needs_reshuffle(2));
        assert!(!state.needs_reshuffle(3));
    }

    #[test]
    fn test_token_rotation_keeps_refresh_token_when_omitted() {
        let current = Credentials {
            access_token: "old-access".to_string(),
            refresh_token: "old-refresh".to_string(),
        };
        let response: TokenResponse =
            serde_json::from_str(r#"{"token_type": "bearer", "access_token": "new-access"}"#)
                .unwrap();

        let rotated = response.rotate(&current);
        assert_eq!(rotated.access_token, "new-access");
        assert_eq!(rotated.refresh_token, "old-refresh");
    }

    #[test]
    fn test_token_rotation_takes_new_refresh_token() {
        let current = Credentials {
            access_token: "a".to_string(),
            refresh_token: "r1".to_string(),
        };
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token": "b", "refresh_token": "r2", "expires_in": 7200}"#)
                .unwrap();
        assert_eq!(response.rotate(&current).refresh_token, "r2");
    }

    #[test]
    fn test_create_post_request_wire_format() {
        let plain = serde_json::to_value(CreatePostRequest::new("hi")).unwrap();
        assert_eq!(plain, serde_json::json!({"text": "hi"}));

        let reply = serde_json::to_value(CreatePostRequest::replying_to("next", "123")).unwrap();
        assert_eq!(
            reply,
            serde_json::json!({"text": "next", "reply": {"in_reply_to_tweet_id": "123"}})
        );
    }

    #[test]
    fn test_create_post_response_id_path() {
        let response: CreatePostResponse =
            serde_json::from_str(r#"{"data": {"id": "1445880548472328192", "text": "hi"}}"#)
                .unwrap();
        assert_eq!(response.data.unwrap().id, "1445880548472328192");

        let empty: CreatePostResponse = serde_json::from_str(r#"{"errors": []}"#).unwrap();
        assert!(empty.data.is_none());
    }

    #[test]
    fn test_credentials_debug_redacts_tokens() {
        let creds = Credentials {
            access_token: "AAAA-secret".to_string(),
            refresh_token: "RRRR-secret".to_string(),
        };
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("AAAA-secret"));
        assert!(!debug.contains("RRRR-secret"));
    }
}
