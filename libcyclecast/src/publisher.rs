//! OAuth2 token rotation and the publish protocol
//!
//! Every run refreshes the access token exactly once before publishing; the
//! stored access token is never reused. Threads are published strictly in
//! order, each post replying to the one before it. A failure part-way
//! through a thread leaves the earlier posts published.

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{ClientCredentials, Config};
use crate::error::{ConfigError, CyclecastError, PlatformError, Result};
use crate::oauth::AuthorizationGrant;
use crate::platforms::ApiClient;
use crate::store::{load_json, save_json, DocumentStore};
use crate::types::{ContentBody, ContentItem, ContentKind, CreatePostRequest, Credentials};

pub struct Publisher {
    api: Arc<dyn ApiClient>,
    store: Arc<dyn DocumentStore>,
    credentials_key: String,
}

impl Publisher {
    pub fn new(
        api: Arc<dyn ApiClient>,
        store: Arc<dyn DocumentStore>,
        credentials_key: impl Into<String>,
    ) -> Self {
        Self {
            api,
            store,
            credentials_key: credentials_key.into(),
        }
    }

    pub fn from_config(
        config: &Config,
        api: Arc<dyn ApiClient>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self::new(
            api,
            store,
            config.credentials_path().to_string_lossy().into_owned(),
        )
    }

    pub fn has_credentials(&self) -> Result<bool> {
        self.store.exists(&self.credentials_key)
    }

    /// Load the stored token pair
    ///
    /// # Errors
    ///
    /// `ConfigError::MissingCredentials` when the one-time authorization
    /// has not been run yet.
    pub fn load_credentials(&self) -> Result<Credentials> {
        load_json(self.store.as_ref(), &self.credentials_key)?
            .ok_or_else(|| ConfigError::MissingCredentials(self.credentials_key.clone()).into())
    }

    pub fn save_credentials(&self, credentials: &Credentials) -> Result<()> {
        save_json(
            self.store.as_ref(),
            &self.credentials_key,
            credentials,
            true,
        )
    }

    /// Rotate the stored token pair and return the new access token
    ///
    /// The stored refresh token is replaced only when the server issues a
    /// new one. Nothing is written when the refresh is rejected.
    pub async fn refresh_access_token(&self, client: &ClientCredentials) -> Result<String> {
        let current = self.load_credentials()?;

        let response = self
            .api
            .refresh_token(client, &current.refresh_token)
            .await?;
        let rotated_refresh = response.refresh_token.is_some();

        let updated = response.rotate(&current);
        self.save_credentials(&updated)?;

        info!(rotated_refresh, "Access token refreshed");
        Ok(updated.access_token)
    }

    /// Exchange an authorization code for the first token pair and store it
    ///
    /// Overwrites any existing credentials. The response must carry a
    /// refresh token, otherwise later runs could not refresh.
    pub async fn authorize(
        &self,
        client: &ClientCredentials,
        grant: &AuthorizationGrant,
    ) -> Result<Credentials> {
        let response = self.api.exchange_code(client, grant).await?;

        let refresh_token = response.refresh_token.ok_or_else(|| {
            PlatformError::InvalidResponse(
                "token response has no refresh_token; is the offline.access scope enabled?"
                    .to_string(),
            )
        })?;

        let credentials = Credentials {
            access_token: response.access_token,
            refresh_token,
        };
        self.save_credentials(&credentials)?;

        info!("Stored new credentials at {}", self.credentials_key);
        Ok(credentials)
    }

    /// Publish one standalone post
    pub async fn post_single(&self, access_token: &str, text: &str) -> Result<String> {
        let id = self
            .api
            .create_post(access_token, &CreatePostRequest::new(text))
            .await?;

        info!(post_id = %id, "Post published: {}", preview(text));
        Ok(id)
    }

    /// Publish `texts` as a reply chain and return the IDs in thread order
    pub async fn post_thread<S: AsRef<str>>(
        &self,
        access_token: &str,
        texts: &[S],
    ) -> Result<Vec<String>> {
        if texts.is_empty() {
            return Err(CyclecastError::InvalidInput(
                "Cannot publish a thread with no posts".to_string(),
            ));
        }

        let total = texts.len();
        let mut ids: Vec<String> = Vec::with_capacity(total);

        for (i, text) in texts.iter().enumerate() {
            let text = text.as_ref();
            let request = match ids.last() {
                Some(previous) => CreatePostRequest::replying_to(text, previous.clone()),
                None => CreatePostRequest::new(text),
            };

            let id = self.api.create_post(access_token, &request).await?;
            info!(post_id = %id, "Thread [{}/{}] published: {}", i + 1, total, preview(text));
            ids.push(id);
        }

        Ok(ids)
    }

    /// Publish an item according to its kind
    ///
    /// A body that does not match the kind is rejected before anything is sent.
    pub async fn publish(&self, access_token: &str, item: &ContentItem) -> Result<Vec<String>> {
        debug!(kind = %item.kind, "Publishing item via {}", self.api.name());

        match (item.kind, &item.body) {
            (ContentKind::Single, ContentBody::Text(text)) => {
                let id = self.post_single(access_token, text).await?;
                Ok(vec![id])
            }
            (ContentKind::Thread, ContentBody::Posts(posts)) => {
                self.post_thread(access_token, posts.as_slice()).await
            }
            (ContentKind::Single, ContentBody::Posts(_)) => Err(CyclecastError::InvalidInput(
                "A single item needs one string of content, not a list".to_string(),
            )),
            (ContentKind::Thread, ContentBody::Text(_)) => Err(CyclecastError::InvalidInput(
                "A thread item needs a list of posts, not a single string".to_string(),
            )),
        }
    }
}

/// First 50 characters, for log lines
fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(50).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
